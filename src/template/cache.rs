//! Parsed-template cache shared by every compilation in the process

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::context::Dialect;
use crate::error::GrammarParseError;
use crate::parser::{self, Map};
use crate::stamp::Kind;
use crate::template::registry;

static GLOBAL: Lazy<TemplateCache> = Lazy::new(TemplateCache::new);

/// Hit and miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Parses each template once and hands out private copies.
///
/// Entries are never evicted. Two threads missing on the same key at once
/// may both parse; the parses are identical and the first store wins.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<(Kind, Dialect), Map>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance
    pub fn global() -> &'static TemplateCache {
        &GLOBAL
    }

    /// Owned copy of the template for `kind` in `dialect`; empty when none
    /// is registered
    pub fn get(&self, kind: Kind, dialect: Dialect) -> Result<Map, GrammarParseError> {
        if let Some(template) = self.entries.read().get(&(kind, dialect)) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(template.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = match registry::source(kind, dialect) {
            Some(text) => parser::parse(text)?,
            None => Map::new(),
        };
        trace!(%kind, %dialect, entries = parsed.len(), "parsed template");

        let mut entries = self.entries.write();
        Ok(entries.entry((kind, dialect)).or_insert(parsed).clone())
    }

    /// Parse every registered template up front
    pub fn prewarm(&self) -> Result<(), GrammarParseError> {
        for (kind, dialect, _) in registry::sources() {
            self.get(kind, dialect)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}
