//! Compilation context: target version, feature flags and dialect selection

use std::fmt;

use indexmap::IndexMap;

use crate::version::{Product, Version};

/// Output configuration syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Hierarchical object syntax (tmsh)
    Modern,
    /// Flat syntax of older releases (bigpipe)
    Legacy,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Modern, Dialect::Legacy];

    /// Default selection: BIG-IP from 11.0.0, EM from 2.0.0 and every
    /// BIG-IQ use the modern dialect.
    pub fn for_version(version: &Version) -> Self {
        if version.at_least(Product::Bigip, 11, 0, 0)
            || version.at_least(Product::Em, 2, 0, 0)
            || version.product.is_bigiq()
        {
            Dialect::Modern
        } else {
            Dialect::Legacy
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Modern => "tmsh",
            Dialect::Legacy => "bigpipe",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only state shared by every stamp during compilation
#[derive(Debug, Clone)]
pub struct Context {
    version: Version,
    features: IndexMap<String, bool>,
}

impl Context {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            features: IndexMap::new(),
        }
    }

    /// Enable or disable a named feature (e.g. a provisioned module)
    pub fn with_feature(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.features.insert(name.into(), enabled);
        self
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Unknown features are off
    pub fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, bool)> {
        self.features.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::for_version(&self.version)
    }
}
