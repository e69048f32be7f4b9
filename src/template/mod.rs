//! Template sources and the parse-once cache in front of them
//!
//! Each entity kind has at most one template per dialect. Templates are
//! written in the configuration syntax itself, with `$`-prefixed
//! placeholders for the keys a stamp renames when compiling.

mod cache;
pub mod registry;

pub use cache::{CacheStats, TemplateCache};
