//! tmos-confgen - configuration trees compiled to TMOS configuration text
//!
//! Entities ("stamps") are hooked onto a tree of partitions and folders.
//! Each stamp compiles against a small template written in the target's own
//! configuration syntax, picking the modern (tmsh) or legacy (bigpipe)
//! dialect from the target version, and the renderer writes the results out
//! in tree order.
//!
//! # Example
//!
//! ```rust
//! use tmos_confgen::compile_topology;
//!
//! let text = compile_topology(r#"
//! version = "bigip 11.5.0"
//!
//! [[stamp]]
//! kind = "node"
//! address = "10.0.0.1"
//! "#).unwrap();
//! assert!(text.contains("ltm node /Common/10.0.0.1"));
//! ```

pub mod context;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod stamp;
pub mod template;
pub mod topology;
pub mod tree;
pub mod version;

pub use context::{Context, Dialect};
pub use error::{CompileError, GrammarParseError, TreeError};
pub use parser::{parse, Map, Value};
pub use renderer::{Encoder, RenderConfig, Renderer};
pub use stamp::{Compiled, Compiler, Kind, Stamp};
pub use template::TemplateCache;
pub use topology::{Topology, TopologyError};
pub use tree::{FolderId, StampId, Tree};
pub use version::{Product, Version, VersionError};

use thiserror::Error;

/// Errors that can occur in the topology-to-text pipeline
#[derive(Debug, Error)]
pub enum ConfgenError {
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("no partition named '{0}'")]
    UnknownPartition(String),
}

/// Configuration for the complete pipeline
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Text output configuration
    pub render: RenderConfig,
    /// Version to compile for, overriding the topology's own
    pub target: Option<Version>,
    /// Render only this partition
    pub partition: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render(mut self, config: RenderConfig) -> Self {
        self.render = config;
        self
    }

    pub fn with_target(mut self, target: Version) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }
}

/// Compile a TOML topology to configuration text with default settings
pub fn compile_topology(source: &str) -> Result<String, ConfgenError> {
    compile_topology_with_config(source, &Config::default())
}

/// Compile a TOML topology using the process-wide template cache
///
/// # Example
///
/// ```rust
/// use tmos_confgen::{compile_topology_with_config, Config, Version};
///
/// let source = r#"
/// [[stamp]]
/// kind = "node"
/// address = "10.0.0.1"
/// "#;
/// let config = Config::new().with_target(Version::bigip(10, 2, 0));
/// let text = compile_topology_with_config(source, &config).unwrap();
/// assert!(text.contains("node 10.0.0.1 {"));
/// ```
pub fn compile_topology_with_config(source: &str, config: &Config) -> Result<String, ConfgenError> {
    let topology = Topology::from_str_with_target(source, config.target)?;
    let tree = topology.tree();
    let from = match &config.partition {
        Some(name) => tree
            .partition(name)
            .ok_or_else(|| ConfgenError::UnknownPartition(name.clone()))?,
        None => tree.root(),
    };

    let renderer = Renderer::new(tree, TemplateCache::global()).with_config(config.render.clone());
    Ok(renderer.render_all(from)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: &str = r#"
version = "bigip 11.5.0"
partitions = 1

[[stamp]]
kind = "node"
id = "n1"
address = "10.0.0.1"

[[stamp]]
kind = "node"
folder = "Partition1"
address = "10.0.1.1"
"#;

    #[test]
    fn test_compile_partition_only() {
        let config = Config::new().with_partition("Partition1");
        let text = compile_topology_with_config(POOL, &config).unwrap();
        assert!(text.contains("/Partition1/10.0.1.1"));
        assert!(!text.contains("/Common/10.0.0.1"));
    }

    #[test]
    fn test_unknown_partition() {
        let config = Config::new().with_partition("Missing");
        let err = compile_topology_with_config(POOL, &config).unwrap_err();
        assert!(matches!(err, ConfgenError::UnknownPartition(name) if name == "Missing"));
    }

    #[test]
    fn test_non_recursive_skips_nested_folders() {
        let source = r#"
version = "bigip 11.5.0"

[[folder]]
path = "Common/app"

[[stamp]]
kind = "node"
folder = "Common/app"
address = "10.0.0.1"
"#;
        let config = Config::new().with_render(RenderConfig::new().with_recursive(false));
        let text = compile_topology_with_config(source, &config).unwrap();
        assert!(!text.contains("10.0.0.1"));
        assert!(text.contains("auth partition Common"));

        let text = compile_topology(source).unwrap();
        assert!(text.contains("ltm node /Common/app/10.0.0.1"));
    }

    #[test]
    fn test_non_recursive_partition_keeps_own_stamps() {
        let source = r#"
version = "bigip 11.5.0"

[[folder]]
path = "Common/app"

[[stamp]]
kind = "node"
address = "10.0.0.1"

[[stamp]]
kind = "node"
folder = "Common/app"
address = "10.0.0.2"
"#;
        let config = Config::new()
            .with_partition("Common")
            .with_render(RenderConfig::new().with_recursive(false));
        let text = compile_topology_with_config(source, &config).unwrap();
        assert!(text.starts_with("auth partition Common {"));
        assert!(text.contains("ltm node /Common/10.0.0.1 {"));
        assert!(text.contains("ltm node /Common/app/10.0.0.2 {"));
    }

    #[test]
    fn test_topology_error_is_wrapped() {
        let err = compile_topology("version = 3").unwrap_err();
        assert!(matches!(err, ConfgenError::Topology(TopologyError::ParseError(_))));
        assert!(err.to_string().starts_with("topology error:"));
    }
}
