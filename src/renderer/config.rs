//! Configuration for text rendering

/// Options for rendering a tree to configuration text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Spaces per nesting level
    pub indent: usize,

    /// Whether to descend below the starting folder's direct children
    pub recursive: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            recursive: true,
        }
    }
}

impl RenderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the indentation width
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set whether to walk the whole subtree
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.indent, 4);
        assert!(config.recursive);
    }

    #[test]
    fn test_builder_pattern() {
        let config = RenderConfig::new().with_indent(2).with_recursive(false);
        assert_eq!(config.indent, 2);
        assert!(!config.recursive);
    }
}
