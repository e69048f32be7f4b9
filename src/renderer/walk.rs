//! Tree walk producing the final configuration text

use std::fmt;

use tracing::info;

use crate::error::CompileError;
use crate::renderer::{Encoder, RenderConfig};
use crate::stamp::{Compiler, Stamp};
use crate::template::TemplateCache;
use crate::tree::{FolderId, Tree};

/// Renders the stamps hooked under a folder, in folder then hook order
#[derive(Debug, Clone)]
pub struct Renderer<'t> {
    compiler: Compiler<'t>,
    config: RenderConfig,
}

impl<'t> Renderer<'t> {
    pub fn new(tree: &'t Tree, cache: &'t TemplateCache) -> Self {
        Self {
            compiler: Compiler::new(tree, cache),
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render using the configured recursion and no filter
    pub fn render_all(&self, from: FolderId) -> Result<String, CompileError> {
        self.render(from, self.config.recursive, |_| true)
    }

    /// Compile and encode every non-built-in stamp accepted by `include`.
    ///
    /// `from` itself is always visited (unless it is the root), followed by
    /// its direct children or, with `recursive`, its whole subtree. Stamps
    /// that compile to nothing are skipped. The first error aborts the
    /// render and nothing is returned.
    pub fn render<F>(&self, from: FolderId, recursive: bool, include: F) -> Result<String, CompileError>
    where
        F: Fn(&Stamp) -> bool,
    {
        let tree = self.compiler.tree();
        let encoder = Encoder::new(self.config.indent);
        let mut out = String::new();
        let mut written = 0usize;

        let mut folders = Vec::new();
        if !recursive && from != tree.root() {
            folders.push(from);
        }
        folders.extend(tree.enumerate(from, recursive));

        for folder in folders {
            for &id in tree.folder(folder).content() {
                let Some(stamp) = tree.stamp(id) else {
                    continue;
                };
                if stamp.built_in() || !include(stamp) {
                    continue;
                }
                let compiled = self.compiler.compile(id)?;
                if let Some(value) = compiled.value.as_ref().filter(|value| !value.is_empty()) {
                    encoder.encode_into(&mut out, value);
                    written += 1;
                }
            }
        }

        info!(folder = %tree.key(from), recursive, stamps = written, bytes = out.len(), "rendered tree");
        Ok(out)
    }

    /// Like [`Renderer::render`], appending to `out` only once the whole
    /// render has succeeded
    pub fn render_into<W, F>(&self, out: &mut W, from: FolderId, recursive: bool, include: F) -> Result<(), CompileError>
    where
        W: fmt::Write,
        F: Fn(&Stamp) -> bool,
    {
        let text = self.render(from, recursive, include)?;
        out.write_str(&text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::parser::Map;
    use crate::stamp::ltm::{Member, Node, Pool};
    use crate::stamp::profile::Profile;
    use crate::stamp::scaffolding::Raw;
    use crate::stamp::Kind;
    use crate::tree::PARTITION_COMMON;
    use crate::version::Version;
    use pretty_assertions::assert_eq;

    fn tree() -> Tree {
        Tree::with_partitions(Context::new(Version::bigip(11, 5, 0)), 1)
    }

    #[test]
    fn test_render_skips_built_in_and_empty() {
        let mut tree = tree();
        let common = tree.partition(PARTITION_COMMON).unwrap();
        tree.hook_stamp(common, Profile::new("tcp"));
        tree.hook_stamp(common, Raw::new(Map::new()));
        tree.hook_stamp(common, Node::new("10.0.0.1"));

        let cache = TemplateCache::new();
        let renderer = Renderer::new(&tree, &cache);
        let text = renderer
            .render(common, false, |stamp| stamp.kind() == Kind::Node)
            .unwrap();
        assert_eq!(text, "ltm node /Common/10.0.0.1 {\n    address 10.0.0.1\n}\n");

        let text = renderer.render(tree.root(), true, |stamp| stamp.kind() != Kind::Partition).unwrap();
        assert_eq!(text, "ltm node /Common/10.0.0.1 {\n    address 10.0.0.1\n}\n");
    }

    #[test]
    fn test_render_order_follows_folders() {
        let mut tree = tree();
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let first = tree.partition("Partition1").unwrap();
        tree.hook_stamp(first, Node::new("10.0.0.2"));
        tree.hook_stamp(common, Node::new("10.0.0.1"));

        let cache = TemplateCache::new();
        let text = Renderer::new(&tree, &cache)
            .render(tree.root(), true, |stamp| stamp.kind() == Kind::Node)
            .unwrap();
        assert_eq!(
            text,
            "ltm node /Common/10.0.0.1 {\n    address 10.0.0.1\n}\nltm node /Partition1/10.0.0.2 {\n    address 10.0.0.2\n}\n"
        );
    }

    #[test]
    fn test_non_recursive_includes_start_folder() {
        let mut tree = tree();
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let app = tree.add(common, "app").unwrap();
        let deep = tree.add(app, "deep").unwrap();
        tree.hook_stamp(common, Node::new("10.0.0.1"));
        tree.hook_stamp(app, Node::new("10.0.0.2"));
        tree.hook_stamp(deep, Node::new("10.0.0.3"));

        let cache = TemplateCache::new();
        let renderer = Renderer::new(&tree, &cache);
        let text = renderer.render(common, false, |_| true).unwrap();
        assert!(text.starts_with("auth partition Common {"));
        assert!(text.contains("ltm node /Common/10.0.0.1 {"));
        assert!(text.contains("sys folder /Common/app {"));
        assert!(text.contains("ltm node /Common/app/10.0.0.2 {"));
        assert!(!text.contains("10.0.0.3"));

        let text = renderer.render(tree.root(), false, |stamp| stamp.kind() == Kind::Node).unwrap();
        assert_eq!(text, "ltm node /Common/10.0.0.1 {\n    address 10.0.0.1\n}\n");
    }

    #[test]
    fn test_render_into_leaves_output_on_error() {
        let mut tree = tree();
        let common = tree.partition(PARTITION_COMMON).unwrap();
        tree.hook_stamp(common, Node::new("10.0.0.1"));
        let unhooked = tree.insert(Node::new("10.0.0.9"));
        let pool = Pool::new("p").with_member(Member::new(unhooked, 80));
        tree.hook_stamp(common, pool);

        let cache = TemplateCache::new();
        let mut out = String::from("# header\n");
        let err = Renderer::new(&tree, &cache)
            .render_into(&mut out, tree.root(), true, |_| true)
            .unwrap_err();
        assert!(matches!(err, CompileError::Reference { kind: Kind::Pool, .. }));
        assert_eq!(out, "# header\n");
    }

    #[test]
    fn test_indent_from_config() {
        let mut tree = tree();
        let common = tree.partition(PARTITION_COMMON).unwrap();
        tree.hook_stamp(common, Raw::parse("sys db x {\n    value y\n}").unwrap());

        let cache = TemplateCache::new();
        let text = Renderer::new(&tree, &cache)
            .with_config(RenderConfig::new().with_indent(2))
            .render(common, true, |stamp| stamp.kind() == Kind::Raw)
            .unwrap();
        assert_eq!(text, "sys db x {\n  value y\n}\n");
    }
}
