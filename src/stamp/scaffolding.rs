//! Partition and folder markers plus pre-built raw objects

use crate::context::Dialect;
use crate::error::{CompileError, GrammarParseError};
use crate::parser::{self, Map};
use crate::stamp::{block, rename_block, Kind, Output, Render, Scope};
use crate::version::{Product, Version};

pub(crate) const PARTITION_MODERN: &str = r#"
auth partition $name {
    description none
}
sys folder $key {
    inherited-devicegroup true
    inherited-traffic-group true
    traffic-group /Common/traffic-group-1
}
cli admin-partitions {
    update-partition $name
}
"#;

pub(crate) const PARTITION_LEGACY: &str = r#"
partition $name {
    description none
}
shell write partition $name
"#;

pub(crate) const FOLDER_MODERN: &str = r#"
sys folder $key {
    inherited-devicegroup true
    inherited-traffic-group true
    traffic-group /Common/traffic-group-1
}
"#;

/// Folders exist on every EM release, unlike most other objects
fn marker_dialect(version: &Version) -> Dialect {
    if version.at_least(Product::Bigip, 11, 0, 0) || version.product.is_em() || version.product.is_bigiq() {
        Dialect::Modern
    } else {
        Dialect::Legacy
    }
}

/// Synthetic stamp owned by every partition
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Defaults to "This is partition <index>"
    pub description: Option<String>,
}

impl Partition {
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }

    fn description(&self, index: usize) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("This is partition {}", index))
    }
}

impl Render for Partition {
    fn kind(&self) -> Kind {
        Kind::Partition
    }

    fn dialect(&self, version: &Version) -> Dialect {
        marker_dialect(version)
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let name = scope.partition_name();
        let description = self.description(scope.partition_index());

        rename_block(self.kind(), &mut template, &["auth", "partition", "$name"], name)?
            .insert("description", description);
        rename_block(self.kind(), &mut template, &["sys", "folder", "$key"], &scope.folder_path())?;
        block(self.kind(), &mut template, &["cli", "admin-partitions"])?.insert("update-partition", name);

        Ok((Some(name.to_string()), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let name = scope.partition_name();
        let description = self.description(scope.partition_index());

        rename_block(self.kind(), &mut template, &["partition", "$name"], name)?
            .insert("description", description);
        block(self.kind(), &mut template, &["shell", "write"])?.insert("partition", name);

        Ok((Some(name.to_string()), Some(template)))
    }
}

/// Synthetic stamp owned by every non-partition folder
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderMarker;

impl Render for FolderMarker {
    fn kind(&self) -> Kind {
        Kind::Folder
    }

    fn dialect(&self, version: &Version) -> Dialect {
        marker_dialect(version)
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let key = scope.folder_path();
        rename_block(self.kind(), &mut template, &["sys", "folder", "$key"], &key)?;
        Ok((Some(key), Some(template)))
    }
}

/// A pre-built object emitted as-is in any dialect
#[derive(Debug, Clone, Default)]
pub struct Raw {
    pub key: Option<String>,
    pub value: Map,
}

impl Raw {
    pub fn new(value: Map) -> Self {
        Self { key: None, value }
    }

    /// Build from configuration text
    pub fn parse(text: &str) -> Result<Self, GrammarParseError> {
        Ok(Self::new(parser::parse(text)?))
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn output(&self) -> Output {
        (self.key.clone(), Some(self.value.clone()))
    }
}

impl Render for Raw {
    fn kind(&self) -> Kind {
        Kind::Raw
    }

    fn modern(&self, _scope: &Scope<'_>, _template: Map) -> Result<Output, CompileError> {
        Ok(self.output())
    }

    fn legacy(&self, _scope: &Scope<'_>, _template: Map) -> Result<Output, CompileError> {
        Ok(self.output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::testing::{compile, encode, tree};
    use crate::tree::PARTITION_COMMON;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partition_modern() {
        let tree = tree(Version::bigip(11, 5, 0), 1);
        let p1 = tree.partition("Partition1").unwrap();
        let marker = tree.folder(p1).of_kind(Kind::Partition)[0];

        let compiled = compile(&tree, marker);
        assert_eq!(compiled.key.as_deref(), Some("Partition1"));
        assert_eq!(
            encode(&compiled),
            r#"auth partition Partition1 {
    description "This is partition 1"
}
sys folder /Partition1 {
    inherited-devicegroup true
    inherited-traffic-group true
    traffic-group /Common/traffic-group-1
}
cli admin-partitions {
    update-partition Partition1
}
"#
        );
    }

    #[test]
    fn test_partition_legacy() {
        let tree = tree(Version::bigip(10, 2, 0), 0);
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let marker = tree.folder(common).of_kind(Kind::Partition)[0];

        let compiled = compile(&tree, marker);
        assert_eq!(compiled.dialect, Dialect::Legacy);
        assert_eq!(
            encode(&compiled),
            "partition Common {\n    description \"This is partition 0\"\n}\nshell write partition Common\n"
        );
    }

    #[test]
    fn test_markers_modern_on_old_em() {
        let mut tree = tree(Version::em(1, 8, 0), 0);
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let sub = tree.add(common, "sub").unwrap();
        let marker = tree.folder(sub).of_kind(Kind::Folder)[0];

        let compiled = compile(&tree, marker);
        assert_eq!(compiled.dialect, Dialect::Modern);
        assert_eq!(compiled.key.as_deref(), Some("/Common/sub"));
    }

    #[test]
    fn test_folder_marker_legacy_is_empty() {
        let mut tree = tree(Version::bigip(10, 2, 0), 0);
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let sub = tree.add(common, "sub").unwrap();
        let marker = tree.folder(sub).of_kind(Kind::Folder)[0];

        let compiled = compile(&tree, marker);
        assert_eq!((compiled.key, compiled.value), (None, None));
    }

    #[test]
    fn test_raw_any_dialect() {
        for version in [Version::bigip(11, 0, 0), Version::bigip(9, 4, 0)] {
            let mut tree = tree(version, 0);
            let common = tree.partition(PARTITION_COMMON).unwrap();
            let raw = Raw::parse("sys db setup.run {\n    value false\n}").unwrap().with_key("setup.run");
            let id = tree.hook_stamp(common, raw);

            let compiled = compile(&tree, id);
            assert_eq!(compiled.key.as_deref(), Some("setup.run"));
            assert_eq!(encode(&compiled), "sys db setup.run {\n    value false\n}\n");
        }
    }
}
