//! Compile-once driver and the view a stamp gets of its surroundings

use tracing::debug;

use crate::context::{Context, Dialect};
use crate::error::CompileError;
use crate::parser::Map;
use crate::stamp::{Kind, Stamp};
use crate::template::TemplateCache;
use crate::tree::{FolderId, Slot, StampId, Tree};
use crate::version::Version;

/// Memoized result of compiling one stamp
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// What other stamps use to refer to this one
    pub key: Option<String>,
    pub value: Option<Map>,
    pub dialect: Dialect,
}

impl Compiled {
    /// True when there is nothing to write out
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().map_or(true, Map::is_empty)
    }
}

/// Compiles stamps of one tree against a template cache.
///
/// Results are stored in the tree's slots, so compiling the same stamp
/// twice (directly or through references) runs its dialect step once.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'t> {
    tree: &'t Tree,
    cache: &'t TemplateCache,
}

impl<'t> Compiler<'t> {
    pub fn new(tree: &'t Tree, cache: &'t TemplateCache) -> Self {
        Self { tree, cache }
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn compile(&self, id: StampId) -> Result<&'t Compiled, CompileError> {
        let slot = self
            .tree
            .slot(id)
            .ok_or(CompileError::UnknownStamp { id: id.0 })?;
        if let Some(done) = slot.memo.get() {
            return Ok(done);
        }

        let kind = slot.stamp.kind();
        let folder = slot.folder.ok_or(CompileError::MissingContext { kind })?;
        if slot.compiling.replace(true) {
            return Err(CompileError::ReferenceCycle { kind });
        }
        let result = slot.memo.get_or_try_init(|| self.run(id, slot, folder));
        slot.compiling.set(false);
        result
    }

    /// Reference key of a stamp, compiling it first if needed
    pub fn reference(&self, id: StampId) -> Result<Option<&'t str>, CompileError> {
        Ok(self.compile(id)?.key.as_deref())
    }

    fn run(&self, id: StampId, slot: &'t Slot, folder: FolderId) -> Result<Compiled, CompileError> {
        let render = slot.stamp.as_render();
        let kind = render.kind();
        let dialect = render.dialect(self.tree.context().version());
        let template = self.cache.get(kind, dialect)?;
        let scope = Scope {
            compiler: *self,
            folder,
            kind,
        };

        slot.renders.set(slot.renders.get() + 1);
        let (key, value) = match dialect {
            Dialect::Modern => render.modern(&scope, template)?,
            Dialect::Legacy => render.legacy(&scope, template)?,
        };
        debug!(stamp = %id, %kind, %dialect, key = ?key, emitted = value.is_some(), "compiled stamp");
        Ok(Compiled {
            key,
            value,
            dialect,
        })
    }
}

/// What a stamp sees while compiling: its folder, the shared context and
/// the stamps it refers to.
pub struct Scope<'t> {
    compiler: Compiler<'t>,
    folder: FolderId,
    kind: Kind,
}

impl<'t> Scope<'t> {
    pub fn context(&self) -> &'t Context {
        self.compiler.tree.context()
    }

    pub fn version(&self) -> &'t Version {
        self.context().version()
    }

    pub fn feature(&self, name: &str) -> bool {
        self.context().feature(name)
    }

    pub fn folder(&self) -> FolderId {
        self.folder
    }

    /// Absolute path of the stamp's folder, e.g. `/Common/sub`
    pub fn folder_path(&self) -> String {
        self.compiler.tree.path(self.folder)
    }

    /// Absolute path of `name` inside the stamp's folder
    pub fn path(&self, name: &str) -> String {
        format!("{}/{}", self.folder_path(), name)
    }

    pub fn partition_name(&self) -> &'t str {
        let tree = self.compiler.tree;
        tree.folder(tree.partition_of(self.folder)).name()
    }

    pub fn partition_index(&self) -> usize {
        let tree = self.compiler.tree;
        tree.folder(tree.partition_of(self.folder)).index()
    }

    /// Reference key of another stamp, compiling it on first use
    pub fn reference(&self, id: StampId) -> Result<String, CompileError> {
        let compiled = self
            .compiler
            .compile(id)
            .map_err(|source| CompileError::Reference {
                kind: self.kind,
                source: Box::new(source),
            })?;
        match &compiled.key {
            Some(key) => Ok(key.clone()),
            None => Err(CompileError::NoReferenceKey {
                kind: self.stamp(id)?.kind(),
            }),
        }
    }

    /// Like [`Scope::reference`], but the target must be of `kind`
    pub fn reference_to(&self, id: StampId, kind: Kind) -> Result<String, CompileError> {
        let stamp = self.stamp(id)?;
        if stamp.kind() != kind {
            return Err(self.unexpected(kind, stamp));
        }
        self.reference(id)
    }

    pub fn stamp(&self, id: StampId) -> Result<&'t Stamp, CompileError> {
        self.compiler
            .tree
            .stamp(id)
            .ok_or(CompileError::UnknownStamp { id: id.0 })
    }

    /// Absolute path of `name` in the folder `id` is hooked to, without
    /// compiling it
    pub fn stamp_path(&self, id: StampId, name: &str) -> Result<String, CompileError> {
        let tree = self.compiler.tree;
        let folder = tree.stamp_folder(id).ok_or(CompileError::MissingContext {
            kind: self.stamp(id)?.kind(),
        })?;
        Ok(format!("{}/{}", tree.path(folder), name))
    }

    /// Error for a reference that points at the wrong kind of stamp
    pub fn unexpected(&self, expected: Kind, found: &Stamp) -> CompileError {
        CompileError::UnexpectedKind {
            expected,
            found: found.kind(),
        }
    }
}
