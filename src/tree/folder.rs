//! Folder nodes and arena handles

use std::fmt;

use indexmap::IndexMap;

use crate::stamp::Kind;

/// Handle to a folder in a [`Tree`](super::Tree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(pub(crate) usize);

/// Handle to a stamp in a [`Tree`](super::Tree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StampId(pub(crate) usize);

impl fmt::Display for StampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A partition (direct child of the root) or a nested folder
#[derive(Debug, Clone)]
pub struct Folder {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) parent: Option<FolderId>,
    pub(crate) children: IndexMap<String, FolderId>,
    pub(crate) content: Vec<StampId>,
    pub(crate) content_map: IndexMap<Kind, Vec<StampId>>,
}

impl Folder {
    pub(crate) fn new(name: impl Into<String>, index: usize, parent: Option<FolderId>) -> Self {
        Self {
            name: name.into(),
            index,
            parent,
            children: IndexMap::new(),
            content: Vec::new(),
            content_map: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position among siblings at creation time
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Hooked stamps in hook order
    pub fn content(&self) -> &[StampId] {
        &self.content
    }

    /// Hooked stamps of one kind, in hook order
    pub fn of_kind(&self, kind: Kind) -> &[StampId] {
        self.content_map.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self) -> impl Iterator<Item = FolderId> + '_ {
        self.children.values().copied()
    }
}
