//! Folder tree holding partitions, nested folders and hooked stamps
//!
//! Folders live in an arena and refer to each other by [`FolderId`]. The root
//! is implicit: it has no name and never contributes to a path. Its direct
//! children are partitions, each of which owns a partition marker stamp.

mod folder;

use std::cell::Cell;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use tracing::trace;

pub use folder::{Folder, FolderId, StampId};

use crate::context::Context;
use crate::error::TreeError;
use crate::stamp::scaffolding::{FolderMarker, Partition};
use crate::stamp::{Compiled, Kind, Stamp};

/// Name of the partition shared by every other partition
pub const PARTITION_COMMON: &str = "Common";

/// Storage for one stamp and its compile-once state
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) stamp: Stamp,
    pub(crate) folder: Option<FolderId>,
    pub(crate) memo: OnceCell<Compiled>,
    pub(crate) compiling: Cell<bool>,
    pub(crate) renders: Cell<u32>,
}

/// The entity tree: folders, the stamps hooked onto them and the shared
/// compilation context.
#[derive(Debug)]
pub struct Tree {
    context: Context,
    folders: Vec<Folder>,
    slots: Vec<Slot>,
}

impl Tree {
    /// Create a tree holding only the implicit root
    pub fn new(context: Context) -> Self {
        Self {
            context,
            folders: vec![Folder::new("", 0, None)],
            slots: Vec::new(),
        }
    }

    /// Root plus `Common` and `Partition1..=count`
    pub fn with_partitions(context: Context, count: usize) -> Self {
        let mut tree = Self::new(context);
        let root = tree.root();
        let names = std::iter::once(PARTITION_COMMON.to_string())
            .chain((1..=count).map(|i| format!("Partition{}", i)));
        for name in names {
            // names are distinct, so this cannot collide
            let _ = tree.add(root, &name);
        }
        tree
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    /// Create a child folder. Children of the root are partitions and get a
    /// partition marker; deeper folders get a folder marker.
    pub fn add(&mut self, parent: FolderId, name: &str) -> Result<FolderId, TreeError> {
        let siblings = &self.folders[parent.0].children;
        if siblings.contains_key(name) {
            return Err(TreeError::DuplicateFolder {
                parent: self.key(parent),
                name: name.to_string(),
            });
        }
        let index = siblings.len();
        let id = FolderId(self.folders.len());
        self.folders.push(Folder::new(name, index, Some(parent)));
        self.folders[parent.0].children.insert(name.to_string(), id);

        let marker: Stamp = if self.folders[parent.0].is_root() {
            Partition::default().into()
        } else {
            FolderMarker.into()
        };
        self.hook_stamp(id, marker);
        trace!(folder = %self.key(id), index, "added folder");
        Ok(id)
    }

    /// Register a stamp without hooking it anywhere yet
    pub fn insert(&mut self, stamp: impl Into<Stamp>) -> StampId {
        let id = StampId(self.slots.len());
        self.slots.push(Slot {
            stamp: stamp.into(),
            folder: None,
            memo: OnceCell::new(),
            compiling: Cell::new(false),
            renders: Cell::new(0),
        });
        id
    }

    /// Append stamps to a folder in the given order
    pub fn hook(&mut self, folder: FolderId, stamps: &[StampId]) -> Result<(), TreeError> {
        for &id in stamps {
            let slot = self
                .slots
                .get(id.0)
                .ok_or(TreeError::UnknownStamp { id: id.0 })?;
            if let Some(current) = slot.folder {
                return Err(TreeError::AlreadyHooked {
                    id: id.0,
                    folder: self.key(current),
                });
            }
        }
        for &id in stamps {
            self.attach(folder, id);
        }
        Ok(())
    }

    /// Insert a stamp and hook it onto `folder` in one step
    pub fn hook_stamp(&mut self, folder: FolderId, stamp: impl Into<Stamp>) -> StampId {
        let id = self.insert(stamp);
        self.attach(folder, id);
        id
    }

    fn attach(&mut self, folder: FolderId, id: StampId) {
        let kind = self.slots[id.0].stamp.kind();
        self.slots[id.0].folder = Some(folder);
        let target = &mut self.folders[folder.0];
        target.content.push(id);
        target.content_map.entry(kind).or_default().push(id);
    }

    pub fn stamp(&self, id: StampId) -> Option<&Stamp> {
        self.slots.get(id.0).map(|slot| &slot.stamp)
    }

    /// Folder a stamp is hooked to
    pub fn stamp_folder(&self, id: StampId) -> Option<FolderId> {
        self.slots.get(id.0).and_then(|slot| slot.folder)
    }

    pub(crate) fn slot(&self, id: StampId) -> Option<&Slot> {
        self.slots.get(id.0)
    }

    /// How many times the dialect step ran for a stamp
    pub fn compile_count(&self, id: StampId) -> u32 {
        self.slots.get(id.0).map(|slot| slot.renders.get()).unwrap_or(0)
    }

    /// `/`-joined names from the partition down; empty for the root
    pub fn key(&self, id: FolderId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(parent) = self.folders[current.0].parent {
            names.push(self.folders[current.0].name.as_str());
            current = parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Absolute form of [`Tree::key`] used inside configuration objects
    pub fn path(&self, id: FolderId) -> String {
        if self.folders[id.0].is_root() {
            String::new()
        } else {
            format!("/{}", self.key(id))
        }
    }

    /// The partition containing `id`; the root maps to itself
    pub fn partition_of(&self, id: FolderId) -> FolderId {
        let mut current = id;
        while let Some(parent) = self.folders[current.0].parent {
            if self.folders[parent.0].is_root() {
                break;
            }
            current = parent;
        }
        current
    }

    pub fn child(&self, parent: FolderId, name: &str) -> Option<FolderId> {
        self.folders[parent.0].children.get(name).copied()
    }

    pub fn partition(&self, name: &str) -> Option<FolderId> {
        self.child(self.root(), name)
    }

    /// Resolve a `Common/sub` style key
    pub fn find(&self, key: &str) -> Option<FolderId> {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.root(), |folder, name| self.child(folder, name))
    }

    /// Depth-first, self-first walk excluding the root. When `recursive` is
    /// false only the direct children of `from` are visited.
    pub fn enumerate(&self, from: FolderId, recursive: bool) -> Walk<'_> {
        let stack = if recursive {
            vec![from]
        } else {
            self.folders[from.0].children.values().rev().copied().collect()
        };
        Walk {
            tree: self,
            stack,
            recursive,
        }
    }

    /// Stamps of `kind` under the partition of `folder`, visiting everything
    /// in `Common` first when `include_common` is set.
    pub fn enumerate_stamps(&self, folder: FolderId, kind: Kind, include_common: bool) -> Vec<StampId> {
        let partition = self.partition_of(folder);
        let mut sources = Vec::new();
        if include_common {
            if let Some(common) = self.partition(PARTITION_COMMON) {
                if common != partition {
                    sources.push(common);
                }
            }
        }
        sources.push(folder);

        sources
            .into_iter()
            .flat_map(|start| self.enumerate(start, true))
            .flat_map(|id| self.folders[id.0].of_kind(kind).iter().copied())
            .collect()
    }
}

/// Iterator returned by [`Tree::enumerate`]
pub struct Walk<'t> {
    tree: &'t Tree,
    stack: Vec<FolderId>,
    recursive: bool,
}

impl Iterator for Walk<'_> {
    type Item = FolderId;

    fn next(&mut self) -> Option<FolderId> {
        loop {
            let id = self.stack.pop()?;
            let folder = &self.tree.folders[id.0];
            if self.recursive {
                self.stack.extend(folder.children.values().rev().copied());
            }
            if !folder.is_root() {
                return Some(id);
            }
        }
    }
}

/// Items of `partition` preceded by those of `Common`.
///
/// The result is cloneable, so callers can `.cycle()` it to hand out shared
/// resources before partition-local ones.
pub fn common_first<'a, T>(
    by_partition: &'a IndexMap<String, Vec<T>>,
    partition: &str,
    include_common: bool,
) -> impl Iterator<Item = &'a T> + Clone + 'a {
    let own: &'a [T] = by_partition
        .get(partition)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let shared: &'a [T] = if include_common && partition != PARTITION_COMMON {
        by_partition
            .get(PARTITION_COMMON)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    } else {
        &[]
    };
    shared.iter().chain(own.iter())
}
