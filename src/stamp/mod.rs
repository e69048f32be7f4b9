//! Stamps: configuration entities hooked onto folders
//!
//! Every entity kind implements [`Render`], which turns a fresh copy of the
//! kind's template into the configuration object for one dialect. The closed
//! [`Stamp`] enum holds one variant per kind so the tree can store them in a
//! single arena. Compilation itself (dialect choice, memoization, reference
//! resolution) lives in [`Compiler`].

mod compiler;

pub mod auth;
pub mod ltm;
pub mod net;
pub mod profile;
pub mod scaffolding;
pub mod security;
pub mod sys;

use std::fmt;

pub use compiler::{Compiled, Compiler, Scope};

use crate::context::Dialect;
use crate::error::CompileError;
use crate::parser::{Map, Value};
use crate::version::Version;

use auth::User;
use ltm::{Node, Pool, VirtualServer};
use net::{RouteDomain, SelfIp, Trunk, Vlan};
use profile::Profile;
use scaffolding::{FolderMarker, Partition, Raw};
use security::{AddressList, Firewall, PortList, RuleList};
use sys::{Defaults, Dns, Mail, Ntp, Platform, Provision};

/// Entity kind, used to index folder content and templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Partition,
    Folder,
    Raw,
    Node,
    Pool,
    VirtualServer,
    Profile,
    SelfIp,
    Trunk,
    Vlan,
    RouteDomain,
    Provision,
    Defaults,
    Platform,
    Dns,
    Ntp,
    Mail,
    User,
    AddressList,
    PortList,
    RuleList,
    Firewall,
}

impl Kind {
    pub const ALL: [Kind; 22] = [
        Kind::Partition,
        Kind::Folder,
        Kind::Raw,
        Kind::Node,
        Kind::Pool,
        Kind::VirtualServer,
        Kind::Profile,
        Kind::SelfIp,
        Kind::Trunk,
        Kind::Vlan,
        Kind::RouteDomain,
        Kind::Provision,
        Kind::Defaults,
        Kind::Platform,
        Kind::Dns,
        Kind::Ntp,
        Kind::Mail,
        Kind::User,
        Kind::AddressList,
        Kind::PortList,
        Kind::RuleList,
        Kind::Firewall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kind::Partition => "partition",
            Kind::Folder => "folder",
            Kind::Raw => "raw",
            Kind::Node => "node",
            Kind::Pool => "pool",
            Kind::VirtualServer => "virtual-server",
            Kind::Profile => "profile",
            Kind::SelfIp => "self-ip",
            Kind::Trunk => "trunk",
            Kind::Vlan => "vlan",
            Kind::RouteDomain => "route-domain",
            Kind::Provision => "provision",
            Kind::Defaults => "defaults",
            Kind::Platform => "platform",
            Kind::Dns => "dns",
            Kind::Ntp => "ntp",
            Kind::Mail => "mail",
            Kind::User => "user",
            Kind::AddressList => "address-list",
            Kind::PortList => "port-list",
            Kind::RuleList => "rule-list",
            Kind::Firewall => "firewall",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference key and configuration object produced by one dialect step.
/// `(None, None)` means there is nothing to emit.
pub type Output = (Option<String>, Option<Map>);

/// Per-kind compile steps.
///
/// `template` is an owned copy of the kind's template for the chosen
/// dialect (empty when the kind has none) and may be mutated freely.
pub trait Render {
    fn kind(&self) -> Kind;

    /// Structural entities that only exist to be referenced
    fn built_in(&self) -> bool {
        false
    }

    fn dialect(&self, version: &Version) -> Dialect {
        Dialect::for_version(version)
    }

    fn modern(&self, _scope: &Scope<'_>, _template: Map) -> Result<Output, CompileError> {
        Ok((None, None))
    }

    fn legacy(&self, _scope: &Scope<'_>, _template: Map) -> Result<Output, CompileError> {
        Ok((None, None))
    }
}

macro_rules! stamps {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Any entity that can be hooked onto a folder
        #[derive(Debug, Clone)]
        pub enum Stamp {
            $($variant($ty),)*
        }

        impl Stamp {
            pub fn as_render(&self) -> &dyn Render {
                match self {
                    $(Stamp::$variant(inner) => inner as &dyn Render,)*
                }
            }
        }

        $(
            impl From<$ty> for Stamp {
                fn from(inner: $ty) -> Self {
                    Stamp::$variant(inner)
                }
            }
        )*
    };
}

stamps! {
    Partition(Partition),
    Folder(FolderMarker),
    Raw(Raw),
    Node(Node),
    Pool(Pool),
    VirtualServer(VirtualServer),
    Profile(Profile),
    SelfIp(SelfIp),
    Trunk(Trunk),
    Vlan(Vlan),
    RouteDomain(RouteDomain),
    Provision(Provision),
    Defaults(Defaults),
    Platform(Platform),
    Dns(Dns),
    Ntp(Ntp),
    Mail(Mail),
    User(User),
    AddressList(AddressList),
    PortList(PortList),
    RuleList(RuleList),
    Firewall(Firewall),
}

impl Stamp {
    pub fn kind(&self) -> Kind {
        self.as_render().kind()
    }

    pub fn built_in(&self) -> bool {
        self.as_render().built_in()
    }
}

/// Rename the templated block at `path` to `new` and return it
pub(crate) fn rename_block<'m>(
    kind: Kind,
    template: &'m mut Map,
    path: &[&str],
    new: &str,
) -> Result<&'m mut Map, CompileError> {
    template
        .rename_entry(path, new)
        .and_then(Value::as_map_mut)
        .ok_or_else(|| shape_error(kind, path))
}

/// The block at `path`
pub(crate) fn block<'m>(
    kind: Kind,
    template: &'m mut Map,
    path: &[&str],
) -> Result<&'m mut Map, CompileError> {
    template.block_mut(path).ok_or_else(|| shape_error(kind, path))
}

fn shape_error(kind: Kind, path: &[&str]) -> CompileError {
    CompileError::TemplateShape {
        kind,
        path: path.join(" "),
    }
}

/// Map whose keys are all toggles, e.g. interface lists
pub(crate) fn toggles<I, S>(keys: I) -> Map
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(|k| (k.into(), Value::Toggle)).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::context::Context;
    use crate::renderer::Encoder;
    use crate::template::TemplateCache;
    use crate::tree::{StampId, Tree};

    /// Tree with `Common` and `count` extra partitions
    pub fn tree(version: Version, count: usize) -> Tree {
        Tree::with_partitions(Context::new(version), count)
    }

    pub fn compile(tree: &Tree, id: StampId) -> Compiled {
        try_compile(tree, id).expect("Should compile")
    }

    pub fn try_compile(tree: &Tree, id: StampId) -> Result<Compiled, CompileError> {
        let cache = TemplateCache::new();
        Compiler::new(tree, &cache).compile(id).cloned()
    }

    pub fn encode(compiled: &Compiled) -> String {
        compiled
            .value
            .as_ref()
            .map(|value| Encoder::default().encode(value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_unique() {
        let mut names: Vec<_> = Kind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Kind::ALL.len());
    }

    #[test]
    fn test_stamp_kind_dispatch() {
        let stamp: Stamp = Node::new("10.0.0.1").into();
        assert_eq!(stamp.kind(), Kind::Node);
        assert!(!stamp.built_in());

        let stamp: Stamp = Profile::new("tcp").into();
        assert!(stamp.built_in());
    }

    #[test]
    fn test_rename_block_reports_shape() {
        let mut template = crate::parser::parse("ltm node $key {}").unwrap();
        let err = rename_block(Kind::Node, &mut template, &["ltm", "pool", "$key"], "x").unwrap_err();
        assert_eq!(
            err,
            CompileError::TemplateShape {
                kind: Kind::Node,
                path: "ltm pool $key".to_string()
            }
        );
        assert!(rename_block(Kind::Node, &mut template, &["ltm", "node", "$key"], "/Common/a").is_ok());
    }
}
