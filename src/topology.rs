//! TOML topology files
//!
//! A topology names the target version, feature flags, extra folders and the
//! stamps to hook, in order. Stamps may carry an `id` so later entries can
//! refer to them.
//!
//! ```toml
//! version = "bigip 11.5.0"
//! partitions = 1
//!
//! [features]
//! afm = true
//!
//! [[stamp]]
//! kind = "node"
//! id = "web1"
//! address = "10.0.0.1"
//!
//! [[stamp]]
//! kind = "pool"
//! name = "web"
//! members = [{ node = "web1", port = 80 }]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::Path;

use ipnet::IpNet;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::context::Context;
use crate::error::{GrammarParseError, TreeError};
use crate::stamp::auth::User;
use crate::stamp::ltm::{Member, Node, Pool, VirtualServer};
use crate::stamp::net::{RouteDomain, SelfIp, Trunk, Vlan};
use crate::stamp::profile::{Profile, ProfileContext};
use crate::stamp::scaffolding::Raw;
use crate::stamp::security::{
    AddressList, Firewall, FirewallContext, FirewallRule, PortList, Rule, RuleList, RuleMatch,
};
use crate::stamp::sys::{Defaults, Dns, Mail, Ntp, Platform, Provision};
use crate::stamp::Stamp;
use crate::tree::{FolderId, StampId, Tree, PARTITION_COMMON};
use crate::version::{Version, VersionError};

/// Errors that can occur when loading a topology
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Failed to read topology file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse topology TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("raw stamp: {0}")]
    Grammar(#[from] GrammarParseError),
    #[error("stamp id '{0}' is defined twice")]
    DuplicateId(String),
    #[error("stamp id '{0}' is not defined by an earlier entry")]
    UnknownId(String),
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("vlan '{0}' has tagged interfaces but no tag")]
    MissingTag(String),
    #[error("no target version given")]
    MissingVersion,
}

/// A loaded topology: the built tree and the ids given to its stamps
#[derive(Debug)]
pub struct Topology {
    tree: Tree,
    ids: HashMap<String, StampId>,
}

impl Topology {
    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, TopologyError> {
        Self::from_str_with_target(content, None)
    }

    /// Parse a topology, with `target` taking precedence over the file's
    /// own `version`
    pub fn from_str_with_target(content: &str, target: Option<Version>) -> Result<Self, TopologyError> {
        let parsed: TomlTopology = toml::from_str(content)?;
        let version = match (target, &parsed.version) {
            (Some(target), _) => target,
            (None, Some(version)) => version.parse()?,
            (None, None) => return Err(TopologyError::MissingVersion),
        };
        Builder::build(parsed, version)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Stamp registered under `id`
    pub fn stamp(&self, id: &str) -> Option<StampId> {
        self.ids.get(id).copied()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTopology {
    version: Option<String>,
    #[serde(default)]
    partitions: usize,
    #[serde(default)]
    features: BTreeMap<String, bool>,
    #[serde(default, rename = "folder")]
    folders: Vec<TomlFolder>,
    #[serde(default, rename = "stamp")]
    stamps: Vec<TomlStamp>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFolder {
    path: String,
}

fn default_folder() -> String {
    PARTITION_COMMON.to_string()
}

#[derive(Deserialize)]
struct TomlStamp {
    #[serde(default = "default_folder")]
    folder: String,
    id: Option<String>,
    #[serde(flatten)]
    spec: TomlSpec,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum TomlSpec {
    Raw {
        text: String,
        key: Option<String>,
    },
    Node {
        address: String,
        name: Option<String>,
        route_domain: Option<String>,
        #[serde(default)]
        monitors: Vec<String>,
    },
    Pool {
        name: String,
        #[serde(default)]
        members: Vec<TomlMember>,
        #[serde(default)]
        monitors: Vec<String>,
    },
    VirtualServer {
        name: String,
        address: String,
        port: u16,
        pool: Option<String>,
        #[serde(default)]
        profiles: Vec<String>,
        #[serde(default)]
        rules: Vec<TomlRule>,
        route_domain: Option<String>,
    },
    Profile {
        name: String,
        #[serde(default)]
        context: ProfileContext,
    },
    SelfIp {
        address: String,
        vlan: String,
        name: Option<String>,
        #[serde(default)]
        allow: Vec<String>,
        #[serde(default)]
        rules: Vec<TomlRule>,
        route_domain: Option<String>,
    },
    Trunk {
        name: String,
        #[serde(default)]
        interfaces: Vec<String>,
        #[serde(default)]
        lacp: bool,
    },
    Vlan {
        name: String,
        #[serde(default)]
        untagged: Vec<String>,
        #[serde(default)]
        tagged: Vec<String>,
        tag: Option<u16>,
    },
    RouteDomain {
        id: u32,
        name: Option<String>,
        #[serde(default)]
        vlans: Vec<String>,
        parent: Option<String>,
        #[serde(default)]
        rules: Vec<TomlRule>,
    },
    Provision {
        module: String,
        level: Option<String>,
    },
    Defaults,
    Platform {
        address: String,
        gateway: String,
        hostname: Option<String>,
        #[serde(default)]
        dhcp: bool,
        #[serde(default)]
        wizard: bool,
    },
    Dns {
        servers: Vec<String>,
        #[serde(default)]
        suffixes: Vec<String>,
    },
    Ntp {
        servers: Vec<String>,
        timezone: Option<String>,
    },
    Mail {
        server: String,
        port: Option<u16>,
        originator: Option<String>,
    },
    User {
        name: String,
        password: Option<String>,
        role: Option<String>,
    },
    AddressList {
        name: String,
        addresses: Vec<String>,
    },
    PortList {
        name: String,
        ports: Vec<String>,
    },
    RuleList {
        name: String,
        #[serde(default)]
        rules: Vec<TomlInlineRule>,
    },
    Firewall {
        #[serde(default)]
        context: FirewallContext,
        #[serde(default)]
        rules: Vec<TomlRule>,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlMember {
    node: String,
    port: u16,
    #[serde(default)]
    monitors: Vec<String>,
}

/// Either `{ list = "id" }` or an inline rule
#[derive(Deserialize)]
#[serde(untagged)]
enum TomlRule {
    List { list: String },
    Inline(TomlInlineRule),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlInlineRule {
    name: String,
    action: Option<String>,
    ip_protocol: Option<String>,
    #[serde(default)]
    source: TomlMatch,
    #[serde(default)]
    destination: TomlMatch,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlMatch {
    #[serde(default)]
    address_lists: Vec<String>,
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    port_lists: Vec<String>,
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    vlans: Vec<String>,
}

struct Builder {
    tree: Tree,
    ids: HashMap<String, StampId>,
}

impl Builder {
    fn build(parsed: TomlTopology, version: Version) -> Result<Topology, TopologyError> {
        let context = parsed
            .features
            .into_iter()
            .fold(Context::new(version), |context, (name, enabled)| {
                context.with_feature(name, enabled)
            });

        let mut builder = Builder {
            tree: Tree::with_partitions(context, parsed.partitions),
            ids: HashMap::new(),
        };
        for folder in &parsed.folders {
            builder.ensure_folder(&folder.path)?;
        }
        for entry in parsed.stamps {
            builder.add_stamp(entry)?;
        }

        debug!(
            partitions = parsed.partitions,
            ids = builder.ids.len(),
            "built topology"
        );
        Ok(Topology {
            tree: builder.tree,
            ids: builder.ids,
        })
    }

    /// Create every missing folder along a `Common/sub` style path
    fn ensure_folder(&mut self, path: &str) -> Result<FolderId, TopologyError> {
        let mut current = self.tree.root();
        for name in path.split('/').filter(|segment| !segment.is_empty()) {
            current = match self.tree.child(current, name) {
                Some(existing) => existing,
                None => self.tree.add(current, name)?,
            };
        }
        Ok(current)
    }

    fn add_stamp(&mut self, entry: TomlStamp) -> Result<(), TopologyError> {
        let folder = self
            .tree
            .find(&entry.folder)
            .ok_or_else(|| TreeError::UnknownFolder {
                path: entry.folder.clone(),
            })?;
        if let Some(id) = &entry.id {
            if self.ids.contains_key(id) {
                return Err(TopologyError::DuplicateId(id.clone()));
            }
        }

        let stamp = self.convert(entry.spec)?;
        let stamp_id = self.tree.hook_stamp(folder, stamp);
        if let Some(id) = entry.id {
            self.ids.insert(id, stamp_id);
        }
        Ok(())
    }

    fn resolve(&self, id: &str) -> Result<StampId, TopologyError> {
        self.ids
            .get(id)
            .copied()
            .ok_or_else(|| TopologyError::UnknownId(id.to_string()))
    }

    fn resolve_all(&self, ids: &[String]) -> Result<Vec<StampId>, TopologyError> {
        ids.iter().map(|id| self.resolve(id)).collect()
    }

    fn resolve_opt(&self, id: Option<&String>) -> Result<Option<StampId>, TopologyError> {
        id.map(|id| self.resolve(id)).transpose()
    }

    fn rule_match(&self, toml: TomlMatch) -> Result<RuleMatch, TopologyError> {
        Ok(RuleMatch {
            address_lists: self.resolve_all(&toml.address_lists)?,
            addresses: toml.addresses,
            port_lists: self.resolve_all(&toml.port_lists)?,
            ports: toml.ports,
            vlans: self.resolve_all(&toml.vlans)?,
        })
    }

    fn inline_rule(&self, toml: TomlInlineRule) -> Result<Rule, TopologyError> {
        let mut rule = Rule::new(toml.name)
            .with_source(self.rule_match(toml.source)?)
            .with_destination(self.rule_match(toml.destination)?);
        if let Some(action) = toml.action {
            rule = rule.with_action(action);
        }
        if let Some(protocol) = toml.ip_protocol {
            rule = rule.with_ip_protocol(protocol);
        }
        Ok(rule)
    }

    fn rules(&self, rules: Vec<TomlRule>) -> Result<Vec<FirewallRule>, TopologyError> {
        rules
            .into_iter()
            .map(|rule| match rule {
                TomlRule::List { list } => Ok(FirewallRule::List(self.resolve(&list)?)),
                TomlRule::Inline(inline) => Ok(FirewallRule::Inline(self.inline_rule(inline)?)),
            })
            .collect()
    }

    fn convert(&self, spec: TomlSpec) -> Result<Stamp, TopologyError> {
        let stamp: Stamp = match spec {
            TomlSpec::Raw { text, key } => {
                let raw = Raw::parse(&text)?;
                match key {
                    Some(key) => raw.with_key(key).into(),
                    None => raw.into(),
                }
            }
            TomlSpec::Node {
                address,
                name,
                route_domain,
                monitors,
            } => {
                let mut node = Node::new(address).with_monitors(monitors);
                if let Some(name) = name {
                    node = node.with_name(name);
                }
                if let Some(rd) = self.resolve_opt(route_domain.as_ref())? {
                    node = node.with_route_domain(rd);
                }
                node.into()
            }
            TomlSpec::Pool {
                name,
                members,
                monitors,
            } => {
                let mut pool = Pool::new(name).with_monitors(monitors);
                for member in members {
                    let mut converted = Member::new(self.resolve(&member.node)?, member.port);
                    converted.monitors = member.monitors;
                    pool = pool.with_member(converted);
                }
                pool.into()
            }
            TomlSpec::VirtualServer {
                name,
                address,
                port,
                pool,
                profiles,
                rules,
                route_domain,
            } => {
                let mut virtual_server = VirtualServer::new(name, address, port)
                    .with_profiles(self.resolve_all(&profiles)?)
                    .with_rules(self.rules(rules)?);
                if let Some(pool) = self.resolve_opt(pool.as_ref())? {
                    virtual_server = virtual_server.with_pool(pool);
                }
                if let Some(rd) = self.resolve_opt(route_domain.as_ref())? {
                    virtual_server = virtual_server.with_route_domain(rd);
                }
                virtual_server.into()
            }
            TomlSpec::Profile { name, context } => Profile::new(name).with_context(context).into(),
            TomlSpec::SelfIp {
                address,
                vlan,
                name,
                allow,
                rules,
                route_domain,
            } => {
                let mut self_ip = SelfIp::new(parse_net(&address)?, self.resolve(&vlan)?)
                    .with_rules(self.rules(rules)?);
                if !allow.is_empty() {
                    self_ip = self_ip.with_allow(allow);
                }
                if let Some(name) = name {
                    self_ip = self_ip.with_name(name);
                }
                if let Some(rd) = self.resolve_opt(route_domain.as_ref())? {
                    self_ip = self_ip.with_route_domain(rd);
                }
                self_ip.into()
            }
            TomlSpec::Trunk {
                name,
                interfaces,
                lacp,
            } => Trunk::new(name).with_interfaces(interfaces).with_lacp(lacp).into(),
            TomlSpec::Vlan {
                name,
                untagged,
                tagged,
                tag,
            } => {
                let vlan = Vlan::new(name.clone()).with_untagged(untagged);
                match tag {
                    Some(tag) => vlan.with_tagged(tagged, tag).into(),
                    None if tagged.is_empty() => vlan.into(),
                    None => return Err(TopologyError::MissingTag(name)),
                }
            }
            TomlSpec::RouteDomain {
                id,
                name,
                vlans,
                parent,
                rules,
            } => {
                let mut route_domain = RouteDomain::new(id)
                    .with_vlans(self.resolve_all(&vlans)?)
                    .with_rules(self.rules(rules)?);
                if let Some(name) = name {
                    route_domain = route_domain.with_name(name);
                }
                if let Some(parent) = parent {
                    route_domain = route_domain.with_parent(parent);
                }
                route_domain.into()
            }
            TomlSpec::Provision { module, level } => {
                let provision = Provision::new(module);
                match level {
                    Some(level) => provision.with_level(level).into(),
                    None => provision.into(),
                }
            }
            TomlSpec::Defaults => Defaults.into(),
            TomlSpec::Platform {
                address,
                gateway,
                hostname,
                dhcp,
                wizard,
            } => {
                let gateway: IpAddr = gateway
                    .parse()
                    .map_err(|_| TopologyError::InvalidAddress(gateway.clone()))?;
                let mut platform = Platform::new(parse_net(&address)?, gateway)
                    .with_dhcp(dhcp)
                    .with_wizard(wizard);
                if let Some(hostname) = hostname {
                    platform = platform.with_hostname(hostname);
                }
                platform.into()
            }
            TomlSpec::Dns { servers, suffixes } => Dns::new(servers).with_suffixes(suffixes).into(),
            TomlSpec::Ntp { servers, timezone } => {
                let ntp = Ntp::new(servers);
                match timezone {
                    Some(timezone) => ntp.with_timezone(timezone).into(),
                    None => ntp.into(),
                }
            }
            TomlSpec::Mail {
                server,
                port,
                originator,
            } => {
                let mut mail = Mail::new(server);
                if let Some(port) = port {
                    mail = mail.with_port(port);
                }
                if let Some(originator) = originator {
                    mail = mail.with_originator(originator);
                }
                mail.into()
            }
            TomlSpec::User {
                name,
                password,
                role,
            } => {
                let mut user = User::new(name);
                if let Some(password) = password {
                    user = user.with_password(password);
                }
                if let Some(role) = role {
                    user = user.with_role(role);
                }
                user.into()
            }
            TomlSpec::AddressList { name, addresses } => AddressList::new(name, addresses).into(),
            TomlSpec::PortList { name, ports } => PortList::new(name, ports).into(),
            TomlSpec::RuleList { name, rules } => {
                let rules = rules
                    .into_iter()
                    .map(|rule| self.inline_rule(rule))
                    .collect::<Result<Vec<_>, _>>()?;
                RuleList::new(name).with_rules(rules).into()
            }
            TomlSpec::Firewall { context, rules } => {
                Firewall::new(context).with_rules(self.rules(rules)?).into()
            }
        };
        Ok(stamp)
    }
}

/// Accepts `10.0.0.1/24` or a bare address, which gets a host prefix
fn parse_net(text: &str) -> Result<IpNet, TopologyError> {
    text.parse::<IpNet>()
        .or_else(|_| text.parse::<IpAddr>().map(IpNet::from))
        .map_err(|_| TopologyError::InvalidAddress(text.to_string()))
}
