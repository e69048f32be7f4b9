//! Local traffic objects: nodes, pools and virtual servers
//!
//! All three only exist on BIG-IP; other products compile them to nothing.

use std::net::IpAddr;

use crate::error::CompileError;
use crate::parser::{Map, Value};
use crate::stamp::net::route_domain_suffix;
use crate::stamp::profile::Profile;
use crate::stamp::security::{firewall_rules, FirewallRule};
use crate::stamp::{rename_block, Kind, Output, Render, Scope, Stamp};
use crate::tree::StampId;

pub(crate) const NODE_MODERN: &str = "ltm node $key {}";

pub(crate) const NODE_LEGACY: &str = r#"
node $address {
    screen none
}
"#;

pub(crate) const POOL_MODERN: &str = r#"
ltm pool $key {
    members {}
    monitor none
}
"#;

pub(crate) const POOL_LEGACY: &str = r#"
pool $name {
    members
}
"#;

pub(crate) const VIRTUAL_MODERN: &str = r#"
ltm virtual $key {
    destination none
    profiles {}
    fw-rules {}
    snat automap
    ip-protocol tcp
    pool none
}
ltm virtual-address $key_va {}
"#;

pub(crate) const VIRTUAL_LEGACY: &str = r#"
virtual $name {
    destination none
    snat automap
    pool none
}
"#;

/// `:` before the port for IPv4, `.` for IPv6
fn port_separator(address: &str) -> Result<char, CompileError> {
    let ip: IpAddr = address.parse().map_err(|_| CompileError::InvalidAddress {
        value: address.to_string(),
    })?;
    Ok(if ip.is_ipv4() { ':' } else { '.' })
}

fn monitor_rule(monitors: &[String]) -> Option<Value> {
    if monitors.is_empty() {
        None
    } else {
        Some(Value::raw(monitors.join(" and ")))
    }
}

fn is_bigip(scope: &Scope<'_>) -> bool {
    scope.version().product.is_bigip()
}

/// A back-end server address
#[derive(Debug, Clone)]
pub struct Node {
    pub address: String,
    /// Defaults to the address
    pub name: String,
    pub route_domain: Option<StampId>,
    pub monitors: Vec<String>,
}

impl Node {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            name: address.clone(),
            address,
            route_domain: None,
            monitors: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_route_domain(mut self, route_domain: StampId) -> Self {
        self.route_domain = Some(route_domain);
        self
    }

    pub fn with_monitors<I, S>(mut self, monitors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.monitors = monitors.into_iter().map(Into::into).collect();
        self
    }
}

impl Render for Node {
    fn kind(&self) -> Kind {
        Kind::Node
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        let address = format!("{}{}", self.address, route_domain_suffix(scope, self.route_domain)?);

        let value = rename_block(self.kind(), &mut template, &["ltm", "node", "$key"], &key)?;
        value.insert("address", address);
        if let Some(monitor) = monitor_rule(&self.monitors) {
            value.insert("monitor", monitor);
        }
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let value = rename_block(self.kind(), &mut template, &["node", "$address"], &self.address)?;
        value.insert("screen", self.name.as_str());
        if let Some(monitor) = monitor_rule(&self.monitors) {
            value.insert("monitor", monitor);
        }
        Ok((Some(self.name.clone()), Some(template)))
    }
}

/// One pool member: a node and the service port
#[derive(Debug, Clone)]
pub struct Member {
    pub node: StampId,
    pub port: u16,
    pub monitors: Vec<String>,
}

impl Member {
    pub fn new(node: StampId, port: u16) -> Self {
        Self {
            node,
            port,
            monitors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub name: String,
    pub members: Vec<Member>,
    /// Pool-level health monitors
    pub monitors: Vec<String>,
}

impl Pool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            monitors: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_monitors<I, S>(mut self, monitors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.monitors = monitors.into_iter().map(Into::into).collect();
        self
    }

    fn node<'t>(&self, scope: &Scope<'t>, id: StampId) -> Result<&'t Node, CompileError> {
        match scope.stamp(id)? {
            Stamp::Node(node) => Ok(node),
            other => Err(scope.unexpected(Kind::Node, other)),
        }
    }
}

impl Render for Pool {
    fn kind(&self) -> Kind {
        Kind::Pool
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);

        let mut members = Map::new();
        for member in &self.members {
            let node = self.node(scope, member.node)?;
            let reference = scope.reference(member.node)?;
            // a bare address key needs the address family's separator
            let sep = if reference == node.address {
                port_separator(&reference)?
            } else {
                ':'
            };
            let mut entry = Map::new();
            entry.insert("address", node.address.as_str());
            if let Some(monitor) = monitor_rule(&member.monitors) {
                entry.insert("monitor", monitor);
            }
            members.insert(format!("{}{}{}", reference, sep, member.port), entry);
        }

        let value = rename_block(self.kind(), &mut template, &["ltm", "pool", "$key"], &key)?;
        match monitor_rule(&self.monitors) {
            Some(monitor) => {
                value.insert("monitor", monitor);
            }
            None => {
                value.remove("monitor");
            }
        }
        value.insert("members", members);
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let value = rename_block(self.kind(), &mut template, &["pool", "$name"], &self.name)?;
        value.clear();
        if let Some(monitor) = monitor_rule(&self.monitors) {
            value.insert("monitor all", monitor);
        }
        value.insert("members", Value::Toggle);
        for member in &self.members {
            let node = self.node(scope, member.node)?;
            let sep = port_separator(&node.address)?;
            value.insert(format!("{}{}{}", node.address, sep, member.port), Value::Toggle);
            if let Some(monitor) = monitor_rule(&member.monitors) {
                value.insert("monitor", monitor);
            }
        }
        Ok((Some(self.name.clone()), Some(template)))
    }
}

/// A listener: destination address and port, profiles and default pool
#[derive(Debug, Clone)]
pub struct VirtualServer {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub pool: Option<StampId>,
    pub profiles: Vec<StampId>,
    pub rules: Vec<FirewallRule>,
    pub route_domain: Option<StampId>,
}

impl VirtualServer {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            pool: None,
            profiles: Vec::new(),
            rules: Vec::new(),
            route_domain: None,
        }
    }

    pub fn with_pool(mut self, pool: StampId) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = StampId>) -> Self {
        self.profiles = profiles.into_iter().collect();
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = FirewallRule>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    pub fn with_route_domain(mut self, route_domain: StampId) -> Self {
        self.route_domain = Some(route_domain);
        self
    }

    fn destination(&self, scope: &Scope<'_>) -> Result<String, CompileError> {
        let sep = port_separator(&self.address)?;
        let suffix = route_domain_suffix(scope, self.route_domain)?;
        Ok(format!("{}{}{}{}", self.address, suffix, sep, self.port))
    }

    fn profile<'t>(&self, scope: &Scope<'t>, id: StampId) -> Result<&'t Profile, CompileError> {
        match scope.stamp(id)? {
            Stamp::Profile(profile) => Ok(profile),
            other => Err(scope.unexpected(Kind::Profile, other)),
        }
    }

    fn pool_reference(&self, scope: &Scope<'_>) -> Result<Option<String>, CompileError> {
        let Some(pool) = self.pool else {
            return Ok(None);
        };
        scope.reference_to(pool, Kind::Pool).map(Some)
    }
}

impl Render for VirtualServer {
    fn kind(&self) -> Kind {
        Kind::VirtualServer
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        let key_va = scope.path(&self.address);
        let suffix = route_domain_suffix(scope, self.route_domain)?;

        let mut profiles = Map::new();
        for &id in &self.profiles {
            let profile = self.profile(scope, id)?;
            let mut context = Map::new();
            context.insert("context", profile.context.name());
            profiles.insert(scope.stamp_path(id, &profile.name)?, context);
        }
        let rules = if scope.feature("afm") && !self.rules.is_empty() {
            Some(firewall_rules(scope, &self.rules)?)
        } else {
            None
        };
        let pool = self.pool_reference(scope)?;

        let value = rename_block(self.kind(), &mut template, &["ltm", "virtual", "$key"], &key)?;
        value.insert("destination", self.destination(scope)?);
        value.insert("profiles", profiles);
        match rules {
            Some(rules) => {
                value.insert("fw-rules", rules);
            }
            None => {
                value.remove("fw-rules");
            }
        }
        if let Some(pool) = pool {
            value.insert("pool", pool);
        }

        rename_block(self.kind(), &mut template, &["ltm", "virtual-address", "$key_va"], &key_va)?
            .insert("address", format!("{}{}", self.address, suffix));
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !is_bigip(scope) {
            return Ok((None, None));
        }
        let mut names = Vec::with_capacity(self.profiles.len());
        for &id in &self.profiles {
            names.push(self.profile(scope, id)?.name.as_str());
        }
        let pool = self.pool_reference(scope)?;

        let value = rename_block(self.kind(), &mut template, &["virtual", "$name"], &self.name)?;
        value.clear();
        value.insert("destination", self.destination(scope)?);
        if !names.is_empty() {
            value.insert("profiles", Value::raw(names.join(" ")));
        }
        if let Some(pool) = pool {
            value.insert("pool", pool);
        }
        Ok((Some(self.name.clone()), Some(template)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::stamp::net::RouteDomain;
    use crate::stamp::profile::ProfileContext;
    use crate::stamp::testing::{compile, encode, try_compile, tree};
    use crate::tree::{Tree, PARTITION_COMMON};
    use crate::version::Version;
    use pretty_assertions::assert_eq;

    fn common(tree: &Tree) -> crate::tree::FolderId {
        tree.partition(PARTITION_COMMON).unwrap()
    }

    #[test]
    fn test_node_modern_with_route_domain() {
        let mut tree = tree(Version::bigip(11, 5, 0), 0);
        let common = common(&tree);
        let rd = tree.hook_stamp(common, RouteDomain::new(3));
        let node = tree.hook_stamp(
            common,
            Node::new("10.0.0.1")
                .with_name("n1")
                .with_route_domain(rd)
                .with_monitors(["icmp", "http"]),
        );

        let compiled = compile(&tree, node);
        assert_eq!(compiled.key.as_deref(), Some("/Common/n1"));
        assert_eq!(
            encode(&compiled),
            "ltm node /Common/n1 {\n    address 10.0.0.1%3\n    monitor icmp and http\n}\n"
        );
    }

    #[test]
    fn test_node_legacy() {
        let mut tree = tree(Version::bigip(10, 2, 0), 0);
        let common = common(&tree);
        let node = tree.hook_stamp(common, Node::new("10.0.0.1").with_name("n1"));

        let compiled = compile(&tree, node);
        assert_eq!(compiled.key.as_deref(), Some("n1"));
        assert_eq!(encode(&compiled), "node 10.0.0.1 {\n    screen n1\n}\n");
    }

    #[test]
    fn test_ltm_skipped_off_bigip() {
        let mut tree = tree(Version::em(3, 0, 0), 0);
        let common = common(&tree);
        let node = tree.hook_stamp(common, Node::new("10.0.0.1"));
        assert!(compile(&tree, node).is_empty());
    }

    #[test]
    fn test_pool_members_use_reference_keys() {
        let mut tree = tree(Version::bigip(11, 0, 0), 0);
        let common = common(&tree);
        let n1 = tree.hook_stamp(common, Node::new("10.0.0.1"));
        let n2 = tree.hook_stamp(common, Node::new("2002::2"));
        let pool = tree.hook_stamp(
            common,
            Pool::new("web")
                .with_member(Member::new(n1, 80))
                .with_member(Member::new(n2, 80))
                .with_monitors(["gateway_icmp"]),
        );

        let compiled = compile(&tree, pool);
        assert_eq!(
            encode(&compiled),
            r#"ltm pool /Common/web {
    members {
        /Common/10.0.0.1:80 {
            address 10.0.0.1
        }
        /Common/2002::2:80 {
            address 2002::2
        }
    }
    monitor gateway_icmp
}
"#
        );
        assert_eq!(tree.compile_count(n1), 1);
        assert_eq!(tree.compile_count(n2), 1);

        compile(&tree, n1);
        assert_eq!(tree.compile_count(n1), 1);
    }

    #[test]
    fn test_pool_without_monitors_drops_monitor() {
        let mut tree = tree(Version::bigip(11, 0, 0), 0);
        let common = common(&tree);
        let pool = tree.hook_stamp(common, Pool::new("empty"));
        assert_eq!(
            encode(&compile(&tree, pool)),
            "ltm pool /Common/empty {\n    members {}\n}\n"
        );
    }

    #[test]
    fn test_pool_legacy_separators() {
        let mut tree = tree(Version::bigip(10, 2, 0), 0);
        let common = common(&tree);
        let n1 = tree.hook_stamp(common, Node::new("10.0.0.1"));
        let n2 = tree.hook_stamp(common, Node::new("2002::2"));
        let pool = tree.hook_stamp(
            common,
            Pool::new("web")
                .with_member(Member::new(n1, 80))
                .with_member(Member::new(n2, 443))
                .with_monitors(["gateway_icmp", "http"]),
        );

        assert_eq!(
            encode(&compile(&tree, pool)),
            "pool web {\n    monitor all gateway_icmp and http\n    members\n    10.0.0.1:80\n    2002::2.443\n}\n"
        );
    }

    #[test]
    fn test_pool_rejects_non_node_member() {
        let mut tree = tree(Version::bigip(11, 0, 0), 0);
        let common = common(&tree);
        let other = tree.hook_stamp(common, Pool::new("inner"));
        let pool = tree.hook_stamp(common, Pool::new("outer").with_member(Member::new(other, 80)));

        assert_eq!(
            try_compile(&tree, pool),
            Err(CompileError::UnexpectedKind {
                expected: Kind::Node,
                found: Kind::Pool
            })
        );
    }

    #[test]
    fn test_pool_member_unhooked_node() {
        let mut tree = tree(Version::bigip(11, 0, 0), 0);
        let common = common(&tree);
        let loose = tree.insert(Node::new("10.0.0.9"));
        let pool = tree.hook_stamp(common, Pool::new("p").with_member(Member::new(loose, 80)));

        assert_eq!(
            try_compile(&tree, pool),
            Err(CompileError::Reference {
                kind: Kind::Pool,
                source: Box::new(CompileError::MissingContext { kind: Kind::Node })
            })
        );
    }

    fn virtual_tree(afm: bool) -> (Tree, StampId) {
        let context = Context::new(Version::bigip(11, 5, 0)).with_feature("afm", afm);
        let mut tree = Tree::with_partitions(context, 0);
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let http = tree.hook_stamp(common, Profile::new("http"));
        let ssl = tree.hook_stamp(common, Profile::new("clientssl").with_context(ProfileContext::ClientSide));
        let node = tree.hook_stamp(common, Node::new("10.0.0.1"));
        let pool = tree.hook_stamp(common, Pool::new("web").with_member(Member::new(node, 80)));
        let rule = crate::stamp::security::Rule::new("allow-web");
        let vs = tree.hook_stamp(
            common,
            VirtualServer::new("vs1", "10.11.0.1", 443)
                .with_pool(pool)
                .with_profiles([http, ssl])
                .with_rules([FirewallRule::Inline(rule)]),
        );
        (tree, vs)
    }

    #[test]
    fn test_virtual_modern() {
        let (tree, vs) = virtual_tree(false);
        let compiled = compile(&tree, vs);
        assert_eq!(compiled.key.as_deref(), Some("/Common/vs1"));
        assert_eq!(
            encode(&compiled),
            r#"ltm virtual /Common/vs1 {
    destination 10.11.0.1:443
    profiles {
        /Common/http {
            context all
        }
        /Common/clientssl {
            context clientside
        }
    }
    snat automap
    ip-protocol tcp
    pool /Common/web
}
ltm virtual-address /Common/10.11.0.1 {
    address 10.11.0.1
}
"#
        );
    }

    #[test]
    fn test_virtual_firewall_rules_need_afm() {
        let (tree, vs) = virtual_tree(true);
        let text = encode(&compile(&tree, vs));
        assert!(text.contains("    fw-rules {\n        allow-web {"));
    }

    #[test]
    fn test_virtual_legacy() {
        let mut tree = tree(Version::bigip(10, 2, 0), 0);
        let common = common(&tree);
        let tcp = tree.hook_stamp(common, Profile::new("tcp"));
        let http = tree.hook_stamp(common, Profile::new("http"));
        let pool = tree.hook_stamp(common, Pool::new("web"));
        let vs = tree.hook_stamp(
            common,
            VirtualServer::new("vs1", "2002::1", 80)
                .with_pool(pool)
                .with_profiles([http, tcp]),
        );

        assert_eq!(
            encode(&compile(&tree, vs)),
            "virtual vs1 {\n    destination 2002::1.80\n    profiles http tcp\n    pool web\n}\n"
        );
    }
}
