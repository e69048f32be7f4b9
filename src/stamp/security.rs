//! Network firewall objects: address/port lists, rule lists and the
//! device-wide rule sets
//!
//! Only BIG-IP 11.3.0 and later understand these; older targets compile
//! them to nothing.

use serde::Deserialize;

use crate::error::CompileError;
use crate::parser::{Map, Value};
use crate::stamp::{rename_block, Kind, Output, Render, Scope, Stamp};
use crate::tree::StampId;
use crate::version::Product;

pub(crate) const ADDRESS_LIST_MODERN: &str = r#"
security firewall address-list $key {
    addresses {}
}
"#;

pub(crate) const PORT_LIST_MODERN: &str = r#"
security firewall port-list $key {
    ports {}
}
"#;

pub(crate) const RULE_LIST_MODERN: &str = r#"
security firewall rule-list $key {
    rules {}
}
"#;

pub(crate) const FIREWALL_MODERN: &str = r#"
security firewall $context {
    rules {}
}
"#;

fn supported(scope: &Scope<'_>) -> bool {
    scope.version().at_least(Product::Bigip, 11, 3, 0)
}

/// Map of names to empty objects, the shape used for list entries
fn entries<'a>(names: impl IntoIterator<Item = &'a String>) -> Map {
    names.into_iter().map(|name| (name.clone(), Map::new())).collect()
}

/// One side of a rule: what traffic it matches
#[derive(Debug, Clone, Default)]
pub struct RuleMatch {
    pub address_lists: Vec<StampId>,
    pub addresses: Vec<String>,
    pub port_lists: Vec<StampId>,
    pub ports: Vec<String>,
    /// Only meaningful on the source side
    pub vlans: Vec<StampId>,
}

impl RuleMatch {
    pub fn is_empty(&self) -> bool {
        self.address_lists.is_empty()
            && self.addresses.is_empty()
            && self.port_lists.is_empty()
            && self.ports.is_empty()
            && self.vlans.is_empty()
    }

    fn compile(&self, scope: &Scope<'_>) -> Result<Map, CompileError> {
        let references = |ids: &[StampId], kind: Kind| -> Result<Vec<String>, CompileError> {
            ids.iter().map(|&id| scope.reference_to(id, kind)).collect()
        };

        let mut map = Map::new();
        if !self.address_lists.is_empty() {
            map.insert("address-lists", Value::Set(references(&self.address_lists, Kind::AddressList)?));
        }
        if !self.addresses.is_empty() {
            map.insert("addresses", entries(&self.addresses));
        }
        if !self.port_lists.is_empty() {
            map.insert("port-lists", Value::Set(references(&self.port_lists, Kind::PortList)?));
        }
        if !self.ports.is_empty() {
            map.insert("ports", entries(&self.ports));
        }
        if !self.vlans.is_empty() {
            map.insert("vlans", Value::Set(references(&self.vlans, Kind::Vlan)?));
        }
        Ok(map)
    }
}

/// A single firewall rule. Rules are values, not stamps: they are written
/// inline wherever they are used.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub action: String,
    pub ip_protocol: Option<String>,
    pub source: RuleMatch,
    pub destination: RuleMatch,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: "accept".to_string(),
            ip_protocol: None,
            source: RuleMatch::default(),
            destination: RuleMatch::default(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_ip_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.ip_protocol = Some(protocol.into());
        self
    }

    pub fn with_source(mut self, source: RuleMatch) -> Self {
        self.source = source;
        self
    }

    pub fn with_destination(mut self, destination: RuleMatch) -> Self {
        self.destination = destination;
        self
    }

    fn compile(&self, scope: &Scope<'_>) -> Result<Map, CompileError> {
        let mut body = Map::new();
        body.insert("action", self.action.as_str());
        if let Some(protocol) = &self.ip_protocol {
            body.insert("ip-protocol", protocol.as_str());
        }
        if !self.destination.is_empty() {
            body.insert("destination", self.destination.compile(scope)?);
        }
        if !self.source.is_empty() {
            body.insert("source", self.source.compile(scope)?);
        }
        Ok(body)
    }
}

/// A rule attached to a virtual server, self IP, route domain or firewall
#[derive(Debug, Clone)]
pub enum FirewallRule {
    Inline(Rule),
    /// Reference to a [`RuleList`] stamp
    List(StampId),
}

/// The `fw-rules`/`rules` block for a list of attached rules
pub(crate) fn firewall_rules(scope: &Scope<'_>, rules: &[FirewallRule]) -> Result<Map, CompileError> {
    let mut map = Map::new();
    for rule in rules {
        match rule {
            FirewallRule::Inline(rule) => {
                map.insert(rule.name.as_str(), rule.compile(scope)?);
            }
            FirewallRule::List(id) => {
                let list = match scope.stamp(*id)? {
                    Stamp::RuleList(list) => list,
                    other => return Err(scope.unexpected(Kind::RuleList, other)),
                };
                let mut entry = Map::new();
                entry.insert("rule-list", scope.reference(*id)?);
                map.insert(list.name.as_str(), entry);
            }
        }
    }
    Ok(map)
}

#[derive(Debug, Clone)]
pub struct AddressList {
    pub name: String,
    /// Addresses or networks
    pub addresses: Vec<String>,
}

impl AddressList {
    pub fn new<I, S>(name: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl Render for AddressList {
    fn kind(&self) -> Kind {
        Kind::AddressList
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !supported(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        rename_block(self.kind(), &mut template, &["security", "firewall", "address-list", "$key"], &key)?
            .insert("addresses", entries(&self.addresses));
        Ok((Some(key), Some(template)))
    }
}

#[derive(Debug, Clone)]
pub struct PortList {
    pub name: String,
    /// Ports or `low-high` ranges
    pub ports: Vec<String>,
}

impl PortList {
    pub fn new<I, S>(name: impl Into<String>, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

impl Render for PortList {
    fn kind(&self) -> Kind {
        Kind::PortList
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !supported(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        rename_block(self.kind(), &mut template, &["security", "firewall", "port-list", "$key"], &key)?
            .insert("ports", entries(&self.ports));
        Ok((Some(key), Some(template)))
    }
}

#[derive(Debug, Clone)]
pub struct RuleList {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl RuleList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }
}

impl Render for RuleList {
    fn kind(&self) -> Kind {
        Kind::RuleList
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !supported(scope) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        let mut rules = Map::new();
        for rule in &self.rules {
            rules.insert(rule.name.as_str(), rule.compile(scope)?);
        }
        rename_block(self.kind(), &mut template, &["security", "firewall", "rule-list", "$key"], &key)?
            .insert("rules", rules);
        Ok((Some(key), Some(template)))
    }
}

/// Which device-wide rule set a [`Firewall`] fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirewallContext {
    #[default]
    Global,
    ManagementIp,
}

impl FirewallContext {
    pub fn block_name(self) -> &'static str {
        match self {
            FirewallContext::Global => "global-rules",
            FirewallContext::ManagementIp => "management-ip-rules",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Firewall {
    pub context: FirewallContext,
    pub rules: Vec<FirewallRule>,
}

impl Firewall {
    pub fn new(context: FirewallContext) -> Self {
        Self {
            context,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = FirewallRule>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }
}

impl Render for Firewall {
    fn kind(&self) -> Kind {
        Kind::Firewall
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !supported(scope) {
            return Ok((None, None));
        }
        let rules = firewall_rules(scope, &self.rules)?;
        rename_block(
            self.kind(),
            &mut template,
            &["security", "firewall", "$context"],
            self.context.block_name(),
        )?
        .insert("rules", rules);
        Ok((None, Some(template)))
    }
}
