//! Network objects: self IPs, trunks, VLANs and route domains

use ipnet::IpNet;

use crate::error::CompileError;
use crate::parser::{Map, MapStyle, Value};
use crate::stamp::security::{firewall_rules, FirewallRule};
use crate::stamp::{rename_block, toggles, Kind, Output, Render, Scope, Stamp};
use crate::tree::StampId;
use crate::version::Product;

pub(crate) const SELF_IP_MODERN: &str = r#"
net self $key {
    address none
    allow-service {
        default
    }
    fw-rules {}
    vlan none
}
"#;

pub(crate) const SELF_IP_LEGACY: &str = r#"
self $address {
    netmask none
    vlan none
    allow default
}
"#;

pub(crate) const TRUNK_MODERN: &str = r#"
net trunk $name {
    lacp disabled
    interfaces {}
}
"#;

pub(crate) const VLAN_MODERN: &str = r#"
net vlan $name {
    partition Common
    interfaces {}
}
"#;

pub(crate) const VLAN_LEGACY: &str = r#"
vlan $name {
    interfaces {}
}
"#;

pub(crate) const ROUTE_DOMAIN_MODERN: &str = r#"
net route-domain $name {
    description "Default Route Domain"
    id 0
    partition Common
    fw-rules {}
    vlans {}
}
"#;

/// `%<id>` for addresses inside a route domain, empty otherwise
pub(crate) fn route_domain_suffix(scope: &Scope<'_>, route_domain: Option<StampId>) -> Result<String, CompileError> {
    let Some(id) = route_domain else {
        return Ok(String::new());
    };
    match scope.stamp(id)? {
        Stamp::RouteDomain(rd) => Ok(format!("%{}", rd.id)),
        other => Err(scope.unexpected(Kind::RouteDomain, other)),
    }
}

/// An address owned by the device on one VLAN
#[derive(Debug, Clone)]
pub struct SelfIp {
    pub address: IpNet,
    pub vlan: StampId,
    /// Defaults to the address with `/` replaced by `_`
    pub name: String,
    /// Allowed services, `default` unless set
    pub allow: Vec<String>,
    pub rules: Vec<FirewallRule>,
    pub route_domain: Option<StampId>,
}

impl SelfIp {
    pub fn new(address: IpNet, vlan: StampId) -> Self {
        Self {
            name: address.to_string().replace('/', "_"),
            address,
            vlan,
            allow: vec!["default".to_string()],
            rules: Vec::new(),
            route_domain: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_allow<I, S>(mut self, allow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = allow.into_iter().map(Into::into).collect();
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
}

impl Render for SelfIp {
    fn kind(&self) -> Kind {
        Kind::SelfIp
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        // BIG-IQ manages its own self IPs from 4.2 on
        if scope.version().at_least(Product::Bigiq, 4, 2, 0) {
            return Ok((None, None));
        }
        let key = scope.path(&self.name);
        let suffix = route_domain_suffix(scope, self.route_domain)?;
        let address = self.address.to_string().replace('/', &format!("{}/", suffix));
        let vlan = scope.reference_to(self.vlan, Kind::Vlan)?;
        let rules = if self.rules.is_empty() {
            None
        } else {
            Some(firewall_rules(scope, &self.rules)?)
        };

        let value = rename_block(self.kind(), &mut template, &["net", "self", "$key"], &key)?;
        value.insert("address", address);
        value.insert("allow-service", toggles(self.allow.iter().cloned()));
        match rules {
            Some(rules) => {
                value.insert("fw-rules", rules);
            }
            None => {
                value.remove("fw-rules");
            }
        }
        value.insert("vlan", vlan);
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let key = self.address.addr().to_string();
        let vlan = scope.reference_to(self.vlan, Kind::Vlan)?;
        let allow = match self.allow.as_slice() {
            [single] => Value::from(single.as_str()),
            many => Value::Map(
                many.iter()
                    .map(|service| match service.split_once(':') {
                        Some((proto, port)) => (proto.to_string(), Value::from(port)),
                        None => (service.clone(), Value::Toggle),
                    })
                    .collect(),
            ),
        };

        let value = rename_block(self.kind(), &mut template, &["self", "$address"], &key)?;
        value.insert("netmask", self.address.netmask().to_string());
        value.insert("vlan", vlan);
        value.insert("allow", allow);
        Ok((Some(key), Some(template)))
    }
}

/// Link aggregation of several interfaces
#[derive(Debug, Clone)]
pub struct Trunk {
    pub name: String,
    pub interfaces: Vec<String>,
    pub lacp: bool,
}

impl Trunk {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            lacp: false,
        }
    }

    pub fn with_interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lacp(mut self, lacp: bool) -> Self {
        self.lacp = lacp;
        self
    }
}

impl Render for Trunk {
    fn kind(&self) -> Kind {
        Kind::Trunk
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let key = scope.path(&self.name);
        let value = rename_block(self.kind(), &mut template, &["net", "trunk", "$name"], &self.name)?;
        if self.interfaces.is_empty() {
            value.remove("interfaces");
        } else {
            value.insert("interfaces", toggles(self.interfaces.iter().cloned()));
        }
        if self.lacp {
            value.insert("lacp", "enabled");
        }
        Ok((Some(key), Some(template)))
    }
}

#[derive(Debug, Clone)]
pub struct Vlan {
    pub name: String,
    pub untagged: Vec<String>,
    pub tagged: Vec<String>,
    pub tag: Option<u16>,
}

impl Vlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            untagged: Vec::new(),
            tagged: Vec::new(),
            tag: None,
        }
    }

    pub fn with_untagged<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.untagged = interfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tagged<I, S>(mut self, interfaces: I, tag: u16) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tagged = interfaces.into_iter().map(Into::into).collect();
        self.tag = Some(tag);
        self
    }

    fn tag_value(&self) -> Value {
        self.tag.map_or(Value::None, Value::from)
    }
}

impl Render for Vlan {
    fn kind(&self) -> Kind {
        Kind::Vlan
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let key = scope.path(&self.name);
        let partition = scope.partition_name();

        let value = rename_block(self.kind(), &mut template, &["net", "vlan", "$name"], &self.name)?;
        value.insert("partition", partition);
        if self.untagged.is_empty() && self.tagged.is_empty() {
            value.remove("interfaces");
        } else {
            let untagged = self.untagged.iter().map(|i| (i.clone(), Value::set(Vec::<String>::new())));
            let tagged = self.tagged.iter().map(|i| (i.clone(), Value::set(["tagged"])));
            value.insert("interfaces", untagged.chain(tagged).collect::<Map>());
        }
        value.insert("description", self.name.as_str());
        if !self.tagged.is_empty() {
            value.insert("tag", self.tag_value());
        }
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let version = scope.version();
        // releases before 10.0 list interfaces without braces
        let style = if version.product.is_bigip() && !version.at_least(Product::Bigip, 10, 0, 0) {
            MapStyle::Bare
        } else {
            MapStyle::Braced
        };
        let interfaces = |names: &[String]| {
            let mut map = toggles(names.iter().cloned());
            map.set_style(style);
            map
        };

        let value = rename_block(self.kind(), &mut template, &["vlan", "$name"], &self.name)?;
        if self.untagged.is_empty() {
            value.remove("interfaces");
        } else {
            value.insert("interfaces", interfaces(&self.untagged));
        }
        if !self.tagged.is_empty() {
            value.insert("tag", self.tag_value());
            value.insert("interfaces tagged", interfaces(&self.tagged));
        }
        Ok((Some(self.name.clone()), Some(template)))
    }
}

#[derive(Debug, Clone)]
pub struct RouteDomain {
    pub id: u32,
    /// Defaults to the id
    pub name: String,
    pub vlans: Vec<StampId>,
    /// Path of the parent route domain
    pub parent: Option<String>,
    pub rules: Vec<FirewallRule>,
}

impl RouteDomain {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: id.to_string(),
            vlans: Vec::new(),
            parent: None,
            rules: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_vlans(mut self, vlans: impl IntoIterator<Item = StampId>) -> Self {
        self.vlans = vlans.into_iter().collect();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = FirewallRule>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }
}

impl Render for RouteDomain {
    fn kind(&self) -> Kind {
        Kind::RouteDomain
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let partition = scope.partition_name();
        let mut vlans = Vec::with_capacity(self.vlans.len());
        for &vlan in &self.vlans {
            vlans.push(scope.reference_to(vlan, Kind::Vlan)?);
        }
        let rules = if scope.feature("afm") && !self.rules.is_empty() {
            Some(firewall_rules(scope, &self.rules)?)
        } else {
            None
        };

        let value = rename_block(self.kind(), &mut template, &["net", "route-domain", "$name"], &self.name)?;
        value.insert("id", i64::from(self.id));
        value.insert("partition", partition);
        if vlans.is_empty() {
            value.remove("vlans");
        } else {
            value.insert("vlans", toggles(vlans));
        }
        if let Some(parent) = &self.parent {
            value.insert("parent", parent.as_str());
        }
        match rules {
            Some(rules) => {
                value.insert("fw-rules", rules);
            }
            None => {
                value.remove("fw-rules");
            }
        }
        Ok((Some(self.name.clone()), Some(template)))
    }
}
