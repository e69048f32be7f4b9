//! Device-wide system settings
//!
//! None of these have a reference key: they configure singletons.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::CompileError;
use crate::parser::{Map, Value};
use crate::stamp::{block, rename_block, Kind, Output, Render, Scope};
use crate::version::Product;

pub(crate) const PROVISION_MODERN: &str = r#"
sys provision $name {
    level none
}
"#;

pub(crate) const PROVISION_LEGACY: &str = r#"
provision $name {
    level none
}
"#;

pub(crate) const DEFAULTS_MODERN: &str = r#"
sys httpd {
    auth-pam-idle-timeout 21600
}
net self-allow {
    defaults {
        ospf:any
        tcp:161
        tcp:22
        tcp:4353
        tcp:443
        tcp:53
        udp:1026
        udp:161
        udp:4353
        udp:520
        udp:53
    }
}
"#;

pub(crate) const DEFAULTS_LEGACY: &str = r#"
stp {}
self allow {}
"#;

/// Services open on self IPs with `allow default` in the flat syntax
const LEGACY_DEFAULT_ALLOW: &str =
    "default tcp domain udp 1026 tcp ssh tcp snmp proto ospf tcp 4353 udp domain tcp https udp efs udp 4353 udp snmp";

pub(crate) const PLATFORM_MODERN: &str = r#"
sys management-ip $ip/$netmask {}
sys management-route default {
    gateway none
}
sys db dhclient.mgmt {
    value disable
}
sys global-settings {
    mgmt-dhcp disabled
    gui-setup disabled
    hostname none
}
"#;

pub(crate) const PLATFORM_LEGACY: &str = r#"
mgmt $ip {
    netmask none
}
mgmt route default inet {
    gateway none
}
system {
    hostname none
}
"#;

pub(crate) const DNS_MODERN: &str = r#"
sys dns {
    name-servers {}
    search {}
}
"#;

pub(crate) const DNS_LEGACY: &str = r#"
dns {
    nameservers
    search
}
"#;

pub(crate) const NTP_MODERN: &str = r#"
sys ntp {
    servers {}
    timezone none
}
"#;

pub(crate) const NTP_LEGACY: &str = r#"
ntp {
    servers none
    timezone none
}
"#;

pub(crate) const MAIL_MODERN: &str = r#"
sys smtp-server $key {
    from-address nobody@f5net.com
    local-host-name test.net
    smtp-server-host-name none
    smtp-server-port 25
}
"#;

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

fn enable(flag: bool) -> &'static str {
    if flag {
        "enable"
    } else {
        "disable"
    }
}

/// Resource level for one software module
#[derive(Debug, Clone)]
pub struct Provision {
    pub module: String,
    /// `minimum`, `nominal` or `dedicated`
    pub level: String,
}

impl Provision {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            level: "nominal".to_string(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

impl Render for Provision {
    fn kind(&self) -> Kind {
        Kind::Provision
    }

    fn modern(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        rename_block(self.kind(), &mut template, &["sys", "provision", "$name"], &self.module)?
            .insert("level", self.level.as_str());
        Ok((None, Some(template)))
    }

    fn legacy(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        if !scope.version().at_least(Product::Bigip, 10, 0, 0) {
            return Ok((None, None));
        }
        rename_block(self.kind(), &mut template, &["provision", "$name"], &self.module)?
            .insert("level", self.level.as_str());
        Ok((None, Some(template)))
    }
}

/// Fixed baseline settings every configuration starts with
#[derive(Debug, Clone, Copy, Default)]
pub struct Defaults;

impl Render for Defaults {
    fn kind(&self) -> Kind {
        Kind::Defaults
    }

    fn modern(&self, _scope: &Scope<'_>, template: Map) -> Result<Output, CompileError> {
        Ok((None, Some(template)))
    }

    fn legacy(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        block(self.kind(), &mut template, &["stp"])?.insert("config name", Value::None);
        block(self.kind(), &mut template, &["self", "allow"])?.insert(LEGACY_DEFAULT_ALLOW, Value::None);
        Ok((None, Some(template)))
    }
}

/// Management interface, default route and host identity
#[derive(Debug, Clone)]
pub struct Platform {
    pub address: IpNet,
    pub gateway: IpAddr,
    pub hostname: String,
    pub dhcp: bool,
    /// Leave the setup wizard enabled
    pub wizard: bool,
}

impl Platform {
    pub fn new(address: IpNet, gateway: IpAddr) -> Self {
        let hostname = format!(
            "ip-{}.mgmt.pdsea.f5net.com",
            address.addr().to_string().replace(['.', ':'], "-")
        );
        Self {
            address,
            gateway,
            hostname,
            dhcp: false,
            wizard: false,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_dhcp(mut self, dhcp: bool) -> Self {
        self.dhcp = dhcp;
        self
    }

    pub fn with_wizard(mut self, wizard: bool) -> Self {
        self.wizard = wizard;
        self
    }
}

impl Render for Platform {
    fn kind(&self) -> Kind {
        Kind::Platform
    }

    fn modern(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let kind = self.kind();
        let management = format!("{}/{}", self.address.addr(), self.address.netmask());
        rename_block(kind, &mut template, &["sys", "management-ip", "$ip/$netmask"], &management)?;
        block(kind, &mut template, &["sys", "management-route", "default"])?
            .insert("gateway", self.gateway.to_string());
        if self.dhcp {
            block(kind, &mut template, &["sys", "db", "dhclient.mgmt"])?.insert("value", "enable");
        }

        let settings = block(kind, &mut template, &["sys", "global-settings"])?;
        settings.insert("gui-setup", enabled(self.wizard));
        settings.insert("mgmt-dhcp", enabled(self.dhcp));
        settings.insert("hostname", self.hostname.as_str());
        Ok((None, Some(template)))
    }

    fn legacy(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let kind = self.kind();
        rename_block(kind, &mut template, &["mgmt", "$ip"], &self.address.addr().to_string())?
            .insert("netmask", self.address.netmask().to_string());
        block(kind, &mut template, &["mgmt", "route", "default", "inet"])?
            .insert("gateway", self.gateway.to_string());

        let system = block(kind, &mut template, &["system"])?;
        system.insert("gui setup", enable(self.wizard));
        system.insert("hostname", self.hostname.as_str());
        Ok((None, Some(template)))
    }
}

/// Name servers and search domains
#[derive(Debug, Clone, Default)]
pub struct Dns {
    pub servers: Vec<String>,
    pub suffixes: Vec<String>,
}

impl Dns {
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            suffixes: Vec::new(),
        }
    }

    pub fn with_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }
}

impl Render for Dns {
    fn kind(&self) -> Kind {
        Kind::Dns
    }

    fn modern(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let dns = block(self.kind(), &mut template, &["sys", "dns"])?;
        dns.insert("name-servers", Value::set(self.servers.iter().cloned()));
        dns.insert("search", Value::set(self.suffixes.iter().cloned()));
        Ok((None, Some(template)))
    }

    fn legacy(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let dns = block(self.kind(), &mut template, &["dns"])?;
        dns.clear();
        dns.insert("nameservers", Value::Toggle);
        dns.extend(self.servers.iter().map(|s| (s.as_str(), Value::Toggle)));
        if !self.suffixes.is_empty() {
            dns.insert("search", Value::Toggle);
            dns.extend(self.suffixes.iter().map(|s| (s.as_str(), Value::Toggle)));
        }
        Ok((None, Some(template)))
    }
}

/// Time servers and zone
#[derive(Debug, Clone, Default)]
pub struct Ntp {
    pub servers: Vec<String>,
    pub timezone: Option<String>,
}

impl Ntp {
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            timezone: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

impl Render for Ntp {
    fn kind(&self) -> Kind {
        Kind::Ntp
    }

    fn modern(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let ntp = block(self.kind(), &mut template, &["sys", "ntp"])?;
        ntp.clear();
        ntp.insert("servers", Value::set(self.servers.iter().cloned()));
        if let Some(timezone) = &self.timezone {
            ntp.insert("timezone", timezone.as_str());
        }
        Ok((None, Some(template)))
    }

    fn legacy(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let ntp = block(self.kind(), &mut template, &["ntp"])?;
        ntp.clear();
        if !self.servers.is_empty() {
            ntp.insert("servers", Value::raw(self.servers.join(" ")));
        }
        if let Some(timezone) = &self.timezone {
            ntp.insert("timezone", timezone.as_str());
        }
        Ok((None, Some(template)))
    }
}

/// Outgoing mail relay
#[derive(Debug, Clone)]
pub struct Mail {
    pub server: String,
    pub port: u16,
    pub originator: String,
}

impl Mail {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: 25,
            originator: "nobody@f5net.com".to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_originator(mut self, originator: impl Into<String>) -> Self {
        self.originator = originator.into();
        self
    }
}

impl Render for Mail {
    fn kind(&self) -> Kind {
        Kind::Mail
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let version = scope.version();
        if !(version.at_least(Product::Bigip, 11, 3, 0) || version.at_least(Product::Em, 3, 0, 0)) {
            return Ok((None, None));
        }
        let key = scope.path(&self.server);
        let value = rename_block(self.kind(), &mut template, &["sys", "smtp-server", "$key"], &key)?;
        value.insert("smtp-server-host-name", self.server.as_str());
        value.insert("smtp-server-port", self.port);
        value.insert("from-address", self.originator.as_str());
        Ok((Some(key), Some(template)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::testing::{compile, encode, tree};
    use crate::tree::PARTITION_COMMON;
    use crate::version::Version;
    use pretty_assertions::assert_eq;

    fn compile_in_common(version: Version, stamp: impl Into<crate::stamp::Stamp>) -> String {
        let mut tree = tree(version, 0);
        let common = tree.partition(PARTITION_COMMON).unwrap();
        let id = tree.hook_stamp(common, stamp);
        encode(&compile(&tree, id))
    }

    #[test]
    fn test_provision() {
        let modern = compile_in_common(Version::bigip(11, 0, 0), Provision::new("afm").with_level("dedicated"));
        assert_eq!(modern, "sys provision afm {\n    level dedicated\n}\n");

        let legacy = compile_in_common(Version::bigip(10, 1, 0), Provision::new("ltm"));
        assert_eq!(legacy, "provision ltm {\n    level nominal\n}\n");

        assert_eq!(compile_in_common(Version::bigip(9, 4, 8), Provision::new("ltm")), "");
    }

    #[test]
    fn test_defaults_legacy() {
        let text = compile_in_common(Version::bigip(10, 2, 0), Defaults);
        assert_eq!(
            text,
            format!("stp {{\n    config name none\n}}\nself allow {{\n    {} none\n}}\n", LEGACY_DEFAULT_ALLOW)
        );
    }

    #[test]
    fn test_defaults_modern_is_template() {
        let text = compile_in_common(Version::bigip(11, 0, 0), Defaults);
        assert!(text.starts_with("sys httpd {\n    auth-pam-idle-timeout 21600\n}\nnet self-allow {\n    defaults {\n        ospf:any\n"));
    }

    fn platform() -> Platform {
        Platform::new("172.27.95.102/24".parse().unwrap(), "172.27.95.254".parse().unwrap())
    }

    #[test]
    fn test_platform_modern() {
        let text = compile_in_common(Version::bigip(11, 5, 0), platform().with_dhcp(true));
        assert_eq!(
            text,
            r#"sys management-ip 172.27.95.102/255.255.255.0 {}
sys management-route default {
    gateway 172.27.95.254
}
sys db dhclient.mgmt {
    value enable
}
sys global-settings {
    mgmt-dhcp enabled
    gui-setup disabled
    hostname ip-172-27-95-102.mgmt.pdsea.f5net.com
}
"#
        );
    }

    #[test]
    fn test_platform_legacy() {
        let text = compile_in_common(Version::bigip(10, 2, 0), platform().with_hostname("bigip1"));
        assert_eq!(
            text,
            r#"mgmt 172.27.95.102 {
    netmask 255.255.255.0
}
mgmt route default inet {
    gateway 172.27.95.254
}
system {
    hostname bigip1
    gui setup disable
}
"#
        );
    }

    #[test]
    fn test_dns() {
        let dns = Dns::new(["172.27.1.1"]).with_suffixes(["f5net.com"]);
        assert_eq!(
            compile_in_common(Version::bigip(11, 0, 0), dns.clone()),
            "sys dns {\n    name-servers { 172.27.1.1 }\n    search { f5net.com }\n}\n"
        );
        assert_eq!(
            compile_in_common(Version::bigip(10, 0, 0), dns),
            "dns {\n    nameservers\n    172.27.1.1\n    search\n    f5net.com\n}\n"
        );
    }

    #[test]
    fn test_ntp() {
        let ntp = Ntp::new(["ntp1.f5net.com", "ntp2.f5net.com"]).with_timezone("America/Los_Angeles");
        assert_eq!(
            compile_in_common(Version::bigip(11, 0, 0), ntp.clone()),
            "sys ntp {\n    servers { ntp1.f5net.com ntp2.f5net.com }\n    timezone America/Los_Angeles\n}\n"
        );
        assert_eq!(
            compile_in_common(Version::bigip(10, 0, 0), ntp),
            "ntp {\n    servers ntp1.f5net.com ntp2.f5net.com\n    timezone America/Los_Angeles\n}\n"
        );
    }

    #[test]
    fn test_mail_version_gate() {
        assert_eq!(compile_in_common(Version::bigip(11, 2, 0), Mail::new("mail.example.com")), "");
        assert_eq!(compile_in_common(Version::em(2, 3, 0), Mail::new("mail.example.com")), "");

        let text = compile_in_common(Version::em(3, 0, 0), Mail::new("mail.example.com").with_port(587));
        assert_eq!(
            text,
            r#"sys smtp-server /Common/mail.example.com {
    from-address nobody@f5net.com
    local-host-name test.net
    smtp-server-host-name mail.example.com
    smtp-server-port 587
}
"#
        );
    }
}
