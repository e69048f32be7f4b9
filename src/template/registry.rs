//! Static template sources, one per (kind, dialect) pair

use crate::context::Dialect;
use crate::stamp::{auth, ltm, net, scaffolding, security, sys, Kind};

/// Template text registered for a kind in one dialect. `None` means the
/// kind has nothing to emit there.
pub fn source(kind: Kind, dialect: Dialect) -> Option<&'static str> {
    use Dialect::{Legacy, Modern};

    let text = match (kind, dialect) {
        (Kind::Partition, Modern) => scaffolding::PARTITION_MODERN,
        (Kind::Partition, Legacy) => scaffolding::PARTITION_LEGACY,
        (Kind::Folder, Modern) => scaffolding::FOLDER_MODERN,
        (Kind::Node, Modern) => ltm::NODE_MODERN,
        (Kind::Node, Legacy) => ltm::NODE_LEGACY,
        (Kind::Pool, Modern) => ltm::POOL_MODERN,
        (Kind::Pool, Legacy) => ltm::POOL_LEGACY,
        (Kind::VirtualServer, Modern) => ltm::VIRTUAL_MODERN,
        (Kind::VirtualServer, Legacy) => ltm::VIRTUAL_LEGACY,
        (Kind::SelfIp, Modern) => net::SELF_IP_MODERN,
        (Kind::SelfIp, Legacy) => net::SELF_IP_LEGACY,
        (Kind::Trunk, Modern) => net::TRUNK_MODERN,
        (Kind::Vlan, Modern) => net::VLAN_MODERN,
        (Kind::Vlan, Legacy) => net::VLAN_LEGACY,
        (Kind::RouteDomain, Modern) => net::ROUTE_DOMAIN_MODERN,
        (Kind::Provision, Modern) => sys::PROVISION_MODERN,
        (Kind::Provision, Legacy) => sys::PROVISION_LEGACY,
        (Kind::Defaults, Modern) => sys::DEFAULTS_MODERN,
        (Kind::Defaults, Legacy) => sys::DEFAULTS_LEGACY,
        (Kind::Platform, Modern) => sys::PLATFORM_MODERN,
        (Kind::Platform, Legacy) => sys::PLATFORM_LEGACY,
        (Kind::Dns, Modern) => sys::DNS_MODERN,
        (Kind::Dns, Legacy) => sys::DNS_LEGACY,
        (Kind::Ntp, Modern) => sys::NTP_MODERN,
        (Kind::Ntp, Legacy) => sys::NTP_LEGACY,
        (Kind::Mail, Modern) => sys::MAIL_MODERN,
        (Kind::User, Modern) => auth::USER_MODERN,
        (Kind::User, Legacy) => auth::USER_LEGACY,
        (Kind::AddressList, Modern) => security::ADDRESS_LIST_MODERN,
        (Kind::PortList, Modern) => security::PORT_LIST_MODERN,
        (Kind::RuleList, Modern) => security::RULE_LIST_MODERN,
        (Kind::Firewall, Modern) => security::FIREWALL_MODERN,
        _ => return None,
    };
    Some(text)
}

/// Every registered source, in kind order
pub fn sources() -> impl Iterator<Item = (Kind, Dialect, &'static str)> {
    Kind::ALL.into_iter().flat_map(|kind| {
        Dialect::ALL
            .into_iter()
            .filter_map(move |dialect| source(kind, dialect).map(|text| (kind, dialect, text)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_source_parses() {
        for (kind, dialect, text) in sources() {
            let parsed = crate::parser::parse(text);
            assert!(parsed.is_ok(), "{} {} template: {:?}", kind, dialect, parsed.err());
            assert!(!parsed.unwrap().is_empty(), "{} {} template is empty", kind, dialect);
        }
    }

    #[test]
    fn test_missing_pairs() {
        assert!(source(Kind::Profile, Dialect::Modern).is_none());
        assert!(source(Kind::Trunk, Dialect::Legacy).is_none());
        assert!(source(Kind::Raw, Dialect::Legacy).is_none());
        assert!(source(Kind::Folder, Dialect::Modern).is_some());
    }
}
