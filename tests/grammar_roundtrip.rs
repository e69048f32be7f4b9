//! Integration tests for the configuration grammar and encoder

use pretty_assertions::assert_eq;

use tmos_confgen::template::registry;
use tmos_confgen::{parse, Encoder, Map, Value};

fn roundtrip(text: &str) -> (Map, Map) {
    let first = parse(text).expect("Should parse");
    let encoded = Encoder::default().encode(&first);
    let second = parse(&encoded).unwrap_or_else(|e| panic!("re-parse failed: {}\n{}", e, encoded));
    (first, second)
}

#[test]
fn test_inline_group_values() {
    let doc = parse("a { b 1 c none }").expect("Should parse");
    let a = doc.get("a").and_then(Value::as_map).unwrap();
    assert_eq!(a.get("b"), Some(&Value::Int(1)));
    assert_eq!(a.get("c"), Some(&Value::None));

    let (first, second) = roundtrip("a { b 1 c none }");
    assert_eq!(first, second);
}

#[test]
fn test_toggle_only_at_end_of_line() {
    assert_eq!(parse("flag\n").unwrap().get("flag"), Some(&Value::Toggle));
    assert_eq!(parse("flag value\n").unwrap().get("flag"), Some(&Value::from("value")));
}

#[test]
fn test_every_template_roundtrips() {
    for (kind, dialect, text) in registry::sources() {
        let (first, second) = roundtrip(text);
        assert_eq!(first, second, "{} ({})", kind, dialect);
    }
}

#[test]
fn test_device_config_roundtrips() {
    let text = r#"
ltm virtual /Common/vs1 {
    destination 10.11.0.1:443
    profiles {
        /Common/http {
            context all
        }
    }
    vlans-disabled
    pool /Common/web
}
net self /Common/self1 {
    address 10.1.0.1/16
    allow-service { tcp:22 tcp:443 }
    vlan /Common/internal
}
sys db ui.advisory.text {
    value "Test device"
}
"#;
    let (first, second) = roundtrip(text);
    assert_eq!(first, second);

    let self_ip = first
        .get("net")
        .and_then(Value::as_map)
        .and_then(|net| net.get("self"))
        .and_then(Value::as_map)
        .and_then(|selfs| selfs.get("/Common/self1"))
        .and_then(Value::as_map)
        .unwrap();
    assert_eq!(self_ip.get("allow-service"), Some(&Value::set(["tcp:443", "tcp:22"])));
}

#[test]
fn test_encoder_layout() {
    let doc = parse("sys dns {\n    name-servers { 10.0.0.2 }\n    search {}\n}\n").unwrap();
    insta::assert_snapshot!(Encoder::default().encode(&doc), @r"
    sys dns {
        name-servers { 10.0.0.2 }
        search {}
    }
    ");
}

#[test]
fn test_parse_error_reports_location() {
    let err = parse("ltm pool web {\n    members {\n").unwrap_err();
    let report = err.format("pool.conf");
    assert!(report.contains("pool.conf"));
    assert!(report.contains(&err.message));
}
