//! End-to-end tests from Clash subscription text to the latency payload.
//!
//! These tests go through the public API only: parse, validate, map, then
//! inspect the emitted JSON.

use serde_json::{Value, json};
use subcanon::config::outbound::Outbound;
use subcanon::config::validation::{check_unique_tags, validate};
use subcanon::contract::{SCHEMA_VERSION, parse_payload, to_payload};
use subcanon::parser::{ParseError, parse_subscription};

const MIXED_SUBSCRIPTION: &str = r#"
mixed-port: 7890
allow-lan: false
proxies:
  - name: reality-ws-node
    type: vless
    server: reality.example.com
    port: 443
    uuid: b831381d-6324-4d53-ad4f-8cda48b30811
    flow: xtls-rprx-vision
    tls: true
    servername: www.microsoft.com
    client-fingerprint: chrome
    reality-opts:
      public-key: Z84J2IelR9ch3k8VtlVhhs5ycBUlXA7wHBWcBrjqnAw
      short-id: 6ba85179e30d4fc2
    network: ws
    ws-opts:
      path: /reality
      headers:
        Host: cdn.example.com
  - name: vmess-ws-node
    type: vmess
    server: vmess.example.com
    port: 8443
    uuid: 2f3a1f2c-9c4e-4f5e-8d1b-0a2b3c4d5e6f
    alterId: 0
    cipher: auto
    tls: true
    network: ws
    ws-opts:
      path: /vmess?ed=2048
      headers:
        Host: vmess-cdn.example.com
        User-Agent: Mozilla/5.0 (X11; Linux x86_64)
  - name: hy2-node
    type: hysteria2
    server: hy2.example.com
    port: 443
    ports: 8443,9000-9010
    hop-interval: 20s
    password: hy2-secret
    up: 30
    down: 150
    obfs: salamander
    obfs-password: obfs-secret
    sni: hy2.example.com
proxy-groups:
  - name: auto
    type: url-test
    proxies: [reality-ws-node, vmess-ws-node, hy2-node]
"#;

fn payload_json(content: &str) -> Value {
    let outbounds = parse_subscription(content).unwrap();
    serde_json::to_value(to_payload(&outbounds)).unwrap()
}

// ============================================================================
// End-to-End Fixture
// ============================================================================

#[test]
fn test_mixed_subscription_tags_and_protocols() {
    let value = payload_json(MIXED_SUBSCRIPTION);
    let outbounds = value["outbounds"].as_array().unwrap();

    let pairs: Vec<(&str, &str)> = outbounds
        .iter()
        .map(|o| {
            (
                o["tag"].as_str().unwrap(),
                o["protocol"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("reality-ws-node", "vless"),
            ("vmess-ws-node", "vmess"),
            ("hy2-node", "hysteria2"),
        ]
    );
}

#[test]
fn test_mixed_subscription_hysteria2_settings() {
    let value = payload_json(MIXED_SUBSCRIPTION);
    let settings = &value["outbounds"][2]["settings"];

    assert_eq!(settings["address"], json!("hy2.example.com"));
    assert_eq!(settings["port"], json!(443));
    assert_eq!(settings["upMbps"], json!(30));
    assert_eq!(settings["downMbps"], json!(150));
    assert_eq!(settings["hopInterval"], json!("20s"));
    assert_eq!(settings["serverPorts"], json!(["8443", "9000-9010"]));
    assert_eq!(settings["obfs"]["type"], json!("salamander"));
    assert_eq!(settings["obfs"]["password"], json!("obfs-secret"));
    assert_eq!(settings["password"], json!("hy2-secret"));
}

#[test]
fn test_mixed_subscription_reality_round_trip() {
    let value = payload_json(MIXED_SUBSCRIPTION);
    let settings = &value["outbounds"][0]["settings"];

    assert_eq!(
        settings["tls"]["reality"]["publicKey"],
        json!("Z84J2IelR9ch3k8VtlVhhs5ycBUlXA7wHBWcBrjqnAw")
    );
    assert_eq!(settings["tls"]["reality"]["shortId"], json!("6ba85179e30d4fc2"));
    assert_eq!(settings["tls"]["serverName"], json!("www.microsoft.com"));
    assert_eq!(settings["flow"], json!("xtls-rprx-vision"));
    assert_eq!(settings["transport"]["type"], json!("ws"));
    assert_eq!(settings["transport"]["path"], json!("/reality"));
}

#[test]
fn test_mixed_subscription_headers_verbatim() {
    let value = payload_json(MIXED_SUBSCRIPTION);
    let headers = &value["outbounds"][1]["settings"]["transport"]["headers"];

    assert_eq!(
        headers,
        &json!({
            "Host": "vmess-cdn.example.com",
            "User-Agent": "Mozilla/5.0 (X11; Linux x86_64)"
        })
    );
}

#[test]
fn test_mixed_subscription_is_valid() {
    let outbounds = parse_subscription(MIXED_SUBSCRIPTION).unwrap();
    assert!(validate(&outbounds).is_empty());
    assert!(check_unique_tags(&outbounds).is_ok());
}

#[test]
fn test_payload_passes_engine_checks() {
    let outbounds = parse_subscription(MIXED_SUBSCRIPTION).unwrap();
    let payload = to_payload(&outbounds);
    let parsed = parse_payload(&payload.to_json().unwrap()).unwrap();
    assert_eq!(parsed.outbounds.len(), 3);
}

// ============================================================================
// Contract Properties
// ============================================================================

#[test]
fn test_schema_version_is_constant() {
    assert_eq!(SCHEMA_VERSION, 1);
    assert_eq!(payload_json("proxies: []\n")["schemaVersion"], json!(1));
    assert_eq!(payload_json(MIXED_SUBSCRIPTION)["schemaVersion"], json!(1));
}

#[test]
fn test_payload_is_deterministic() {
    let outbounds = parse_subscription(MIXED_SUBSCRIPTION).unwrap();
    let first = to_payload(&outbounds).to_json_pretty().unwrap();
    let second = to_payload(&parse_subscription(MIXED_SUBSCRIPTION).unwrap())
        .to_json_pretty()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_server_ports_sequence_preserved() {
    let content = r#"
proxies:
  - name: hop
    type: hysteria2
    server: hop.example.com
    server-ports: ["8443", "9000-9100"]
    password: pw
"#;
    let value = payload_json(content);
    assert_eq!(
        value["outbounds"][0]["settings"]["serverPorts"],
        json!(["8443", "9000-9100"])
    );
}

#[test]
fn test_absent_fields_stay_absent() {
    let content = "proxies:\n  - name: bare\n    type: vless\n    server: a\n    port: 1\n    uuid: u\n";
    let value = payload_json(content);
    let settings = value["outbounds"][0]["settings"].as_object().unwrap();
    let mut keys: Vec<&str> = settings.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["address", "port", "uuid"]);
}

#[test]
fn test_hy2_alias_maps_to_hysteria2_protocol() {
    let content = "proxies:\n  - name: short\n    type: hy2\n    server: a\n    port: 443\n    password: pw\n";
    let outbounds = parse_subscription(content).unwrap();
    assert!(validate(&outbounds).is_empty());
    let value = payload_json(content);
    assert_eq!(value["outbounds"][0]["protocol"], json!("hysteria2"));
    assert_eq!(value["outbounds"][0]["settings"]["password"], json!("pw"));
}

#[test]
fn test_out_of_range_port_fails_engine_checks() {
    let content = "proxies:\n  - name: high\n    type: vless\n    server: a\n    port: 70000\n    uuid: u\n";
    let outbounds = parse_subscription(content).unwrap();
    assert_eq!(outbounds[0].server_port(), Some(70000));
    assert_eq!(
        validate(&outbounds),
        vec!["high: port 70000 is out of range".to_string()]
    );
    assert!(parse_payload(&to_payload(&outbounds).to_json().unwrap()).is_err());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_missing_server_reported_for_every_kind() {
    let content = r#"
proxies:
  - name: v1
    type: vless
    port: 443
    uuid: u
  - name: v2
    type: vmess
    server: ""
    port: 443
    uuid: u
  - name: h1
    type: hysteria2
    server: null
    port: 443
    password: pw
"#;
    let outbounds = parse_subscription(content).unwrap();
    let messages = validate(&outbounds);

    for tag in ["v1", "v2", "h1"] {
        let expected = format!("{}: server is required", tag);
        assert!(
            messages.contains(&expected),
            "missing '{}' in {:?}",
            expected,
            messages
        );
    }
    // Invalid outbounds are still mapped.
    assert_eq!(to_payload(&outbounds).outbounds.len(), 3);
}

#[test]
fn test_validation_does_not_filter() {
    let content = "proxies:\n  - name: broken\n    type: vless\n";
    let outbounds = parse_subscription(content).unwrap();
    let before = outbounds.clone();
    let messages = validate(&outbounds);
    assert!(!messages.is_empty());
    assert_eq!(outbounds, before);
}

#[test]
fn test_unknown_kind_is_reported_and_passed_through() {
    let content = "proxies:\n  - name: t\n    type: trojan\n    server: a\n    port: 443\n    password: pw\n";
    let outbounds = parse_subscription(content).unwrap();
    assert!(matches!(outbounds[0], Outbound::Unsupported(_)));
    assert_eq!(
        validate(&outbounds),
        vec!["t: unsupported protocol type 'trojan'".to_string()]
    );

    let value = serde_json::to_value(to_payload(&outbounds)).unwrap();
    assert_eq!(value["outbounds"][0]["protocol"], json!("trojan"));
    assert_eq!(value["outbounds"][0]["settings"]["raw"]["password"], json!("pw"));
}

// ============================================================================
// Ingestion Failures
// ============================================================================

#[test]
fn test_malformed_input_is_fatal() {
    let result = parse_subscription("proxies:\n  - name: a\n    type: [vless\n");
    assert!(matches!(result, Err(ParseError::MalformedInput { .. })));
}
