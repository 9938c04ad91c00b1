//! Typed field readers over a generic proxy node, plus the sub-decoders shared
//! by several protocols (TLS/Reality and transports).
//!
//! Readers return `None` for absent keys, `null` values and values of a shape
//! they cannot represent. Strings are returned exactly as written.

use serde_yaml::{Mapping, Value};
use tracing::trace;

use crate::config::shared::{
    GrpcTransport, HeaderMap, Http2Transport, OutboundRealityConfig, OutboundTlsConfig, Transport,
    WebSocketTransport,
};

// ============================================================================
// Scalar Readers
// ============================================================================

/// Looks up a key, treating `null` as absent.
pub fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

/// Renders a scalar as text: strings verbatim, numbers and booleans in their
/// canonical decimal/`true`/`false` form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn string(map: &Mapping, key: &str) -> Option<String> {
    let value = get(map, key)?;
    let result = scalar_to_string(value);
    if result.is_none() {
        trace!("Field '{}' is not a scalar, ignoring it", key);
    }
    result
}

/// First present key wins.
pub fn first_string(map: &Mapping, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string(map, key))
}

pub fn boolean(map: &Mapping, key: &str) -> Option<bool> {
    match get(map, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

/// A port given as an integer or a numeric string.
///
/// The range is not checked here: `0` or `70000` decode as written so the
/// validator can report them.
pub fn port(map: &Mapping, key: &str) -> Option<u32> {
    let result = match get(map, key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse::<u32>().ok(),
        _ => None,
    };
    if result.is_none() {
        trace!("Field '{}' is not a numeric port, ignoring it", key);
    }
    result
}

/// An unsigned integer given as a number or a numeric string.
pub fn unsigned(map: &Mapping, key: &str) -> Option<u32> {
    match get(map, key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Like [`unsigned`], but a string may also carry an `Mbps` unit
/// (`"30 Mbps"`).
pub fn mbps(map: &Mapping, key: &str) -> Option<u32> {
    let result = match get(map, key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits = strip_mbps_unit(s);
            digits.parse::<u32>().ok()
        }
        _ => None,
    };
    if result.is_none() {
        trace!("Field '{}' is not a bandwidth in Mbps, ignoring it", key);
    }
    result
}

fn strip_mbps_unit(s: &str) -> &str {
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();
    match lower.strip_suffix("mbps") {
        Some(rest) => trimmed[..rest.len()].trim_end(),
        None => trimmed,
    }
}

/// A list of scalars; a single scalar counts as a one-element list.
pub fn string_list(map: &Mapping, key: &str) -> Option<Vec<String>> {
    match get(map, key)? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        other => scalar_to_string(other).map(|s| vec![s]),
    }
}

/// A list given either as a sequence or as one comma-separated string.
/// Items are split on commas only; their text is otherwise untouched.
pub fn comma_list(map: &Mapping, key: &str) -> Option<Vec<String>> {
    match get(map, key)? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect(),
        ),
        other => scalar_to_string(other).map(|s| vec![s]),
    }
}

pub fn mapping<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    get(map, key)?.as_mapping()
}

/// Copies a header mapping. Names and values are kept exactly as written.
pub fn header_map(map: &Mapping) -> HeaderMap {
    map.iter()
        .filter_map(|(name, value)| Some((scalar_to_string(name)?, scalar_to_string(value)?)))
        .collect()
}

// ============================================================================
// TLS / Reality
// ============================================================================

/// Reads the TLS keys of an entry. `None` when none of them is present.
///
/// A `reality-opts` block is decoded whether or not TLS is switched on; its
/// presence enables Reality unless it carries `enabled: false`.
pub fn decode_tls(map: &Mapping) -> Option<OutboundTlsConfig> {
    let reality = mapping(map, "reality-opts").map(|opts| OutboundRealityConfig {
        enabled: boolean(opts, "enabled").unwrap_or(true),
        public_key: string(opts, "public-key"),
        short_id: string(opts, "short-id"),
    });

    let tls = OutboundTlsConfig {
        enabled: boolean(map, "tls"),
        server_name: first_string(map, &["servername", "sni"]),
        insecure: boolean(map, "skip-cert-verify"),
        alpn: string_list(map, "alpn"),
        fingerprint: string(map, "client-fingerprint"),
        reality,
    };

    if tls == OutboundTlsConfig::default() {
        None
    } else {
        Some(tls)
    }
}

// ============================================================================
// Transports
// ============================================================================

/// Reads the `network` key and its options block. Plain `tcp` (or no
/// `network`) means there is no transport layer.
pub fn decode_transport(map: &Mapping) -> Option<Transport> {
    let network = string(map, "network")?;

    let transport = match network.as_str() {
        "tcp" => return None,
        "ws" => {
            let opts = options_block(map, "ws-opts", "ws-opt");
            Transport::WebSocket(WebSocketTransport {
                path: opts.and_then(|o| string(o, "path")),
                headers: opts.and_then(|o| mapping(o, "headers")).map(header_map),
                max_early_data: opts.and_then(|o| unsigned(o, "max-early-data")),
                early_data_header_name: opts.and_then(|o| string(o, "early-data-header-name")),
            })
        }
        "grpc" => {
            let opts = options_block(map, "grpc-opts", "grpc-opt");
            Transport::Grpc(GrpcTransport {
                service_name: opts.and_then(|o| string(o, "grpc-service-name")),
            })
        }
        "h2" => {
            let opts = options_block(map, "h2-opts", "h2-opt");
            Transport::Http2(Http2Transport {
                host: opts.and_then(|o| string_list(o, "host")),
                path: opts.and_then(|o| string(o, "path")),
            })
        }
        _ => {
            trace!("No options decoder for network '{}', keeping its name", network);
            Transport::Other(network)
        }
    };

    Some(transport)
}

fn options_block<'a>(map: &'a Mapping, key: &str, alias: &str) -> Option<&'a Mapping> {
    mapping(map, key).or_else(|| mapping(map, alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(content: &str) -> Mapping {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn test_string_is_verbatim() {
        let map = yaml("name: '  Spaced Name  '\npassword: 123456\nempty: ''\nnothing: null\n");
        assert_eq!(string(&map, "name"), Some("  Spaced Name  ".to_string()));
        assert_eq!(string(&map, "password"), Some("123456".to_string()));
        assert_eq!(string(&map, "empty"), Some(String::new()));
        assert_eq!(string(&map, "nothing"), None);
        assert_eq!(string(&map, "absent"), None);
    }

    #[test]
    fn test_port_accepts_number_and_numeric_string() {
        let map = yaml("a: 443\nb: '8443'\nc: 70000\nd: abc\ne: 0\nf: -1\n");
        assert_eq!(port(&map, "a"), Some(443));
        assert_eq!(port(&map, "b"), Some(8443));
        assert_eq!(port(&map, "c"), Some(70000));
        assert_eq!(port(&map, "d"), None);
        assert_eq!(port(&map, "e"), Some(0));
        assert_eq!(port(&map, "f"), None);
    }

    #[test]
    fn test_mbps_forms() {
        let map = yaml("a: 30\nb: '150'\nc: 100 Mbps\nd: 20mbps\ne: 1 Gbps\n");
        assert_eq!(mbps(&map, "a"), Some(30));
        assert_eq!(mbps(&map, "b"), Some(150));
        assert_eq!(mbps(&map, "c"), Some(100));
        assert_eq!(mbps(&map, "d"), Some(20));
        assert_eq!(mbps(&map, "e"), None);
    }

    #[test]
    fn test_unsigned_rejects_units() {
        let map = yaml("a: 0\nb: '64'\nc: 10 Mbps\nd: -1\n");
        assert_eq!(unsigned(&map, "a"), Some(0));
        assert_eq!(unsigned(&map, "b"), Some(64));
        assert_eq!(unsigned(&map, "c"), None);
        assert_eq!(unsigned(&map, "d"), None);
    }

    #[test]
    fn test_comma_list_keeps_ranges() {
        let map = yaml("a: 8443,9000-9010\nb: ['8443', '9000-9100']\nc: 443\n");
        assert_eq!(
            comma_list(&map, "a"),
            Some(vec!["8443".to_string(), "9000-9010".to_string()])
        );
        assert_eq!(
            comma_list(&map, "b"),
            Some(vec!["8443".to_string(), "9000-9100".to_string()])
        );
        assert_eq!(comma_list(&map, "c"), Some(vec!["443".to_string()]));
    }

    #[test]
    fn test_header_map_keeps_case() {
        let map = yaml("Host: cdn.example.com\nUser-Agent: Mozilla/5.0\nx-lower: v\n");
        let headers = header_map(&map);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Host"), Some("cdn.example.com"));
        assert_eq!(headers.get("User-Agent"), Some("Mozilla/5.0"));
        assert_eq!(headers.get("x-lower"), Some("v"));
        assert_eq!(headers.get("host"), None);
    }

    #[test]
    fn test_decode_tls_absent() {
        let map = yaml("name: a\nserver: example.com\n");
        assert!(decode_tls(&map).is_none());
    }

    #[test]
    fn test_decode_tls_with_reality() {
        let map = yaml(
            r#"
tls: true
servername: www.microsoft.com
alpn: [h2, http/1.1]
client-fingerprint: chrome
reality-opts:
  public-key: Z84J2IelR9ch3k8VtlVhhs5ycBUlXA7wHBWcBrjqnAw
  short-id: 6ba85179e30d4fc2
"#,
        );
        let tls = decode_tls(&map).unwrap();
        assert_eq!(tls.enabled, Some(true));
        assert_eq!(tls.server_name.as_deref(), Some("www.microsoft.com"));
        assert_eq!(
            tls.alpn,
            Some(vec!["h2".to_string(), "http/1.1".to_string()])
        );
        assert_eq!(tls.fingerprint.as_deref(), Some("chrome"));
        let reality = tls.reality.unwrap();
        assert!(reality.enabled);
        assert_eq!(
            reality.public_key.as_deref(),
            Some("Z84J2IelR9ch3k8VtlVhhs5ycBUlXA7wHBWcBrjqnAw")
        );
        assert_eq!(reality.short_id.as_deref(), Some("6ba85179e30d4fc2"));
    }

    #[test]
    fn test_decode_reality_without_tls_switch() {
        let map = yaml("tls: false\nreality-opts:\n  enabled: false\n  public-key: pk\n  short-id: ab\n");
        let tls = decode_tls(&map).unwrap();
        assert_eq!(tls.enabled, Some(false));
        let reality = tls.reality.unwrap();
        assert!(!reality.enabled);
        assert_eq!(reality.public_key.as_deref(), Some("pk"));
        assert_eq!(reality.short_id.as_deref(), Some("ab"));
    }

    #[test]
    fn test_decode_ws_transport() {
        let map = yaml(
            r#"
network: ws
ws-opts:
  path: /ray?ed=2048
  headers:
    Host: cdn.example.com
    User-Agent: Mozilla/5.0
"#,
        );
        let Some(Transport::WebSocket(ws)) = decode_transport(&map) else {
            panic!("Expected WebSocket transport");
        };
        assert_eq!(ws.path.as_deref(), Some("/ray?ed=2048"));
        let headers = ws.headers.unwrap();
        assert_eq!(headers.get("Host"), Some("cdn.example.com"));
        assert_eq!(headers.get("User-Agent"), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_decode_grpc_and_h2_transport() {
        let map = yaml("network: grpc\ngrpc-opts:\n  grpc-service-name: svc\n");
        assert_eq!(
            decode_transport(&map),
            Some(Transport::Grpc(GrpcTransport {
                service_name: Some("svc".to_string())
            }))
        );

        let map = yaml("network: h2\nh2-opts:\n  host: [a.example.com]\n  path: /h2\n");
        assert_eq!(
            decode_transport(&map),
            Some(Transport::Http2(Http2Transport {
                host: Some(vec!["a.example.com".to_string()]),
                path: Some("/h2".to_string()),
            }))
        );
    }

    #[test]
    fn test_decode_transport_tcp_and_unknown() {
        assert!(decode_transport(&yaml("network: tcp\n")).is_none());
        assert!(decode_transport(&yaml("name: a\n")).is_none());
        assert_eq!(
            decode_transport(&yaml("network: xhttp\n")),
            Some(Transport::Other("xhttp".to_string()))
        );
    }

    #[test]
    fn test_ws_without_options() {
        assert_eq!(
            decode_transport(&yaml("network: ws\n")),
            Some(Transport::WebSocket(WebSocketTransport::default()))
        );
    }
}
