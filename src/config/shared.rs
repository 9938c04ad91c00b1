//! Sub-structures shared by several outbound kinds: TLS/Reality, transports,
//! and the opaque value types that must survive decoding untouched.

use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Verbatim Value Types
// ============================================================================

/// One entry of a port-hopping list, either a literal port (`"8443"`) or a
/// range (`"9000-9100"`).
///
/// Stored exactly as written in the subscription and never expanded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortSpec(String);

impl PortSpec {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for PortSpec {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for PortSpec {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A duration exactly as the subscription spelled it (`"20s"`, `"1m30s"`, `"30"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawDuration(String);

impl RawDuration {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for RawDuration {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RawDuration {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RawDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP headers for a transport, keyed by the name exactly as written.
///
/// Keys are compared case-sensitively; `Host` and `host` are two entries.
/// Iteration is ordered by key so that emitted JSON is stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for HeaderMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// TLS
// ============================================================================

/// TLS configuration for outbound (client) connections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundTlsConfig {
    /// Explicit `tls` switch, absent when the subscription did not say
    pub enabled: Option<bool>,

    /// Server name for verification and SNI
    pub server_name: Option<String>,

    /// Accept any server certificate
    pub insecure: Option<bool>,

    /// ALPN protocols in subscription order
    pub alpn: Option<Vec<String>>,

    /// uTLS client fingerprint
    pub fingerprint: Option<String>,

    /// Reality configuration
    pub reality: Option<OutboundRealityConfig>,
}

impl OutboundTlsConfig {
    /// Reality block, only when it is switched on.
    pub fn enabled_reality(&self) -> Option<&OutboundRealityConfig> {
        self.reality.as_ref().filter(|r| r.enabled)
    }
}

/// Reality configuration for outbound (client).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundRealityConfig {
    /// Enable Reality
    pub enabled: bool,

    /// Server public key
    pub public_key: Option<String>,

    /// Short ID (hex string, 0-8 digits)
    pub short_id: Option<String>,
}

impl OutboundRealityConfig {
    pub fn new(public_key: impl Into<String>, short_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            public_key: Some(public_key.into()),
            short_id: Some(short_id.into()),
        }
    }
}

// ============================================================================
// Transports
// ============================================================================

/// V2Ray-style transport carried under a proxy protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// WebSocket transport (`network: ws`)
    WebSocket(WebSocketTransport),
    /// gRPC transport (`network: grpc`)
    Grpc(GrpcTransport),
    /// HTTP/2 transport (`network: h2`)
    Http2(Http2Transport),
    /// A network the decoder has no sub-structure for, kept by name
    Other(String),
}

impl Transport {
    /// Transport type name as it appears in subscriptions and in the contract.
    pub fn kind(&self) -> &str {
        match self {
            Transport::WebSocket(_) => "ws",
            Transport::Grpc(_) => "grpc",
            Transport::Http2(_) => "h2",
            Transport::Other(network) => network,
        }
    }
}

/// WebSocket transport configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebSocketTransport {
    /// HTTP request path
    pub path: Option<String>,

    /// Extra headers, verbatim
    pub headers: Option<HeaderMap>,

    /// Max early data size
    pub max_early_data: Option<u32>,

    /// Early data header name
    pub early_data_header_name: Option<String>,
}

/// gRPC transport configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrpcTransport {
    /// gRPC service name
    pub service_name: Option<String>,
}

/// HTTP/2 transport configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Http2Transport {
    /// Host domains
    pub host: Option<Vec<String>>,

    /// HTTP request path
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_spec_keeps_range_text() {
        let spec = PortSpec::from("9000-9100");
        assert_eq!(spec.as_str(), "9000-9100");
        assert_eq!(spec.to_string(), "9000-9100");
    }

    #[test]
    fn test_raw_duration_keeps_unit() {
        let hop = RawDuration::from("20s");
        assert_eq!(hop.as_str(), "20s");
        assert_eq!(hop.into_inner(), "20s");
    }

    #[test]
    fn test_header_map_is_case_sensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Host", "a.example.com");
        headers.insert("host", "b.example.com");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Host"), Some("a.example.com"));
        assert_eq!(headers.get("host"), Some("b.example.com"));
        assert_eq!(headers.get("HOST"), None);
    }

    #[test]
    fn test_header_map_iterates_in_key_order() {
        let headers: HeaderMap = [("User-Agent", "ua"), ("Host", "h")].into_iter().collect();
        let keys: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Host", "User-Agent"]);
    }

    #[test]
    fn test_enabled_reality_ignores_disabled_block() {
        let tls = OutboundTlsConfig {
            reality: Some(OutboundRealityConfig {
                enabled: false,
                public_key: Some("pk".to_string()),
                short_id: None,
            }),
            ..Default::default()
        };
        assert!(tls.enabled_reality().is_none());

        let tls = OutboundTlsConfig {
            reality: Some(OutboundRealityConfig::new("pk", "ab")),
            ..Default::default()
        };
        assert_eq!(
            tls.enabled_reality().and_then(|r| r.public_key.as_deref()),
            Some("pk")
        );
    }

    #[test]
    fn test_transport_kind_names() {
        assert_eq!(Transport::WebSocket(WebSocketTransport::default()).kind(), "ws");
        assert_eq!(Transport::Grpc(GrpcTransport::default()).kind(), "grpc");
        assert_eq!(Transport::Http2(Http2Transport::default()).kind(), "h2");
        assert_eq!(Transport::Other("xhttp".to_string()).kind(), "xhttp");
    }
}
