//! Hysteria2 protocol decoder
//!
//! Reads `type: hysteria2` (and `type: hy2`) proxy entries, including port hopping
//! (`ports` / `server-ports`, `hop-interval`), bandwidth hints and
//! obfuscation. Port lists and intervals are kept as written.

use tracing::trace;

use crate::config::outbound::{Hysteria2Obfs, Hysteria2Outbound, Outbound};
use crate::config::shared::{PortSpec, RawDuration};
use crate::parser::fields;
use crate::parser::ingest::ProxyNode;

use super::ProtocolDecoder;

// ============================================================================
// Hysteria2 Decoder
// ============================================================================

/// Decoder for Hysteria2 entries, registered once per accepted `type` value.
/// Output is always [`Outbound::Hysteria2`] whatever the alias.
pub struct Hysteria2Decoder {
    kind: &'static str,
}

impl Hysteria2Decoder {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl ProtocolDecoder for Hysteria2Decoder {
    fn kind(&self) -> &str {
        self.kind
    }

    fn decode(&self, node: &ProxyNode) -> Outbound {
        trace!("Decoding Hysteria2 entry #{} (type: {})", node.index, self.kind);
        let map = &node.fields;

        let server_ports = fields::comma_list(map, "ports")
            .or_else(|| fields::comma_list(map, "server-ports"))
            .filter(|ports| !ports.is_empty())
            .map(|ports| ports.into_iter().map(PortSpec::new).collect());

        let obfs_type = fields::string(map, "obfs");
        let obfs_password = fields::string(map, "obfs-password");
        let obfs = if obfs_type.is_some() || obfs_password.is_some() {
            Some(Hysteria2Obfs {
                obfs_type,
                password: obfs_password,
            })
        } else {
            None
        };

        Outbound::Hysteria2(Hysteria2Outbound {
            tag: fields::string(map, "name"),
            server: fields::string(map, "server"),
            server_port: fields::port(map, "port"),
            server_ports,
            hop_interval: fields::string(map, "hop-interval").map(RawDuration::new),
            up_mbps: fields::mbps(map, "up"),
            down_mbps: fields::mbps(map, "down"),
            obfs,
            password: fields::string(map, "password"),
            auth_str: fields::first_string(map, &["auth-str", "auth_str"]),
            tls: fields::decode_tls(map),
        })
    }
}
