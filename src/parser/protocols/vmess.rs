//! VMess protocol decoder
//!
//! Reads `type: vmess` proxy entries. The Clash `cipher` key carries the VMess
//! security method; `alterId` is kept as given.

use tracing::trace;

use crate::config::outbound::{Outbound, VMessOutbound};
use crate::parser::fields;
use crate::parser::ingest::ProxyNode;

use super::ProtocolDecoder;

// ============================================================================
// VMess Decoder
// ============================================================================

/// Decoder for `type: vmess` entries
pub struct VMessDecoder;

impl ProtocolDecoder for VMessDecoder {
    fn kind(&self) -> &str {
        "vmess"
    }

    fn decode(&self, node: &ProxyNode) -> Outbound {
        trace!("Decoding VMess entry #{}", node.index);
        let map = &node.fields;

        Outbound::VMess(VMessOutbound {
            tag: fields::string(map, "name"),
            server: fields::string(map, "server"),
            server_port: fields::port(map, "port"),
            uuid: fields::string(map, "uuid"),
            alter_id: fields::unsigned(map, "alterId"),
            security: fields::first_string(map, &["cipher", "security"]),
            tls: fields::decode_tls(map),
            transport: fields::decode_transport(map),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shared::Transport;

    fn decode(content: &str) -> VMessOutbound {
        let node = ProxyNode::new(0, serde_yaml::from_str(content).unwrap());
        match VMessDecoder.decode(&node) {
            Outbound::VMess(vmess) => vmess,
            other => panic!("Expected VMess outbound, got {:?}", other),
        }
    }

    #[test]
    fn test_vmess_basic() {
        let vmess = decode(
            "name: vm\ntype: vmess\nserver: vm.example.com\nport: 8443\nuuid: u\nalterId: 0\ncipher: auto\n",
        );
        assert_eq!(vmess.tag.as_deref(), Some("vm"));
        assert_eq!(vmess.server.as_deref(), Some("vm.example.com"));
        assert_eq!(vmess.server_port, Some(8443));
        assert_eq!(vmess.uuid.as_deref(), Some("u"));
        assert_eq!(vmess.alter_id, Some(0));
        assert_eq!(vmess.security.as_deref(), Some("auto"));
    }

    #[test]
    fn test_vmess_with_websocket_and_tls() {
        let vmess = decode(
            r#"
name: vmess-ws
type: vmess
server: vm.example.com
port: 443
uuid: u
alterId: 0
cipher: auto
tls: true
servername: cdn.example.com
network: ws
ws-opts:
  path: /vmess
  headers:
    Host: cdn.example.com
"#,
        );
        let tls = vmess.tls.unwrap();
        assert_eq!(tls.server_name.as_deref(), Some("cdn.example.com"));
        assert!(tls.reality.is_none());

        let Some(Transport::WebSocket(ws)) = vmess.transport else {
            panic!("Expected WebSocket transport");
        };
        assert_eq!(ws.path.as_deref(), Some("/vmess"));
        assert_eq!(
            ws.headers.unwrap().get("Host"),
            Some("cdn.example.com")
        );
    }

    #[test]
    fn test_vmess_without_alter_id() {
        let vmess = decode("name: vm\ntype: vmess\nserver: a\nport: 1\nuuid: u\n");
        assert!(vmess.alter_id.is_none());
        assert!(vmess.security.is_none());
    }
}
