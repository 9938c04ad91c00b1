//! VLESS protocol decoder
//!
//! Reads `type: vless` proxy entries. Reality parameters come from the
//! `reality-opts` block, transports from `network` and its options block.

use tracing::trace;

use crate::config::outbound::{Outbound, VLessOutbound};
use crate::parser::fields;
use crate::parser::ingest::ProxyNode;

use super::ProtocolDecoder;

// ============================================================================
// VLESS Decoder
// ============================================================================

/// Decoder for `type: vless` entries
pub struct VLessDecoder;

impl ProtocolDecoder for VLessDecoder {
    fn kind(&self) -> &str {
        "vless"
    }

    fn decode(&self, node: &ProxyNode) -> Outbound {
        trace!("Decoding VLESS entry #{}", node.index);
        let map = &node.fields;

        Outbound::VLess(VLessOutbound {
            tag: fields::string(map, "name"),
            server: fields::string(map, "server"),
            server_port: fields::port(map, "port"),
            uuid: fields::string(map, "uuid"),
            flow: fields::string(map, "flow").filter(|flow| !flow.is_empty()),
            tls: fields::decode_tls(map),
            transport: fields::decode_transport(map),
        })
    }
}
