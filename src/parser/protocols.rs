//! Protocol decoders module
//!
//! Each supported protocol kind has a decoder implementing [`ProtocolDecoder`].
//! The [`DecoderRegistry`] dispatches a generic proxy node to the decoder
//! registered under its exact `type` string.

mod hysteria2;
mod vless;
mod vmess;

pub use hysteria2::Hysteria2Decoder;
pub use vless::VLessDecoder;
pub use vmess::VMessDecoder;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{debug, trace, warn};

use crate::config::outbound::{Outbound, UnsupportedOutbound};

use super::fields;
use super::ingest::ProxyNode;

// ============================================================================
// Protocol Decoder Trait
// ============================================================================

/// Trait for decoding one proxy node of a given protocol kind
pub trait ProtocolDecoder: Send + Sync {
    /// Returns the `type` string this decoder handles (e.g., "vless")
    fn kind(&self) -> &str;

    /// Decodes a node into an outbound. Missing fields stay `None`;
    /// decoding itself cannot fail.
    fn decode(&self, node: &ProxyNode) -> Outbound;
}

// ============================================================================
// Unknown Kind Policy
// ============================================================================

/// What the registry does with an entry whose `type` has no decoder.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownKindPolicy {
    /// Keep the entry as [`Outbound::Unsupported`] so later passes see it
    #[default]
    PassThrough,
    /// Drop the entry, logging a warning
    Skip,
}

// ============================================================================
// Decoder Registry
// ============================================================================

/// Registry for protocol decoders with dynamic dispatch
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn ProtocolDecoder>>,
    unknown_kind: UnknownKindPolicy,
}

impl DecoderRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            unknown_kind: UnknownKindPolicy::default(),
        }
    }

    /// Creates a registry with all built-in decoders registered
    pub fn with_builtin_decoders() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VLessDecoder));
        registry.register(Arc::new(VMessDecoder));
        registry.register(Arc::new(Hysteria2Decoder::new("hysteria2")));
        registry.register(Arc::new(Hysteria2Decoder::new("hy2")));
        registry
    }

    /// Sets the policy for entries with an unknown `type`
    pub fn with_unknown_kind_policy(mut self, policy: UnknownKindPolicy) -> Self {
        self.unknown_kind = policy;
        self
    }

    pub fn unknown_kind_policy(&self) -> UnknownKindPolicy {
        self.unknown_kind
    }

    /// Registers a protocol decoder
    pub fn register(&mut self, decoder: Arc<dyn ProtocolDecoder>) {
        self.decoders.insert(decoder.kind().to_string(), decoder);
    }

    /// Gets the decoder for the given kind (exact, case-sensitive match)
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ProtocolDecoder>> {
        self.decoders.get(kind)
    }

    /// Decodes a single node.
    ///
    /// Returns `None` only when the node's kind is unknown and the policy is
    /// [`UnknownKindPolicy::Skip`].
    pub fn decode_node(&self, node: &ProxyNode) -> Option<Outbound> {
        if let Some(decoder) = node.kind().and_then(|kind| self.decoders.get(kind)) {
            trace!(
                "Decoding proxy entry #{} with '{}' decoder",
                node.index,
                decoder.kind()
            );
            return Some(decoder.decode(node));
        }

        match self.unknown_kind {
            UnknownKindPolicy::PassThrough => {
                debug!(
                    "Passing through proxy entry #{} with unknown type {:?}",
                    node.index,
                    node.kind()
                );
                Some(decode_unsupported(node))
            }
            UnknownKindPolicy::Skip => {
                warn!(
                    "Skipping proxy entry #{} ({}) with unknown type {:?}",
                    node.index,
                    node.name().unwrap_or("<no name>"),
                    node.kind()
                );
                None
            }
        }
    }

    /// Decodes nodes in order
    pub fn decode_nodes(&self, nodes: &[ProxyNode]) -> Vec<Outbound> {
        let outbounds: Vec<Outbound> = nodes.iter().filter_map(|n| self.decode_node(n)).collect();

        let unsupported = outbounds
            .iter()
            .filter(|o| matches!(o, Outbound::Unsupported(_)))
            .count();
        debug!(
            "Decoding complete: {} entries, {} outbounds, {} unsupported, {} skipped",
            nodes.len(),
            outbounds.len(),
            unsupported,
            nodes.len() - outbounds.len()
        );

        outbounds
    }
}

// ============================================================================
// Opaque Pass-Through
// ============================================================================

const IDENTITY_KEYS: [&str; 4] = ["type", "name", "server", "port"];

/// Keeps an entry of unknown kind: identity fields typed, everything else
/// carried as JSON under its original key.
fn decode_unsupported(node: &ProxyNode) -> Outbound {
    let map = &node.fields;
    let mut raw = Map::new();

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            trace!("Dropping non-string key in proxy entry #{}", node.index);
            continue;
        };
        if IDENTITY_KEYS.contains(&key) {
            continue;
        }
        match serde_json::to_value(value) {
            Ok(json) => {
                raw.insert(key.to_string(), json);
            }
            Err(e) => {
                warn!(
                    "Field '{}' of proxy entry #{} has no JSON form: {}",
                    key, node.index, e
                );
            }
        }
    }

    Outbound::Unsupported(UnsupportedOutbound {
        kind: fields::string(map, "type"),
        tag: fields::string(map, "name"),
        server: fields::string(map, "server"),
        server_port: fields::port(map, "port"),
        raw,
    })
}
