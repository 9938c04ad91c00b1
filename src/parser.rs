//! Subscription Parsing Module
//!
//! This module provides functionality for:
//! - Reading Clash-style YAML (or JSON) subscriptions into generic proxy nodes
//! - Decoding nodes into typed outbounds via a registry of protocol decoders
//!
//! A subscription parses as a whole or not at all: malformed input is an
//! error, while incomplete entries decode with missing fields left empty for
//! the validator to report.

pub mod fields;
pub mod ingest;
pub mod protocols;

use std::fmt;

use tracing::debug;

use crate::config::outbound::Outbound;

pub use ingest::{ProxyNode, decode_base64, read_proxy_nodes};
pub use protocols::{
    DecoderRegistry, Hysteria2Decoder, ProtocolDecoder, UnknownKindPolicy, VLessDecoder,
    VMessDecoder,
};

// ============================================================================
// Parse Errors
// ============================================================================

/// Failure to read a subscription document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text is not well-formed YAML/JSON, or its shape cannot hold a
    /// proxy list
    MalformedInput { reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedInput { reason } => {
                write!(f, "malformed subscription: {}", reason)
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Unified Subscription Parsing
// ============================================================================

/// Parses subscription content with the built-in decoders
pub fn parse_subscription(content: &str) -> Result<Vec<Outbound>, ParseError> {
    let registry = DecoderRegistry::with_builtin_decoders();
    parse_subscription_with_registry(content, &registry)
}

/// Parses subscription content using a custom registry
pub fn parse_subscription_with_registry(
    content: &str,
    registry: &DecoderRegistry,
) -> Result<Vec<Outbound>, ParseError> {
    let nodes = read_proxy_nodes(content)?;
    let outbounds = registry.decode_nodes(&nodes);
    debug!("Parsed {} outbounds from subscription", outbounds.len());
    Ok(outbounds)
}
