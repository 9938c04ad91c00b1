//! Subscription ingestion
//!
//! Turns raw subscription text into an ordered list of generic proxy nodes.
//! Nothing here looks at protocol-specific keys.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace, warn};

use super::ParseError;

// ============================================================================
// Proxy Node
// ============================================================================

/// One entry of the `proxies` sequence, still untyped.
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyNode {
    /// 0-based position in the source `proxies` sequence
    pub index: usize,
    /// The entry's keys and values as parsed
    pub fields: Mapping,
}

impl ProxyNode {
    pub fn new(index: usize, fields: Mapping) -> Self {
        Self { index, fields }
    }

    /// The `type` discriminator, when it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// The `name` of the entry, when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }
}

// ============================================================================
// Document Reading
// ============================================================================

/// Reads the proxy entries of a Clash-style YAML (or JSON) subscription.
///
/// Accepted shapes:
/// - a mapping with a `proxies` sequence (other top-level keys are ignored)
/// - a bare sequence of proxy entries
/// - either of the above, Base64 encoded as a single scalar
///
/// # Errors
///
/// Returns [`ParseError::MalformedInput`] when the text is not well-formed
/// YAML/JSON, or when its shape cannot hold a proxy list.
pub fn read_proxy_nodes(content: &str) -> Result<Vec<ProxyNode>, ParseError> {
    debug!(
        "Reading subscription document, content length: {} bytes",
        content.len()
    );

    let document = parse_document(content)?;
    let document = match document {
        Value::String(text) => {
            debug!("Document root is a scalar, trying Base64 unwrapping");
            unwrap_base64_document(&text)?
        }
        other => other,
    };

    let nodes = proxies_from_document(document)?;
    debug!("Subscription document contains {} proxy entries", nodes.len());
    Ok(nodes)
}

fn parse_document(content: &str) -> Result<Value, ParseError> {
    serde_yaml::from_str(content).map_err(|e| ParseError::MalformedInput {
        reason: e.to_string(),
    })
}

/// Decodes a Base64-wrapped document and parses the result.
fn unwrap_base64_document(text: &str) -> Result<Value, ParseError> {
    let decoded = decode_base64(text)
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ParseError::MalformedInput {
            reason: "document root is a scalar, not a proxy list".to_string(),
        })?;

    trace!("Base64 decoded document length: {} bytes", decoded.len());

    match parse_document(&decoded)? {
        Value::String(_) => Err(ParseError::MalformedInput {
            reason: "Base64 decoded document is a scalar, not a proxy list".to_string(),
        }),
        document => Ok(document),
    }
}

fn proxies_from_document(document: Value) -> Result<Vec<ProxyNode>, ParseError> {
    match document {
        Value::Mapping(mut root) => match root.remove("proxies") {
            None | Some(Value::Null) => {
                warn!("Subscription document has no proxies");
                Ok(Vec::new())
            }
            Some(Value::Sequence(entries)) => Ok(collect_nodes(entries)),
            Some(_) => Err(ParseError::MalformedInput {
                reason: "`proxies` must be a sequence".to_string(),
            }),
        },
        Value::Sequence(entries) => {
            debug!("Document root is a bare proxy sequence");
            Ok(collect_nodes(entries))
        }
        Value::Null => {
            warn!("Subscription document is empty");
            Ok(Vec::new())
        }
        _ => Err(ParseError::MalformedInput {
            reason: "document root must be a mapping or a sequence".to_string(),
        }),
    }
}

fn collect_nodes(entries: Vec<Value>) -> Vec<ProxyNode> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Mapping(fields) => ProxyNode::new(index, fields),
            _ => {
                warn!("Proxy entry #{} is not a mapping, keeping it empty", index);
                ProxyNode::new(index, Mapping::new())
            }
        })
        .collect()
}

// ============================================================================
// Base64
// ============================================================================

/// Decodes Base64 content, trying standard and URL-safe alphabets with and
/// without padding. Whitespace (line breaks) is ignored.
pub fn decode_base64(content: &str) -> Option<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        trace!("Decoded using standard Base64");
        return Some(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64");
        return Some(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64 without padding");
        return Some(decoded);
    }

    let padded = add_base64_padding(&cleaned);
    STANDARD
        .decode(&padded)
        .or_else(|_| URL_SAFE.decode(&padded))
        .ok()
}

fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}
