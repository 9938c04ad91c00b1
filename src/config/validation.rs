//! Outbound validation module.
//!
//! Decoding is tolerant and always yields an outbound; this module is the
//! separate pass that reports what a decoded outbound is missing. It never
//! mutates or filters its input, and deciding what to do with the report is
//! left to the caller.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::config::outbound::{Hysteria2Outbound, Outbound, UnsupportedOutbound};
use crate::config::shared::OutboundTlsConfig;

// ============================================================================
// Violation Types
// ============================================================================

/// A required field that may be missing from an outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Tag,
    Server,
    Port,
    Uuid,
    Password,
    ObfsPassword,
    RealityPublicKey,
    RealityShortId,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tag => "tag",
            Self::Server => "server",
            Self::Port => "port",
            Self::Uuid => "uuid",
            Self::Password => "password",
            Self::ObfsPassword => "obfs password",
            Self::RealityPublicKey => "reality public key",
            Self::RealityShortId => "reality short id",
        };
        f.write_str(name)
    }
}

/// One problem found in one outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A required field is absent or empty.
    MissingRequiredField {
        /// Tag of the outbound, or its position when it has none.
        outbound: String,
        /// The missing field.
        field: RequiredField,
    },

    /// The entry's `type` matched no known protocol.
    UnsupportedProtocol {
        /// Tag of the outbound, or its position when it has none.
        outbound: String,
        /// The `type` string as written, `None` when the entry had none.
        kind: Option<String>,
    },

    /// A port is present but outside `1..=65535`.
    PortOutOfRange {
        /// Tag of the outbound, or its position when it has none.
        outbound: String,
        /// The port as decoded.
        port: u32,
    },

    /// Two or more outbounds share a tag.
    DuplicateTag {
        /// The duplicated tag.
        tag: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredField { outbound, field } => {
                write!(f, "{outbound}: {field} is required")
            }
            Self::UnsupportedProtocol {
                outbound,
                kind: Some(kind),
            } => {
                write!(f, "{outbound}: unsupported protocol type '{kind}'")
            }
            Self::UnsupportedProtocol {
                outbound,
                kind: None,
            } => {
                write!(f, "{outbound}: protocol type is missing")
            }
            Self::PortOutOfRange { outbound, port } => {
                write!(f, "{outbound}: port {port} is out of range")
            }
            Self::DuplicateTag { tag } => {
                write!(f, "duplicate tag '{tag}'")
            }
        }
    }
}

impl std::error::Error for Violation {}

// ============================================================================
// Validation Result
// ============================================================================

/// Result of validating a list of outbounds.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Violations in outbound order.
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no violations).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Check if validation found violations.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.violations.is_empty()
    }

    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Append the violations of another pass, keeping order.
    pub fn extend(&mut self, other: ValidationResult) {
        self.violations.extend(other.violations);
    }

    /// Human-readable messages, one per violation.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Log all violations using tracing.
    pub fn log_violations(&self) {
        for violation in &self.violations {
            warn!(violation = %violation, "outbound validation violation");
        }
    }
}

// ============================================================================
// Validation Implementation
// ============================================================================

/// Validate outbounds and return the violation messages.
///
/// Every outbound with an absent or empty `server` produces a message
/// containing `server is required`, whatever its protocol.
#[must_use]
pub fn validate(outbounds: &[Outbound]) -> Vec<String> {
    validate_outbounds(outbounds).messages()
}

/// Validate outbounds and return structured violations.
///
/// Checks, per outbound:
/// - `tag` and `server` present and non-empty
/// - a port in `1..=65535` (or, for hysteria2, a non-empty port-hopping list)
/// - protocol identity: `uuid` for vless/vmess, `password` for hysteria2
/// - obfs password when hysteria2 obfuscation is configured
/// - Reality public key and short id when Reality is enabled
#[must_use]
pub fn validate_outbounds(outbounds: &[Outbound]) -> ValidationResult {
    let mut result = ValidationResult::new();

    debug!(count = outbounds.len(), "starting outbound validation");

    for (index, outbound) in outbounds.iter().enumerate() {
        let label = outbound_label(outbound, index);
        check_common_fields(outbound, &label, &mut result);

        match outbound {
            Outbound::VLess(o) => {
                check_uuid(o.uuid.as_deref(), &label, &mut result);
            }
            Outbound::VMess(o) => {
                check_uuid(o.uuid.as_deref(), &label, &mut result);
            }
            Outbound::Hysteria2(o) => {
                check_hysteria2(o, &label, &mut result);
            }
            Outbound::Unsupported(o) => {
                check_unsupported(o, &label, &mut result);
            }
        }

        if let Some(tls) = outbound.tls() {
            check_reality(tls, &label, &mut result);
        }
    }

    if result.is_ok() {
        debug!("outbound validation passed");
    } else {
        debug!(
            violation_count = result.violation_count(),
            "outbound validation found violations"
        );
    }

    result
}

/// Report tags used by more than one outbound.
///
/// Not part of [`validate`]: tag uniqueness is a policy of the caller.
/// Each duplicated tag is reported once, in order of its second appearance.
#[must_use]
pub fn check_unique_tags(outbounds: &[Outbound]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for tag in outbounds.iter().filter_map(Outbound::tag) {
        if !seen.insert(tag) && reported.insert(tag) {
            result.add_violation(Violation::DuplicateTag {
                tag: tag.to_string(),
            });
        }
    }

    result
}

/// Tag of the outbound, or `outbound #<n>` (1-based) when it has none.
fn outbound_label(outbound: &Outbound, index: usize) -> String {
    match outbound.tag() {
        Some(tag) if !tag.trim().is_empty() => tag.to_string(),
        _ => format!("outbound #{}", index + 1),
    }
}

/// Ports the latency engine accepts.
pub fn is_valid_port(port: u32) -> bool {
    (1..=65535).contains(&port)
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn missing(label: &str, field: RequiredField, result: &mut ValidationResult) {
    result.add_violation(Violation::MissingRequiredField {
        outbound: label.to_string(),
        field,
    });
}

fn check_common_fields(outbound: &Outbound, label: &str, result: &mut ValidationResult) {
    if is_blank(outbound.tag()) {
        missing(label, RequiredField::Tag, result);
    }

    if is_blank(outbound.server()) {
        missing(label, RequiredField::Server, result);
    }

    let has_port_hopping = match outbound {
        Outbound::Hysteria2(o) => o.server_ports.as_ref().is_some_and(|p| !p.is_empty()),
        _ => false,
    };
    match outbound.server_port() {
        None if !has_port_hopping => missing(label, RequiredField::Port, result),
        Some(port) if !is_valid_port(port) => {
            result.add_violation(Violation::PortOutOfRange {
                outbound: label.to_string(),
                port,
            });
        }
        _ => {}
    }
}

fn check_uuid(uuid: Option<&str>, label: &str, result: &mut ValidationResult) {
    if is_blank(uuid) {
        missing(label, RequiredField::Uuid, result);
    }
}

fn check_hysteria2(outbound: &Hysteria2Outbound, label: &str, result: &mut ValidationResult) {
    if is_blank(outbound.password.as_deref()) && is_blank(outbound.auth_str.as_deref()) {
        missing(label, RequiredField::Password, result);
    }

    if let Some(obfs) = &outbound.obfs
        && is_blank(obfs.password.as_deref())
    {
        missing(label, RequiredField::ObfsPassword, result);
    }
}

fn check_unsupported(outbound: &UnsupportedOutbound, label: &str, result: &mut ValidationResult) {
    let kind = outbound.kind.clone().filter(|k| !k.is_empty());
    result.add_violation(Violation::UnsupportedProtocol {
        outbound: label.to_string(),
        kind,
    });
}

fn check_reality(tls: &OutboundTlsConfig, label: &str, result: &mut ValidationResult) {
    let Some(reality) = tls.enabled_reality() else {
        return;
    };

    if is_blank(reality.public_key.as_deref()) {
        missing(label, RequiredField::RealityPublicKey, result);
    }
    if is_blank(reality.short_id.as_deref()) {
        missing(label, RequiredField::RealityShortId, result);
    }
}
