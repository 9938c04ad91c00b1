//! Canonical latency-engine payload.
//!
//! [`to_payload`] maps decoded outbounds into the versioned JSON shape the
//! latency engine consumes. The mapping renames and flattens fields but never
//! changes a value: absent fields stay absent, list order is preserved and
//! header names keep their case.
//!
//! [`parse_payload`] performs the checks the engine applies when it receives
//! a payload, so producers can self-check their output.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::outbound::{
    Hysteria2Obfs, Hysteria2Outbound, Outbound, UnsupportedOutbound, VLessOutbound, VMessOutbound,
};
use crate::config::shared::{OutboundRealityConfig, OutboundTlsConfig, PortSpec, Transport};
use crate::config::validation::is_valid_port;

/// Version stamped on every payload produced by this mapper.
pub const SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Payload Types
// ============================================================================

/// The payload handed to the latency engine on initialisation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LatencyInitPayload {
    pub schema_version: u32,
    pub outbounds: Vec<CanonicalOutbound>,
}

impl LatencyInitPayload {
    /// Serialize the payload to a compact JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the payload to a pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One outbound in canonical form. The engine correlates results by `tag`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CanonicalOutbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    pub protocol: String,

    pub settings: CanonicalSettings,
}

/// Flattened protocol settings. Only fields the outbound carries are set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_str: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_mbps: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_mbps: Option<u32>,

    /// Port specs exactly as written (`"443"`, `"9000-9100"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ports: Option<Vec<String>>,

    /// Raw duration string (`"20s"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_interval: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<CanonicalObfs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<CanonicalTls>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<CanonicalTransport>,

    /// Source keys of an entry with an unknown protocol, passed through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalObfs {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub obfs_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality: Option<CanonicalReality>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalReality {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalTransport {
    #[serde(rename = "type")]
    pub transport_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Header names keep their case; ordered for stable output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_early_data: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<String>,
}

// ============================================================================
// Mapping
// ============================================================================

/// Maps outbounds to the canonical payload, one entry per outbound in input
/// order. Total: outbounds the validator would reject are mapped as well.
pub fn to_payload(outbounds: &[Outbound]) -> LatencyInitPayload {
    let outbounds: Vec<CanonicalOutbound> = outbounds.iter().map(to_canonical).collect();
    debug!(
        "Mapped {} outbounds to schema version {}",
        outbounds.len(),
        SCHEMA_VERSION
    );

    LatencyInitPayload {
        schema_version: SCHEMA_VERSION,
        outbounds,
    }
}

fn to_canonical(outbound: &Outbound) -> CanonicalOutbound {
    let settings = match outbound {
        Outbound::VLess(o) => vless_settings(o),
        Outbound::VMess(o) => vmess_settings(o),
        Outbound::Hysteria2(o) => hysteria2_settings(o),
        Outbound::Unsupported(o) => unsupported_settings(o),
    };

    CanonicalOutbound {
        tag: outbound.tag().map(ToString::to_string),
        protocol: outbound.kind().to_string(),
        settings,
    }
}

fn vless_settings(o: &VLessOutbound) -> CanonicalSettings {
    CanonicalSettings {
        address: o.server.clone(),
        port: o.server_port,
        uuid: o.uuid.clone(),
        flow: o.flow.clone(),
        tls: o.tls.as_ref().map(canonical_tls),
        transport: o.transport.as_ref().map(canonical_transport),
        ..Default::default()
    }
}

fn vmess_settings(o: &VMessOutbound) -> CanonicalSettings {
    CanonicalSettings {
        address: o.server.clone(),
        port: o.server_port,
        uuid: o.uuid.clone(),
        alter_id: o.alter_id,
        security: o.security.clone(),
        tls: o.tls.as_ref().map(canonical_tls),
        transport: o.transport.as_ref().map(canonical_transport),
        ..Default::default()
    }
}

fn hysteria2_settings(o: &Hysteria2Outbound) -> CanonicalSettings {
    CanonicalSettings {
        address: o.server.clone(),
        port: o.server_port,
        password: o.password.clone(),
        auth_str: o.auth_str.clone(),
        up_mbps: o.up_mbps,
        down_mbps: o.down_mbps,
        server_ports: o
            .server_ports
            .as_ref()
            .map(|ports| ports.iter().map(PortSpec::as_str).map(String::from).collect()),
        hop_interval: o.hop_interval.as_ref().map(|d| d.as_str().to_string()),
        obfs: o.obfs.as_ref().map(canonical_obfs),
        tls: o.tls.as_ref().map(canonical_tls),
        ..Default::default()
    }
}

fn unsupported_settings(o: &UnsupportedOutbound) -> CanonicalSettings {
    CanonicalSettings {
        address: o.server.clone(),
        port: o.server_port,
        raw: (!o.raw.is_empty()).then(|| o.raw.clone()),
        ..Default::default()
    }
}

fn canonical_obfs(obfs: &Hysteria2Obfs) -> CanonicalObfs {
    CanonicalObfs {
        obfs_type: obfs.obfs_type.clone(),
        password: obfs.password.clone(),
    }
}

fn canonical_tls(tls: &OutboundTlsConfig) -> CanonicalTls {
    CanonicalTls {
        enabled: tls.enabled,
        server_name: tls.server_name.clone(),
        insecure: tls.insecure,
        alpn: tls.alpn.clone(),
        fingerprint: tls.fingerprint.clone(),
        reality: tls.reality.as_ref().map(canonical_reality),
    }
}

fn canonical_reality(reality: &OutboundRealityConfig) -> CanonicalReality {
    CanonicalReality {
        enabled: reality.enabled,
        public_key: reality.public_key.clone(),
        short_id: reality.short_id.clone(),
    }
}

fn canonical_transport(transport: &Transport) -> CanonicalTransport {
    let base = CanonicalTransport {
        transport_type: transport.kind().to_string(),
        ..Default::default()
    };

    match transport {
        Transport::WebSocket(ws) => CanonicalTransport {
            path: ws.path.clone(),
            headers: ws.headers.as_ref().map(|headers| {
                headers
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            }),
            max_early_data: ws.max_early_data,
            early_data_header_name: ws.early_data_header_name.clone(),
            ..base
        },
        Transport::Grpc(grpc) => CanonicalTransport {
            service_name: grpc.service_name.clone(),
            ..base
        },
        Transport::Http2(h2) => CanonicalTransport {
            host: h2.host.clone(),
            path: h2.path.clone(),
            ..base
        },
        Transport::Other(_) => base,
    }
}

// ============================================================================
// Consumer-Side Checks
// ============================================================================

/// Reasons the latency engine refuses a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Not JSON, or not the payload shape (including unknown fields)
    InvalidJson { reason: String },
    /// `schemaVersion` differs from [`SCHEMA_VERSION`]
    UnsupportedSchemaVersion { found: u32 },
    /// The payload carries no outbounds
    EmptyOutbounds,
    /// Outbounds lacking a tag, protocol, address or usable port; one entry
    /// per problem, e.g. `outbounds[0].tag missing`
    MissingFields(Vec<String>),
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::InvalidJson { reason } => {
                write!(f, "invalid payload JSON: {}", reason)
            }
            ContractError::UnsupportedSchemaVersion { found } => {
                write!(
                    f,
                    "unsupported schema version {} (expected {})",
                    found, SCHEMA_VERSION
                )
            }
            ContractError::EmptyOutbounds => write!(f, "payload contains no outbounds"),
            ContractError::MissingFields(missing) => {
                write!(f, "payload has missing fields: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for ContractError {}

/// Parses and checks a payload the way the latency engine does.
pub fn parse_payload(json: &str) -> Result<LatencyInitPayload, ContractError> {
    let payload: LatencyInitPayload =
        serde_json::from_str(json).map_err(|e| ContractError::InvalidJson {
            reason: e.to_string(),
        })?;

    if payload.schema_version != SCHEMA_VERSION {
        return Err(ContractError::UnsupportedSchemaVersion {
            found: payload.schema_version,
        });
    }

    if payload.outbounds.is_empty() {
        return Err(ContractError::EmptyOutbounds);
    }

    let missing = missing_fields(&payload.outbounds);
    if !missing.is_empty() {
        return Err(ContractError::MissingFields(missing));
    }

    Ok(payload)
}

/// Every outbound needs a non-blank `tag`, `protocol` and `settings.address`,
/// and a `settings.port` in `1..=65535`.
fn missing_fields(outbounds: &[CanonicalOutbound]) -> Vec<String> {
    let blank = |value: Option<&str>| value.is_none_or(|v| v.trim().is_empty());
    let mut missing = Vec::new();

    for (idx, outbound) in outbounds.iter().enumerate() {
        if blank(outbound.tag.as_deref()) {
            missing.push(format!("outbounds[{}].tag missing", idx));
        }
        if blank(Some(outbound.protocol.as_str())) {
            missing.push(format!("outbounds[{}].protocol missing", idx));
        }
        if blank(outbound.settings.address.as_deref()) {
            missing.push(format!("outbounds[{}].settings.address missing", idx));
        }
        if !outbound.settings.port.is_some_and(is_valid_port) {
            missing.push(format!("outbounds[{}].settings.port missing", idx));
        }
    }

    missing
}
