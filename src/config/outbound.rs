use std::fmt;

use serde_json::{Map, Value};

use crate::config::shared::{OutboundTlsConfig, PortSpec, RawDuration, Transport};

// ============================================================================
// Protocol Kinds
// ============================================================================

/// Protocol kinds the decoder understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    VLess,
    VMess,
    Hysteria2,
}

impl ProtocolKind {
    /// All supported kinds, in registration order.
    pub const ALL: [ProtocolKind; 3] = [
        ProtocolKind::VLess,
        ProtocolKind::VMess,
        ProtocolKind::Hysteria2,
    ];

    /// The discriminator string used by subscriptions and by the contract.
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolKind::VLess => "vless",
            ProtocolKind::VMess => "vmess",
            ProtocolKind::Hysteria2 => "hysteria2",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Outbound Enum
// ============================================================================

/// One proxy server definition decoded from a subscription.
///
/// Each variant carries only the fields meaningful to its protocol. Fields
/// missing from the source are `None`, never a placeholder value.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// VLESS outbound
    VLess(VLessOutbound),
    /// VMess outbound
    VMess(VMessOutbound),
    /// Hysteria2 outbound
    Hysteria2(Hysteria2Outbound),
    /// Entry whose `type` matched no registered decoder
    Unsupported(UnsupportedOutbound),
}

impl Outbound {
    /// Discriminator string; the verbatim source string for unsupported entries.
    pub fn kind(&self) -> &str {
        match self {
            Outbound::VLess(_) => ProtocolKind::VLess.as_str(),
            Outbound::VMess(_) => ProtocolKind::VMess.as_str(),
            Outbound::Hysteria2(_) => ProtocolKind::Hysteria2.as_str(),
            Outbound::Unsupported(o) => o.kind.as_deref().unwrap_or(""),
        }
    }

    pub fn protocol_kind(&self) -> Option<ProtocolKind> {
        match self {
            Outbound::VLess(_) => Some(ProtocolKind::VLess),
            Outbound::VMess(_) => Some(ProtocolKind::VMess),
            Outbound::Hysteria2(_) => Some(ProtocolKind::Hysteria2),
            Outbound::Unsupported(_) => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Outbound::VLess(o) => o.tag.as_deref(),
            Outbound::VMess(o) => o.tag.as_deref(),
            Outbound::Hysteria2(o) => o.tag.as_deref(),
            Outbound::Unsupported(o) => o.tag.as_deref(),
        }
    }

    pub fn server(&self) -> Option<&str> {
        match self {
            Outbound::VLess(o) => o.server.as_deref(),
            Outbound::VMess(o) => o.server.as_deref(),
            Outbound::Hysteria2(o) => o.server.as_deref(),
            Outbound::Unsupported(o) => o.server.as_deref(),
        }
    }

    pub fn server_port(&self) -> Option<u32> {
        match self {
            Outbound::VLess(o) => o.server_port,
            Outbound::VMess(o) => o.server_port,
            Outbound::Hysteria2(o) => o.server_port,
            Outbound::Unsupported(o) => o.server_port,
        }
    }

    pub fn tls(&self) -> Option<&OutboundTlsConfig> {
        match self {
            Outbound::VLess(o) => o.tls.as_ref(),
            Outbound::VMess(o) => o.tls.as_ref(),
            Outbound::Hysteria2(o) => o.tls.as_ref(),
            Outbound::Unsupported(_) => None,
        }
    }
}

// ============================================================================
// Outbound Types
// ============================================================================

/// VLESS outbound configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VLessOutbound {
    /// Tag of the outbound
    pub tag: Option<String>,

    /// Server address (required)
    pub server: Option<String>,

    /// Server port (required)
    pub server_port: Option<u32>,

    /// VLESS UUID (required)
    pub uuid: Option<String>,

    /// VLESS flow (e.g., "xtls-rprx-vision")
    pub flow: Option<String>,

    /// TLS configuration
    pub tls: Option<OutboundTlsConfig>,

    /// V2Ray transport configuration
    pub transport: Option<Transport>,
}

/// VMess outbound configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VMessOutbound {
    /// Tag of the outbound
    pub tag: Option<String>,

    /// Server address (required)
    pub server: Option<String>,

    /// Server port (required)
    pub server_port: Option<u32>,

    /// VMess user UUID (required)
    pub uuid: Option<String>,

    /// Alter ID (0 = AEAD, 1 = legacy)
    pub alter_id: Option<u32>,

    /// Security: auto, none, zero, aes-128-gcm, chacha20-poly1305
    pub security: Option<String>,

    /// TLS configuration
    pub tls: Option<OutboundTlsConfig>,

    /// V2Ray transport configuration
    pub transport: Option<Transport>,
}

/// Hysteria2 outbound configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hysteria2Outbound {
    /// Tag of the outbound
    pub tag: Option<String>,

    /// Server address (required)
    pub server: Option<String>,

    /// Server port
    pub server_port: Option<u32>,

    /// Port hopping list, in subscription order
    pub server_ports: Option<Vec<PortSpec>>,

    /// Port hopping interval
    pub hop_interval: Option<RawDuration>,

    /// Upload bandwidth in Mbps
    pub up_mbps: Option<u32>,

    /// Download bandwidth in Mbps
    pub down_mbps: Option<u32>,

    /// Obfuscation configuration
    pub obfs: Option<Hysteria2Obfs>,

    /// Authentication password
    pub password: Option<String>,

    /// Legacy authentication string
    pub auth_str: Option<String>,

    /// TLS configuration
    pub tls: Option<OutboundTlsConfig>,
}

/// Hysteria2 obfuscation configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hysteria2Obfs {
    /// Obfuscation type (e.g. "salamander")
    pub obfs_type: Option<String>,

    /// Obfuscation password
    pub password: Option<String>,
}

/// An entry with an unknown or missing `type`, passed through opaquely.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnsupportedOutbound {
    /// The `type` string exactly as written, if there was one
    pub kind: Option<String>,

    pub tag: Option<String>,

    pub server: Option<String>,

    pub server_port: Option<u32>,

    /// Remaining source keys, converted to JSON values
    pub raw: Map<String, Value>,
}

// ============================================================================
// Constructors
// ============================================================================

impl VLessOutbound {
    /// Create a new VLESS outbound with required fields
    pub fn new(
        tag: impl Into<String>,
        server: impl Into<String>,
        server_port: u16,
        uuid: impl Into<String>,
    ) -> Self {
        Self {
            tag: Some(tag.into()),
            server: Some(server.into()),
            server_port: Some(u32::from(server_port)),
            uuid: Some(uuid.into()),
            ..Default::default()
        }
    }

    /// Set VLESS flow
    pub fn with_flow(mut self, flow: impl Into<String>) -> Self {
        self.flow = Some(flow.into());
        self
    }

    pub fn with_tls(mut self, tls: OutboundTlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl VMessOutbound {
    /// Create a new VMess outbound with required fields
    pub fn new(
        tag: impl Into<String>,
        server: impl Into<String>,
        server_port: u16,
        uuid: impl Into<String>,
    ) -> Self {
        Self {
            tag: Some(tag.into()),
            server: Some(server.into()),
            server_port: Some(u32::from(server_port)),
            uuid: Some(uuid.into()),
            ..Default::default()
        }
    }

    /// Set security method
    pub fn with_security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl Hysteria2Outbound {
    /// Create a new Hysteria2 outbound with required fields
    pub fn new(
        tag: impl Into<String>,
        server: impl Into<String>,
        server_port: u16,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tag: Some(tag.into()),
            server: Some(server.into()),
            server_port: Some(u32::from(server_port)),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn with_obfs(mut self, obfs_type: impl Into<String>, password: impl Into<String>) -> Self {
        self.obfs = Some(Hysteria2Obfs {
            obfs_type: Some(obfs_type.into()),
            password: Some(password.into()),
        });
        self
    }

    pub fn with_server_ports<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PortSpec>,
    {
        self.server_ports = Some(ports.into_iter().map(Into::into).collect());
        self
    }
}
