//! Typed outbound model.
//!
//! A subscription decodes into a list of [`Outbound`] values: one closed
//! variant per supported protocol, plus an opaque variant for entries whose
//! protocol is unknown. The model carries no serialization of its own; the
//! external representation lives in [`crate::contract`].

pub mod outbound;
pub mod shared;
pub mod validation;

pub use outbound::{
    Hysteria2Obfs, Hysteria2Outbound, Outbound, ProtocolKind, UnsupportedOutbound, VLessOutbound,
    VMessOutbound,
};
pub use shared::{
    GrpcTransport, HeaderMap, Http2Transport, OutboundRealityConfig, OutboundTlsConfig, PortSpec,
    RawDuration, Transport, WebSocketTransport,
};
pub use validation::{
    RequiredField, ValidationResult, Violation, check_unique_tags, is_valid_port, validate,
    validate_outbounds,
};
