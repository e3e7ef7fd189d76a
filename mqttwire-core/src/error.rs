use thiserror::Error;

use crate::{
    packet_type::PacketType,
    properties::{PropertyId, PropertyScope},
    protocol::ProtocolVersion,
    reason::DisconnectReasonCode,
    topic::TopicError,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed variable byte integer")]
    MalformedVarInt,

    #[error("Value {0} does not fit in a variable byte integer")]
    VarIntOutOfRange(u32),

    #[error("Unknown packet type {0:#x}")]
    UnknownPacketType(u8),

    #[error("Invalid fixed header flags {flags:#06b} for {packet_type}")]
    InvalidFixedHeaderFlags { packet_type: PacketType, flags: u8 },

    #[error("Remaining length {length} exceeds limit of {limit} bytes")]
    RemainingLengthExceeded { length: usize, limit: usize },

    #[error("Packet of {size} bytes exceeds maximum packet size of {limit} bytes")]
    PacketTooLarge { size: usize, limit: usize },

    #[error("Remaining length {declared} does not match the {actual} bytes of the packet body")]
    VariableHeaderLengthMismatch { declared: usize, actual: usize },

    #[error("Needed {needed} more bytes, only {remaining} left")]
    InsufficientBytes { needed: usize, remaining: usize },

    #[error("Invalid UTF-8 string in {field}")]
    InvalidUtf8String { field: &'static str },

    #[error("Field {field} is {len} bytes long, maximum is 65535")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("Invalid packet identifier for {0}")]
    InvalidPacketIdentifier(PacketType),

    #[error("Invalid QoS level {0}")]
    InvalidQoS(u8),

    #[error("Unknown reason code {code:#04x} for {packet_type}")]
    UnknownReasonCode { packet_type: PacketType, code: u8 },

    #[error("Property block declares {declared} bytes but {actual} are available or required")]
    PropertyLengthMismatch { declared: usize, actual: usize },

    #[error("Unknown property identifier {0:#x}")]
    UnknownPropertyIdentifier(u32),

    #[error("Property {0:?} must not appear more than once")]
    DuplicatePropertyNotAllowed(PropertyId),

    #[error("Property {id:?} is not allowed in {scope:?}")]
    PropertyNotAllowed { id: PropertyId, scope: PropertyScope },

    #[error("{what} is not supported by {version}")]
    ProtocolVersionMismatch {
        version: ProtocolVersion,
        what: &'static str,
    },

    #[error("Unsupported protocol {name:?} level {level}")]
    UnsupportedProtocolVersion { name: String, level: u8 },

    #[error("Invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),

    #[error("Malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Reason code a session layer should put in the DISCONNECT (or CONNACK)
    /// it sends before closing the connection because of this error.
    pub fn disconnect_reason(&self) -> DisconnectReasonCode {
        use Error::*;

        match self {
            PacketTooLarge { .. } | RemainingLengthExceeded { .. } => {
                DisconnectReasonCode::PacketTooLarge
            }
            InvalidTopic(_) => DisconnectReasonCode::TopicNameInvalid,
            DuplicatePropertyNotAllowed(_)
            | PropertyNotAllowed { .. }
            | ProtocolVersionMismatch { .. }
            | UnsupportedProtocolVersion { .. }
            | InvalidPacketIdentifier(_) => DisconnectReasonCode::ProtocolError,
            Io(_) => DisconnectReasonCode::UnspecifiedError,
            _ => DisconnectReasonCode::MalformedPacket,
        }
    }

    /// Turns an underflow inside a packet body into the length mismatch it
    /// really is, given how many bytes the fixed header declared.
    pub fn within_body(self, declared: usize) -> Self {
        match self {
            Error::InsufficientBytes { needed, remaining } => Error::VariableHeaderLengthMismatch {
                declared,
                actual: declared - remaining + needed,
            },
            e => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::ReasonCode;

    #[test]
    fn test_within_body_maps_underflow() {
        let err = Error::InsufficientBytes {
            needed: 2,
            remaining: 1,
        }
        .within_body(5);

        match err {
            Error::VariableHeaderLengthMismatch { declared, actual } => {
                assert_eq!(declared, 5);
                assert_eq!(actual, 6);
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_disconnect_reason() {
        assert_eq!(
            Error::MalformedVarInt.disconnect_reason(),
            DisconnectReasonCode::MalformedPacket
        );
        assert_eq!(
            Error::PacketTooLarge { size: 10, limit: 5 }.disconnect_reason(),
            DisconnectReasonCode::PacketTooLarge
        );
        assert!(Error::DuplicatePropertyNotAllowed(PropertyId::TopicAlias)
            .disconnect_reason()
            .is_error());
    }
}
