//! MQTT reason and return codes, one table per packet type and version.
//!
//! Every table implements [`ReasonCode`], whose error classification is a
//! pure function of the numeric value: bit 0x80 set means failure.

use core::fmt;

use bytes::{BufMut, BytesMut};

use crate::{codec::Encoder, error::Error, packet_type::PacketType, protocol::ProtocolVersion, qos::QoS};

/// Capability shared by every reason/return code table.
pub trait ReasonCode {
    /// Byte carried on the wire.
    fn value(&self) -> u8;

    /// True when the code reports a failure.
    fn is_error(&self) -> bool {
        (self.value() & 0x80) != 0
    }
}

macro_rules! reason_codes {
    (
        $(#[$meta:meta])*
        $name:ident for $packet:ident, default $default:ident {
            $($variant:ident = $value:literal => $msg:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value,)+
        }

        impl $name {
            /// Every code in this table.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl ReasonCode for $name {
            fn value(&self) -> u8 {
                *self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($value => Ok($name::$variant),)+
                    _ => Err(Error::UnknownReasonCode {
                        packet_type: PacketType::$packet,
                        code,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let msg = match self {
                    $($name::$variant => $msg,)+
                };
                f.write_str(msg)
            }
        }

        impl std::error::Error for $name {}

        impl Encoder for $name {
            fn encode(&self, buffer: &mut BytesMut) {
                buffer.put_u8(self.value());
            }

            fn encoded_size(&self) -> usize {
                1
            }
        }
    };
}

reason_codes! {
    /// CONNACK reason codes (MQTT 5.0).
    ConnectReasonCode for ConnAck, default Success {
        Success = 0x00 => "Success",
        UnspecifiedError = 0x80 => "Unspecified error",
        MalformedPacket = 0x81 => "Malformed packet",
        ProtocolError = 0x82 => "Protocol error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        UnsupportedProtocolVersion = 0x84 => "Unsupported protocol version",
        ClientIdentifierNotValid = 0x85 => "Client identifier not valid",
        BadUserNameOrPassword = 0x86 => "Bad user name or password",
        NotAuthorized = 0x87 => "Not authorized",
        ServerUnavailable = 0x88 => "Server unavailable",
        ServerBusy = 0x89 => "Server busy",
        Banned = 0x8a => "Banned",
        BadAuthenticationMethod = 0x8c => "Bad authentication method",
        TopicNameInvalid = 0x90 => "Topic name invalid",
        PacketTooLarge = 0x95 => "Packet too large",
        QuotaExceeded = 0x97 => "Quota exceeded",
        PayloadFormatInvalid = 0x99 => "Payload format invalid",
        RetainNotSupported = 0x9a => "Retain not supported",
        QoSNotSupported = 0x9b => "QoS not supported",
        UseAnotherServer = 0x9c => "Use another server",
        ServerMoved = 0x9d => "Server moved",
        ConnectionRateExceeded = 0x9f => "Connection rate exceeded",
    }
}

reason_codes! {
    /// CONNACK return codes (MQTT 3.1 and 3.1.1).
    ///
    /// Refusals predate the 0x80 convention, so none of them is an error by
    /// [`ReasonCode::is_error`]; use [`ConnectReturnCode::is_accepted`].
    ConnectReturnCode for ConnAck, default Accepted {
        Accepted = 0x00 => "Connection accepted",
        UnacceptableProtocolVersion = 0x01 => "Unacceptable protocol version",
        IdentifierRejected = 0x02 => "Identifier rejected",
        ServerUnavailable = 0x03 => "Server unavailable",
        BadUserNameOrPassword = 0x04 => "Bad user name or password",
        NotAuthorized = 0x05 => "Not authorized",
    }
}

impl ConnectReturnCode {
    pub fn is_accepted(&self) -> bool {
        *self == ConnectReturnCode::Accepted
    }
}

impl From<ConnectReasonCode> for ConnectReturnCode {
    fn from(reason: ConnectReasonCode) -> Self {
        match reason {
            ConnectReasonCode::Success => ConnectReturnCode::Accepted,
            ConnectReasonCode::UnsupportedProtocolVersion => {
                ConnectReturnCode::UnacceptableProtocolVersion
            }
            ConnectReasonCode::ClientIdentifierNotValid => ConnectReturnCode::IdentifierRejected,
            ConnectReasonCode::BadUserNameOrPassword => ConnectReturnCode::BadUserNameOrPassword,
            ConnectReasonCode::NotAuthorized | ConnectReasonCode::Banned => {
                ConnectReturnCode::NotAuthorized
            }
            _ => ConnectReturnCode::ServerUnavailable,
        }
    }
}

reason_codes! {
    /// PUBACK reason codes.
    PubAckReasonCode for PubAck, default Success {
        Success = 0x00 => "Success",
        NoMatchingSubscribers = 0x10 => "No matching subscribers",
        UnspecifiedError = 0x80 => "Unspecified error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        NotAuthorized = 0x87 => "Not authorized",
        TopicNameInvalid = 0x90 => "Topic name invalid",
        PacketIdentifierInUse = 0x91 => "Packet identifier in use",
        QuotaExceeded = 0x97 => "Quota exceeded",
        PayloadFormatInvalid = 0x99 => "Payload format invalid",
    }
}

reason_codes! {
    /// PUBREC reason codes.
    PubRecReasonCode for PubRec, default Success {
        Success = 0x00 => "Success",
        NoMatchingSubscribers = 0x10 => "No matching subscribers",
        UnspecifiedError = 0x80 => "Unspecified error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        NotAuthorized = 0x87 => "Not authorized",
        TopicNameInvalid = 0x90 => "Topic name invalid",
        PacketIdentifierInUse = 0x91 => "Packet identifier in use",
        QuotaExceeded = 0x97 => "Quota exceeded",
        PayloadFormatInvalid = 0x99 => "Payload format invalid",
    }
}

reason_codes! {
    /// PUBREL reason codes.
    PubRelReasonCode for PubRel, default Success {
        Success = 0x00 => "Success",
        PacketIdentifierNotFound = 0x92 => "Packet identifier not found",
    }
}

reason_codes! {
    /// PUBCOMP reason codes.
    PubCompReasonCode for PubComp, default Success {
        Success = 0x00 => "Success",
        PacketIdentifierNotFound = 0x92 => "Packet identifier not found",
    }
}

reason_codes! {
    /// SUBACK reason codes (MQTT 5.0).
    SubAckReasonCode for SubAck, default GrantedQoS0 {
        GrantedQoS0 = 0x00 => "Granted QoS 0",
        GrantedQoS1 = 0x01 => "Granted QoS 1",
        GrantedQoS2 = 0x02 => "Granted QoS 2",
        UnspecifiedError = 0x80 => "Unspecified error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        NotAuthorized = 0x87 => "Not authorized",
        TopicFilterInvalid = 0x8f => "Topic filter invalid",
        PacketIdentifierInUse = 0x91 => "Packet identifier in use",
        QuotaExceeded = 0x97 => "Quota exceeded",
        SharedSubscriptionsNotSupported = 0x9e => "Shared subscriptions not supported",
        SubscriptionIdentifiersNotSupported = 0xa1 => "Subscription identifiers not supported",
        WildcardSubscriptionsNotSupported = 0xa2 => "Wildcard subscriptions not supported",
    }
}

impl SubAckReasonCode {
    pub fn granted(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => SubAckReasonCode::GrantedQoS0,
            QoS::AtLeastOnce => SubAckReasonCode::GrantedQoS1,
            QoS::ExactlyOnce => SubAckReasonCode::GrantedQoS2,
        }
    }
}

reason_codes! {
    /// SUBACK return codes (MQTT 3.1 and 3.1.1).
    SubAckReturnCode for SubAck, default SuccessMaximumQoS0 {
        SuccessMaximumQoS0 = 0x00 => "Success, maximum QoS 0",
        SuccessMaximumQoS1 = 0x01 => "Success, maximum QoS 1",
        SuccessMaximumQoS2 = 0x02 => "Success, maximum QoS 2",
        Failure = 0x80 => "Failure",
    }
}

impl SubAckReturnCode {
    pub fn granted(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => SubAckReturnCode::SuccessMaximumQoS0,
            QoS::AtLeastOnce => SubAckReturnCode::SuccessMaximumQoS1,
            QoS::ExactlyOnce => SubAckReturnCode::SuccessMaximumQoS2,
        }
    }
}

reason_codes! {
    /// UNSUBACK reason codes (MQTT 5.0).
    UnsubAckReasonCode for UnsubAck, default Success {
        Success = 0x00 => "Success",
        NoSubscriptionExisted = 0x11 => "No subscription existed",
        UnspecifiedError = 0x80 => "Unspecified error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        NotAuthorized = 0x87 => "Not authorized",
        TopicFilterInvalid = 0x8f => "Topic filter invalid",
        PacketIdentifierInUse = 0x91 => "Packet identifier in use",
    }
}

reason_codes! {
    /// DISCONNECT reason codes (MQTT 5.0).
    DisconnectReasonCode for Disconnect, default NormalDisconnection {
        NormalDisconnection = 0x00 => "Normal disconnection",
        DisconnectWithWillMessage = 0x04 => "Disconnect with will message",
        UnspecifiedError = 0x80 => "Unspecified error",
        MalformedPacket = 0x81 => "Malformed packet",
        ProtocolError = 0x82 => "Protocol error",
        ImplementationSpecificError = 0x83 => "Implementation specific error",
        NotAuthorized = 0x87 => "Not authorized",
        ServerBusy = 0x89 => "Server busy",
        ServerShuttingDown = 0x8b => "Server shutting down",
        KeepAliveTimeout = 0x8d => "Keep alive timeout",
        SessionTakenOver = 0x8e => "Session taken over",
        TopicFilterInvalid = 0x8f => "Topic filter invalid",
        TopicNameInvalid = 0x90 => "Topic name invalid",
        ReceiveMaximumExceeded = 0x93 => "Receive maximum exceeded",
        TopicAliasInvalid = 0x94 => "Topic alias invalid",
        PacketTooLarge = 0x95 => "Packet too large",
        MessageRateTooHigh = 0x96 => "Message rate too high",
        QuotaExceeded = 0x97 => "Quota exceeded",
        AdministrativeAction = 0x98 => "Administrative action",
        PayloadFormatInvalid = 0x99 => "Payload format invalid",
        RetainNotSupported = 0x9a => "Retain not supported",
        QoSNotSupported = 0x9b => "QoS not supported",
        UseAnotherServer = 0x9c => "Use another server",
        ServerMoved = 0x9d => "Server moved",
        SharedSubscriptionsNotSupported = 0x9e => "Shared subscriptions not supported",
        ConnectionRateExceeded = 0x9f => "Connection rate exceeded",
        MaximumConnectTime = 0xa0 => "Maximum connect time",
        SubscriptionIdentifiersNotSupported = 0xa1 => "Subscription identifiers not supported",
        WildcardSubscriptionsNotSupported = 0xa2 => "Wildcard subscriptions not supported",
    }
}

reason_codes! {
    /// AUTH reason codes (MQTT 5.0).
    AuthReasonCode for Auth, default Success {
        Success = 0x00 => "Success",
        ContinueAuthentication = 0x18 => "Continue authentication",
        ReAuthenticate = 0x19 => "Re-authenticate",
    }
}

/// CONNACK code: a legacy return code before 5.0, a reason code after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnAckCode {
    Legacy(ConnectReturnCode),
    Reason(ConnectReasonCode),
}

impl ConnAckCode {
    pub fn decode(code: u8, version: ProtocolVersion) -> crate::Result<Self> {
        if version.is_v5() {
            Ok(ConnAckCode::Reason(code.try_into()?))
        } else {
            Ok(ConnAckCode::Legacy(code.try_into()?))
        }
    }

    /// Whether the connection was accepted, regardless of version.
    pub fn is_success(&self) -> bool {
        self.value() == 0x00
    }
}

impl ReasonCode for ConnAckCode {
    fn value(&self) -> u8 {
        match self {
            ConnAckCode::Legacy(c) => c.value(),
            ConnAckCode::Reason(c) => c.value(),
        }
    }
}

/// SUBACK code: a legacy return code before 5.0, a reason code after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAckCode {
    Legacy(SubAckReturnCode),
    Reason(SubAckReasonCode),
}

impl SubAckCode {
    pub fn decode(code: u8, version: ProtocolVersion) -> crate::Result<Self> {
        if version.is_v5() {
            Ok(SubAckCode::Reason(code.try_into()?))
        } else {
            Ok(SubAckCode::Legacy(code.try_into()?))
        }
    }

    /// Granted QoS for the matching subscription, or `None` on failure.
    pub fn granted_qos(&self) -> Option<QoS> {
        match self.value() {
            0x00 => Some(QoS::AtMostOnce),
            0x01 => Some(QoS::AtLeastOnce),
            0x02 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

impl ReasonCode for SubAckCode {
    fn value(&self) -> u8 {
        match self {
            SubAckCode::Legacy(c) => c.value(),
            SubAckCode::Reason(c) => c.value(),
        }
    }
}

/// Result of a registry lookup: a code from any of the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyReasonCode {
    ConnAck(ConnAckCode),
    PubAck(PubAckReasonCode),
    PubRec(PubRecReasonCode),
    PubRel(PubRelReasonCode),
    PubComp(PubCompReasonCode),
    SubAck(SubAckCode),
    UnsubAck(UnsubAckReasonCode),
    Disconnect(DisconnectReasonCode),
    Auth(AuthReasonCode),
}

impl ReasonCode for AnyReasonCode {
    fn value(&self) -> u8 {
        use AnyReasonCode::*;

        match self {
            ConnAck(c) => c.value(),
            PubAck(c) => c.value(),
            PubRec(c) => c.value(),
            PubRel(c) => c.value(),
            PubComp(c) => c.value(),
            SubAck(c) => c.value(),
            UnsubAck(c) => c.value(),
            Disconnect(c) => c.value(),
            Auth(c) => c.value(),
        }
    }
}

/// Looks up `code` in the table owned by `packet_type` under `version`.
///
/// Packet types that carry no code under `version` (CONNECT, PUBLISH, any
/// acknowledgement other than CONNACK and SUBACK before 5.0, ...) have no
/// table, so every byte fails with [`Error::UnknownReasonCode`].
pub fn lookup(
    packet_type: PacketType,
    version: ProtocolVersion,
    code: u8,
) -> crate::Result<AnyReasonCode> {
    let unknown = Error::UnknownReasonCode { packet_type, code };

    let reason = match packet_type {
        PacketType::ConnAck => AnyReasonCode::ConnAck(ConnAckCode::decode(code, version)?),
        PacketType::SubAck => AnyReasonCode::SubAck(SubAckCode::decode(code, version)?),
        _ if !version.is_v5() => return Err(unknown),
        PacketType::PubAck => AnyReasonCode::PubAck(code.try_into()?),
        PacketType::PubRec => AnyReasonCode::PubRec(code.try_into()?),
        PacketType::PubRel => AnyReasonCode::PubRel(code.try_into()?),
        PacketType::PubComp => AnyReasonCode::PubComp(code.try_into()?),
        PacketType::UnsubAck => AnyReasonCode::UnsubAck(code.try_into()?),
        PacketType::Disconnect => AnyReasonCode::Disconnect(code.try_into()?),
        PacketType::Auth => AnyReasonCode::Auth(code.try_into()?),
        _ => return Err(unknown),
    };

    Ok(reason)
}
