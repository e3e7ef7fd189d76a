pub mod auth;
pub mod codec;
pub mod config;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod fixed_header;
pub mod ping;
pub mod pubacks;
pub mod publish;
pub mod suback;
pub mod subscribe;
pub mod unsuback;
pub mod unsubscribe;

use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::Decoder, error::Error, packet_type::PacketType, protocol::ProtocolVersion, Result,
};

pub use crate::{
    auth::AuthPacket,
    codec::{decode, encode, PacketCodec},
    config::CodecConfig,
    connack::ConnAckPacket,
    connect::{ConnectPacket, LastWill},
    disconnect::DisconnectPacket,
    fixed_header::FixedHeader,
    ping::{PingReqPacket, PingRespPacket},
    pubacks::{PubAckPacket, PubCompPacket, PubRecPacket, PubRelPacket},
    publish::PublishPacket,
    suback::SubAckPacket,
    subscribe::{RetainHandling, SubscribePacket, Subscription, SubscriptionOptions},
    unsuback::UnsubAckPacket,
    unsubscribe::UnsubscribePacket,
};

/// Body codec of a single control packet type.
///
/// Implementors only deal with the bytes after the fixed header. Framing,
/// remaining length and size limits are handled by [`PacketBody::encode_packet`],
/// [`PacketBody::decode_packet`] and the [`codec`] facade.
pub trait PacketBody: Sized {
    const PACKET_TYPE: PacketType;

    /// Flag nibble of the fixed header.
    fn flags(&self) -> u8 {
        Self::PACKET_TYPE.required_flags().unwrap_or(0)
    }

    /// Checks that the packet can be expressed under `version`.
    fn validate(&self, version: ProtocolVersion) -> Result<()>;

    /// Writes the variable header and payload. Only called on a packet that
    /// passed [`PacketBody::validate`] for the same version.
    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion);

    /// Reads the variable header and payload from `body`, which holds
    /// exactly the remaining length declared by `header`.
    fn decode_body(header: &FixedHeader, body: &mut Bytes, version: ProtocolVersion)
        -> Result<Self>;

    /// Validates, then writes the fixed header followed by the body.
    fn encode_packet(&self, buffer: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        self.validate(version)?;

        let mut body = BytesMut::new();
        self.encode_body(&mut body, version);

        let header = FixedHeader::new(Self::PACKET_TYPE, self.flags(), body.len())?;
        buffer.reserve(header.packet_size());
        header.encode(buffer);
        buffer.extend_from_slice(&body);

        Ok(())
    }

    /// Decodes a body and checks that it was consumed in full.
    fn decode_packet(header: &FixedHeader, mut body: Bytes, version: ProtocolVersion) -> Result<Self> {
        let declared = header.remaining_length;
        let packet =
            Self::decode_body(header, &mut body, version).map_err(|e| e.within_body(declared))?;

        if body.has_remaining() {
            return Err(Error::VariableHeaderLengthMismatch {
                declared,
                actual: declared - body.remaining(),
            });
        }

        Ok(packet)
    }
}

/// Reads a packet identifier, which must be non-zero wherever it appears.
pub(crate) fn decode_packet_id<T: Buf>(buffer: &mut T, packet_type: PacketType) -> Result<u16> {
    let packet_id = u16::decode(buffer)?;
    check_packet_id(packet_id, packet_type)?;

    Ok(packet_id)
}

pub(crate) fn check_packet_id(packet_id: u16, packet_type: PacketType) -> Result<()> {
    if packet_id == 0 {
        return Err(Error::InvalidPacketIdentifier(packet_type));
    }

    Ok(())
}

/// Fails when `present` holds for a field that has no encoding before 5.0.
pub(crate) fn require_v5(version: ProtocolVersion, present: bool, what: &'static str) -> Result<()> {
    if present && !version.is_v5() {
        return Err(Error::ProtocolVersionMismatch { version, what });
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPacket {
    Connect(ConnectPacket),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket),
    SubAck(SubAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubAck(UnsubAckPacket),
    PingReq(PingReqPacket),
    PingResp(PingRespPacket),
    Disconnect(DisconnectPacket),
    Auth(AuthPacket),
}

macro_rules! control_packet_from {
    ($($variant:ident($packet:ty),)+) => {
        $(
            impl From<$packet> for ControlPacket {
                fn from(packet: $packet) -> Self {
                    ControlPacket::$variant(packet)
                }
            }
        )+
    };
}

control_packet_from! {
    Connect(ConnectPacket),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket),
    SubAck(SubAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubAck(UnsubAckPacket),
    PingReq(PingReqPacket),
    PingResp(PingRespPacket),
    Disconnect(DisconnectPacket),
    Auth(AuthPacket),
}

impl ControlPacket {
    pub fn packet_type(&self) -> PacketType {
        use ControlPacket::*;

        match self {
            Connect(_) => PacketType::Connect,
            ConnAck(_) => PacketType::ConnAck,
            Publish(_) => PacketType::Publish,
            PubAck(_) => PacketType::PubAck,
            PubRec(_) => PacketType::PubRec,
            PubRel(_) => PacketType::PubRel,
            PubComp(_) => PacketType::PubComp,
            Subscribe(_) => PacketType::Subscribe,
            SubAck(_) => PacketType::SubAck,
            Unsubscribe(_) => PacketType::Unsubscribe,
            UnsubAck(_) => PacketType::UnsubAck,
            PingReq(_) => PacketType::PingReq,
            PingResp(_) => PacketType::PingResp,
            Disconnect(_) => PacketType::Disconnect,
            Auth(_) => PacketType::Auth,
        }
    }

    /// Decodes the body that follows `header`.
    pub fn decode_body(header: &FixedHeader, body: Bytes, version: ProtocolVersion) -> Result<Self> {
        use ControlPacket::*;

        let packet = match header.packet_type {
            PacketType::Connect => Connect(ConnectPacket::decode_packet(header, body, version)?),
            PacketType::ConnAck => ConnAck(ConnAckPacket::decode_packet(header, body, version)?),
            PacketType::Publish => Publish(PublishPacket::decode_packet(header, body, version)?),
            PacketType::PubAck => PubAck(PubAckPacket::decode_packet(header, body, version)?),
            PacketType::PubRec => PubRec(PubRecPacket::decode_packet(header, body, version)?),
            PacketType::PubRel => PubRel(PubRelPacket::decode_packet(header, body, version)?),
            PacketType::PubComp => PubComp(PubCompPacket::decode_packet(header, body, version)?),
            PacketType::Subscribe => {
                Subscribe(SubscribePacket::decode_packet(header, body, version)?)
            }
            PacketType::SubAck => SubAck(SubAckPacket::decode_packet(header, body, version)?),
            PacketType::Unsubscribe => {
                Unsubscribe(UnsubscribePacket::decode_packet(header, body, version)?)
            }
            PacketType::UnsubAck => {
                UnsubAck(UnsubAckPacket::decode_packet(header, body, version)?)
            }
            PacketType::PingReq => PingReq(PingReqPacket::decode_packet(header, body, version)?),
            PacketType::PingResp => {
                PingResp(PingRespPacket::decode_packet(header, body, version)?)
            }
            PacketType::Disconnect => {
                Disconnect(DisconnectPacket::decode_packet(header, body, version)?)
            }
            PacketType::Auth => Auth(AuthPacket::decode_packet(header, body, version)?),
        };

        Ok(packet)
    }

    /// Appends the complete wire form of the packet to `buffer`.
    pub fn encode(&self, buffer: &mut BytesMut, version: ProtocolVersion) -> Result<()> {
        use ControlPacket::*;

        match self {
            Connect(p) => p.encode_packet(buffer, version),
            ConnAck(p) => p.encode_packet(buffer, version),
            Publish(p) => p.encode_packet(buffer, version),
            PubAck(p) => p.encode_packet(buffer, version),
            PubRec(p) => p.encode_packet(buffer, version),
            PubRel(p) => p.encode_packet(buffer, version),
            PubComp(p) => p.encode_packet(buffer, version),
            Subscribe(p) => p.encode_packet(buffer, version),
            SubAck(p) => p.encode_packet(buffer, version),
            Unsubscribe(p) => p.encode_packet(buffer, version),
            UnsubAck(p) => p.encode_packet(buffer, version),
            PingReq(p) => p.encode_packet(buffer, version),
            PingResp(p) => p.encode_packet(buffer, version),
            Disconnect(p) => p.encode_packet(buffer, version),
            Auth(p) => p.encode_packet(buffer, version),
        }
    }
}
