use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::AuthReasonCode,
    Result,
};

use crate::{FixedHeader, PacketBody};

/// Extended authentication exchange, MQTT 5.0 only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPacket {
    pub reason_code: AuthReasonCode,
    pub properties: Properties,
}

impl AuthPacket {
    pub fn new(reason_code: AuthReasonCode, properties: Properties) -> Self {
        Self {
            reason_code,
            properties,
        }
    }
}

impl PacketBody for AuthPacket {
    const PACKET_TYPE: PacketType = PacketType::Auth;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        if !version.is_v5() {
            return Err(Error::ProtocolVersionMismatch {
                version,
                what: "AUTH",
            });
        }

        self.properties.validate(PropertyScope::Auth)
    }

    fn encode_body(&self, buffer: &mut BytesMut, _version: ProtocolVersion) {
        if !self.properties.is_empty() {
            self.reason_code.encode(buffer);
            self.properties.encode(buffer);
        } else if self.reason_code != AuthReasonCode::Success {
            self.reason_code.encode(buffer);
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        if !version.is_v5() {
            return Err(Error::UnknownPacketType(PacketType::Auth as u8));
        }

        let mut packet = AuthPacket::default();

        if body.has_remaining() {
            packet.reason_code = AuthReasonCode::try_from(u8::decode(body)?)?;

            if body.has_remaining() {
                packet.properties = Properties::decode(body, PropertyScope::Auth)?;
            }
        }

        Ok(packet)
    }
}
