use bytes::{Buf, BufMut, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::{ReasonCode, UnsubAckReasonCode},
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

/// Before 5.0 an UNSUBACK is just the packet identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubAckPacket {
    pub packet_id: u16,
    pub properties: Properties,
    pub reason_codes: Vec<UnsubAckReasonCode>,
}

impl UnsubAckPacket {
    pub fn new(packet_id: u16, reason_codes: Vec<UnsubAckReasonCode>) -> Self {
        Self {
            packet_id,
            reason_codes,
            ..Default::default()
        }
    }
}

impl PacketBody for UnsubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::UnsubAck;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        check_packet_id(self.packet_id, Self::PACKET_TYPE)?;
        require_v5(version, !self.properties.is_empty(), "UNSUBACK properties")?;
        require_v5(version, !self.reason_codes.is_empty(), "UNSUBACK reason codes")?;
        self.properties.validate(PropertyScope::UnsubAck)?;

        if version.is_v5() && self.reason_codes.is_empty() {
            return Err(Error::MalformedPacket("UNSUBACK without reason codes"));
        }

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        self.packet_id.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);

            for code in &self.reason_codes {
                buffer.put_u8(code.value());
            }
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let packet_id = decode_packet_id(body, Self::PACKET_TYPE)?;

        if !version.is_v5() {
            return Ok(UnsubAckPacket::new(packet_id, Vec::new()));
        }

        let properties = Properties::decode(body, PropertyScope::UnsubAck)?;

        let mut reason_codes = Vec::with_capacity(body.remaining());
        while body.has_remaining() {
            reason_codes.push(UnsubAckReasonCode::try_from(u8::decode(body)?)?);
        }

        if reason_codes.is_empty() {
            return Err(Error::MalformedPacket("UNSUBACK without reason codes"));
        }

        Ok(UnsubAckPacket {
            packet_id,
            properties,
            reason_codes,
        })
    }
}
