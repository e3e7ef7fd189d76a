use bytes::{Buf, BufMut, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::{ReasonCode, SubAckCode},
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubAckPacket {
    pub packet_id: u16,
    pub properties: Properties,
    /// One code per topic filter of the SUBSCRIBE, in the same order.
    pub return_codes: Vec<SubAckCode>,
}

impl PacketBody for SubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::SubAck;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        check_packet_id(self.packet_id, Self::PACKET_TYPE)?;
        require_v5(version, !self.properties.is_empty(), "SUBACK properties")?;
        self.properties.validate(PropertyScope::SubAck)?;

        if self.return_codes.is_empty() {
            return Err(Error::MalformedPacket("SUBACK without return codes"));
        }

        for code in &self.return_codes {
            match (code, version.is_v5()) {
                (SubAckCode::Reason(_), true) | (SubAckCode::Legacy(_), false) => {}
                (SubAckCode::Reason(_), false) => {
                    return Err(Error::ProtocolVersionMismatch {
                        version,
                        what: "SUBACK reason code",
                    })
                }
                (SubAckCode::Legacy(_), true) => {
                    return Err(Error::ProtocolVersionMismatch {
                        version,
                        what: "legacy SUBACK return code",
                    })
                }
            }
        }

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        self.packet_id.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);
        }

        for code in &self.return_codes {
            buffer.put_u8(code.value());
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let packet_id = decode_packet_id(body, Self::PACKET_TYPE)?;

        let properties = if version.is_v5() {
            Properties::decode(body, PropertyScope::SubAck)?
        } else {
            Properties::default()
        };

        let mut return_codes = Vec::with_capacity(body.remaining());
        while body.has_remaining() {
            return_codes.push(SubAckCode::decode(u8::decode(body)?, version)?);
        }

        if return_codes.is_empty() {
            return Err(Error::MalformedPacket("SUBACK without return codes"));
        }

        Ok(SubAckPacket {
            packet_id,
            properties,
            return_codes,
        })
    }
}
