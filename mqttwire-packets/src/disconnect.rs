use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::{DisconnectReasonCode, ReasonCode},
    Result,
};

use crate::{require_v5, FixedHeader, PacketBody};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectPacket {
    pub reason_code: DisconnectReasonCode,
    pub properties: Properties,
}

impl DisconnectPacket {
    pub fn new(reason_code: DisconnectReasonCode) -> Self {
        Self {
            reason_code,
            properties: Properties::default(),
        }
    }
}

impl PacketBody for DisconnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Disconnect;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        require_v5(version, self.reason_code.value() != 0, "DISCONNECT reason code")?;
        require_v5(version, !self.properties.is_empty(), "DISCONNECT properties")?;

        self.properties.validate(PropertyScope::Disconnect)
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        if !version.is_v5() {
            return;
        }

        if !self.properties.is_empty() {
            self.reason_code.encode(buffer);
            self.properties.encode(buffer);
        } else if self.reason_code != DisconnectReasonCode::NormalDisconnection {
            self.reason_code.encode(buffer);
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let mut packet = DisconnectPacket::default();

        if version.is_v5() && body.has_remaining() {
            packet.reason_code = DisconnectReasonCode::try_from(u8::decode(body)?)?;

            if body.has_remaining() {
                packet.properties = Properties::decode(body, PropertyScope::Disconnect)?;
            }
        }

        Ok(packet)
    }
}
