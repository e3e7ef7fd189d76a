//! PUBACK, PUBREC, PUBREL and PUBCOMP.
//!
//! All four share one layout: a packet identifier, then in MQTT 5.0 an
//! optional reason code and an optional property block. The reason code is
//! left out when it is Success and there are no properties, and the property
//! block when it is empty.

use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::{
        PubAckReasonCode, PubCompReasonCode, PubRecReasonCode, PubRelReasonCode, ReasonCode,
    },
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

macro_rules! ack_packet {
    ($(#[$meta:meta])* $name:ident, $reason:ident, $packet_type:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub packet_id: u16,
            pub reason_code: $reason,
            pub properties: Properties,
        }

        impl $name {
            pub fn new(packet_id: u16) -> Self {
                Self {
                    packet_id,
                    ..Default::default()
                }
            }

            pub fn with_reason(packet_id: u16, reason_code: $reason) -> Self {
                Self {
                    packet_id,
                    reason_code,
                    ..Default::default()
                }
            }
        }

        impl PacketBody for $name {
            const PACKET_TYPE: PacketType = PacketType::$packet_type;

            fn validate(&self, version: ProtocolVersion) -> Result<()> {
                check_packet_id(self.packet_id, Self::PACKET_TYPE)?;
                require_v5(version, self.reason_code.value() != 0, "acknowledgement reason code")?;
                require_v5(version, !self.properties.is_empty(), "acknowledgement properties")?;

                self.properties.validate(PropertyScope::$packet_type)
            }

            fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
                self.packet_id.encode(buffer);

                if !version.is_v5() {
                    return;
                }

                if !self.properties.is_empty() {
                    self.reason_code.encode(buffer);
                    self.properties.encode(buffer);
                } else if self.reason_code.value() != 0 {
                    self.reason_code.encode(buffer);
                }
            }

            fn decode_body(
                _header: &FixedHeader,
                body: &mut Bytes,
                version: ProtocolVersion,
            ) -> Result<Self> {
                let packet_id = decode_packet_id(body, Self::PACKET_TYPE)?;
                let mut packet = Self::new(packet_id);

                if version.is_v5() && body.has_remaining() {
                    packet.reason_code = $reason::try_from(u8::decode(body)?)?;

                    if body.has_remaining() {
                        packet.properties =
                            Properties::decode(body, PropertyScope::$packet_type)?;
                    }
                }

                Ok(packet)
            }
        }
    };
}

ack_packet! {
    /// Answer to a QoS 1 PUBLISH.
    PubAckPacket, PubAckReasonCode, PubAck
}

ack_packet! {
    /// First answer to a QoS 2 PUBLISH.
    PubRecPacket, PubRecReasonCode, PubRec
}

ack_packet! {
    /// Answer to a PUBREC.
    PubRelPacket, PubRelReasonCode, PubRel
}

ack_packet! {
    /// Answer to a PUBREL, ending the QoS 2 exchange.
    PubCompPacket, PubCompReasonCode, PubComp
}
