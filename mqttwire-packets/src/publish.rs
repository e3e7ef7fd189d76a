use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::{decode_string, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyId, PropertyScope},
    protocol::ProtocolVersion,
    qos::QoS,
    topic::validate_topic_name,
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishPacket {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic: String,
    /// Present exactly when `qos` is above 0.
    pub packet_id: Option<u16>,
    pub properties: Properties,
    pub payload: Bytes,
}

impl PublishPacket {
    pub fn new(topic: impl Into<String>, qos: QoS, payload: impl Into<Bytes>) -> Self {
        Self {
            qos,
            topic: topic.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_packet_id(mut self, packet_id: u16) -> Self {
        self.packet_id = Some(packet_id);
        self
    }

    /// An empty topic name is only valid in 5.0, where a Topic Alias stands
    /// in for it.
    fn check_topic(topic: &str, properties: &Properties, version: ProtocolVersion) -> Result<()> {
        if topic.is_empty() && version.is_v5() && properties.contains(PropertyId::TopicAlias) {
            return Ok(());
        }

        validate_topic_name(topic).map_err(Error::from)
    }
}

impl PacketBody for PublishPacket {
    const PACKET_TYPE: PacketType = PacketType::Publish;

    fn flags(&self) -> u8 {
        (self.dup as u8) << 3 | (self.qos as u8) << 1 | self.retain as u8
    }

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        if self.dup && self.qos == QoS::AtMostOnce {
            return Err(Error::MalformedPacket("DUP set on a QoS 0 PUBLISH"));
        }

        match (self.qos, self.packet_id) {
            (QoS::AtMostOnce, None) => {}
            (QoS::AtMostOnce, Some(_)) | (_, None) => {
                return Err(Error::InvalidPacketIdentifier(PacketType::Publish))
            }
            (_, Some(packet_id)) => check_packet_id(packet_id, PacketType::Publish)?,
        }

        require_v5(version, !self.properties.is_empty(), "PUBLISH properties")?;
        self.properties.validate(PropertyScope::Publish)?;

        Self::check_topic(&self.topic, &self.properties, version)
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        self.topic.encode(buffer);
        self.packet_id.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);
        }

        buffer.extend_from_slice(&self.payload);
    }

    fn decode_body(header: &FixedHeader, body: &mut Bytes, version: ProtocolVersion) -> Result<Self> {
        let dup = header.flags & 0b1000 != 0;
        let qos = QoS::try_from((header.flags >> 1) & 0b11)?;
        let retain = header.flags & 0b0001 != 0;

        if dup && qos == QoS::AtMostOnce {
            return Err(Error::MalformedPacket("DUP set on a QoS 0 PUBLISH"));
        }

        let topic = decode_string(body, "topic name")?;

        let packet_id = match qos {
            QoS::AtMostOnce => None,
            _ => Some(decode_packet_id(body, PacketType::Publish)?),
        };

        let properties = if version.is_v5() {
            Properties::decode(body, PropertyScope::Publish)?
        } else {
            Properties::default()
        };

        Self::check_topic(&topic, &properties, version)?;

        let payload = body.copy_to_bytes(body.remaining());

        Ok(PublishPacket {
            dup,
            qos,
            retain,
            topic,
            packet_id,
            properties,
            payload,
        })
    }
}
