use bytes::{Buf, Bytes, BytesMut};

use mqttwire_core::{
    codec::{check_field_len, decode_string, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    topic::validate_topic_filter,
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribePacket {
    pub packet_id: u16,
    pub properties: Properties,
    pub topic_filters: Vec<String>,
}

impl UnsubscribePacket {
    pub fn new<I, S>(packet_id: u16, topic_filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packet_id,
            topic_filters: topic_filters.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl PacketBody for UnsubscribePacket {
    const PACKET_TYPE: PacketType = PacketType::Unsubscribe;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        check_packet_id(self.packet_id, Self::PACKET_TYPE)?;
        require_v5(version, !self.properties.is_empty(), "UNSUBSCRIBE properties")?;
        self.properties.validate(PropertyScope::Unsubscribe)?;

        if self.topic_filters.is_empty() {
            return Err(Error::MalformedPacket("UNSUBSCRIBE without topic filters"));
        }

        for filter in &self.topic_filters {
            check_field_len("topic filter", filter.len())?;
            validate_topic_filter(filter, version)?;
        }

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        self.packet_id.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);
        }

        self.topic_filters.encode(buffer);
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let packet_id = decode_packet_id(body, Self::PACKET_TYPE)?;

        let properties = if version.is_v5() {
            Properties::decode(body, PropertyScope::Unsubscribe)?
        } else {
            Properties::default()
        };

        let mut topic_filters = Vec::new();
        while body.has_remaining() {
            let filter = decode_string(body, "topic filter")?;
            validate_topic_filter(&filter, version)?;
            topic_filters.push(filter);
        }

        if topic_filters.is_empty() {
            return Err(Error::MalformedPacket("UNSUBSCRIBE without topic filters"));
        }

        Ok(UnsubscribePacket {
            packet_id,
            properties,
            topic_filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use mqttwire_core::codec::StringPair;
    use mqttwire_core::properties::Property;

    use super::*;
    use crate::test_util::{decode, encode};

    #[test]
    fn test_unsubscribe_packet_v3_1_1() {
        let expected = vec![
            0xa2, 0x0b, 0x00, 0x02, 0x00, 0x03, 0x61, 0x2f, 0x62, 0x00, 0x02, 0x63, 0x2f,
        ];
        let packet = UnsubscribePacket::new(2, ["a/b", "c/"]);

        assert_eq!(encode(&packet, ProtocolVersion::V3_1_1), expected);
        assert_eq!(
            decode::<UnsubscribePacket>(&expected, ProtocolVersion::V3_1_1).unwrap(),
            packet
        );
    }

    #[test]
    fn test_unsubscribe_packet_v5() {
        let packet = UnsubscribePacket {
            properties: Properties::new().with(Property::UserProperty(StringPair::new("k", "v"))),
            ..UnsubscribePacket::new(9, ["$share/g/a/+"])
        };

        let encoded = encode(&packet, ProtocolVersion::V5);
        assert_eq!(
            decode::<UnsubscribePacket>(&encoded, ProtocolVersion::V5).unwrap(),
            packet
        );
    }

    #[test]
    fn test_unsubscribe_packet_checks() {
        assert!(matches!(
            decode::<UnsubscribePacket>(&[0xa2, 0x02, 0x00, 0x01], ProtocolVersion::V3_1_1),
            Err(Error::MalformedPacket(_))
        ));
        assert!(matches!(
            decode::<UnsubscribePacket>(&[0xa0, 0x02, 0x00, 0x01], ProtocolVersion::V3_1_1),
            Err(Error::InvalidFixedHeaderFlags { .. })
        ));

        let mut buf = BytesMut::new();
        let packet = UnsubscribePacket::new(0, ["a"]);
        assert!(matches!(
            packet.encode_packet(&mut buf, ProtocolVersion::V5),
            Err(Error::InvalidPacketIdentifier(PacketType::Unsubscribe))
        ));
    }
}
