use bytes::{BufMut, Bytes, BytesMut};

use mqttwire_core::{
    codec::{check_field_len, check_string, decode_string, Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    qos::QoS,
    topic::validate_topic_name,
    Result,
};

use crate::{require_v5, FixedHeader, PacketBody};

/// Message the server publishes on the client's behalf when the
/// connection drops without a DISCONNECT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastWill {
    pub qos: QoS,
    pub retain: bool,
    pub properties: Properties,
    pub topic: String,
    pub payload: Bytes,
}

impl LastWill {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectPacket {
    /// Version the client asks for. Decoding takes it from the protocol
    /// name and level on the wire.
    pub protocol_version: ProtocolVersion,
    pub clean_start: bool,
    pub keepalive: u16,
    pub properties: Properties,
    pub client_id: String,
    pub will: Option<LastWill>,
    pub user_name: Option<String>,
    pub password: Option<Bytes>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ConnectFlags {
    user_name: bool,
    password: bool,
    will_retain: bool,
    will_qos: QoS,
    will_flag: bool,
    clean_start: bool,
}

impl ConnectFlags {
    fn to_byte(&self) -> u8 {
        let mut flags = 0;

        flags |= (self.user_name as u8) << 7;
        flags |= (self.password as u8) << 6;
        flags |= (self.will_retain as u8) << 5;
        flags |= (self.will_qos as u8) << 3;
        flags |= (self.will_flag as u8) << 2;
        flags |= (self.clean_start as u8) << 1;

        flags
    }

    fn from_byte(flags: u8, version: ProtocolVersion) -> Result<Self> {
        if flags & 0x01 != 0 {
            return Err(Error::MalformedPacket("CONNECT reserved flag is set"));
        }

        let parsed = ConnectFlags {
            user_name: flags & 0x80 != 0,
            password: flags & 0x40 != 0,
            will_retain: flags & 0x20 != 0,
            will_qos: QoS::try_from((flags >> 3) & 0x03)?,
            will_flag: flags & 0x04 != 0,
            clean_start: flags & 0x02 != 0,
        };

        if !parsed.will_flag && (parsed.will_qos != QoS::AtMostOnce || parsed.will_retain) {
            return Err(Error::MalformedPacket(
                "will QoS or retain set without the will flag",
            ));
        }

        if !version.is_v5() && parsed.password && !parsed.user_name {
            return Err(Error::MalformedPacket(
                "password flag set without the user name flag",
            ));
        }

        Ok(parsed)
    }
}

impl ConnectPacket {
    fn connect_flags(&self) -> ConnectFlags {
        ConnectFlags {
            user_name: self.user_name.is_some(),
            password: self.password.is_some(),
            will_retain: self.will.as_ref().map_or(false, |w| w.retain),
            will_qos: self.will.as_ref().map_or(QoS::AtMostOnce, |w| w.qos),
            will_flag: self.will.is_some(),
            clean_start: self.clean_start,
        }
    }
}

impl PacketBody for ConnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Connect;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        if self.protocol_version != version {
            return Err(Error::ProtocolVersionMismatch {
                version,
                what: "CONNECT for another protocol level",
            });
        }

        require_v5(version, !self.properties.is_empty(), "CONNECT properties")?;
        require_v5(
            version,
            self.password.is_some() && self.user_name.is_none(),
            "password without user name",
        )?;
        self.properties.validate(PropertyScope::Connect)?;

        check_string("client identifier", &self.client_id)?;

        if let Some(will) = &self.will {
            require_v5(version, !will.properties.is_empty(), "will properties")?;
            will.properties.validate(PropertyScope::Will)?;
            validate_topic_name(&will.topic)?;
            check_field_len("will payload", will.payload.len())?;
        }

        if let Some(user_name) = &self.user_name {
            check_string("user name", user_name)?;
        }

        if let Some(password) = &self.password {
            check_field_len("password", password.len())?;
        }

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        version.protocol_name().encode(buffer);
        buffer.put_u8(version.protocol_level());
        buffer.put_u8(self.connect_flags().to_byte());
        self.keepalive.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);
        }

        self.client_id.encode(buffer);

        if let Some(will) = &self.will {
            if version.is_v5() {
                will.properties.encode(buffer);
            }

            will.topic.encode(buffer);
            will.payload.encode(buffer);
        }

        self.user_name.encode(buffer);
        self.password.encode(buffer);
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        _version: ProtocolVersion,
    ) -> Result<Self> {
        let name = decode_string(body, "protocol name")?;
        let level = u8::decode(body)?;

        let protocol_version = ProtocolVersion::from_name_and_level(&name, level)
            .ok_or(Error::UnsupportedProtocolVersion { name, level })?;
        let v5 = protocol_version.is_v5();

        let flags = ConnectFlags::from_byte(u8::decode(body)?, protocol_version)?;
        let keepalive = u16::decode(body)?;

        let properties = if v5 {
            Properties::decode(body, PropertyScope::Connect)?
        } else {
            Properties::default()
        };

        let client_id = decode_string(body, "client identifier")?;

        let will = if flags.will_flag {
            let properties = if v5 {
                Properties::decode(body, PropertyScope::Will)?
            } else {
                Properties::default()
            };

            let topic = decode_string(body, "will topic")?;
            validate_topic_name(&topic)?;

            Some(LastWill {
                qos: flags.will_qos,
                retain: flags.will_retain,
                properties,
                topic,
                payload: Bytes::decode(body)?,
            })
        } else {
            None
        };

        let user_name = if flags.user_name {
            Some(decode_string(body, "user name")?)
        } else {
            None
        };

        let password = if flags.password {
            Some(Bytes::decode(body)?)
        } else {
            None
        };

        Ok(ConnectPacket {
            protocol_version,
            clean_start: flags.clean_start,
            keepalive,
            properties,
            client_id,
            will,
            user_name,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use mqttwire_core::properties::Property;

    use super::*;
    use crate::test_util::{decode, encode};

    #[test]
    fn test_connect_packet_encoding() {
        let expected = vec![
            0x10, 0x10, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x05, 0x02, 0x00, 0x3c, 0x03, 0x21,
            0x00, 0x14, 0x00, 0x00,
        ];

        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V5,
            clean_start: true,
            keepalive: 60,
            properties: Properties::new().with(Property::ReceiveMaximum(20)),
            ..Default::default()
        };

        assert_eq!(encode(&packet, ProtocolVersion::V5), expected);
        assert_eq!(decode::<ConnectPacket>(&expected, ProtocolVersion::V5).unwrap(), packet);
    }

    #[test]
    fn test_connect_packet_with_will_and_credentials() {
        let expected = vec![
            0x10, 0x52, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x05, 0xee, 0x00, 0x3c, 0x08, 0x11,
            0x00, 0x00, 0x00, 0x1e, 0x21, 0x00, 0x14, 0x00, 0x00, 0x0d, 0x08, 0x00, 0x0a, 0x74,
            0x65, 0x73, 0x74, 0x5f, 0x74, 0x6f, 0x70, 0x69, 0x63, 0x00, 0x0a, 0x74, 0x65, 0x73,
            0x74, 0x5f, 0x74, 0x6f, 0x70, 0x69, 0x63, 0x00, 0x0c, 0x74, 0x65, 0x73, 0x74, 0x5f,
            0x70, 0x61, 0x79, 0x6c, 0x6f, 0x61, 0x64, 0x00, 0x09, 0x74, 0x65, 0x73, 0x74, 0x5f,
            0x75, 0x73, 0x65, 0x72, 0x00, 0x08, 0x74, 0x65, 0x73, 0x74, 0x5f, 0x70, 0x77, 0x64,
        ];

        let will = LastWill {
            qos: QoS::AtLeastOnce,
            retain: true,
            properties: Properties::new()
                .with(Property::ResponseTopic("test_topic".to_string())),
            ..LastWill::new("test_topic", "test_payload")
        };

        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V5,
            clean_start: true,
            keepalive: 60,
            properties: Properties::new()
                .with(Property::SessionExpiryInterval(30))
                .with(Property::ReceiveMaximum(20)),
            will: Some(will),
            user_name: Some("test_user".to_string()),
            password: Some(Bytes::from("test_pwd")),
            ..Default::default()
        };

        assert_eq!(encode(&packet, ProtocolVersion::V5), expected);
        assert_eq!(decode::<ConnectPacket>(&expected, ProtocolVersion::V5).unwrap(), packet);
    }

    #[test]
    fn test_connect_packet_v3_1_1() {
        let expected = vec![
            0x10, 0x0c, // fixed header
            0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, // "MQTT"
            0x04, // level
            0x02, // clean session
            0x00, 0x3c, // keepalive
            0x00, 0x00, // client id
        ];

        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V3_1_1,
            clean_start: true,
            keepalive: 60,
            ..Default::default()
        };

        assert_eq!(encode(&packet, ProtocolVersion::V3_1_1), expected);
        assert_eq!(
            decode::<ConnectPacket>(&expected, ProtocolVersion::V3_1_1).unwrap(),
            packet
        );
    }

    #[test]
    fn test_connect_packet_v3_1_level_from_body() {
        let input = vec![
            0x10, 0x0e, // fixed header
            0x00, 0x06, 0x4d, 0x51, 0x49, 0x73, 0x64, 0x70, // "MQIsdp"
            0x03, // level
            0x02, // clean session
            0x00, 0x3c, // keepalive
            0x00, 0x00, // client id
        ];

        // The codec may still be set to 5.0 before the CONNECT is seen.
        let packet = decode::<ConnectPacket>(&input, ProtocolVersion::V5).unwrap();

        assert_eq!(packet.protocol_version, ProtocolVersion::V3_1);
        assert!(packet.clean_start);
        assert_eq!(packet.keepalive, 60);
        assert!(packet.properties.is_empty());
    }

    #[test]
    fn test_connect_packet_unsupported_protocol() {
        let input = [
            0x10, 0x0c, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x06, 0x02, 0x00, 0x3c, 0x00, 0x00,
        ];

        assert!(matches!(
            decode::<ConnectPacket>(&input, ProtocolVersion::V5),
            Err(Error::UnsupportedProtocolVersion { level: 6, .. })
        ));

        let input = [
            0x10, 0x0c, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x58, 0x04, 0x02, 0x00, 0x3c, 0x00, 0x00,
        ];

        assert!(matches!(
            decode::<ConnectPacket>(&input, ProtocolVersion::V5),
            Err(Error::UnsupportedProtocolVersion { .. })
        ));
    }

    #[test]
    fn test_connect_flags() {
        let header = [0x10, 0x0c, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x04];
        let with_flags = |flags: u8| {
            let mut input = header.to_vec();
            input.extend_from_slice(&[flags, 0x00, 0x3c, 0x00, 0x00]);
            decode::<ConnectPacket>(&input, ProtocolVersion::V3_1_1)
        };

        // reserved bit
        assert!(matches!(with_flags(0x03), Err(Error::MalformedPacket(_))));
        // will QoS without will flag
        assert!(matches!(with_flags(0x0a), Err(Error::MalformedPacket(_))));
        // will retain without will flag
        assert!(matches!(with_flags(0x22), Err(Error::MalformedPacket(_))));
        // will QoS 3
        assert!(matches!(with_flags(0x1e), Err(Error::InvalidQoS(3))));
        // password without user name
        assert!(matches!(with_flags(0x42), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn test_connect_packet_version_checks() {
        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V3_1_1,
            properties: Properties::new().with(Property::ReceiveMaximum(10)),
            ..Default::default()
        };

        let mut buf = BytesMut::new();
        assert!(matches!(
            packet.encode_packet(&mut buf, ProtocolVersion::V3_1_1),
            Err(Error::ProtocolVersionMismatch { .. })
        ));
        assert!(matches!(
            packet.encode_packet(&mut buf, ProtocolVersion::V5),
            Err(Error::ProtocolVersionMismatch { .. })
        ));

        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V3_1_1,
            password: Some(Bytes::from_static(b"secret")),
            ..Default::default()
        };
        assert!(matches!(
            packet.encode_packet(&mut buf, ProtocolVersion::V3_1_1),
            Err(Error::ProtocolVersionMismatch { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_connect_packet_will_topic() {
        let packet = ConnectPacket {
            protocol_version: ProtocolVersion::V5,
            will: Some(LastWill::new("a/#", "bye")),
            ..Default::default()
        };

        let mut buf = BytesMut::new();
        assert!(matches!(
            packet.encode_packet(&mut buf, ProtocolVersion::V5),
            Err(Error::InvalidTopic(_))
        ));
    }
}
