use bytes::{BufMut, Bytes, BytesMut};

use mqttwire_core::{
    codec::{Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    reason::{ConnAckCode, ConnectReasonCode, ConnectReturnCode, ReasonCode},
    Result,
};

use crate::{require_v5, FixedHeader, PacketBody};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAckPacket {
    pub session_present: bool,
    pub code: ConnAckCode,
    pub properties: Properties,
}

impl ConnAckPacket {
    /// An MQTT 5.0 CONNACK.
    pub fn new(session_present: bool, reason: ConnectReasonCode) -> Self {
        Self {
            session_present,
            code: ConnAckCode::Reason(reason),
            properties: Properties::default(),
        }
    }

    /// An MQTT 3.1 / 3.1.1 CONNACK.
    pub fn legacy(session_present: bool, return_code: ConnectReturnCode) -> Self {
        Self {
            session_present,
            code: ConnAckCode::Legacy(return_code),
            properties: Properties::default(),
        }
    }

    /// The same answer expressed for `version`. A 5.0 reason code is mapped
    /// onto the closest legacy return code when going back to 3.x, and 3.1
    /// has no session present flag.
    pub fn for_version(mut self, version: ProtocolVersion) -> Self {
        if version == ProtocolVersion::V3_1 {
            self.session_present = false;
        }

        self.code = match (self.code, version.is_v5()) {
            (ConnAckCode::Reason(reason), false) => {
                self.properties = Properties::default();
                ConnAckCode::Legacy(reason.into())
            }
            (code, _) => code,
        };

        self
    }
}

impl PacketBody for ConnAckPacket {
    const PACKET_TYPE: PacketType = PacketType::ConnAck;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        match (self.code, version.is_v5()) {
            (ConnAckCode::Reason(_), true) | (ConnAckCode::Legacy(_), false) => {}
            (ConnAckCode::Legacy(_), true) => {
                return Err(Error::ProtocolVersionMismatch {
                    version,
                    what: "legacy CONNACK return code",
                })
            }
            (ConnAckCode::Reason(_), false) => {
                return Err(Error::ProtocolVersionMismatch {
                    version,
                    what: "CONNACK reason code",
                })
            }
        }

        if self.session_present && version == ProtocolVersion::V3_1 {
            return Err(Error::ProtocolVersionMismatch {
                version,
                what: "CONNACK session present flag",
            });
        }

        if self.session_present && !self.code.is_success() {
            return Err(Error::MalformedPacket(
                "session present on a refused connection",
            ));
        }

        require_v5(version, !self.properties.is_empty(), "CONNACK properties")?;
        self.properties.validate(PropertyScope::ConnAck)
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        buffer.put_u8(self.session_present as u8);
        buffer.put_u8(self.code.value());

        if version.is_v5() {
            self.properties.encode(buffer);
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let flags = u8::decode(body)?;
        let reserved = match version {
            ProtocolVersion::V3_1 => 0xff,
            _ => 0xfe,
        };
        if flags & reserved != 0 {
            return Err(Error::MalformedPacket("CONNACK reserved flags are set"));
        }

        let code = ConnAckCode::decode(u8::decode(body)?, version)?;
        let session_present = flags & 0x01 != 0;

        if session_present && !code.is_success() {
            return Err(Error::MalformedPacket(
                "session present on a refused connection",
            ));
        }

        let properties = if version.is_v5() {
            Properties::decode(body, PropertyScope::ConnAck)?
        } else {
            Properties::default()
        };

        Ok(ConnAckPacket {
            session_present,
            code,
            properties,
        })
    }
}
