use core::fmt;

use crate::codec::VAR_INT_MAX;

/// One type byte, four remaining-length bytes, and the largest body.
pub const MAX_PACKET_SIZE: u32 = VAR_INT_MAX + 5;

/// Protocol revision of a connection, identified on the wire by the protocol
/// name and level of CONNECT.
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub enum ProtocolVersion {
    /// "MQIsdp", level 3
    V3_1 = 3,
    /// "MQTT", level 4
    V3_1_1 = 4,
    /// "MQTT", level 5
    #[default]
    V5 = 5,
}

impl ProtocolVersion {
    pub fn protocol_name(&self) -> &'static str {
        if *self == ProtocolVersion::V3_1 {
            "MQIsdp"
        } else {
            "MQTT"
        }
    }

    pub fn protocol_level(&self) -> u8 {
        *self as u8
    }

    /// Properties, reason codes on acknowledgements and AUTH exist only here.
    pub fn is_v5(&self) -> bool {
        *self == ProtocolVersion::V5
    }

    /// Packet size limit in effect until the peer announces a smaller one.
    pub fn max_packet_size(&self) -> u32 {
        MAX_PACKET_SIZE
    }

    /// Version named by a CONNECT, or `None` when name and level disagree.
    pub fn from_name_and_level(name: &str, level: u8) -> Option<ProtocolVersion> {
        ProtocolVersion::try_from(level)
            .ok()
            .filter(|version| version.protocol_name() == name)
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        [
            ProtocolVersion::V3_1,
            ProtocolVersion::V3_1_1,
            ProtocolVersion::V5,
        ]
        .into_iter()
        .find(|version| version.protocol_level() == level)
        .ok_or(level)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolVersion::V3_1 => "MQTT 3.1",
            ProtocolVersion::V3_1_1 => "MQTT 3.1.1",
            ProtocolVersion::V5 => "MQTT 5.0",
        };
        f.write_str(name)
    }
}
