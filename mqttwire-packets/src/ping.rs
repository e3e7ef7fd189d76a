use bytes::{Bytes, BytesMut};

use mqttwire_core::{packet_type::PacketType, protocol::ProtocolVersion, Result};

use crate::{FixedHeader, PacketBody};

macro_rules! empty_packet {
    ($(#[$meta:meta])* $name:ident, $packet_type:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl PacketBody for $name {
            const PACKET_TYPE: PacketType = PacketType::$packet_type;

            fn validate(&self, _version: ProtocolVersion) -> Result<()> {
                Ok(())
            }

            fn encode_body(&self, _buffer: &mut BytesMut, _version: ProtocolVersion) {}

            fn decode_body(
                _header: &FixedHeader,
                _body: &mut Bytes,
                _version: ProtocolVersion,
            ) -> Result<Self> {
                Ok($name)
            }
        }
    };
}

empty_packet! {
    /// Keep-alive probe sent by the client.
    PingReqPacket, PingReq
}

empty_packet! {
    PingRespPacket, PingResp
}
