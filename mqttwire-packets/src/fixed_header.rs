use bytes::{Buf, BufMut, BytesMut};

use mqttwire_core::{
    codec::{
        ensure_remaining, var_int_len, Decoder, Encoder, VariableByteInteger, VAR_INT_MAX,
    },
    error::Error,
    packet_type::PacketType,
    protocol::ProtocolVersion,
    Result,
};

/// First byte and remaining length of a control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: usize,
}

impl FixedHeader {
    pub fn new(packet_type: PacketType, flags: u8, remaining_length: usize) -> Result<Self> {
        if remaining_length > VAR_INT_MAX as usize {
            return Err(Error::RemainingLengthExceeded {
                length: remaining_length,
                limit: VAR_INT_MAX as usize,
            });
        }

        Ok(Self {
            packet_type,
            flags,
            remaining_length,
        })
    }

    fn parse_first_byte(byte: u8, version: ProtocolVersion) -> Result<(PacketType, u8)> {
        let nibble = byte >> 4;
        let packet_type = PacketType::try_from(nibble)?;

        if packet_type == PacketType::Auth && !version.is_v5() {
            return Err(Error::UnknownPacketType(nibble));
        }

        let flags = byte & 0x0f;
        if let Some(required) = packet_type.required_flags() {
            if flags != required {
                return Err(Error::InvalidFixedHeaderFlags { packet_type, flags });
            }
        }

        Ok((packet_type, flags))
    }

    pub fn decode<T: Buf>(buffer: &mut T, version: ProtocolVersion) -> Result<Self> {
        Self::decode_with_limit(buffer, version, VAR_INT_MAX as usize)
    }

    /// Like [`FixedHeader::decode`], rejecting a remaining length above `limit`.
    pub fn decode_with_limit<T: Buf>(
        buffer: &mut T,
        version: ProtocolVersion,
        limit: usize,
    ) -> Result<Self> {
        ensure_remaining(buffer, 1)?;
        let (packet_type, flags) = Self::parse_first_byte(buffer.get_u8(), version)?;
        let remaining_length = VariableByteInteger::decode(buffer)?.0 as usize;

        if remaining_length > limit {
            return Err(Error::RemainingLengthExceeded {
                length: remaining_length,
                limit,
            });
        }

        Ok(Self {
            packet_type,
            flags,
            remaining_length,
        })
    }

    /// Reads the header at the front of `src` without consuming anything.
    /// Returns the header with its encoded length, or `None` while `src`
    /// does not yet hold all of it.
    pub fn peek(src: &[u8], version: ProtocolVersion) -> Result<Option<(Self, usize)>> {
        let Some(&first) = src.first() else {
            return Ok(None);
        };

        let (packet_type, flags) = Self::parse_first_byte(first, version)?;

        let Some((remaining_length, len)) = VariableByteInteger::peek(&src[1..])? else {
            return Ok(None);
        };

        let header = Self {
            packet_type,
            flags,
            remaining_length: remaining_length as usize,
        };

        Ok(Some((header, 1 + len)))
    }

    pub fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u8((self.packet_type as u8) << 4 | self.flags);
        VariableByteInteger(self.remaining_length as u32).encode(buffer);
    }

    /// Bytes taken by the header itself.
    pub fn encoded_size(&self) -> usize {
        1 + var_int_len(self.remaining_length)
    }

    /// Bytes taken by the whole packet.
    pub fn packet_size(&self) -> usize {
        self.encoded_size() + self.remaining_length
    }
}
