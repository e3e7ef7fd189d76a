use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use mqttwire_core::{error::Error, protocol::ProtocolVersion, Result};

use crate::{CodecConfig, ControlPacket, FixedHeader};

/// What an inbound size limit is measured against.
#[derive(Debug, Clone, Copy)]
enum SizeLimit {
    /// Bytes after the fixed header.
    RemainingLength(usize),
    /// The whole packet, fixed header included.
    PacketSize(usize),
}

impl SizeLimit {
    fn check(self, header: &FixedHeader, header_len: usize) -> Result<()> {
        let (size, limit) = match self {
            SizeLimit::RemainingLength(limit) => (header.remaining_length, limit),
            SizeLimit::PacketSize(limit) => (header_len + header.remaining_length, limit),
        };

        if size > limit {
            debug!(
                "Rejected {} packet of {} bytes, limit is {}",
                header.packet_type, size, limit
            );
            return Err(Error::PacketTooLarge { size, limit });
        }

        Ok(())
    }
}

/// Decodes one complete packet from the front of `src`.
///
/// `max_packet_size` bounds the remaining length. On success the packet's
/// bytes are consumed. A packet that is too large or not fully buffered
/// leaves `src` untouched; a packet whose body fails to decode has already
/// been removed from it.
pub fn decode(
    src: &mut BytesMut,
    version: ProtocolVersion,
    max_packet_size: u32,
) -> Result<ControlPacket> {
    decode_limited(src, version, SizeLimit::RemainingLength(max_packet_size as usize))
}

/// Encodes `packet` for `version` into a fresh buffer.
pub fn encode(packet: &ControlPacket, version: ProtocolVersion) -> Result<BytesMut> {
    let mut buffer = BytesMut::new();
    encode_limited(packet, &mut buffer, version, version.max_packet_size() as usize)?;

    Ok(buffer)
}

fn decode_limited(
    src: &mut BytesMut,
    version: ProtocolVersion,
    limit: SizeLimit,
) -> Result<ControlPacket> {
    let mut peeker = &src[..];
    let header = FixedHeader::decode(&mut peeker, version).map_err(|e| {
        debug!("Rejected fixed header: {}", e);
        e
    })?;
    let header_len = src.len() - peeker.len();
    let size = header_len + header.remaining_length;

    limit.check(&header, header_len)?;

    let available = src.len() - header_len;
    if available < header.remaining_length {
        debug!(
            "Rejected {} packet: {} of {} body bytes buffered",
            header.packet_type, available, header.remaining_length
        );
        return Err(Error::VariableHeaderLengthMismatch {
            declared: header.remaining_length,
            actual: available,
        });
    }

    let mut body = src.split_to(size).freeze();
    body.advance(header_len);

    match ControlPacket::decode_body(&header, body, version) {
        Ok(packet) => {
            trace!("Decoded {} packet of {} bytes", header.packet_type, size);
            Ok(packet)
        }
        Err(e) => {
            debug!("Rejected {} packet: {}", header.packet_type, e);
            Err(e)
        }
    }
}

fn encode_limited(
    packet: &ControlPacket,
    dst: &mut BytesMut,
    version: ProtocolVersion,
    limit: usize,
) -> Result<()> {
    let start = dst.len();

    if let Err(e) = packet.encode(dst, version) {
        debug!("Cannot encode {} packet: {}", packet.packet_type(), e);
        return Err(e);
    }

    let size = dst.len() - start;
    if size > limit {
        dst.truncate(start);
        debug!(
            "Cannot send {} packet of {} bytes, limit is {}",
            packet.packet_type(),
            size,
            limit
        );
        return Err(Error::PacketTooLarge { size, limit });
    }

    trace!("Encoded {} packet of {} bytes", packet.packet_type(), size);
    Ok(())
}

/// Packet codec bound to one connection: its negotiated protocol version
/// and size limits.
///
/// Unlike the free [`decode`], limits here count the whole packet, the way
/// the MQTT 5.0 Maximum Packet Size property does.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    config: CodecConfig,
    version: ProtocolVersion,
}

impl PacketCodec {
    pub fn new(config: CodecConfig, version: ProtocolVersion) -> Self {
        PacketCodec { config, version }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Switches to the version agreed in CONNECT.
    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    /// Decodes exactly one packet from the front of `src`.
    pub fn decode_packet(&self, src: &mut BytesMut) -> Result<ControlPacket> {
        let limit = SizeLimit::PacketSize(self.config.max_inbound(self.version));
        decode_limited(src, self.version, limit)
    }

    /// Appends one packet to `dst`. Nothing is appended on error.
    pub fn encode_packet(&self, packet: &ControlPacket, dst: &mut BytesMut) -> Result<()> {
        encode_limited(packet, dst, self.version, self.config.max_outbound(self.version))
    }
}

/// Framing adapter. A CONNECT passing through in either direction sets the
/// protocol version used for the rest of the stream.
impl tokio_util::codec::Decoder for PacketCodec {
    type Item = ControlPacket;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ControlPacket>> {
        let Some((header, header_len)) = FixedHeader::peek(&src[..], self.version)? else {
            return Ok(None);
        };

        let size = header_len + header.remaining_length;
        SizeLimit::PacketSize(self.config.max_inbound(self.version)).check(&header, header_len)?;

        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        let packet = self.decode_packet(src)?;

        if let ControlPacket::Connect(connect) = &packet {
            self.version = connect.protocol_version;
        }

        Ok(Some(packet))
    }
}

impl tokio_util::codec::Encoder<ControlPacket> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, packet: ControlPacket, dst: &mut BytesMut) -> Result<()> {
        if let ControlPacket::Connect(connect) = &packet {
            self.version = connect.protocol_version;
        }

        self.encode_packet(&packet, dst)
    }
}
