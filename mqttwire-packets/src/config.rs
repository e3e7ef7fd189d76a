//! Codec limits, loadable from the embedding application's configuration.

use serde::Deserialize;

use mqttwire_core::protocol::ProtocolVersion;

/// Packet size limits applied by [`crate::PacketCodec`].
///
/// Sizes count the whole packet, fixed header included. A missing value
/// means the largest packet the protocol can express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest packet accepted from the peer
    pub max_inbound_packet_size: Option<u32>,

    /// Largest packet we are willing to send
    pub max_outbound_packet_size: Option<u32>,
}

impl CodecConfig {
    pub fn with_max_inbound_packet_size(mut self, size: u32) -> Self {
        self.max_inbound_packet_size = Some(size);
        self
    }

    pub fn with_max_outbound_packet_size(mut self, size: u32) -> Self {
        self.max_outbound_packet_size = Some(size);
        self
    }

    pub fn max_inbound(&self, version: ProtocolVersion) -> usize {
        Self::limit(self.max_inbound_packet_size, version)
    }

    pub fn max_outbound(&self, version: ProtocolVersion) -> usize {
        Self::limit(self.max_outbound_packet_size, version)
    }

    fn limit(size: Option<u32>, version: ProtocolVersion) -> usize {
        let max = version.max_packet_size();
        size.map_or(max, |size| size.min(max)) as usize
    }
}
