use bytes::{Buf, BufMut, Bytes, BytesMut};

use mqttwire_core::{
    codec::{check_field_len, decode_string, Decoder, Encoder},
    error::Error,
    packet_type::PacketType,
    properties::{Properties, PropertyScope},
    protocol::ProtocolVersion,
    qos::QoS,
    topic::validate_topic_filter,
    Result,
};

use crate::{check_packet_id, decode_packet_id, require_v5, FixedHeader, PacketBody};

/// When retained messages are sent for a new subscription.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetainHandling {
    #[default]
    SendAtSubscribe = 0,
    SendAtNewSubscribe = 1,
    DoNotSend = 2,
}

impl TryFrom<u8> for RetainHandling {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RetainHandling::SendAtSubscribe),
            1 => Ok(RetainHandling::SendAtNewSubscribe),
            2 => Ok(RetainHandling::DoNotSend),
            _ => Err(Error::MalformedPacket("invalid retain handling")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl SubscriptionOptions {
    pub fn new(qos: QoS) -> Self {
        Self {
            qos,
            ..Default::default()
        }
    }

    fn to_byte(self) -> u8 {
        (self.retain_handling as u8) << 4
            | (self.retain_as_published as u8) << 3
            | (self.no_local as u8) << 2
            | self.qos as u8
    }

    fn from_byte(byte: u8, version: ProtocolVersion) -> Result<Self> {
        let reserved = if version.is_v5() { 0xc0 } else { 0xfc };
        if byte & reserved != 0 {
            return Err(Error::MalformedPacket(
                "reserved subscription option bits are set",
            ));
        }

        Ok(SubscriptionOptions {
            qos: QoS::try_from(byte & 0x03)?,
            no_local: byte & 0x04 != 0,
            retain_as_published: byte & 0x08 != 0,
            retain_handling: RetainHandling::try_from((byte >> 4) & 0x03)?,
        })
    }

    fn is_qos_only(&self) -> bool {
        *self == Self::new(self.qos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic_filter: String,
    pub options: SubscriptionOptions,
}

impl Subscription {
    pub fn new(topic_filter: impl Into<String>, qos: QoS) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            options: SubscriptionOptions::new(qos),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: u16,
    pub properties: Properties,
    pub subscriptions: Vec<Subscription>,
}

impl SubscribePacket {
    pub fn new(packet_id: u16, subscriptions: Vec<Subscription>) -> Self {
        Self {
            packet_id,
            subscriptions,
            ..Default::default()
        }
    }
}

impl PacketBody for SubscribePacket {
    const PACKET_TYPE: PacketType = PacketType::Subscribe;

    fn validate(&self, version: ProtocolVersion) -> Result<()> {
        check_packet_id(self.packet_id, Self::PACKET_TYPE)?;
        require_v5(version, !self.properties.is_empty(), "SUBSCRIBE properties")?;
        self.properties.validate(PropertyScope::Subscribe)?;

        if self.subscriptions.is_empty() {
            return Err(Error::MalformedPacket("SUBSCRIBE without topic filters"));
        }

        for subscription in &self.subscriptions {
            check_field_len("topic filter", subscription.topic_filter.len())?;
            validate_topic_filter(&subscription.topic_filter, version)?;
            require_v5(
                version,
                !subscription.options.is_qos_only(),
                "subscription options",
            )?;
        }

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut, version: ProtocolVersion) {
        self.packet_id.encode(buffer);

        if version.is_v5() {
            self.properties.encode(buffer);
        }

        for subscription in &self.subscriptions {
            subscription.topic_filter.encode(buffer);
            buffer.put_u8(subscription.options.to_byte());
        }
    }

    fn decode_body(
        _header: &FixedHeader,
        body: &mut Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let packet_id = decode_packet_id(body, Self::PACKET_TYPE)?;

        let properties = if version.is_v5() {
            Properties::decode(body, PropertyScope::Subscribe)?
        } else {
            Properties::default()
        };

        let mut subscriptions = Vec::new();

        while body.has_remaining() {
            let topic_filter = decode_string(body, "topic filter")?;
            validate_topic_filter(&topic_filter, version)?;

            let options = SubscriptionOptions::from_byte(u8::decode(body)?, version)?;

            subscriptions.push(Subscription {
                topic_filter,
                options,
            });
        }

        if subscriptions.is_empty() {
            return Err(Error::MalformedPacket("SUBSCRIBE without topic filters"));
        }

        Ok(SubscribePacket {
            packet_id,
            properties,
            subscriptions,
        })
    }
}
