//! MQTT 5.0 properties.
//!
//! A property block is a variable byte integer length followed by
//! identifier/value pairs. [`Properties`] keeps them in wire order.

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    codec::{
        check_field_len, check_string, var_int_len, Decoder, Encoder, StringPair,
        VariableByteInteger, VAR_INT_MAX,
    },
    error::Error,
};

/// Where a property block sits. Each packet with properties has its own
/// scope; the Will properties inside CONNECT have theirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyScope {
    Connect,
    ConnAck,
    Publish,
    Will,
    PubAck,
    PubRec,
    PubRel,
    PubComp,
    Subscribe,
    SubAck,
    Unsubscribe,
    UnsubAck,
    Disconnect,
    Auth,
}

/// Wire type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Byte,
    TwoByteInteger,
    FourByteInteger,
    VariableByteInteger,
    Utf8String,
    Utf8StringPair,
    BinaryData,
}

macro_rules! define_properties {
    ($($name:ident = $id:literal: $ty:ty => $kind:ident [$($scope:ident),+],)+) => {
        /// Property identifiers.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PropertyId {
            $($name = $id,)+
        }

        impl PropertyId {
            pub const ALL: &'static [PropertyId] = &[$(PropertyId::$name,)+];

            pub fn kind(&self) -> ValueKind {
                match self {
                    $(PropertyId::$name => ValueKind::$kind,)+
                }
            }

            /// Blocks this property may appear in.
            pub fn scopes(&self) -> &'static [PropertyScope] {
                match self {
                    $(PropertyId::$name => &[$(PropertyScope::$scope,)+],)+
                }
            }
        }

        impl TryFrom<u32> for PropertyId {
            type Error = Error;

            fn try_from(id: u32) -> Result<Self, Self::Error> {
                match id {
                    $($id => Ok(PropertyId::$name),)+
                    _ => Err(Error::UnknownPropertyIdentifier(id)),
                }
            }
        }

        /// A property with its typed value.
        #[derive(Debug, Clone, PartialEq, Eq)]
        #[allow(clippy::enum_variant_names)] // Warns because of UserProperty
        pub enum Property {
            $($name($ty),)+
        }

        impl Property {
            pub fn id(&self) -> PropertyId {
                match self {
                    $(Property::$name(_) => PropertyId::$name,)+
                }
            }

            fn decode_value<T: Buf>(id: PropertyId, buffer: &mut T) -> crate::Result<Self> {
                match id {
                    $(PropertyId::$name => Ok(Property::$name(<$ty>::decode(buffer)?)),)+
                }
            }

            fn encode_value(&self, buffer: &mut BytesMut) {
                match self {
                    $(Property::$name(v) => v.encode(buffer),)+
                }
            }

            fn value_size(&self) -> usize {
                match self {
                    $(Property::$name(v) => v.encoded_size(),)+
                }
            }
        }
    };
}

define_properties! {
    PayloadFormatIndicator = 0x01: u8 => Byte [Publish, Will],
    MessageExpiryInterval = 0x02: u32 => FourByteInteger [Publish, Will],
    ContentType = 0x03: String => Utf8String [Publish, Will],
    ResponseTopic = 0x08: String => Utf8String [Publish, Will],
    CorrelationData = 0x09: Bytes => BinaryData [Publish, Will],
    SubscriptionIdentifier = 0x0b: VariableByteInteger => VariableByteInteger [Publish, Subscribe],
    SessionExpiryInterval = 0x11: u32 => FourByteInteger [Connect, ConnAck, Disconnect],
    AssignedClientIdentifier = 0x12: String => Utf8String [ConnAck],
    ServerKeepAlive = 0x13: u16 => TwoByteInteger [ConnAck],
    AuthenticationMethod = 0x15: String => Utf8String [Connect, ConnAck, Auth],
    AuthenticationData = 0x16: Bytes => BinaryData [Connect, ConnAck, Auth],
    RequestProblemInformation = 0x17: u8 => Byte [Connect],
    WillDelayInterval = 0x18: u32 => FourByteInteger [Will],
    RequestResponseInformation = 0x19: u8 => Byte [Connect],
    ResponseInformation = 0x1a: String => Utf8String [ConnAck],
    ServerReference = 0x1c: String => Utf8String [ConnAck, Disconnect],
    ReasonString = 0x1f: String => Utf8String [
        ConnAck, PubAck, PubRec, PubRel, PubComp, SubAck, UnsubAck, Disconnect, Auth
    ],
    ReceiveMaximum = 0x21: u16 => TwoByteInteger [Connect, ConnAck],
    TopicAliasMaximum = 0x22: u16 => TwoByteInteger [Connect, ConnAck],
    TopicAlias = 0x23: u16 => TwoByteInteger [Publish],
    MaximumQoS = 0x24: u8 => Byte [ConnAck],
    RetainAvailable = 0x25: u8 => Byte [ConnAck],
    UserProperty = 0x26: StringPair => Utf8StringPair [
        Connect, ConnAck, Publish, Will, PubAck, PubRec, PubRel, PubComp,
        Subscribe, SubAck, Unsubscribe, UnsubAck, Disconnect, Auth
    ],
    MaximumPacketSize = 0x27: u32 => FourByteInteger [Connect, ConnAck],
    WildcardSubscriptionAvailable = 0x28: u8 => Byte [ConnAck],
    SubscriptionIdentifierAvailable = 0x29: u8 => Byte [ConnAck],
    SharedSubscriptionAvailable = 0x2a: u8 => Byte [ConnAck],
}

impl PropertyId {
    /// User Property may repeat anywhere; a PUBLISH forwarded to a subscriber
    /// carries one Subscription Identifier per matching subscription.
    pub fn allows_duplicates(&self, scope: PropertyScope) -> bool {
        match self {
            PropertyId::UserProperty => true,
            PropertyId::SubscriptionIdentifier => scope == PropertyScope::Publish,
            _ => false,
        }
    }

    pub fn is_allowed_in(&self, scope: PropertyScope) -> bool {
        self.scopes().contains(&scope)
    }
}

impl Property {
    /// Checks the value ranges MQTT 5.0 puts on individual properties.
    fn check_value(&self) -> crate::Result<()> {
        use Property::*;

        match self {
            PayloadFormatIndicator(v)
            | RequestProblemInformation(v)
            | RequestResponseInformation(v)
            | MaximumQoS(v)
            | RetainAvailable(v)
            | WildcardSubscriptionAvailable(v)
            | SubscriptionIdentifierAvailable(v)
            | SharedSubscriptionAvailable(v)
                if *v > 1 =>
            {
                Err(Error::MalformedPacket("byte property must be 0 or 1"))
            }
            SubscriptionIdentifier(v) if v.0 == 0 || v.0 > VAR_INT_MAX => Err(
                Error::MalformedPacket("subscription identifier out of range"),
            ),
            ReceiveMaximum(0) => Err(Error::MalformedPacket("receive maximum is zero")),
            MaximumPacketSize(0) => Err(Error::MalformedPacket("maximum packet size is zero")),
            TopicAlias(0) => Err(Error::MalformedPacket("topic alias is zero")),
            ContentType(s)
            | ResponseTopic(s)
            | AssignedClientIdentifier(s)
            | AuthenticationMethod(s)
            | ResponseInformation(s)
            | ServerReference(s)
            | ReasonString(s) => check_string("property string", s),
            CorrelationData(b) | AuthenticationData(b) => {
                check_field_len("property binary data", b.len())
            }
            UserProperty(pair) => {
                check_string("user property key", &pair.key)?;
                check_string("user property value", &pair.value)
            }
            _ => Ok(()),
        }
    }

    fn entry_size(&self) -> usize {
        var_int_len(self.id() as usize) + self.value_size()
    }
}

/// Ordered property set of one packet (or of a Will).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    pub fn new() -> Self {
        Properties(Vec::new())
    }

    /// Appends a property. Rules are checked at encode time.
    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    pub fn with(mut self, property: Property) -> Self {
        self.push(property);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.0.iter()
    }

    /// First property with identifier `id`.
    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.0.iter().find(|p| p.id() == id)
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.get(id).is_some()
    }

    pub fn user_properties(&self) -> impl Iterator<Item = &StringPair> {
        self.0.iter().filter_map(|p| match p {
            Property::UserProperty(pair) => Some(pair),
            _ => None,
        })
    }

    /// Checks every property against `scope`: allowed there, not repeated
    /// unless repeatable, value in range.
    pub fn validate(&self, scope: PropertyScope) -> crate::Result<()> {
        for (i, property) in self.0.iter().enumerate() {
            check_entry(&self.0[..i], property, scope)?;
        }

        let size = self.entries_size();
        if size > VAR_INT_MAX as usize {
            return Err(Error::PropertyLengthMismatch {
                declared: VAR_INT_MAX as usize,
                actual: size,
            });
        }

        Ok(())
    }

    fn entries_size(&self) -> usize {
        self.0.iter().map(Property::entry_size).sum()
    }

    /// Decodes a property block, length prefix included.
    pub fn decode<T: Buf>(buffer: &mut T, scope: PropertyScope) -> crate::Result<Self> {
        let declared = VariableByteInteger::decode(buffer)?.0 as usize;

        if buffer.remaining() < declared {
            return Err(Error::PropertyLengthMismatch {
                declared,
                actual: buffer.remaining(),
            });
        }

        let mut block = Buf::take(&mut *buffer, declared);
        let mut properties = Properties::new();

        let overrun = |e: Error, remaining: usize| match e {
            Error::InsufficientBytes { needed, .. } => Error::PropertyLengthMismatch {
                declared,
                actual: declared - remaining + needed,
            },
            Error::MalformedVarInt if remaining < 4 => Error::PropertyLengthMismatch {
                declared,
                actual: declared + 1,
            },
            e => e,
        };

        while block.has_remaining() {
            let remaining = block.remaining();
            let id = VariableByteInteger::decode(&mut block).map_err(|e| overrun(e, remaining))?;
            let id = PropertyId::try_from(id.0)?;

            let remaining = block.remaining();
            let property =
                Property::decode_value(id, &mut block).map_err(|e| overrun(e, remaining))?;

            check_entry(&properties.0, &property, scope)?;
            properties.0.push(property);
        }

        Ok(properties)
    }
}

fn check_entry(before: &[Property], property: &Property, scope: PropertyScope) -> crate::Result<()> {
    let id = property.id();

    if !id.is_allowed_in(scope) {
        return Err(Error::PropertyNotAllowed { id, scope });
    }

    if !id.allows_duplicates(scope) && before.iter().any(|p| p.id() == id) {
        return Err(Error::DuplicatePropertyNotAllowed(id));
    }

    property.check_value()
}

impl Encoder for Properties {
    /// Writes the length prefix and the entries. The prefix is taken from the
    /// bytes actually produced.
    fn encode(&self, buffer: &mut BytesMut) {
        let mut entries = BytesMut::with_capacity(self.entries_size());

        for property in &self.0 {
            VariableByteInteger(property.id() as u32).encode(&mut entries);
            property.encode_value(&mut entries);
        }

        VariableByteInteger(entries.len() as u32).encode(buffer);
        buffer.extend_from_slice(&entries);
    }

    fn encoded_size(&self) -> usize {
        let len = self.entries_size();
        var_int_len(len) + len
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Properties(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
