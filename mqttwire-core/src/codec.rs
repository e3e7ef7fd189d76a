use std::mem;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::Error;

/// Largest value a variable byte integer can carry.
pub const VAR_INT_MAX: u32 = 268_435_455;

/// Largest length a two-byte length prefix can carry.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

pub trait Decoder {
    fn decode<T>(buffer: &mut T) -> crate::Result<Self>
    where
        Self: Sized,
        T: Buf;
}

pub trait Encoder {
    fn encode(&self, buffer: &mut BytesMut);
    fn encoded_size(&self) -> usize {
        mem::size_of_val(self)
    }
}

pub fn ensure_remaining<T: Buf>(buffer: &T, needed: usize) -> crate::Result<()> {
    if buffer.remaining() < needed {
        return Err(Error::InsufficientBytes {
            needed,
            remaining: buffer.remaining(),
        });
    }

    Ok(())
}

/// Checks that a length-prefixed field fits its two-byte prefix.
pub fn check_field_len(field: &'static str, len: usize) -> crate::Result<()> {
    if len > MAX_FIELD_LEN {
        return Err(Error::FieldTooLong { field, len });
    }

    Ok(())
}

/// Checks that a string field would decode again: it fits its length
/// prefix and carries no U+0000.
pub fn check_string(field: &'static str, value: &str) -> crate::Result<()> {
    check_field_len(field, value.len())?;

    if value.contains('\0') {
        return Err(Error::InvalidUtf8String { field });
    }

    Ok(())
}

const CONTINUATION: u8 = 0x80;

fn put_var_int(mut value: u32, buffer: &mut BytesMut) {
    debug_assert!(value <= VAR_INT_MAX);

    while value >= CONTINUATION as u32 {
        buffer.put_u8(value as u8 | CONTINUATION);
        value >>= 7;
    }
    buffer.put_u8(value as u8);
}

/// Encodes `value` as a variable byte integer, rejecting values that would
/// need more than four bytes.
pub fn encode_var_int(value: u32, buffer: &mut BytesMut) -> crate::Result<()> {
    if value > VAR_INT_MAX {
        return Err(Error::VarIntOutOfRange(value));
    }

    put_var_int(value, buffer);
    Ok(())
}

/// Number of bytes `value` occupies once encoded as a variable byte integer.
pub fn var_int_len(value: usize) -> usize {
    match value {
        0..=127 => 1,
        128..=16383 => 2,
        16384..=2097151 => 3,
        _ => 4,
    }
}

/// Folds up to four bytes into a value. `Ok(None)` means `bytes` ran out
/// before a byte without the continuation bit.
fn fold_var_int(bytes: impl IntoIterator<Item = u8>) -> crate::Result<Option<(u32, usize)>> {
    let mut value = 0u32;
    let mut used = 0;

    for byte in bytes.into_iter().take(4) {
        value |= u32::from(byte & !CONTINUATION) << (7 * used);
        used += 1;

        if byte & CONTINUATION == 0 {
            return Ok(Some((value, used)));
        }
    }

    match used {
        4 => Err(Error::MalformedVarInt),
        _ => Ok(None),
    }
}

#[derive(PartialEq, Eq, Debug, Default, Clone, Copy)]
pub struct VariableByteInteger(pub u32);

impl VariableByteInteger {
    /// Reads a variable byte integer from the front of `src` without
    /// consuming it. Returns the value and the number of bytes it occupies,
    /// or `None` when `src` ends before the terminating byte.
    pub fn peek(src: &[u8]) -> crate::Result<Option<(u32, usize)>> {
        fold_var_int(src.iter().copied())
    }
}

impl Encoder for VariableByteInteger {
    fn encode(&self, buffer: &mut BytesMut) {
        put_var_int(self.0, buffer);
    }

    fn encoded_size(&self) -> usize {
        var_int_len(self.0 as usize)
    }
}

impl Decoder for VariableByteInteger {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        let bytes = std::iter::from_fn(|| {
            if buffer.has_remaining() {
                Some(buffer.get_u8())
            } else {
                None
            }
        });

        match fold_var_int(bytes)? {
            Some((value, _)) => Ok(VariableByteInteger(value)),
            None => Err(Error::MalformedVarInt),
        }
    }
}

/// Decodes a length-prefixed UTF-8 string, naming `field` in any error.
///
/// MQTT forbids U+0000 in every string, so it is rejected along with
/// invalid UTF-8.
pub fn decode_string<T: Buf>(buffer: &mut T, field: &'static str) -> crate::Result<String> {
    ensure_remaining(buffer, 2)?;
    let length = buffer.get_u16() as usize;
    ensure_remaining(buffer, length)?;

    let bytes = buffer.copy_to_bytes(length);

    match String::from_utf8(bytes.to_vec()) {
        Ok(s) if !s.contains('\0') => Ok(s),
        _ => Err(Error::InvalidUtf8String { field }),
    }
}

impl Encoder for String {
    fn encode(&self, buffer: &mut BytesMut) {
        self.as_str().encode(buffer);
    }

    fn encoded_size(&self) -> usize {
        self.len() + mem::size_of::<u16>()
    }
}

impl Decoder for String {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        decode_string(buffer, "UTF-8 string")
    }
}

impl Encoder for &str {
    fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u16(self.len() as u16);
        buffer.put(self.as_bytes());
    }

    fn encoded_size(&self) -> usize {
        self.len() + mem::size_of::<u16>()
    }
}

/// Two UTF-8 strings, used by the User Property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPair {
    pub key: String,
    pub value: String,
}

impl StringPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        StringPair {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Encoder for StringPair {
    fn encode(&self, buffer: &mut BytesMut) {
        self.key.encode(buffer);
        self.value.encode(buffer);
    }

    fn encoded_size(&self) -> usize {
        self.key.encoded_size() + self.value.encoded_size()
    }
}

impl Decoder for StringPair {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        Ok(StringPair {
            key: decode_string(buffer, "user property key")?,
            value: decode_string(buffer, "user property value")?,
        })
    }
}

impl Encoder for u8 {
    fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u8(*self);
    }
}

impl Decoder for u8 {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        ensure_remaining(buffer, 1)?;
        Ok(buffer.get_u8())
    }
}

impl Encoder for u16 {
    fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u16(*self);
    }
}

impl Decoder for u16 {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        ensure_remaining(buffer, 2)?;
        Ok(buffer.get_u16())
    }
}

impl Encoder for u32 {
    fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u32(*self);
    }
}

impl Decoder for u32 {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        ensure_remaining(buffer, 4)?;
        Ok(buffer.get_u32())
    }
}

impl Encoder for Bytes {
    fn encode(&self, buffer: &mut BytesMut) {
        buffer.put_u16(self.len() as u16);
        buffer.extend_from_slice(self);
    }

    fn encoded_size(&self) -> usize {
        mem::size_of::<u16>() + self.len()
    }
}

impl Decoder for Bytes {
    fn decode<T: Buf>(buffer: &mut T) -> crate::Result<Self> {
        ensure_remaining(buffer, 2)?;
        let length = buffer.get_u16() as usize;
        ensure_remaining(buffer, length)?;

        Ok(buffer.copy_to_bytes(length))
    }
}

impl<E: Encoder> Encoder for Option<E> {
    fn encode(&self, buffer: &mut BytesMut) {
        self.iter().for_each(|value| value.encode(buffer));
    }

    fn encoded_size(&self) -> usize {
        self.as_ref().map_or(0, Encoder::encoded_size)
    }
}

impl<E: Encoder> Encoder for Vec<E> {
    fn encode(&self, buffer: &mut BytesMut) {
        self.iter().for_each(|value| value.encode(buffer));
    }

    fn encoded_size(&self) -> usize {
        self.iter().map(Encoder::encoded_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::{codec::*, error::Error};

    #[test]
    fn test_var_int_wire_bytes() {
        let cases: [(u32, &[u8]); 4] = [
            (64, &[0x40]),
            (321, &[0xc1, 0x02]),
            (16_384, &[0x80, 0x80, 0x01]),
            (VAR_INT_MAX, &[0xff, 0xff, 0xff, 0x7f]),
        ];

        for (value, wire) in cases {
            let mut encoded = BytesMut::new();
            VariableByteInteger(value).encode(&mut encoded);
            assert_eq!(&encoded[..], wire);

            let mut src = Bytes::copy_from_slice(wire);
            assert_eq!(VariableByteInteger::decode(&mut src).unwrap().0, value);
            assert!(src.is_empty());
        }
    }

    #[test]
    fn test_var_int_boundaries() {
        let cases = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (268_435_455, 4),
        ];

        for (value, len) in cases {
            let mut encoded = BytesMut::new();
            encode_var_int(value, &mut encoded).expect("in range");

            assert_eq!(encoded.len(), len, "value {value}");
            assert_eq!(VariableByteInteger(value).encoded_size(), len);
            assert_eq!(VariableByteInteger::decode(&mut encoded).unwrap().0, value);
        }
    }

    #[test]
    fn test_var_int_out_of_range() {
        let mut encoded = BytesMut::new();

        match encode_var_int(268_435_456, &mut encoded) {
            Err(Error::VarIntOutOfRange(v)) => assert_eq!(v, 268_435_456),
            r => panic!("unexpected result {r:?}"),
        }
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_var_int_fifth_byte_rejected() {
        let mut encoded = Bytes::from_static(&[0x80, 0x81, 0x82, 0x83, 0x01]);

        assert!(matches!(
            VariableByteInteger::decode(&mut encoded),
            Err(Error::MalformedVarInt)
        ));
        assert_eq!(encoded.remaining(), 1);
    }

    #[test]
    fn test_decoder_exhausted_integer() {
        let mut encoded = Bytes::from(vec![0xff, 0xff]);

        assert!(matches!(
            VariableByteInteger::decode(&mut encoded),
            Err(Error::MalformedVarInt)
        ));
    }

    #[test]
    fn test_peek() {
        assert_eq!(VariableByteInteger::peek(&[0x2a, 0xff]).unwrap(), Some((42, 1)));
        assert_eq!(VariableByteInteger::peek(&[0xc5]).unwrap(), None);
        assert_eq!(VariableByteInteger::peek(&[]).unwrap(), None);
        assert!(matches!(
            VariableByteInteger::peek(&[0x80, 0x80, 0x80, 0x80]),
            Err(Error::MalformedVarInt)
        ));
    }

    #[test]
    fn test_string_rejects_invalid_utf8() {
        let mut encoded = Bytes::from(vec![0x00, 0x02, 0xc3, 0x28]);

        match decode_string(&mut encoded, "topic name") {
            Err(Error::InvalidUtf8String { field }) => assert_eq!(field, "topic name"),
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_string_rejects_null_char() {
        let mut encoded = Bytes::from(vec![0x00, 0x03, b'a', 0x00, b'b']);

        assert!(matches!(
            String::decode(&mut encoded),
            Err(Error::InvalidUtf8String { .. })
        ));
    }

    #[test]
    fn test_string_underflow() {
        let mut encoded = Bytes::from(vec![0x00, 0x05, b'a']);

        match String::decode(&mut encoded) {
            Err(Error::InsufficientBytes { needed, remaining }) => {
                assert_eq!(needed, 5);
                assert_eq!(remaining, 1);
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_check_string() {
        assert!(check_string("user name", "alice").is_ok());

        match check_string("user name", "al\0ice") {
            Err(Error::InvalidUtf8String { field }) => assert_eq!(field, "user name"),
            r => panic!("unexpected result {r:?}"),
        }

        assert!(matches!(
            check_string("user name", &"a".repeat(MAX_FIELD_LEN + 1)),
            Err(Error::FieldTooLong { len: 65_536, .. })
        ));
    }

    #[test]
    fn test_string_pair() {
        let pair = StringPair::new("key", "value");
        let mut encoded = BytesMut::new();
        pair.encode(&mut encoded);

        assert_eq!(encoded.len(), pair.encoded_size());
        assert_eq!(StringPair::decode(&mut encoded).unwrap(), pair);
    }
}
