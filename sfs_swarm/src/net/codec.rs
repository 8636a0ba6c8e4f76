//! Binary packet framing and object serialization for the SmartFox 2X protocol.
//!
//! A packet is a header byte, a big-endian length (u16, or u32 when the
//! big-size flag is set) and a serialized object, optionally zlib-compressed.
//! All multi-byte numbers are big-endian.

use super::{
    errors::{CodecError, Result},
    payload::{SfsArray, SfsObject, SfsValue},
};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use std::io::{Read, Write};

/// Maximum accepted packet payload (server default max message size is lower).
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Payloads larger than this are compressed before sending.
const COMPRESSION_THRESHOLD: usize = 1024;

/// Deepest object/array nesting accepted from the wire
const MAX_DEPTH: usize = 64;

const FLAG_BINARY: u8 = 0x80;
const FLAG_ENCRYPTED: u8 = 0x40;
const FLAG_COMPRESSED: u8 = 0x20;
const FLAG_BLUEBOX: u8 = 0x10;
const FLAG_BIG_SIZE: u8 = 0x08;

mod type_id {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const BYTE: u8 = 2;
    pub const SHORT: u8 = 3;
    pub const INT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const FLOAT: u8 = 6;
    pub const DOUBLE: u8 = 7;
    pub const UTF_STRING: u8 = 8;
    pub const BOOL_ARRAY: u8 = 9;
    pub const BYTE_ARRAY: u8 = 10;
    pub const SHORT_ARRAY: u8 = 11;
    pub const INT_ARRAY: u8 = 12;
    pub const LONG_ARRAY: u8 = 13;
    pub const FLOAT_ARRAY: u8 = 14;
    pub const DOUBLE_ARRAY: u8 = 15;
    pub const UTF_STRING_ARRAY: u8 = 16;
    pub const SFS_ARRAY: u8 = 17;
    pub const SFS_OBJECT: u8 = 18;
    pub const TEXT: u8 = 20;
}

/// Frame an object into a packet ready to be sent as one binary message.
pub fn encode_packet(message: &SfsObject) -> Result<Vec<u8>> {
    let mut body = encode_object(message)?;
    let mut header = FLAG_BINARY;

    if body.len() > COMPRESSION_THRESHOLD {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        let compressed = encoder.finish()?;
        if compressed.len() < body.len() {
            body = compressed;
            header |= FLAG_COMPRESSED;
        }
    }

    if body.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            actual: body.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(body.len() + 5);
    if body.len() > u16::MAX as usize {
        header |= FLAG_BIG_SIZE;
        buf.push(header);
        buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    } else {
        buf.push(header);
        buf.extend_from_slice(&(body.len() as u16).to_be_bytes());
    }
    buf.extend(body);
    Ok(buf)
}

/// Parse one framed packet.
pub fn decode_packet(data: &[u8]) -> Result<SfsObject> {
    let mut reader = Reader::new(data);
    let header = reader.u8()?;

    if header & FLAG_BINARY == 0 || header & (FLAG_ENCRYPTED | FLAG_BLUEBOX) != 0 {
        return Err(CodecError::UnsupportedHeader(header));
    }

    let len = if header & FLAG_BIG_SIZE != 0 {
        reader.u32()? as usize
    } else {
        reader.u16()? as usize
    };

    if len > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            actual: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let body = reader.take(len)?;
    if header & FLAG_COMPRESSED != 0 {
        let mut inflated = Vec::new();
        ZlibDecoder::new(body)
            .take(MAX_MESSAGE_SIZE as u64 + 1)
            .read_to_end(&mut inflated)?;
        if inflated.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge {
                actual: inflated.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        decode_object(&inflated)
    } else {
        decode_object(body)
    }
}

/// Serialize an object including its leading type byte.
pub fn encode_object(object: &SfsObject) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_object(&mut buf, object)?;
    Ok(buf)
}

/// Deserialize an object that starts with its type byte.
pub fn decode_object(data: &[u8]) -> Result<SfsObject> {
    let mut reader = Reader::new(data);
    let id = reader.u8()?;
    if id != type_id::SFS_OBJECT {
        return Err(CodecError::NotAnObject(id));
    }
    reader.object_body()
}

fn write_len16(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u16::try_from(len).map_err(|_| CodecError::FieldTooLong(len))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_len32(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| CodecError::FieldTooLong(len))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_str16(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    write_len16(buf, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_object(buf: &mut Vec<u8>, object: &SfsObject) -> Result<()> {
    buf.push(type_id::SFS_OBJECT);
    write_len16(buf, object.len())?;
    for (key, value) in object.iter() {
        write_str16(buf, key)?;
        write_value(buf, value)?;
    }
    Ok(())
}

fn write_array(buf: &mut Vec<u8>, array: &SfsArray) -> Result<()> {
    buf.push(type_id::SFS_ARRAY);
    write_len16(buf, array.len())?;
    for value in array.iter() {
        write_value(buf, value)?;
    }
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, value: &SfsValue) -> Result<()> {
    match value {
        SfsValue::Null => buf.push(type_id::NULL),
        SfsValue::Bool(v) => {
            buf.push(type_id::BOOL);
            buf.push(u8::from(*v));
        }
        SfsValue::Byte(v) => {
            buf.push(type_id::BYTE);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Short(v) => {
            buf.push(type_id::SHORT);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Int(v) => {
            buf.push(type_id::INT);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Long(v) => {
            buf.push(type_id::LONG);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Float(v) => {
            buf.push(type_id::FLOAT);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Double(v) => {
            buf.push(type_id::DOUBLE);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        SfsValue::Utf(s) => {
            buf.push(type_id::UTF_STRING);
            write_str16(buf, s)?;
        }
        SfsValue::Text(s) => {
            buf.push(type_id::TEXT);
            write_len32(buf, s.len())?;
            buf.extend_from_slice(s.as_bytes());
        }
        SfsValue::BoolArray(items) => {
            buf.push(type_id::BOOL_ARRAY);
            write_len16(buf, items.len())?;
            buf.extend(items.iter().map(|b| u8::from(*b)));
        }
        SfsValue::ByteArray(bytes) => {
            buf.push(type_id::BYTE_ARRAY);
            write_len32(buf, bytes.len())?;
            buf.extend_from_slice(bytes);
        }
        SfsValue::ShortArray(items) => {
            buf.push(type_id::SHORT_ARRAY);
            write_len16(buf, items.len())?;
            items.iter().for_each(|v| buf.extend_from_slice(&v.to_be_bytes()));
        }
        SfsValue::IntArray(items) => {
            buf.push(type_id::INT_ARRAY);
            write_len16(buf, items.len())?;
            items.iter().for_each(|v| buf.extend_from_slice(&v.to_be_bytes()));
        }
        SfsValue::LongArray(items) => {
            buf.push(type_id::LONG_ARRAY);
            write_len16(buf, items.len())?;
            items.iter().for_each(|v| buf.extend_from_slice(&v.to_be_bytes()));
        }
        SfsValue::FloatArray(items) => {
            buf.push(type_id::FLOAT_ARRAY);
            write_len16(buf, items.len())?;
            items.iter().for_each(|v| buf.extend_from_slice(&v.to_be_bytes()));
        }
        SfsValue::DoubleArray(items) => {
            buf.push(type_id::DOUBLE_ARRAY);
            write_len16(buf, items.len())?;
            items.iter().for_each(|v| buf.extend_from_slice(&v.to_be_bytes()));
        }
        SfsValue::UtfArray(items) => {
            buf.push(type_id::UTF_STRING_ARRAY);
            write_len16(buf, items.len())?;
            for s in items {
                write_str16(buf, s)?;
            }
        }
        SfsValue::Array(array) => write_array(buf, array)?,
        SfsValue::Object(object) => write_object(buf, object)?,
    }
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Containers currently open
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// Read a nested container body, bounding the recursion.
    fn nested<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::TooDeep { max: MAX_DEPTH });
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(CodecError::Truncated {
                needed: n - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn len32(&mut self) -> Result<usize> {
        let len = i32::from_be_bytes(self.array()?);
        usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))
    }

    fn str16(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        Ok(String::from_utf8(self.take(len)?.to_vec())?)
    }

    fn repeat<T>(&mut self, mut read: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.u16()? as usize;
        let mut out = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    fn object_body(&mut self) -> Result<SfsObject> {
        self.nested(|r| {
            let count = r.u16()? as usize;
            let mut object = SfsObject::new();
            for _ in 0..count {
                let key = r.str16()?;
                let value = r.value()?;
                object.put(key, value);
            }
            Ok(object)
        })
    }

    fn array_body(&mut self) -> Result<SfsArray> {
        self.nested(|r| {
            let items = r.repeat(Self::value)?;
            Ok(items.into_iter().collect())
        })
    }

    fn value(&mut self) -> Result<SfsValue> {
        let id = self.u8()?;
        let value = match id {
            type_id::NULL => SfsValue::Null,
            type_id::BOOL => SfsValue::Bool(self.u8()? != 0),
            type_id::BYTE => SfsValue::Byte(i8::from_be_bytes(self.array()?)),
            type_id::SHORT => SfsValue::Short(i16::from_be_bytes(self.array()?)),
            type_id::INT => SfsValue::Int(i32::from_be_bytes(self.array()?)),
            type_id::LONG => SfsValue::Long(i64::from_be_bytes(self.array()?)),
            type_id::FLOAT => SfsValue::Float(f32::from_be_bytes(self.array()?)),
            type_id::DOUBLE => SfsValue::Double(f64::from_be_bytes(self.array()?)),
            type_id::UTF_STRING => SfsValue::Utf(self.str16()?),
            type_id::TEXT => {
                let len = self.len32()?;
                SfsValue::Text(String::from_utf8(self.take(len)?.to_vec())?)
            }
            type_id::BOOL_ARRAY => SfsValue::BoolArray(self.repeat(|r| Ok(r.u8()? != 0))?),
            type_id::BYTE_ARRAY => {
                let len = self.len32()?;
                SfsValue::ByteArray(self.take(len)?.to_vec())
            }
            type_id::SHORT_ARRAY => {
                SfsValue::ShortArray(self.repeat(|r| Ok(i16::from_be_bytes(r.array()?)))?)
            }
            type_id::INT_ARRAY => {
                SfsValue::IntArray(self.repeat(|r| Ok(i32::from_be_bytes(r.array()?)))?)
            }
            type_id::LONG_ARRAY => {
                SfsValue::LongArray(self.repeat(|r| Ok(i64::from_be_bytes(r.array()?)))?)
            }
            type_id::FLOAT_ARRAY => {
                SfsValue::FloatArray(self.repeat(|r| Ok(f32::from_be_bytes(r.array()?)))?)
            }
            type_id::DOUBLE_ARRAY => {
                SfsValue::DoubleArray(self.repeat(|r| Ok(f64::from_be_bytes(r.array()?)))?)
            }
            type_id::UTF_STRING_ARRAY => SfsValue::UtfArray(self.repeat(Self::str16)?),
            type_id::SFS_ARRAY => SfsValue::Array(self.array_body()?),
            type_id::SFS_OBJECT => SfsValue::Object(self.object_body()?),
            other => return Err(CodecError::UnsupportedType(other)),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_bytes() {
        let mut obj = SfsObject::new();
        obj.put_int("x", 3);

        let bytes = encode_object(&obj).unwrap();
        assert_eq!(bytes, vec![18, 0, 1, 0, 1, b'x', 4, 0, 0, 0, 3]);
    }

    #[test]
    fn test_decode_nested_shop_response() {
        // {"shopID": int 2, "list": [ {"clip": "hat"} ]}
        let bytes: Vec<u8> = vec![
            18, 0, 2, //
            0, 6, b's', b'h', b'o', b'p', b'I', b'D', 4, 0, 0, 0, 2, //
            0, 4, b'l', b'i', b's', b't', 17, 0, 1, //
            18, 0, 1, 0, 4, b'c', b'l', b'i', b'p', 8, 0, 3, b'h', b'a', b't',
        ];

        let obj = decode_object(&bytes).unwrap();
        assert_eq!(obj.get_int("shopID"), Some(2));
        let list = obj.get_array("list").unwrap();
        assert_eq!(list.get_object(0).and_then(|p| p.get_utf("clip")), Some("hat"));
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = vec![18, 0, 1, 0, 1, b'x', 4, 0, 0];
        assert!(matches!(
            decode_object(&bytes),
            Err(CodecError::Truncated { needed: 2 })
        ));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode_object(&[17, 0, 0]),
            Err(CodecError::NotAnObject(17))
        ));
    }

    /// `{"p": [[...]]}` with `levels` arrays, the innermost empty
    fn nested_arrays(levels: usize) -> Vec<u8> {
        let mut bytes = vec![18, 0, 1, 0, 1, b'p'];
        for _ in 1..levels {
            bytes.extend_from_slice(&[17, 0, 1]);
        }
        bytes.extend_from_slice(&[17, 0, 0]);
        bytes
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let body = nested_arrays(200_000);
        let mut packet = vec![FLAG_BINARY | FLAG_BIG_SIZE];
        packet.extend_from_slice(&(body.len() as u32).to_be_bytes());
        packet.extend(body);

        assert!(matches!(
            decode_packet(&packet),
            Err(CodecError::TooDeep { max: MAX_DEPTH })
        ));
    }

    #[test]
    fn test_nesting_within_limit_decodes() {
        // The top-level object counts as one level.
        let obj = decode_object(&nested_arrays(MAX_DEPTH - 1)).unwrap();
        assert!(obj.get_array("p").is_some());

        assert!(matches!(
            decode_object(&nested_arrays(MAX_DEPTH)),
            Err(CodecError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_packet_header_and_length() {
        let mut obj = SfsObject::new();
        obj.put_byte("c", 0).put_short("a", 0);

        let packet = encode_packet(&obj).unwrap();
        let body_len = u16::from_be_bytes([packet[1], packet[2]]) as usize;

        assert_eq!(packet[0], FLAG_BINARY);
        assert_eq!(body_len, packet.len() - 3);
        assert_eq!(decode_packet(&packet).unwrap(), obj);
    }

    #[test]
    fn test_large_packet_is_compressed() {
        let mut obj = SfsObject::new();
        obj.put_utf("pad", "a".repeat(4000));

        let packet = encode_packet(&obj).unwrap();
        assert_ne!(packet[0] & FLAG_COMPRESSED, 0);
        assert_eq!(decode_packet(&packet).unwrap().get_utf("pad").map(str::len), Some(4000));
    }

    #[test]
    fn test_encrypted_packet_rejected() {
        let packet = [FLAG_BINARY | FLAG_ENCRYPTED, 0, 0];
        assert!(matches!(
            decode_packet(&packet),
            Err(CodecError::UnsupportedHeader(_))
        ));
    }
}
