//! Structured payloads carried by requests, responses and extension commands.
//!
//! The model mirrors the SmartFox object/array types: named fields for objects,
//! positional items for arrays, and typed accessors that return `None` on a
//! missing key or a type mismatch.

/// A single typed value inside an [`SfsObject`] or [`SfsArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum SfsValue {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Utf(String),
    BoolArray(Vec<bool>),
    ByteArray(Vec<u8>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    UtfArray(Vec<String>),
    Array(SfsArray),
    Object(SfsObject),
    Text(String),
}

impl SfsValue {
    /// Integer view used where the server is loose about numeric widths
    /// (room ids, user counts).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SfsValue::Byte(v) => Some(i64::from(*v)),
            SfsValue::Short(v) => Some(i64::from(*v)),
            SfsValue::Int(v) => Some(i64::from(*v)),
            SfsValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SfsValue::Utf(s) | SfsValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Named fields, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfsObject {
    entries: Vec<(String, SfsValue)>,
}

impl SfsObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn put(&mut self, key: impl Into<String>, value: SfsValue) -> &mut Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.put(key, SfsValue::Bool(value))
    }

    pub fn put_byte(&mut self, key: impl Into<String>, value: i8) -> &mut Self {
        self.put(key, SfsValue::Byte(value))
    }

    pub fn put_short(&mut self, key: impl Into<String>, value: i16) -> &mut Self {
        self.put(key, SfsValue::Short(value))
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i32) -> &mut Self {
        self.put(key, SfsValue::Int(value))
    }

    pub fn put_utf(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.put(key, SfsValue::Utf(value.into()))
    }

    pub fn put_object(&mut self, key: impl Into<String>, value: SfsObject) -> &mut Self {
        self.put(key, SfsValue::Object(value))
    }

    pub fn put_array(&mut self, key: impl Into<String>, value: SfsArray) -> &mut Self {
        self.put(key, SfsValue::Array(value))
    }

    pub fn get(&self, key: &str) -> Option<&SfsValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            SfsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_byte(&self, key: &str) -> Option<i8> {
        match self.get(key)? {
            SfsValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_short(&self, key: &str) -> Option<i16> {
        match self.get(key)? {
            SfsValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            SfsValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_utf(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_object(&self, key: &str) -> Option<&SfsObject> {
        match self.get(key)? {
            SfsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn get_array(&self, key: &str) -> Option<&SfsArray> {
        match self.get(key)? {
            SfsValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SfsValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Positional items of mixed types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfsArray {
    items: Vec<SfsValue>,
}

impl SfsArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: SfsValue) -> &mut Self {
        self.items.push(value);
        self
    }

    pub fn add_int(&mut self, value: i32) -> &mut Self {
        self.push(SfsValue::Int(value))
    }

    pub fn add_utf(&mut self, value: impl Into<String>) -> &mut Self {
        self.push(SfsValue::Utf(value.into()))
    }

    pub fn add_object(&mut self, value: SfsObject) -> &mut Self {
        self.push(SfsValue::Object(value))
    }

    pub fn get(&self, index: usize) -> Option<&SfsValue> {
        self.items.get(index)
    }

    pub fn get_int(&self, index: usize) -> Option<i32> {
        match self.get(index)? {
            SfsValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_utf(&self, index: usize) -> Option<&str> {
        self.get(index)?.as_str()
    }

    pub fn get_object(&self, index: usize) -> Option<&SfsObject> {
        match self.get(index)? {
            SfsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn get_array(&self, index: usize) -> Option<&SfsArray> {
        match self.get(index)? {
            SfsValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SfsValue> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<SfsValue> for SfsArray {
    fn from_iter<I: IntoIterator<Item = SfsValue>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
