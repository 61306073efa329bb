//! Built-in field types: primitives, padding, constants, fixed strings, vectors, arrays
//! and enums. Multi-byte values are little-endian throughout.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    errors::{CodecError, SchemaError},
    field::FieldType,
    value::Value,
};

fn exact<const N: usize>(data: &[u8]) -> Result<[u8; N], CodecError> {
    data.try_into().map_err(|_| CodecError::InsufficientData {
        required: N,
        actual: data.len(),
    })
}

fn check_len(data: &[u8], required: usize) -> Result<(), CodecError> {
    if data.len() < required {
        return Err(CodecError::InsufficientData {
            required,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Fixed-width integer or float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl Primitive {
    fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    fn encode_int(self, v: i64) -> Result<Vec<u8>, CodecError> {
        let out_of_range = || CodecError::OutOfRange(format!("{v} does not fit {self:?}"));
        Ok(match self {
            Primitive::U8 => u8::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::U16 => u16::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::U32 => u32::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::I8 => i8::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::I16 => i16::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::I32 => i32::try_from(v).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
            Primitive::F32 | Primitive::F64 => self.encode_float(v as f64),
        })
    }

    fn encode_float(self, v: f64) -> Vec<u8> {
        match self {
            Primitive::F32 => (v as f32).to_le_bytes().to_vec(),
            _ => v.to_le_bytes().to_vec(),
        }
    }
}

impl FieldType for Primitive {
    fn size(&self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 => 1,
            Primitive::U16 | Primitive::I16 => 2,
            Primitive::U32 | Primitive::I32 | Primitive::F32 => 4,
            Primitive::F64 => 8,
        }
    }

    fn default_value(&self) -> Value {
        if self.is_float() {
            Value::Float(0.0)
        } else {
            Value::Int(0)
        }
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        Ok(match self {
            Primitive::U8 => Value::Int(u8::from_le_bytes(exact(data)?).into()),
            Primitive::U16 => Value::Int(u16::from_le_bytes(exact(data)?).into()),
            Primitive::U32 => Value::Int(u32::from_le_bytes(exact(data)?).into()),
            Primitive::I8 => Value::Int(i8::from_le_bytes(exact(data)?).into()),
            Primitive::I16 => Value::Int(i16::from_le_bytes(exact(data)?).into()),
            Primitive::I32 => Value::Int(i32::from_le_bytes(exact(data)?).into()),
            Primitive::F32 => Value::Float(f32::from_le_bytes(exact(data)?).into()),
            Primitive::F64 => Value::Float(f64::from_le_bytes(exact(data)?)),
        })
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        if self.is_float() {
            let v = value.as_float().ok_or_else(|| value.mismatch("float"))?;
            Ok(self.encode_float(v))
        } else {
            let v = value.as_int().ok_or_else(|| value.mismatch("int"))?;
            self.encode_int(v)
        }
    }
}

/// Zero bytes that carry no information. Decodes to [Value::Unit], always encodes zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    len: usize,
}

impl Padding {
    pub fn new(len: usize) -> Self {
        Padding { len }
    }
}

impl FieldType for Padding {
    fn size(&self) -> usize {
        self.len
    }

    fn default_value(&self) -> Value {
        Value::Unit
    }

    fn decode(&self, _data: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Unit)
    }

    fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(vec![0; self.len])
    }
}

/// Reserved bytes that must be written back as declared.
///
/// Decoding exposes the observed bytes for inspection; encoding ignores the value and
/// always emits the declared constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    bytes: Vec<u8>,
}

impl Constant {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Constant {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FieldType for Constant {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn default_value(&self) -> Value {
        Value::Bytes(self.bytes.clone())
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Bytes(data.to_vec()))
    }

    fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(self.bytes.clone())
    }
}

/// Fixed-width ASCII string, null padded on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedString {
    len: usize,
}

impl FixedString {
    pub fn new(len: usize) -> Self {
        FixedString { len }
    }
}

impl FieldType for FixedString {
    fn size(&self) -> usize {
        self.len
    }

    fn default_value(&self) -> Value {
        Value::Str(String::new())
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        let bytes: Vec<u8> = data.iter().copied().filter(|b| *b != 0).collect();

        if !bytes.is_ascii() {
            return Err(CodecError::Encoding(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }

        String::from_utf8(bytes)
            .map(Value::Str)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let s = value.as_str().ok_or_else(|| value.mismatch("string"))?;

        if !s.is_ascii() {
            return Err(CodecError::Encoding(s.to_string()));
        }
        if s.len() > self.len {
            return Err(CodecError::ValueTooLong {
                value: s.to_string(),
                max: self.len,
            });
        }

        let mut out = s.as_bytes().to_vec();
        out.resize(self.len, 0);
        Ok(out)
    }
}

/// XYZ vector of three 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vector3f;

impl FieldType for Vector3f {
    fn size(&self) -> usize {
        12
    }

    fn default_value(&self) -> Value {
        Value::Vec3([0.0; 3])
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        check_len(data, 12)?;

        let mut xyz = [0.0f64; 3];
        for (axis, chunk) in xyz.iter_mut().zip(data.chunks_exact(4)) {
            *axis = f32::from_le_bytes(exact(chunk)?).into();
        }

        Ok(Value::Vec3(xyz))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let xyz = value.as_vec3().ok_or_else(|| value.mismatch("vec3"))?;
        Ok(xyz
            .iter()
            .flat_map(|axis| (*axis as f32).to_le_bytes())
            .collect())
    }
}

/// Fixed-length array of a single element type.
///
/// Decoding always yields `len` elements; encoding pads short inputs with the element
/// type's default.
#[derive(Debug, Clone)]
pub struct Array {
    element: Arc<dyn FieldType>,
    len: usize,
}

impl Array {
    pub fn new(element: impl FieldType + 'static, len: usize) -> Self {
        Array {
            element: Arc::new(element),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FieldType for Array {
    fn size(&self) -> usize {
        self.len * self.element.size()
    }

    fn default_value(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        check_len(data, self.size())?;

        let step = self.element.size();
        let mut values = Vec::with_capacity(self.len);
        for i in 0..self.len {
            values.push(self.element.decode(&data[i * step..(i + 1) * step])?);
        }

        Ok(Value::Array(values))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let values = value.as_array().ok_or_else(|| value.mismatch("array"))?;

        if values.len() > self.len {
            return Err(CodecError::ArrayTooLarge {
                len: values.len(),
                max: self.len,
            });
        }

        let mut out = Vec::with_capacity(self.size());
        for v in values {
            out.extend(self.element.encode(v)?);
        }

        let padding = self.element.default_value();
        for _ in values.len()..self.len {
            out.extend(self.element.encode(&padding)?);
        }

        Ok(out)
    }
}

/// Integer-coded enumeration with labelled options.
///
/// Values need not be contiguous or ordered. The encoded width is the smallest number of
/// bytes that holds the largest option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    options: Vec<(u64, String)>,
    default: u64,
    size: usize,
}

impl Enum {
    pub fn new<L: Into<String>>(
        options: impl IntoIterator<Item = (u64, L)>,
        default: u64,
    ) -> Result<Self, SchemaError> {
        let options: Vec<(u64, String)> = options
            .into_iter()
            .map(|(value, label)| (value, label.into()))
            .collect();

        let mut seen = BTreeSet::new();
        for (value, _) in &options {
            if !seen.insert(*value) {
                return Err(SchemaError::DuplicateEnumValue(*value));
            }
        }

        let max = seen.last().copied().ok_or(SchemaError::EmptyEnum)?;
        if !seen.contains(&default) {
            return Err(SchemaError::InvalidEnumDefault(default));
        }

        let bits = (u64::BITS - max.leading_zeros()) as usize;
        let size = bits.div_ceil(8).max(1);

        Ok(Enum {
            options,
            default,
            size,
        })
    }

    pub fn options(&self) -> &[(u64, String)] {
        &self.options
    }

    /// The option with integer `value`, as a [Value::Enum].
    pub fn option(&self, value: u64) -> Option<Value> {
        self.options
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(value, label)| Value::Enum {
                value: *value,
                label: label.clone(),
            })
    }
}

impl FieldType for Enum {
    fn size(&self) -> usize {
        self.size
    }

    fn default_value(&self) -> Value {
        self.option(self.default)
            .unwrap_or(Value::Enum {
                value: self.default,
                label: String::new(),
            })
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        check_len(data, self.size)?;

        let value = data[..self.size]
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        self.option(value)
            .ok_or(CodecError::UnknownEnumValue(value))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let raw = match value {
            Value::Enum { value, .. } => *value,
            Value::Int(v) => u64::try_from(*v)
                .map_err(|_| CodecError::OutOfRange(format!("negative enum value {v}")))?,
            other => return Err(other.mismatch("enum")),
        };

        let bytes = raw.to_le_bytes();
        if bytes[self.size..].iter().any(|b| *b != 0) {
            return Err(CodecError::OutOfRange(format!(
                "enum value {raw} does not fit {} bytes",
                self.size
            )));
        }

        Ok(bytes[..self.size].to_vec())
    }
}
