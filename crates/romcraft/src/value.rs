//! Dynamic values produced by field types, and the per-instance storage of a struct.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::errors::CodecError;

/// A value decoded from (or to be encoded into) a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Sentinel produced by padding; carries no information.
    Unit,
    Int(i64),
    Float(f64),
    /// Raw bytes, as observed for constant fields.
    Bytes(Vec<u8>),
    Str(String),
    Vec3([f64; 3]),
    Array(Vec<Value>),
    /// An enum option: its integer value and label.
    Enum { value: u64, label: String },
    /// A calendar date derived by a hook; never stored directly in bytes.
    Date(NaiveDate),
    /// A nested struct instance.
    Struct(Record),
}

impl Value {
    /// Short name of the variant, used in [CodecError::TypeMismatch].
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Vec3(_) => "vec3",
            Value::Array(_) => "array",
            Value::Enum { .. } => "enum",
            Value::Date(_) => "date",
            Value::Struct(_) => "struct",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<(u64, &str)> {
        match self {
            Value::Enum { value, label } => Some((*value, label)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str) -> CodecError {
        CodecError::TypeMismatch {
            expected,
            found: self.kind_name(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<[f64; 3]> for Value {
    fn from(value: [f64; 3]) -> Self {
        Value::Vec3(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Struct(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

/// One instance of a struct: a value per declared field, plus any values derived by hooks.
///
/// Layout order lives in the [crate::schema::Schema]; the record itself is keyed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Sets `name` to `value`, returning the previous value if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Like [Record::get] but fails with [CodecError::UnknownField].
    pub fn value(&self, name: &str) -> Result<&Value, CodecError> {
        self.values
            .get(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))
    }

    pub fn value_mut(&mut self, name: &str) -> Result<&mut Value, CodecError> {
        self.values
            .get_mut(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))
    }

    pub fn int(&self, name: &str) -> Result<i64, CodecError> {
        let value = self.value(name)?;
        value.as_int().ok_or_else(|| value.mismatch("int"))
    }

    pub fn float(&self, name: &str) -> Result<f64, CodecError> {
        let value = self.value(name)?;
        value.as_float().ok_or_else(|| value.mismatch("float"))
    }

    pub fn str(&self, name: &str) -> Result<&str, CodecError> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| value.mismatch("string"))
    }

    pub fn array(&self, name: &str) -> Result<&[Value], CodecError> {
        let value = self.value(name)?;
        value.as_array().ok_or_else(|| value.mismatch("array"))
    }

    pub fn enumeration(&self, name: &str) -> Result<(u64, &str), CodecError> {
        let value = self.value(name)?;
        value.as_enum().ok_or_else(|| value.mismatch("enum"))
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate, CodecError> {
        let value = self.value(name)?;
        value.as_date().ok_or_else(|| value.mismatch("date"))
    }

    pub fn record(&self, name: &str) -> Result<&Record, CodecError> {
        let value = self.value(name)?;
        value.as_record().ok_or_else(|| value.mismatch("struct"))
    }

    pub fn record_mut(&mut self, name: &str) -> Result<&mut Record, CodecError> {
        let value = self.value_mut(name)?;
        match value {
            Value::Struct(r) => Ok(r),
            other => Err(other.mismatch("struct")),
        }
    }

    /// Array of [Value::Vec3] elements, as triples.
    pub fn vec3s(&self, name: &str) -> Result<Vec<[f64; 3]>, CodecError> {
        self.array(name)?
            .iter()
            .map(|v| v.as_vec3().ok_or_else(|| v.mismatch("vec3")))
            .collect()
    }

    /// Array of [Value::Int] elements.
    pub fn ints(&self, name: &str) -> Result<Vec<i64>, CodecError> {
        self.array(name)?
            .iter()
            .map(|v| v.as_int().ok_or_else(|| v.mismatch("int")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut record = Record::new();
        record.set("count", 4i64);
        record.set("name", "ACME");
        record.set("points", vec![[1.0, 2.0, 3.0]]);

        assert_eq!(record.int("count"), Ok(4));
        assert_eq!(record.float("count"), Ok(4.0));
        assert_eq!(record.str("name"), Ok("ACME"));
        assert_eq!(record.vec3s("points"), Ok(vec![[1.0, 2.0, 3.0]]));
    }

    #[test]
    fn test_missing_and_mismatched() {
        let mut record = Record::new();
        record.set("name", "ACME");

        assert_eq!(
            record.int("count"),
            Err(CodecError::UnknownField("count".to_string()))
        );
        assert_eq!(
            record.int("name"),
            Err(CodecError::TypeMismatch {
                expected: "int",
                found: "string"
            })
        );
    }

    #[test]
    fn test_nested_record_mut() {
        let mut outer = Record::new();
        outer.set("inner", Record::new());
        outer.record_mut("inner").unwrap().set("x", 1i64);

        assert_eq!(outer.record("inner").unwrap().int("x"), Ok(1));
    }
}
