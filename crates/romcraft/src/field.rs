//! The [FieldType] contract and the named [Field]s a [crate::schema::Schema] is built from.

use std::{fmt, sync::Arc};

use crate::{errors::CodecError, schema::Schema, value::Value};

/// Encode/decode behaviour shared by every field of one kind.
///
/// Implementations must be fixed-size: `encode` always returns exactly `size()` bytes and
/// `decode` is handed exactly `size()` bytes. [Schema] implements this trait too, which is
/// how structs nest.
pub trait FieldType: fmt::Debug + Send + Sync {
    /// Number of bytes this type occupies.
    fn size(&self) -> usize;

    /// Value used for freshly constructed records.
    fn default_value(&self) -> Value;

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Returns the schema if this type is a nested struct.
    fn as_schema(&self) -> Option<&Schema> {
        None
    }
}

/// A single named field in a schema: a field type and an optional default override.
///
/// Position in the layout is the position in the list handed to [Schema::compile].
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: Arc<dyn FieldType>,
    default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: impl FieldType + 'static) -> Self {
        Self::shared(name, Arc::new(kind))
    }

    /// Builds a field around a field type that is shared with other schemas.
    pub fn shared(name: impl Into<String>, kind: Arc<dyn FieldType>) -> Self {
        Field {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Overrides the field type's default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &dyn FieldType {
        self.kind.as_ref()
    }

    pub fn size(&self) -> usize {
        self.kind.size()
    }

    pub fn default_value(&self) -> Value {
        match &self.default {
            Some(value) => value.clone(),
            None => self.kind.default_value(),
        }
    }

    /// Decodes this field from the front of `data`, returning the value and the unconsumed rest.
    pub fn decode<'a>(&self, data: &'a [u8]) -> Result<(Value, &'a [u8]), CodecError> {
        let size = self.size();
        if data.len() < size {
            return Err(CodecError::InsufficientData {
                required: size,
                actual: data.len(),
            });
        }

        let (head, rest) = data.split_at(size);
        Ok((self.kind.decode(head)?, rest))
    }

    /// Appends the encoding of `value` to `buf`.
    pub fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        let encoded = self.kind.encode(value)?;
        self.append(encoded, buf)
    }

    /// Like [Field::encode], but a nested struct runs its hooks against `value` itself, so
    /// values they derive stay visible to the caller.
    pub(crate) fn encode_in_place(
        &self,
        value: &mut Value,
        buf: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        match (self.kind.as_schema(), value) {
            (Some(schema), Value::Struct(record)) => {
                let encoded = schema.encode(record)?;
                self.append(encoded, buf)
            }
            (_, value) => self.encode(value, buf),
        }
    }

    fn append(&self, encoded: Vec<u8>, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        if encoded.len() != self.size() {
            return Err(CodecError::LengthMismatch {
                field: self.name.clone(),
                expected: self.size(),
                actual: encoded.len(),
            });
        }

        buf.extend_from_slice(&encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::kinds::Primitive;

    use super::*;

    #[derive(Debug)]
    struct Broken;

    impl FieldType for Broken {
        fn size(&self) -> usize {
            2
        }

        fn default_value(&self) -> Value {
            Value::Int(0)
        }

        fn decode(&self, _data: &[u8]) -> Result<Value, CodecError> {
            Ok(Value::Int(0))
        }

        fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
            Ok(vec![0])
        }
    }

    #[test]
    fn test_decode_consumes_prefix() {
        let field = Field::new("revision", Primitive::U16);
        let (value, rest) = field.decode(&[0x34, 0x12, 0xFF]).unwrap();

        assert_eq!(value, Value::Int(0x1234));
        assert_eq!(rest, &[0xFF]);
    }

    #[test]
    fn test_decode_insufficient_data() {
        let field = Field::new("revision", Primitive::U16);

        assert_eq!(
            field.decode(&[0x34]).unwrap_err(),
            CodecError::InsufficientData {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_encode_appends() {
        let field = Field::new("angle", Primitive::U8);
        let mut buf = vec![0xAA];
        field.encode(&Value::Int(90), &mut buf).unwrap();

        assert_eq!(buf, vec![0xAA, 90]);
    }

    #[test]
    fn test_default_override() {
        let field = Field::new("angle", Primitive::U8).with_default(90i64);
        assert_eq!(field.default_value(), Value::Int(90));

        let field = Field::new("angle", Primitive::U8);
        assert_eq!(field.default_value(), Value::Int(0));
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let field = Field::new("broken", Broken);
        let mut buf = Vec::new();

        assert_eq!(
            field.encode(&Value::Int(0), &mut buf).unwrap_err(),
            CodecError::LengthMismatch {
                field: "broken".to_string(),
                expected: 2,
                actual: 1
            }
        );
        assert!(buf.is_empty());
    }
}
