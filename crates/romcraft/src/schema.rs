//! Schema: an ordered set of named [Field]s that encodes and decodes whole records.
//!
//! Fields are laid out in the order they were handed to [Schema::compile]; names only
//! identify fields, they never influence layout. A [Schema] is itself a [FieldType], so
//! schemas nest.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    errors::{CodecError, SchemaError},
    field::{Field, FieldType},
    value::{Record, Value},
};

/// Lifecycle callbacks attached to a [Schema].
///
/// Every callback receives the schema it belongs to, so hooks can [Schema::locate] or
/// [Schema::patch] their own fields. All callbacks default to no-ops.
pub trait Hooks: Send + Sync {
    /// Runs after a record is default-constructed from field defaults.
    fn init(&self, _schema: &Schema, _record: &mut Record) {}

    /// Derives higher-level values from the raw field values just decoded.
    fn post_decode(&self, _schema: &Schema, _record: &mut Record) -> Result<(), CodecError> {
        Ok(())
    }

    /// Derives raw field values from higher-level values before encoding.
    fn pre_encode(&self, _schema: &Schema, _record: &mut Record) -> Result<(), CodecError> {
        Ok(())
    }

    /// May rewrite the fully encoded bytes.
    fn post_encode(
        &self,
        _schema: &Schema,
        _record: &mut Record,
        _data: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        Ok(())
    }
}

struct NoHooks;

impl Hooks for NoHooks {}

/// A compiled struct layout. Use [Schema::compile] to build one from [Field]s, then
/// [Schema::decode] and [Schema::encode] to move between bytes and [Record]s.
#[derive(Clone)]
pub struct Schema {
    name: String,
    size: usize,
    /// Fields in layout order.
    fields: Vec<Field>,
    hooks: Arc<dyn Hooks>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Compiles `fields` into a schema. Fails if two fields share a name.
    pub fn compile(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !names.insert(field.name()) {
                return Err(SchemaError::DuplicateField(field.name().to_string()));
            }
        }

        let size = fields.iter().map(Field::size).sum();

        Ok(Schema {
            name: name.into(),
            size,
            fields,
            hooks: Arc::new(NoHooks),
        })
    }

    pub fn with_hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total encoded size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&Field, CodecError> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))
    }

    /// A record holding every field's default value, after the `init` hook.
    pub fn default_record(&self) -> Record {
        let mut record = Record::new();
        for field in &self.fields {
            record.set(field.name(), field.default_value());
        }

        self.hooks.init(self, &mut record);
        record
    }

    /// Byte offset and size of the field `name`.
    pub fn locate(&self, name: &str) -> Result<(usize, usize), CodecError> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name() == name {
                return Ok((offset, field.size()));
            }
            offset += field.size();
        }

        Err(CodecError::UnknownField(name.to_string()))
    }

    /// Absolute offset and size of a field reached through nested structs,
    /// e.g. `["header", "checksum"]`.
    pub fn locate_path(&self, path: &[&str]) -> Result<(usize, usize), CodecError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok((0, self.size));
        };

        let (offset, size) = self.locate(first)?;
        if rest.is_empty() {
            return Ok((offset, size));
        }

        let nested = self
            .field(first)?
            .kind()
            .as_schema()
            .ok_or(CodecError::TypeMismatch {
                expected: "struct",
                found: "field",
            })?;
        let (inner, size) = nested.locate_path(rest)?;

        Ok((offset + inner, size))
    }

    /// Decodes a record from the first [Schema::size] bytes of `data`.
    pub fn decode(&self, data: &[u8]) -> Result<Record, CodecError> {
        if data.len() < self.size {
            return Err(CodecError::InsufficientData {
                required: self.size,
                actual: data.len(),
            });
        }

        tracing::debug!(schema = %self.name, size = self.size, "decoding");

        let mut record = self.default_record();
        let mut rest = data;
        for field in &self.fields {
            let (value, remaining) = field.decode(rest)?;
            record.set(field.name(), value);
            rest = remaining;
        }

        self.hooks.post_decode(self, &mut record)?;
        Ok(record)
    }

    /// Encodes `record`, running the pre-encode and post-encode hooks.
    ///
    /// Hooks mutate `record` itself, so derived raw values stay visible afterwards.
    /// Fields missing from the record are encoded with their default.
    pub fn encode(&self, record: &mut Record) -> Result<Vec<u8>, CodecError> {
        tracing::debug!(schema = %self.name, size = self.size, "encoding");

        for field in &self.fields {
            if !record.contains(field.name()) {
                record.set(field.name(), field.default_value());
            }
        }

        self.hooks.pre_encode(self, record)?;

        let mut data = Vec::with_capacity(self.size);
        for field in &self.fields {
            let value = record.value_mut(field.name())?;
            field.encode_in_place(value, &mut data)?;
        }

        self.hooks.post_encode(self, record, &mut data)?;
        Ok(data)
    }

    /// Sets field `name` to `value` and returns just that field's encoding.
    pub fn update(
        &self,
        record: &mut Record,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<u8>, CodecError> {
        let field = self.field(name)?;
        let value = value.into();

        let mut buf = Vec::with_capacity(field.size());
        field.encode(&value, &mut buf)?;

        record.set(name, value);
        Ok(buf)
    }

    /// Like [Schema::update], and also writes the encoding into `data`, a buffer
    /// previously produced by this schema.
    pub fn patch(
        &self,
        record: &mut Record,
        data: &mut [u8],
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), CodecError> {
        let (offset, size) = self.locate(name)?;
        if data.len() < offset + size {
            return Err(CodecError::InsufficientData {
                required: offset + size,
                actual: data.len(),
            });
        }

        let encoded = self.update(record, name, value)?;
        data[offset..offset + size].copy_from_slice(&encoded);
        Ok(())
    }
}

impl FieldType for Schema {
    fn size(&self) -> usize {
        self.size
    }

    fn default_value(&self) -> Value {
        Value::Struct(self.default_record())
    }

    fn decode(&self, data: &[u8]) -> Result<Value, CodecError> {
        Schema::decode(self, data).map(Value::Struct)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut record = value
            .as_record()
            .cloned()
            .ok_or_else(|| value.mismatch("struct"))?;
        Schema::encode(self, &mut record)
    }

    fn as_schema(&self) -> Option<&Schema> {
        Some(self)
    }
}
