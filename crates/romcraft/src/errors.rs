//! Error types for schema definition and for encoding/decoding records.

use thiserror::Error;

/// Errors produced while declaring a [crate::schema::Schema] or one of its field types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields of the same schema share a name.
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    /// An enum was declared without options.
    #[error("enum must declare at least one option")]
    EmptyEnum,
    /// Two enum options share the same integer value.
    #[error("enum option value {0} is declared more than once")]
    DuplicateEnumValue(u64),
    /// The enum default is not one of its options.
    #[error("enum default {0} is not one of the declared options")]
    InvalidEnumDefault(u64),
}

/// Errors produced while decoding bytes into a record or encoding a record into bytes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Fewer bytes remain than the field or struct requires.
    #[error("insufficient data: need {required} bytes, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    /// A fixed-width string contains non-ASCII bytes or characters.
    #[error("string is not ASCII: {0:?}")]
    Encoding(String),
    /// A string exceeds the fixed width of its field.
    #[error("value '{value}' is too long, max length is {max}")]
    ValueTooLong { value: String, max: usize },
    /// An array field was given more elements than its fixed length.
    #[error("array has {len} elements, max is {max}")]
    ArrayTooLarge { len: usize, max: usize },
    /// The decoded integer matches none of the enum's options.
    #[error("unknown enum value {0}")]
    UnknownEnumValue(u64),
    /// A field name that the schema (or record) does not declare.
    #[error("unknown field '{0}'")]
    UnknownField(String),
    /// A value of the wrong kind was supplied for a field.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A value does not fit the range its encoding can represent.
    #[error("value out of range: {0}")]
    OutOfRange(String),
    /// A field type produced a different number of bytes than its declared size.
    #[error("field '{field}' encoded {actual} bytes, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    /// The redundant month stored next to a packed date disagrees with the date.
    #[error("stored month {stored} disagrees with date {date}")]
    InconsistentDate { stored: u8, date: chrono::NaiveDate },
    /// The layout used for encoding failed to compile.
    #[error("invalid layout: {0}")]
    Schema(#[from] SchemaError),
}
