//! # romcraft
//!
//! A library for encoding and decoding fixed-layout binary records using declarative
//! schemas.
//!
//! Declare a record as an ordered list of named fields (primitives, padding, constants,
//! fixed strings, vectors, arrays, enums and nested schemas), then decode byte slices
//! into [value::Record]s and encode them back. Per-schema [schema::Hooks] derive values
//! that do not map one-to-one onto bytes. The [ndi] module builds the NDI tool
//! definition (`.rom`) format on top.
//!
//! ## Example
//!
//! ```
//! use romcraft::field::Field;
//! use romcraft::kinds::{FixedString, Primitive};
//! use romcraft::schema::Schema;
//!
//! let schema = Schema::compile(
//!     "tag",
//!     vec![
//!         Field::new("id", Primitive::U16),
//!         Field::new("name", FixedString::new(4)),
//!     ],
//! )
//! .unwrap();
//!
//! let mut record = schema.decode(&[0x2A, 0x00, b'A', b'B', 0, 0]).unwrap();
//! assert_eq!(record.int("id"), Ok(42));
//! assert_eq!(record.str("name"), Ok("AB"));
//!
//! record.set("id", 7i64);
//! assert_eq!(schema.encode(&mut record).unwrap(), vec![7, 0, b'A', b'B', 0, 0]);
//! ```

pub mod bits;
pub mod errors;
pub mod field;
pub mod kinds;
pub mod ndi;
pub mod schema;
pub mod value;

pub use errors::{CodecError, SchemaError};
pub use field::{Field, FieldType};
pub use schema::{Hooks, Schema};
pub use value::{Record, Value};
