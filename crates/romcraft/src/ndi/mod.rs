//! The NDI tool definition format: fixed 752-byte `.rom` images describing a passive
//! or active optical tracking tool.
//!
//! [layout::tool] is the dynamic schema; [ToolDefinition] is the typed view most
//! callers want.

pub mod checksum;
pub mod layout;
pub mod sequence;
pub mod tool;

pub use layout::{MarkerType, RECORD_SIZE, ToolMainType, ToolSubType};
pub use tool::{FaceGeometry, Geometry, Header, ToolDefinition, ToolDetails};
