//! Byte layout of an NDI tool definition ROM.
//!
//! | offset | size | section |
//! |---|---|---|
//! | 0 | 24 | [header] |
//! | 24 | 556 | [geometry] |
//! | 580 | 33 | [tool_details] |
//! | 613 | 139 | [face_geometry] |

use std::sync::LazyLock;

use crate::{
    errors::{CodecError, SchemaError},
    field::Field,
    kinds::{Array, Constant, Enum, FixedString, Padding, Primitive, Vector3f},
    schema::{Hooks, Schema},
    value::{Record, Value},
};

use super::{checksum, sequence};

pub const RECORD_SIZE: usize = 752;
/// Capacity of the marker, normal, firing, face and group arrays.
pub const MAX_MARKERS: usize = 20;
pub const MAX_FACES: usize = 8;

pub const HEADER: &str = "header";
pub const GEOMETRY: &str = "geometry";
pub const TOOL_DETAILS: &str = "tool_details";
pub const FACE_GEOMETRY: &str = "face_geometry";

pub const SIGNATURE: &str = "ndi";
pub const CHECKSUM: &str = "checksum";
pub const TOOL_SUB_TYPE: &str = "tool_sub_type";
pub const TOOL_MAIN_TYPE: &str = "tool_main_type";
pub const TOOL_REVISION: &str = "tool_revision";
pub const SEQUENCE_AND_DATE: &str = "sequence_and_date";

pub const MAXIMUM_MARKER_ANGLE: &str = "maximum_marker_angle";
pub const MARKER_COUNT: &str = "marker_count";
pub const MINIMUM_MARKER_COUNT: &str = "minimum_marker_count";
pub const MAXIMUM_MARKER_ERROR: &str = "maximum_marker_error";
pub const MARKERS: &str = "markers";
pub const MARKER_NORMALS: &str = "marker_normals";
pub const FIRING_SEQUENCE: &str = "firing_sequence";

pub const TOOL_MANUFACTURER: &str = "tool_manufacturer";
pub const PART_NUMBER: &str = "part_number";

pub const MARKER_FACES: &str = "marker_faces";
pub const MARKER_GROUPS: &str = "marker_groups";
pub const MARKER_TYPE: &str = "marker_type";
pub const FACE_NORMALS: &str = "face_normals";

/// Declares a Rust enum mirroring an [Enum] option table.
macro_rules! option_table {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident {
            $($variant:ident = $value:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn value(self) -> u64 {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn from_value(value: u64) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.value() == value)
            }

            /// The field type encoding this table.
            pub fn field_type() -> Result<Enum, SchemaError> {
                Enum::new(
                    Self::ALL.iter().map(|v| (v.value(), v.label())),
                    $name::$default.value(),
                )
            }

            pub(crate) fn to_value(self) -> Value {
                Value::Enum {
                    value: self.value(),
                    label: self.label().to_string(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

option_table! {
    /// What the tool is used for.
    ToolMainType, default = Unknown {
        Unknown = 0 => "Unknown",
        Reference = 1 => "Reference",
        Pointer = 2 => "Pointer",
        ButtonBox = 3 => "Button Box",
        UserDefined = 4 => "User Defined",
        Microscope = 5 => "Microscope",
        CalibrationBlock = 7 => "Calibration Block",
        ToolDockingStation = 8 => "Tool Docking Station",
        IsolationBox = 9 => "Isolation Box",
        CArmTracker = 10 => "C-Arm Tracker",
        Catheter = 11 => "Catheter",
        GpioDevice = 12 => "GPIO Device",
        ScanReference = 14 => "Scan Reference",
    }
}

option_table! {
    ToolSubType, default = Undefined {
        RemovableTip = 0 => "Removable Tip",
        FixedTip = 1 => "Fixed Tip",
        Undefined = 2 => "Undefined",
    }
}

option_table! {
    /// Physical marker kind.
    MarkerType, default = PassiveSphere {
        PassiveSphere = 41 => "Passive Sphere",
        PassiveDisc = 49 => "Passive Disc",
        RadixLens = 57 => "Radix Lens",
    }
}

pub fn header() -> Result<Schema, SchemaError> {
    Schema::compile(
        HEADER,
        vec![
            Field::new(SIGNATURE, FixedString::new(3)).with_default("NDI"),
            Field::new("pad_3", Padding::new(1)),
            Field::new(CHECKSUM, Primitive::U16),
            Field::new("reserved_6", Constant::new([0, 0, 1, 0, 0, 0])),
            Field::new(TOOL_SUB_TYPE, ToolSubType::field_type()?),
            Field::new("pad_13", Padding::new(2)),
            Field::new(TOOL_MAIN_TYPE, ToolMainType::field_type()?),
            Field::new(TOOL_REVISION, Primitive::U16),
            Field::new("pad_18", Padding::new(2)),
            Field::new(SEQUENCE_AND_DATE, sequence::schema()?),
        ],
    )
}

fn round5(v: f64) -> f64 {
    (v * 1e5).round() / 1e5
}

fn count(record: &Record, name: &str) -> Result<usize, CodecError> {
    let v = record.int(name)?;
    usize::try_from(v).map_err(|_| CodecError::OutOfRange(format!("{name} = {v}")))
}

/// Keeps `marker_count` and the firing sequence in step with the marker list.
struct GeometryHooks;

impl Hooks for GeometryHooks {
    fn post_decode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let n = count(record, MARKER_COUNT)?;

        let mut markers = record.vec3s(MARKERS)?;
        markers.truncate(n);
        for marker in &mut markers {
            *marker = marker.map(round5);
        }

        let mut normals = record.vec3s(MARKER_NORMALS)?;
        normals.truncate(n);

        record.set(MARKERS, markers);
        record.set(MARKER_NORMALS, normals);
        Ok(())
    }

    fn pre_encode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let n = record.array(MARKERS)?.len();
        if n > MAX_MARKERS {
            return Err(CodecError::ArrayTooLarge {
                len: n,
                max: MAX_MARKERS,
            });
        }

        record.set(MARKER_COUNT, n as i64);
        record.set(FIRING_SEQUENCE, (0..n as i64).collect::<Vec<_>>());
        Ok(())
    }
}

pub fn geometry() -> Result<Schema, SchemaError> {
    Ok(Schema::compile(
        GEOMETRY,
        vec![
            Field::new(MAXIMUM_MARKER_ANGLE, Primitive::U8).with_default(90i64),
            Field::new("pad_25", Padding::new(3)),
            Field::new(MARKER_COUNT, Primitive::U8),
            Field::new("pad_29", Padding::new(3)),
            Field::new(MINIMUM_MARKER_COUNT, Primitive::U8).with_default(3i64),
            Field::new("pad_33", Padding::new(3)),
            Field::new(MAXIMUM_MARKER_ERROR, Primitive::F32).with_default(2.0f64),
            Field::new("pad_40", Padding::new(32)),
            Field::new(MARKERS, Array::new(Vector3f, MAX_MARKERS)),
            Field::new(MARKER_NORMALS, Array::new(Vector3f, MAX_MARKERS)),
            Field::new(FIRING_SEQUENCE, Array::new(Primitive::U8, MAX_MARKERS)),
            Field::new("leds", Constant::new([31, 31, 31, 31])),
            Field::new("tool_in_port", Constant::new([9])),
            Field::new("switches", Constant::new([0, 0, 0])),
        ],
    )?
    .with_hooks(GeometryHooks))
}

pub fn tool_details() -> Result<Schema, SchemaError> {
    Schema::compile(
        TOOL_DETAILS,
        vec![
            Field::new(TOOL_MANUFACTURER, FixedString::new(12)),
            Field::new(PART_NUMBER, FixedString::new(20)),
            Field::new("reserved_612", Constant::new([9])),
        ],
    )
}

/// Drops unused face and group slots on decode, and assigns every marker to face 1
/// and group 1 when none are given. `marker_count` is supplied by the enclosing tool.
struct FaceGeometryHooks;

impl Hooks for FaceGeometryHooks {
    fn init(&self, _schema: &Schema, record: &mut Record) {
        record.set(MARKER_COUNT, 0i64);
    }

    fn post_decode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        for name in [MARKER_FACES, MARKER_GROUPS] {
            let assigned: Vec<i64> = record.ints(name)?.into_iter().filter(|v| *v != 0).collect();
            record.set(name, assigned);
        }
        Ok(())
    }

    fn pre_encode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let n = if record.contains(MARKER_COUNT) {
            count(record, MARKER_COUNT)?
        } else {
            0
        };
        for name in [MARKER_FACES, MARKER_GROUPS] {
            if record.array(name)?.is_empty() {
                record.set(name, vec![1i64; n]);
            }
        }
        Ok(())
    }
}

pub fn face_geometry() -> Result<Schema, SchemaError> {
    Ok(Schema::compile(
        FACE_GEOMETRY,
        vec![
            Field::new(MARKER_FACES, Array::new(Primitive::U8, MAX_MARKERS)),
            Field::new(MARKER_GROUPS, Array::new(Primitive::U8, MAX_MARKERS)),
            Field::new("alg_flags", Constant::new([128])),
            Field::new("pad_654", Padding::new(1)),
            Field::new(MARKER_TYPE, MarkerType::field_type()?),
            Field::new(FACE_NORMALS, Array::new(Vector3f, MAX_FACES)),
        ],
    )?
    .with_hooks(FaceGeometryHooks))
}

/// Propagates the marker count into the face geometry and stamps the checksum.
struct ToolHooks;

impl Hooks for ToolHooks {
    fn post_decode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let n = record.record(GEOMETRY)?.int(MARKER_COUNT)?;
        record.record_mut(FACE_GEOMETRY)?.set(MARKER_COUNT, n);
        Ok(())
    }

    fn pre_encode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let n = record.record(GEOMETRY)?.array(MARKERS)?.len();
        record
            .record_mut(FACE_GEOMETRY)?
            .set(MARKER_COUNT, n as i64);
        Ok(())
    }

    fn post_encode(
        &self,
        schema: &Schema,
        record: &mut Record,
        data: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        checksum::patch(schema, record, data)
    }
}

fn build_tool() -> Result<Schema, SchemaError> {
    Ok(Schema::compile(
        "ndi_tool_definition",
        vec![
            Field::new(HEADER, header()?),
            Field::new(GEOMETRY, geometry()?),
            Field::new(TOOL_DETAILS, tool_details()?),
            Field::new(FACE_GEOMETRY, face_geometry()?),
        ],
    )?
    .with_hooks(ToolHooks))
}

static TOOL: LazyLock<Result<Schema, SchemaError>> = LazyLock::new(build_tool);

/// The complete tool definition layout, compiled once.
pub fn tool() -> Result<&'static Schema, CodecError> {
    TOOL.as_ref().map_err(|e| CodecError::Schema(e.clone()))
}

#[cfg(test)]
mod tests {
    use crate::field::FieldType;

    use super::*;

    #[test]
    fn test_section_sizes() {
        assert_eq!(header().unwrap().size(), 24);
        assert_eq!(geometry().unwrap().size(), 556);
        assert_eq!(tool_details().unwrap().size(), 33);
        assert_eq!(face_geometry().unwrap().size(), 139);
        assert_eq!(tool().unwrap().size(), RECORD_SIZE);
    }

    #[test]
    fn test_field_offsets() {
        let tool = tool().unwrap();
        assert_eq!(tool.locate_path(&[HEADER, CHECKSUM]), Ok((4, 2)));
        assert_eq!(tool.locate_path(&[HEADER, TOOL_SUB_TYPE]), Ok((12, 1)));
        assert_eq!(tool.locate_path(&[HEADER, TOOL_MAIN_TYPE]), Ok((15, 1)));
        assert_eq!(tool.locate_path(&[HEADER, SEQUENCE_AND_DATE]), Ok((20, 4)));
        assert_eq!(tool.locate_path(&[GEOMETRY, MARKER_COUNT]), Ok((28, 1)));
        assert_eq!(tool.locate_path(&[GEOMETRY, MARKERS]), Ok((72, 240)));
        assert_eq!(tool.locate_path(&[GEOMETRY, FIRING_SEQUENCE]), Ok((552, 20)));
        assert_eq!(tool.locate_path(&[TOOL_DETAILS, PART_NUMBER]), Ok((592, 20)));
        assert_eq!(tool.locate_path(&[FACE_GEOMETRY, MARKER_TYPE]), Ok((655, 1)));
        assert_eq!(tool.locate_path(&[FACE_GEOMETRY, FACE_NORMALS]), Ok((656, 96)));
    }

    #[test]
    fn test_option_tables() {
        assert_eq!(ToolMainType::from_value(10), Some(ToolMainType::CArmTracker));
        assert_eq!(ToolMainType::from_value(6), None);
        assert_eq!(ToolSubType::default(), ToolSubType::Undefined);
        assert_eq!(MarkerType::RadixLens.label(), "Radix Lens");
        assert_eq!(MarkerType::field_type().unwrap().size(), 1);
    }

    #[test]
    fn test_geometry_hooks() {
        let schema = geometry().unwrap();
        let mut record = schema.default_record();
        record.set(MARKERS, vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

        let data = schema.encode(&mut record).unwrap();
        assert_eq!(record.int(MARKER_COUNT), Ok(2));
        assert_eq!(record.ints(FIRING_SEQUENCE), Ok(vec![0, 1]));
        assert_eq!(data[4], 2);
        assert_eq!(data[0], 90);

        let decoded = schema.decode(&data).unwrap();
        assert_eq!(
            decoded.vec3s(MARKERS),
            Ok(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
        );
        assert_eq!(decoded.vec3s(MARKER_NORMALS).unwrap().len(), 2);
        assert_eq!(decoded.ints(FIRING_SEQUENCE).unwrap().len(), MAX_MARKERS);
    }

    #[test]
    fn test_geometry_rounds_markers() {
        let schema = geometry().unwrap();
        let mut record = schema.default_record();
        record.set(MARKERS, vec![[0.1, -12.3456789, 100.0]]);

        let data = schema.encode(&mut record).unwrap();
        let decoded = schema.decode(&data).unwrap();
        assert_eq!(decoded.vec3s(MARKERS), Ok(vec![[0.1, -12.34568, 100.0]]));
    }

    #[test]
    fn test_face_geometry_defaults_and_filtering() {
        let schema = face_geometry().unwrap();
        let mut record = schema.default_record();
        record.set(MARKER_COUNT, 3i64);

        let data = schema.encode(&mut record).unwrap();
        assert_eq!(&data[..4], &[1, 1, 1, 0]);
        assert_eq!(&data[20..23], &[1, 1, 1]);
        assert_eq!(data[40], 128);
        assert_eq!(data[42], 41);

        let decoded = schema.decode(&data).unwrap();
        assert_eq!(decoded.ints(MARKER_FACES), Ok(vec![1, 1, 1]));
        assert_eq!(decoded.ints(MARKER_GROUPS), Ok(vec![1, 1, 1]));
    }

    #[test]
    fn test_explicit_faces_are_kept() {
        let schema = face_geometry().unwrap();
        let mut record = schema.default_record();
        record.set(MARKER_COUNT, 2i64);
        record.set(MARKER_FACES, vec![1i64, 2]);

        let data = schema.encode(&mut record).unwrap();
        assert_eq!(&data[..3], &[1, 2, 0]);
    }
}
