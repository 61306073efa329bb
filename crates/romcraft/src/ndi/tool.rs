//! Typed view of an NDI tool definition.
//!
//! [ToolDefinition] mirrors the dynamic [Record] produced by [layout::tool], with
//! Rust types in place of [crate::value::Value]s. Encoding and decoding go through the
//! dynamic schema so every hook runs.

use chrono::{Local, NaiveDate};

use crate::{errors::CodecError, value::Record};

use super::{
    checksum,
    layout::{self, *},
    sequence::{DATE, SEQUENCE_NUMBER},
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub tool_sub_type: ToolSubType,
    pub tool_main_type: ToolMainType,
    pub tool_revision: u16,
    pub sequence_number: u16,
    pub date: NaiveDate,
    /// As stored; recomputed on every encode.
    pub checksum: u16,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Degrees.
    pub maximum_marker_angle: u8,
    /// As stored; encoding derives it from `markers`.
    pub marker_count: u8,
    pub minimum_marker_count: u8,
    /// Millimetres.
    pub maximum_marker_error: f32,
    pub markers: Vec<[f64; 3]>,
    pub marker_normals: Vec<[f64; 3]>,
    /// As stored; encoding derives it from `markers`.
    pub firing_sequence: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ToolDetails {
    pub tool_manufacturer: String,
    pub part_number: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceGeometry {
    /// Face index per marker. Left empty, every marker is assigned face 1.
    pub marker_faces: Vec<u8>,
    /// Group index per marker. Left empty, every marker is assigned group 1.
    pub marker_groups: Vec<u8>,
    pub marker_type: MarkerType,
    pub face_normals: Vec<[f64; 3]>,
}

/// A complete tool definition ROM.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ToolDefinition {
    pub header: Header,
    pub geometry: Geometry,
    pub tool_details: ToolDetails,
    pub face_geometry: FaceGeometry,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            tool_sub_type: ToolSubType::default(),
            tool_main_type: ToolMainType::default(),
            tool_revision: 0,
            sequence_number: 0,
            date: Local::now().date_naive(),
            checksum: 0,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            maximum_marker_angle: 90,
            marker_count: 0,
            minimum_marker_count: 3,
            maximum_marker_error: 2.0,
            markers: Vec::new(),
            marker_normals: Vec::new(),
            firing_sequence: Vec::new(),
        }
    }
}

fn narrow<T: TryFrom<i64>>(record: &Record, name: &str) -> Result<T, CodecError> {
    let v = record.int(name)?;
    T::try_from(v).map_err(|_| CodecError::OutOfRange(format!("{name} = {v}")))
}

fn narrow_all<T: TryFrom<i64>>(record: &Record, name: &str) -> Result<Vec<T>, CodecError> {
    record
        .ints(name)?
        .into_iter()
        .map(|v| T::try_from(v).map_err(|_| CodecError::OutOfRange(format!("{name} = {v}"))))
        .collect()
}

fn option<T>(
    record: &Record,
    name: &str,
    from_value: impl Fn(u64) -> Option<T>,
) -> Result<T, CodecError> {
    let (value, _) = record.enumeration(name)?;
    from_value(value).ok_or(CodecError::UnknownEnumValue(value))
}

impl TryFrom<&Record> for ToolDefinition {
    type Error = CodecError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let header = record.record(HEADER)?;
        let stamp = header.record(SEQUENCE_AND_DATE)?;
        let geometry = record.record(GEOMETRY)?;
        let details = record.record(TOOL_DETAILS)?;
        let faces = record.record(FACE_GEOMETRY)?;

        Ok(ToolDefinition {
            header: Header {
                tool_sub_type: option(header, TOOL_SUB_TYPE, ToolSubType::from_value)?,
                tool_main_type: option(header, TOOL_MAIN_TYPE, ToolMainType::from_value)?,
                tool_revision: narrow(header, TOOL_REVISION)?,
                sequence_number: narrow(stamp, SEQUENCE_NUMBER)?,
                date: stamp.date(DATE)?,
                checksum: narrow(header, CHECKSUM)?,
            },
            geometry: Geometry {
                maximum_marker_angle: narrow(geometry, MAXIMUM_MARKER_ANGLE)?,
                marker_count: narrow(geometry, MARKER_COUNT)?,
                minimum_marker_count: narrow(geometry, MINIMUM_MARKER_COUNT)?,
                maximum_marker_error: geometry.float(MAXIMUM_MARKER_ERROR)? as f32,
                markers: geometry.vec3s(MARKERS)?,
                marker_normals: geometry.vec3s(MARKER_NORMALS)?,
                firing_sequence: narrow_all(geometry, FIRING_SEQUENCE)?,
            },
            tool_details: ToolDetails {
                tool_manufacturer: details.str(TOOL_MANUFACTURER)?.to_string(),
                part_number: details.str(PART_NUMBER)?.to_string(),
            },
            face_geometry: FaceGeometry {
                marker_faces: narrow_all(faces, MARKER_FACES)?,
                marker_groups: narrow_all(faces, MARKER_GROUPS)?,
                marker_type: option(faces, MARKER_TYPE, MarkerType::from_value)?,
                face_normals: faces.vec3s(FACE_NORMALS)?,
            },
        })
    }
}

impl ToolDefinition {
    /// Decodes the first 752 bytes of `data`. The checksum is not verified.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let record = layout::tool()?.decode(data)?;
        Self::try_from(&record)
    }

    /// Encodes into a 752-byte ROM image with a freshly computed checksum.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut record = self.to_record()?;
        layout::tool()?.encode(&mut record)
    }

    /// Whether the checksum stored in `data` matches its contents.
    pub fn verify_checksum(data: &[u8]) -> Result<bool, CodecError> {
        checksum::verify(data)
    }

    /// The dynamic record for this definition, ready for [crate::schema::Schema::encode].
    pub fn to_record(&self) -> Result<Record, CodecError> {
        let mut record = layout::tool()?.default_record();

        let header = record.record_mut(HEADER)?;
        header.set(TOOL_SUB_TYPE, self.header.tool_sub_type.to_value());
        header.set(TOOL_MAIN_TYPE, self.header.tool_main_type.to_value());
        header.set(TOOL_REVISION, i64::from(self.header.tool_revision));
        header.set(CHECKSUM, i64::from(self.header.checksum));
        let stamp = header.record_mut(SEQUENCE_AND_DATE)?;
        stamp.set(DATE, self.header.date);
        stamp.set(SEQUENCE_NUMBER, i64::from(self.header.sequence_number));

        let g = &self.geometry;
        let geometry = record.record_mut(GEOMETRY)?;
        geometry.set(MAXIMUM_MARKER_ANGLE, i64::from(g.maximum_marker_angle));
        geometry.set(MARKER_COUNT, i64::from(g.marker_count));
        geometry.set(MINIMUM_MARKER_COUNT, i64::from(g.minimum_marker_count));
        geometry.set(MAXIMUM_MARKER_ERROR, f64::from(g.maximum_marker_error));
        geometry.set(MARKERS, g.markers.clone());
        geometry.set(MARKER_NORMALS, g.marker_normals.clone());
        geometry.set(FIRING_SEQUENCE, widen(&g.firing_sequence));

        let details = record.record_mut(TOOL_DETAILS)?;
        details.set(TOOL_MANUFACTURER, self.tool_details.tool_manufacturer.as_str());
        details.set(PART_NUMBER, self.tool_details.part_number.as_str());

        let f = &self.face_geometry;
        let faces = record.record_mut(FACE_GEOMETRY)?;
        faces.set(MARKER_FACES, widen(&f.marker_faces));
        faces.set(MARKER_GROUPS, widen(&f.marker_groups));
        faces.set(MARKER_TYPE, f.marker_type.to_value());
        faces.set(FACE_NORMALS, f.face_normals.clone());

        Ok(record)
    }
}

fn widen(bytes: &[u8]) -> Vec<i64> {
    bytes.iter().map(|b| i64::from(*b)).collect()
}
