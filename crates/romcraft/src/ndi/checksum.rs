//! The 16-bit additive checksum stored in the ROM header.
//!
//! It covers every byte after the checksum field itself, through the end of the
//! record. The header bytes before it are not covered.

use crate::{
    errors::CodecError,
    schema::Schema,
    value::{Record, Value},
};

use super::layout::{self, CHECKSUM, HEADER};

/// Sum of `bytes`, wrapped to 16 bits.
pub fn sum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

/// Offset of the first byte after the checksum field within an encoded record.
fn covered_from(schema: &Schema) -> Result<usize, CodecError> {
    let (offset, size) = schema.locate_path(&[HEADER, CHECKSUM])?;
    Ok(offset + size)
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

/// Checksum an encoded tool definition should carry.
pub fn compute(data: &[u8]) -> Result<u16, CodecError> {
    let schema = layout::tool()?;
    check_len(data, schema.size())?;

    let start = covered_from(schema)?;
    Ok(sum(&data[start..schema.size()]))
}

/// Checksum actually stored in an encoded tool definition.
pub fn stored(data: &[u8]) -> Result<u16, CodecError> {
    let schema = layout::tool()?;
    check_len(data, schema.size())?;

    let (offset, _) = schema.locate_path(&[HEADER, CHECKSUM])?;
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

/// Whether the stored checksum matches the bytes it covers.
pub fn verify(data: &[u8]) -> Result<bool, CodecError> {
    Ok(stored(data)? == compute(data)?)
}

/// Computes the checksum of freshly encoded `data` and writes it into both the
/// header bytes and the header record.
pub(crate) fn patch(
    schema: &Schema,
    record: &mut Record,
    data: &mut [u8],
) -> Result<(), CodecError> {
    let start = covered_from(schema)?;
    check_len(data, start)?;
    let checksum = sum(&data[start..]);

    let (header_offset, header_size) = schema.locate(HEADER)?;
    let header = schema
        .field(HEADER)?
        .kind()
        .as_schema()
        .ok_or(CodecError::TypeMismatch {
            expected: "struct",
            found: "field",
        })?;

    tracing::debug!(checksum, "patching tool checksum");

    header.patch(
        record.record_mut(HEADER)?,
        &mut data[header_offset..header_offset + header_size],
        CHECKSUM,
        Value::Int(i64::from(checksum)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_wraps() {
        assert_eq!(sum(&[]), 0);
        assert_eq!(sum(&[1, 2, 3]), 6);
        assert_eq!(sum(&[0xFF; 258]), (0xFF * 258 % 0x1_0000) as u16);
        assert_eq!(sum(&[0xFF; 300]), ((0xFFu32 * 300) & 0xFFFF) as u16);
    }

    #[test]
    fn test_compute_covers_suffix_only() {
        let mut data = vec![0u8; layout::RECORD_SIZE];
        data[0] = 0xAA;
        data[5] = 0xBB;
        data[6] = 1;
        data[layout::RECORD_SIZE - 1] = 2;

        assert_eq!(compute(&data), Ok(3));
    }

    #[test]
    fn test_stored_and_verify() {
        let mut data = vec![0u8; layout::RECORD_SIZE];
        data[100] = 0x34;
        data[200] = 0x12;
        assert_eq!(verify(&data), Ok(false));

        data[4] = 0x46;
        assert_eq!(stored(&data), Ok(0x46));
        assert_eq!(verify(&data), Ok(true));
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(
            compute(&[0u8; 10]),
            Err(CodecError::InsufficientData {
                required: layout::RECORD_SIZE,
                actual: 10
            })
        );
    }
}
