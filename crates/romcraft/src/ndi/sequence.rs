//! The four-byte sequence number and date field at offset 20 of the header.
//!
//! | byte | bits | meaning |
//! |---|---|---|
//! | `sequence_lower` | 0–7 | low 8 bits of the sequence number |
//! | `days` | 0–1 | high 2 bits of the sequence number |
//! | `days` | 2–7 | day of year modulo 64 |
//! | `date_data` | 0–2 | day of year divided by 64 |
//! | `date_data` | 3–6 | zero-based month (redundant) |
//! | `date_data` | 7 | set in odd years |
//! | `even_years` | 0–7 | `(year - 1900) / 2` |

use chrono::{Datelike, Days, Local, NaiveDate};

use crate::{
    bits,
    errors::{CodecError, SchemaError},
    field::Field,
    kinds::Primitive,
    schema::{Hooks, Schema},
    value::Record,
};

pub const EPOCH_YEAR: i32 = 1900;
/// Last year the packed form can express.
pub const MAX_YEAR: i32 = EPOCH_YEAR + 2 * u8::MAX as i32 + 1;
pub const MAX_SEQUENCE_NUMBER: u16 = 1023;

pub const SEQUENCE_LOWER: &str = "sequence_lower";
pub const DAYS: &str = "days";
pub const DATE_DATA: &str = "date_data";
pub const EVEN_YEARS: &str = "even_years";
pub const DATE: &str = "date";
pub const SEQUENCE_NUMBER: &str = "sequence_number";

/// The raw bytes of the field, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Packed {
    pub sequence_lower: u8,
    pub days: u8,
    pub date_data: u8,
    pub even_years: u8,
}

/// The values recovered from a [Packed] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpacked {
    pub date: NaiveDate,
    pub sequence_number: u16,
    /// Zero-based month as stored; may disagree with `date`.
    pub stored_month: u8,
}

impl Unpacked {
    pub fn month_consistent(&self) -> bool {
        self.date.month0() == u32::from(self.stored_month)
    }
}

/// Packs `date` and `sequence_number`. Fails for years outside 1900–2411 or
/// sequence numbers above 1023.
pub fn pack(date: NaiveDate, sequence_number: u16) -> Result<Packed, CodecError> {
    let year = date.year();
    if !(EPOCH_YEAR..=MAX_YEAR).contains(&year) {
        return Err(CodecError::OutOfRange(format!(
            "year {year} is outside {EPOCH_YEAR}..={MAX_YEAR}"
        )));
    }
    if sequence_number > MAX_SEQUENCE_NUMBER {
        return Err(CodecError::OutOfRange(format!(
            "sequence number {sequence_number} exceeds {MAX_SEQUENCE_NUMBER}"
        )));
    }

    let day_of_year = u64::from(date.ordinal0());
    let sequence = u64::from(sequence_number);
    let parity = (year % 2) as u64;

    let days = bits::insert(bits::insert(0, 2, 6, day_of_year % 64), 0, 2, sequence >> 8);
    let date_data = bits::insert(
        bits::insert(bits::insert(0, 7, 1, parity), 3, 4, u64::from(date.month0())),
        0,
        3,
        day_of_year >> 6,
    );

    Ok(Packed {
        sequence_lower: (sequence & 0xFF) as u8,
        days: days as u8,
        date_data: date_data as u8,
        even_years: ((year - EPOCH_YEAR) / 2) as u8,
    })
}

/// Recovers the date and sequence number from the packed bytes.
pub fn unpack(packed: Packed) -> Result<Unpacked, CodecError> {
    let days = u64::from(packed.days);
    let date_data = u64::from(packed.date_data);

    let day_of_year = (bits::extract(date_data, 0, 3) << 6) + bits::extract(days, 2, 6);
    let parity = bits::extract(date_data, 7, 1) as i32;
    let year = 2 * i32::from(packed.even_years) + EPOCH_YEAR + parity;

    let date = NaiveDate::from_yo_opt(year, 1)
        .and_then(|start| start.checked_add_days(Days::new(day_of_year)))
        .ok_or_else(|| CodecError::OutOfRange(format!("day {day_of_year} of year {year}")))?;

    let sequence_number = u16::from(packed.sequence_lower) + 256 * bits::extract(days, 0, 2) as u16;

    Ok(Unpacked {
        date,
        sequence_number,
        stored_month: bits::extract(date_data, 3, 4) as u8,
    })
}

fn byte(record: &Record, name: &str) -> Result<u8, CodecError> {
    let v = record.int(name)?;
    u8::try_from(v).map_err(|_| CodecError::OutOfRange(format!("{name} = {v}")))
}

/// Hooks deriving `date` and `sequence_number` from the packed bytes, and back.
pub struct SequenceAndDate;

impl Hooks for SequenceAndDate {
    fn init(&self, _schema: &Schema, record: &mut Record) {
        record.set(SEQUENCE_NUMBER, 0i64);
        record.set(DATE, Local::now().date_naive());
    }

    fn post_decode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let unpacked = unpack(Packed {
            sequence_lower: byte(record, SEQUENCE_LOWER)?,
            days: byte(record, DAYS)?,
            date_data: byte(record, DATE_DATA)?,
            even_years: byte(record, EVEN_YEARS)?,
        })?;

        if !unpacked.month_consistent() {
            if cfg!(feature = "strict-dates") {
                return Err(CodecError::InconsistentDate {
                    stored: unpacked.stored_month,
                    date: unpacked.date,
                });
            }
            tracing::warn!(
                date = %unpacked.date,
                stored_month = unpacked.stored_month,
                "confusing timestamp: day of year does not match stored month"
            );
        }

        record.set(DATE, unpacked.date);
        record.set(SEQUENCE_NUMBER, i64::from(unpacked.sequence_number));
        Ok(())
    }

    fn pre_encode(&self, _schema: &Schema, record: &mut Record) -> Result<(), CodecError> {
        let date = record.date(DATE)?;
        let sequence = record.int(SEQUENCE_NUMBER)?;
        let sequence = u16::try_from(sequence)
            .map_err(|_| CodecError::OutOfRange(format!("sequence number {sequence}")))?;

        let packed = pack(date, sequence)?;
        record.set(SEQUENCE_LOWER, i64::from(packed.sequence_lower));
        record.set(DAYS, i64::from(packed.days));
        record.set(DATE_DATA, i64::from(packed.date_data));
        record.set(EVEN_YEARS, i64::from(packed.even_years));
        Ok(())
    }
}

pub fn schema() -> Result<Schema, SchemaError> {
    Ok(Schema::compile(
        "sequence_and_date",
        vec![
            Field::new(SEQUENCE_LOWER, Primitive::U8),
            Field::new(DAYS, Primitive::U8),
            Field::new(DATE_DATA, Primitive::U8),
            Field::new(EVEN_YEARS, Primitive::U8),
        ],
    )?
    .with_hooks(SequenceAndDate))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pack_known_date() {
        // day 202 of 2022, even year
        let packed = pack(date(2022, 7, 22), 1).unwrap();
        assert_eq!(
            packed,
            Packed {
                sequence_lower: 1,
                days: 40,
                date_data: 51,
                even_years: 61
            }
        );
    }

    #[test]
    fn test_pack_odd_year_high_sequence() {
        let packed = pack(date(2023, 12, 31), 1023).unwrap();
        assert_eq!(
            packed,
            Packed {
                sequence_lower: 255,
                days: 179,
                date_data: 221,
                even_years: 61
            }
        );
    }

    #[test]
    fn test_unpack_known_bytes() {
        let unpacked = unpack(Packed {
            sequence_lower: 1,
            days: 40,
            date_data: 51,
            even_years: 61,
        })
        .unwrap();

        assert_eq!(unpacked.date, date(2022, 7, 22));
        assert_eq!(unpacked.sequence_number, 1);
        assert!(unpacked.month_consistent());
    }

    #[test]
    fn test_sequence_high_bits_share_days_byte() {
        let packed = pack(date(1900, 1, 1), 0x2FF).unwrap();
        assert_eq!(packed.sequence_lower, 0xFF);
        assert_eq!(packed.days, 0b10);
        assert_eq!(unpack(packed).unwrap().sequence_number, 0x2FF);
    }

    #[test]
    fn test_pack_range_limits() {
        assert!(pack(date(1899, 12, 31), 0).is_err());
        assert!(pack(date(MAX_YEAR + 1, 1, 1), 0).is_err());
        assert!(pack(date(MAX_YEAR, 12, 31), 0).is_ok());
        assert!(matches!(
            pack(date(2022, 1, 1), 1024),
            Err(CodecError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_stored_month_mismatch_is_detected() {
        let mut packed = pack(date(2022, 7, 22), 1).unwrap();
        packed.date_data = bits::insert(u64::from(packed.date_data), 3, 4, 0) as u8;

        let unpacked = unpack(packed).unwrap();
        assert_eq!(unpacked.date, date(2022, 7, 22));
        assert!(!unpacked.month_consistent());
    }

    #[cfg(not(feature = "strict-dates"))]
    #[test]
    fn test_month_mismatch_only_warns() {
        let schema = schema().unwrap();
        // month bits cleared: stored month is January
        let record = schema.decode(&[1, 40, 3, 61]).unwrap();
        assert_eq!(record.date(DATE), Ok(date(2022, 7, 22)));
    }

    #[cfg(feature = "strict-dates")]
    #[test]
    fn test_month_mismatch_is_an_error() {
        let schema = schema().unwrap();
        assert_eq!(
            schema.decode(&[1, 40, 3, 61]).unwrap_err(),
            CodecError::InconsistentDate {
                stored: 0,
                date: date(2022, 7, 22)
            }
        );
    }

    #[test]
    fn test_schema_round_trip() {
        let schema = schema().unwrap();

        let mut record = schema.default_record();
        record.set(DATE, date(2022, 7, 22));
        record.set(SEQUENCE_NUMBER, 1i64);

        let data = schema.encode(&mut record).unwrap();
        assert_eq!(data, vec![1, 40, 51, 61]);
        assert_eq!(record.int(DAYS), Ok(40));

        let decoded = schema.decode(&data).unwrap();
        assert_eq!(decoded.date(DATE), Ok(date(2022, 7, 22)));
        assert_eq!(decoded.int(SEQUENCE_NUMBER), Ok(1));
    }

    #[test]
    fn test_default_record_is_today() {
        let record = schema().unwrap().default_record();
        assert_eq!(record.int(SEQUENCE_NUMBER), Ok(0));
        assert!(record.date(DATE).is_ok());
    }

    proptest! {
        #[test]
        fn prop_pack_round_trip(
            year in EPOCH_YEAR..=MAX_YEAR,
            ordinal in 1u32..=365,
            sequence in 0u16..=MAX_SEQUENCE_NUMBER,
        ) {
            let d = NaiveDate::from_yo_opt(year, ordinal).unwrap();
            let unpacked = unpack(pack(d, sequence).unwrap()).unwrap();

            prop_assert_eq!(unpacked.date, d);
            prop_assert_eq!(unpacked.sequence_number, sequence);
            prop_assert!(unpacked.month_consistent());
        }
    }
}
