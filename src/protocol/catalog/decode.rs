//! Typed decoding of raw parameter data.
//!
//! Decoding borrows from the input: text fields and pass-through data are
//! slices of the raw bytes, so no allocation is involved.
use core::fmt;

use super::DecodeRule;
use crate::error::DecodeError;
use crate::infra::codec::bytes::ByteReader;

/// Number of cells reported by each cell-voltage parameter.
pub const CELLS_PER_PARAMETER: usize = 16;

const MILLI: f64 = 1000.0;

//==================================================================================VALUES
/// Result of decoding one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue<'a> {
    /// Scaled physical value (V, A, Wh).
    Float(f64),
    /// Unscaled count or byte value.
    Integer(u32),
    CellVoltages([f64; CELLS_PER_PARAMETER]),
    Temperatures(Temperatures),
    Statistics(Statistics),
    History(History),
    Versions(Versions<'a>),
    Date(Date),
    DateTime(DateTime),
    /// Trimmed ASCII text.
    Text(&'a str),
    /// Bytes of a parameter whose meaning is unknown.
    Raw(&'a [u8]),
}

/// Temperatures in °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperatures {
    pub cells: [i8; 3],
    pub discharge_fet: i8,
    pub charge_fet: i8,
    pub soft_start_circuit: i8,
}

/// Capacity counters in Wh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub total_capacity: f64,
    pub lifetime_charged: f64,
    pub current_cycle_charged: f64,
}

/// Lifetime extremes recorded by the BMS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct History {
    /// Largest discharge current (A).
    pub max_output: f64,
    /// Largest charge current (A).
    pub max_input: f64,
    pub max_cell_voltage: f64,
    pub min_cell_voltage: f64,
    pub max_temperature: i8,
    pub min_temperature: i8,
}

/// `major.minor` firmware or hardware revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Versions<'a> {
    pub software: Version,
    pub hardware: Version,
    /// Four-character index, trimmed.
    pub index: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub date: Date,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T{:02}:{:02}:{:02}",
            self.date, self.hour, self.minute, self.second
        )
    }
}

//==================================================================================DECODE
/// Apply `rule` to `data`, which must be exactly `length` bytes long.
pub fn decode_with_rule(
    parameter: u8,
    length: u8,
    rule: DecodeRule,
    data: &[u8],
) -> Result<DecodedValue<'_>, DecodeError> {
    if data.len() != length as usize {
        return Err(DecodeError::InvalidDataLength {
            parameter,
            expected: length as usize,
            actual: data.len(),
        });
    }

    let mut reader = ByteReader::new(data);
    let value = match rule {
        DecodeRule::UnsignedMilli => DecodedValue::Float(reader.read_u32()? as f64 / MILLI),
        DecodeRule::SignedMilli => DecodedValue::Float(reader.read_i32()? as f64 / MILLI),
        DecodeRule::Unsigned => DecodedValue::Integer(reader.read_u32()?),
        DecodeRule::Byte => DecodedValue::Integer(reader.read_u8()? as u32),
        DecodeRule::CellVoltages => {
            let mut cells = [0.0; CELLS_PER_PARAMETER];
            for cell in cells.iter_mut() {
                *cell = reader.read_u16()? as f64 / MILLI;
            }
            DecodedValue::CellVoltages(cells)
        }
        DecodeRule::Temperatures => {
            let cells = [reader.read_i8()?, reader.read_i8()?, reader.read_i8()?];
            // Byte 3 is reserved.
            reader.advance(1)?;
            DecodedValue::Temperatures(Temperatures {
                cells,
                discharge_fet: reader.read_i8()?,
                charge_fet: reader.read_i8()?,
                soft_start_circuit: reader.read_i8()?,
            })
        }
        DecodeRule::Statistics => DecodedValue::Statistics(Statistics {
            total_capacity: reader.read_u32()? as f64 / MILLI,
            lifetime_charged: reader.read_u32()? as f64 / MILLI,
            current_cycle_charged: reader.read_u32()? as f64 / MILLI,
        }),
        DecodeRule::History => DecodedValue::History(History {
            max_output: reader.read_i32()? as f64 / MILLI,
            max_input: reader.read_i32()? as f64 / MILLI,
            max_cell_voltage: reader.read_u16()? as f64 / MILLI,
            min_cell_voltage: reader.read_u16()? as f64 / MILLI,
            max_temperature: reader.read_i8()?,
            min_temperature: reader.read_i8()?,
        }),
        DecodeRule::Versions => {
            let software = read_version(&mut reader)?;
            let hardware = read_version(&mut reader)?;
            let index = ascii_trimmed(parameter, reader.read_slice(4)?)?;
            DecodedValue::Versions(Versions {
                software,
                hardware,
                index,
            })
        }
        DecodeRule::Date => DecodedValue::Date(read_date(parameter, &mut reader)?),
        DecodeRule::DateTime => {
            let date = read_date(parameter, &mut reader)?;
            let (hour, minute, second) =
                (reader.read_u8()?, reader.read_u8()?, reader.read_u8()?);
            if hour > 23 || minute > 59 || second > 59 {
                return Err(DecodeError::InvalidDate { parameter });
            }
            DecodedValue::DateTime(DateTime {
                date,
                hour,
                minute,
                second,
            })
        }
        DecodeRule::Text => DecodedValue::Text(ascii_trimmed(parameter, data)?),
        DecodeRule::Raw => DecodedValue::Raw(data),
    };

    Ok(value)
}

/// Stored as `[minor, major]`.
fn read_version(reader: &mut ByteReader<'_>) -> Result<Version, DecodeError> {
    let minor = reader.read_u8()?;
    let major = reader.read_u8()?;
    Ok(Version { major, minor })
}

fn read_date(parameter: u8, reader: &mut ByteReader<'_>) -> Result<Date, DecodeError> {
    let year = 2000 + reader.read_u8()? as u16;
    let month = reader.read_u8()?;
    let day = reader.read_u8()?;

    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return Err(DecodeError::InvalidDate { parameter });
    }

    Ok(Date { year, month, day })
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn ascii_trimmed(parameter: u8, bytes: &[u8]) -> Result<&str, DecodeError> {
    if !bytes.is_ascii() {
        return Err(DecodeError::InvalidText { parameter });
    }
    core::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|_| DecodeError::InvalidText { parameter })
}
