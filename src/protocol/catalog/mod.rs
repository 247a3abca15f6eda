//! Parameter catalog of the BMS and ESC buses.
//!
//! Each known identifier has one fixed data length and one decode rule. The
//! table is the interoperability contract with real hardware: lengths must be
//! reproduced exactly, or the devices answer with frames the codec rejects.
//!
//! Identifiers missing from the table are not an error when decoding: their
//! bytes pass through untouched (see [`decode_parameter`]). Only asking for the
//! *length* of an unknown identifier fails, because no request can be built
//! without it.
use crate::error::{CatalogError, DecodeError};

pub mod decode;

pub use decode::{
    Date, DateTime, DecodedValue, History, Statistics, Temperatures, Version, Versions,
};

//==================================================================================DECODE_RULE
/// How the raw bytes of a parameter become a [`DecodedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeRule {
    /// Unsigned LE32 in thousandths (mV, mA, mWh).
    UnsignedMilli,
    /// Signed LE32 in thousandths.
    SignedMilli,
    /// Unsigned LE32 without scaling (counters).
    Unsigned,
    /// First byte as-is (percent, health).
    Byte,
    /// Sixteen LE16 cell voltages in millivolts.
    CellVoltages,
    Temperatures,
    Statistics,
    History,
    Versions,
    /// `2000 + y`, month, day.
    Date,
    /// `2000 + y`, month, day, hour, minute, second.
    DateTime,
    /// Fixed-length ASCII, surrounding whitespace trimmed.
    Text,
    /// Meaning unknown, bytes returned unchanged.
    Raw,
}

//==================================================================================BMS_PARAMETER
/// Parameters served by the BMS at [`crate::core::BMS_ADDRESS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BmsParameter {
    Unknown0 = 0,
    Unknown7 = 7,
    Temperatures = 8,
    BatteryVoltage = 9,
    BatteryCurrent = 10,
    BatteryPercent = 13,
    BatteryHealth = 14,
    RemainingCapacity = 15,
    TotalCapacity = 16,
    Unknown17 = 17,
    Unknown20 = 20,
    Statistics = 21,
    BmsStatus = 22,
    ChargeCycles = 23,
    DesignedCapacity = 24,
    DesignedVoltage = 25,
    Versions = 26,
    ManufacturingDate = 27,
    Unknown28 = 28,
    RtcTime = 29,
    Unknown30 = 30,
    BmsManufacturer = 32,
    BatteryModel = 33,
    CellType = 34,
    SerialNumber = 35,
    CellVoltages1 = 36,
    CellVoltages2 = 37,
    History = 38,
    Unknown39 = 39,
    Unknown48 = 48,
    Unknown120 = 120,
    Unknown160 = 160,
}

/// Static catalog entry.
#[derive(Debug)]
pub struct ParameterDescriptor {
    /// 1. Parameter identity.
    pub parameter: BmsParameter,
    /// 2. Name used in diagnostics.
    pub name: &'static str,
    /// 3. Fixed data length in bytes.
    pub length: u8,
    /// 4. Decode rule.
    pub rule: DecodeRule,
}

const fn entry(
    parameter: BmsParameter,
    name: &'static str,
    length: u8,
    rule: DecodeRule,
) -> ParameterDescriptor {
    ParameterDescriptor {
        parameter,
        name,
        length,
        rule,
    }
}

/// Every known BMS parameter, in identifier order.
pub static BMS_CATALOG: [ParameterDescriptor; 32] = [
    entry(BmsParameter::Unknown0, "Unknown_0", 4, DecodeRule::Raw),
    entry(BmsParameter::Unknown7, "Unknown_7", 1, DecodeRule::Raw),
    entry(BmsParameter::Temperatures, "Temperatures", 8, DecodeRule::Temperatures),
    entry(BmsParameter::BatteryVoltage, "BatteryVoltage", 4, DecodeRule::UnsignedMilli),
    entry(BmsParameter::BatteryCurrent, "BatteryCurrent", 4, DecodeRule::SignedMilli),
    entry(BmsParameter::BatteryPercent, "BatteryPercent", 1, DecodeRule::Byte),
    entry(BmsParameter::BatteryHealth, "BatteryHealth", 4, DecodeRule::Byte),
    entry(BmsParameter::RemainingCapacity, "RemainingCapacity", 4, DecodeRule::UnsignedMilli),
    entry(BmsParameter::TotalCapacity, "TotalCapacity", 4, DecodeRule::UnsignedMilli),
    entry(BmsParameter::Unknown17, "Unknown_17", 2, DecodeRule::Raw),
    entry(BmsParameter::Unknown20, "Unknown_20", 4, DecodeRule::Raw),
    entry(BmsParameter::Statistics, "Statistics", 12, DecodeRule::Statistics),
    entry(BmsParameter::BmsStatus, "BmsStatus", 10, DecodeRule::Raw),
    entry(BmsParameter::ChargeCycles, "ChargeCycles", 4, DecodeRule::Unsigned),
    entry(BmsParameter::DesignedCapacity, "DesignedCapacity", 4, DecodeRule::UnsignedMilli),
    entry(BmsParameter::DesignedVoltage, "DesignedVoltage", 4, DecodeRule::UnsignedMilli),
    entry(BmsParameter::Versions, "Versions", 8, DecodeRule::Versions),
    entry(BmsParameter::ManufacturingDate, "ManufacturingDate", 3, DecodeRule::Date),
    entry(BmsParameter::Unknown28, "Unknown_28", 4, DecodeRule::Raw),
    entry(BmsParameter::RtcTime, "RtcTime", 6, DecodeRule::DateTime),
    entry(BmsParameter::Unknown30, "Unknown_30", 6, DecodeRule::Raw),
    entry(BmsParameter::BmsManufacturer, "BmsManufacturer", 16, DecodeRule::Text),
    entry(BmsParameter::BatteryModel, "BatteryModel", 32, DecodeRule::Text),
    entry(BmsParameter::CellType, "CellType", 16, DecodeRule::Text),
    entry(BmsParameter::SerialNumber, "SerialNumber", 32, DecodeRule::Text),
    entry(BmsParameter::CellVoltages1, "CellVoltages1", 32, DecodeRule::CellVoltages),
    entry(BmsParameter::CellVoltages2, "CellVoltages2", 32, DecodeRule::CellVoltages),
    entry(BmsParameter::History, "History", 14, DecodeRule::History),
    entry(BmsParameter::Unknown39, "Unknown_39", 64, DecodeRule::Raw),
    entry(BmsParameter::Unknown48, "Unknown_48", 64, DecodeRule::Raw),
    entry(BmsParameter::Unknown120, "Unknown_120", 64, DecodeRule::Raw),
    entry(BmsParameter::Unknown160, "Unknown_160", 32, DecodeRule::Raw),
];

impl BmsParameter {
    /// Resolve a wire identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        BMS_CATALOG
            .iter()
            .find(|descriptor| descriptor.parameter as u8 == id)
            .map(|descriptor| descriptor.parameter)
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn descriptor(self) -> &'static ParameterDescriptor {
        // The table holds every variant; the fallback is never taken.
        BMS_CATALOG
            .iter()
            .find(|descriptor| descriptor.parameter == self)
            .unwrap_or(&BMS_CATALOG[0])
    }

    /// Fixed data length in bytes.
    pub fn length(self) -> u8 {
        self.descriptor().length
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn rule(self) -> DecodeRule {
        self.descriptor().rule
    }

    /// Decode `data` with this parameter's rule.
    pub fn decode(self, data: &[u8]) -> Result<DecodedValue<'_>, DecodeError> {
        decode::decode_with_rule(self.id(), self.length(), self.rule(), data)
    }

    /// Iterate over every known parameter.
    pub fn all() -> impl Iterator<Item = BmsParameter> {
        BMS_CATALOG.iter().map(|descriptor| descriptor.parameter)
    }
}

impl TryFrom<u8> for BmsParameter {
    type Error = CatalogError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(CatalogError::UnknownParameter(id))
    }
}

/// Data length of a BMS parameter identifier.
pub fn parameter_length(id: u8) -> Result<u8, CatalogError> {
    BmsParameter::try_from(id).map(BmsParameter::length)
}

/// Decode raw BMS data by identifier.
///
/// Unknown identifiers return [`DecodedValue::Raw`] holding `data` unchanged,
/// so newer firmware with extra parameters keeps working.
pub fn decode_parameter(id: u8, data: &[u8]) -> Result<DecodedValue<'_>, DecodeError> {
    match BmsParameter::from_id(id) {
        Some(parameter) => parameter.decode(data),
        None => Ok(DecodedValue::Raw(data)),
    }
}

/// Single-value parameters sampled by external loggers.
pub const SCALAR_PARAMETERS: [BmsParameter; 15] = [
    BmsParameter::BatteryVoltage,
    BmsParameter::BatteryCurrent,
    BmsParameter::BatteryPercent,
    BmsParameter::BatteryHealth,
    BmsParameter::RemainingCapacity,
    BmsParameter::TotalCapacity,
    BmsParameter::ChargeCycles,
    BmsParameter::DesignedCapacity,
    BmsParameter::DesignedVoltage,
    BmsParameter::ManufacturingDate,
    BmsParameter::RtcTime,
    BmsParameter::BmsManufacturer,
    BmsParameter::BatteryModel,
    BmsParameter::CellType,
    BmsParameter::SerialNumber,
];

//==================================================================================ESC_PARAMETER
/// Parameters the ESC broadcasts in Status frames from [`crate::core::ESC_ADDRESS`].
/// Their meaning is unknown; they decode as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EscParameter {
    Unknown72 = 72,
    Unknown75 = 75,
}

impl EscParameter {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            72 => Some(EscParameter::Unknown72),
            75 => Some(EscParameter::Unknown75),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn length(self) -> u8 {
        match self {
            EscParameter::Unknown72 => 12,
            EscParameter::Unknown75 => 2,
        }
    }
}

/// Data length of an ESC parameter identifier.
pub fn esc_parameter_length(id: u8) -> Result<u8, CatalogError> {
    EscParameter::from_id(id)
        .map(EscParameter::length)
        .ok_or(CatalogError::UnknownParameter(id))
}
