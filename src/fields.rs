//! Field enums for the BH1730 register map.
//!
//! Each enum maps a logical register field to the code the device
//! expects; the numeric derives are what `create_register!` uses to
//! encode and decode whole registers.

/// ADC power state, CONTROL register bit 0.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Power {
    Off = 0x00,
    On = 0x01,
}

/// ADC measurement enable, CONTROL register bit 1.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcEnable {
    Disabled = 0x00,
    Enabled = 0x01,
}

/// Conversion mode, CONTROL register bit 3. `OneShot` requests exactly
/// one conversion, after which the device returns to idle.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementMode {
    Continuous = 0x00,
    OneShot = 0x01,
}

/// Conversion result validity, CONTROL register bit 4 (read-only on the
/// device; this driver paces reads with a fixed delay instead of polling
/// it).
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcDataStatus {
    Invalid = 0x00,
    Valid = 0x01,
}

/// Analog gain applied to both photodiode channels before digitization.
///
/// Exactly one gain is active at a time; it is configured once at setup
/// and stays fixed during operation.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    X1 = 0x00,
    X2 = 0x01,
    X64 = 0x02,
    X128 = 0x03,
}

impl Default for Gain {
    fn default() -> Self {
        Gain::X1
    }
}

impl From<u8> for Gain {
    /// Decodes a raw gain register code. Out-of-range codes fall back to
    /// ×1, matching the device default.
    fn from(code: u8) -> Self {
        match code {
            0x01 => Gain::X2,
            0x02 => Gain::X64,
            0x03 => Gain::X128,
            _ => Gain::X1,
        }
    }
}

impl Into<f32> for &Gain {
    fn into(self) -> f32 {
        match self {
            Gain::X1 => 1.0,
            Gain::X2 => 2.0,
            Gain::X64 => 64.0,
            Gain::X128 => 128.0,
        }
    }
}
