//! # Introduction
//! This is a platform-agnostic Rust driver for the [`BH1730 Ambient Light Sensor`](https://www.rohm.com/products/sensors-mems/ambient-light-sensor-ics/bh1730fvc-product)
//! using [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits.
//!
//! ## Supported devices
//! Tested with the following sensor(s):
//! - [BH1730FVC](https://fscdn.rohm.com/en/products/databook/datasheet/ic/sensor/light/bh1730fvc-e.pdf)
//!
//! ## Usage
//! ### Protocol layer
//!
//! [`Bh1730`] speaks the raw register protocol: power the ADC, select a
//! gain, request a one-shot conversion and read back the two channel
//! counts.
//!
//! ```no_run
//! use embedded_hal_mock::i2c::Mock;
//! use bh1730::{Bh1730, Gain};
//!
//! # let i2c = Mock::new(&[]);
//! let mut sensor = Bh1730::new(i2c);
//! sensor.power_on().unwrap();
//! sensor.set_gain(Gain::X2).unwrap();
//! sensor.trigger_measurement().unwrap();
//! // wait for the conversion to finish, then:
//! let sample = sensor.read_raw().unwrap();
//! let lux = bh1730::raw_to_lux(sample.data0, sample.data1, Gain::X2);
//! ```
//!
//! ### Measurement controller
//!
//! [`Bh1730Controller`] runs the whole duty cycle for a host that ticks
//! it periodically and can call back after a delay. See the
//! [`controller`] module docs for the two-phase read protocol.
//!
//! ```no_run
//! use embedded_hal_mock::i2c::Mock;
//! use bh1730::{Bh1730Config, Bh1730Controller, Gain, Sink};
//!
//! struct Stdout;
//! impl Sink for Stdout {
//!     fn publish(&mut self, value: f32) {
//!         let _ = value; // forward to your output pipeline
//!     }
//! }
//!
//! # let i2c = Mock::new(&[]);
//! let config = Bh1730Config::default().with_gain(Gain::X2);
//! let mut lux_out = Stdout;
//! let mut controller = Bh1730Controller::new(i2c, &config).with_illuminance_sink(&mut lux_out);
//!
//! controller.setup().unwrap();
//! // on every periodic tick:
//! let pending = controller.update().unwrap();
//! // ... schedule a callback pending.delay_ms() milliseconds later:
//! controller.complete_read(pending).unwrap();
//! ```
//!
#![no_std]
#[macro_use]
extern crate num_derive;
use embedded_hal::blocking::i2c;
use paste::paste;

pub mod controller;
mod fields;
mod macros;
mod registers;
mod types;
pub use crate::controller::{Bh1730Controller, PendingRead, Sink, READ_DELAY_MS};
pub use crate::fields::*;
pub use crate::registers::*;
pub use crate::types::{DriverState, Error, RawSample};

const BH1730_BASE_ADDRESS: u8 = 0x29;

create_struct_with!(Bh1730Config, {gain: Gain});

impl Default for Bh1730Config {
    fn default() -> Self {
        Bh1730Config { gain: Gain::X1 }
    }
}

/// Register-level driver for the BH1730.
///
/// Owns the I²C bus handle and translates logical operations into the
/// register transactions of the device protocol. It issues no delays and
/// keeps no measurement state; pacing a conversion is the caller's job
/// (usually [`Bh1730Controller`]'s).
pub struct Bh1730<I2C> {
    i2c: I2C,
}

impl<I2C, E> Bh1730<I2C>
where
    I2C: i2c::WriteRead<Error = E> + i2c::Write<Error = E>,
{
    /// Initializes the BH1730 driver while consuming the i2c bus
    pub fn new(i2c: I2C) -> Self {
        Bh1730 { i2c }
    }

    /// Destroy driver instance, return I²C bus instance.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    /// Writes the power-enable bit to the control register, leaving the
    /// ADC idle.
    pub fn power_on(&mut self) -> Result<(), Error<E>> {
        let control_reg = ControlRegister::default().with_power(Power::On);
        self.write_register(Register::CONTROL, control_reg.value())
    }

    /// Selects the analog gain for both photodiode channels.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<E>> {
        let gain_reg = GainRegister::default().with_gain(gain);
        self.write_register(Register::GAIN, gain_reg.value())
    }

    /// Requests exactly one conversion cycle (power + ADC enable +
    /// one-shot, in a single control register write).
    pub fn trigger_measurement(&mut self) -> Result<(), Error<E>> {
        let control_reg = ControlRegister::default()
            .with_power(Power::On)
            .with_adc_enable(AdcEnable::Enabled)
            .with_measurement_mode(MeasurementMode::OneShot);
        self.write_register(Register::CONTROL, control_reg.value())
    }

    /// Reads both channel counts in one 4-byte burst starting at the
    /// DATA0 low byte. The device serves the bytes little-endian, data0
    /// first.
    pub fn read_raw(&mut self) -> Result<RawSample, Error<E>> {
        let mut data: [u8; 4] = [0; 4];
        self.i2c
            .write_read(
                BH1730_BASE_ADDRESS,
                &[Register::DATA0_LOW | BH1730_CMD],
                &mut data,
            )
            .map_err(Error::I2C)?;

        Ok(RawSample {
            data0: u16::from_le_bytes([data[0], data[1]]),
            data1: u16::from_le_bytes([data[2], data[3]]),
        })
    }

    fn write_register(&mut self, register: u8, data: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(BH1730_BASE_ADDRESS, &[register | BH1730_CMD, data])
            .map_err(Error::I2C)
            .and(Ok(()))
    }
}

struct LuxBand {
    ratio_below: f32,
    ch0_coeff: f32,
    ch1_coeff: f32,
}

// Empirical calibration bands from the datasheet's application note,
// evaluated first-match in ascending ratio order. Coefficients are
// calibrated for x1 gain at the default integration time.
const LUX_BANDS: [LuxBand; 4] = [
    LuxBand {
        ratio_below: 0.26,
        ch0_coeff: 1.29,
        ch1_coeff: 2.733,
    },
    LuxBand {
        ratio_below: 0.55,
        ch0_coeff: 0.795,
        ch1_coeff: 0.859,
    },
    LuxBand {
        ratio_below: 1.09,
        ch0_coeff: 0.51,
        ch1_coeff: 0.345,
    },
    LuxBand {
        ratio_below: 2.13,
        ch0_coeff: 0.276,
        ch1_coeff: 0.13,
    },
];

/// Converts one raw sample into illuminance in lux.
///
/// The band coefficients assume ×1 gain and the default integration
/// time; the result is rescaled by the configured gain and by
/// `102.6 / ITIME_MS`. An infrared-dominated reading (`data1/data0`
/// at or above the last band threshold) yields 0 lx.
///
/// When `data0` is 0 the channel ratio is unbounded, which this driver
/// defines as the infrared-dominated case: the result is 0 lx, never
/// NaN or infinity.
pub fn raw_to_lux(data0: u16, data1: u16, gain: Gain) -> f32 {
    if data0 == 0 {
        return 0.0;
    }

    let ratio = f32::from(data1) / f32::from(data0);
    let gain_factor: f32 = (&gain).into();

    for band in &LUX_BANDS {
        if ratio < band.ratio_below {
            return (band.ch0_coeff * f32::from(data0) - band.ch1_coeff * f32::from(data1))
                / gain_factor
                * (102.6 / ITIME_MS);
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    use embedded_hal_mock::i2c;
    const BH1730_ADDR: u8 = 0x29;

    #[test]
    fn power_on_sets_power_bit() {
        let expectations = [i2c::Transaction::write(
            BH1730_ADDR,
            std::vec![Register::CONTROL | BH1730_CMD, 0x01],
        )];
        let mock = i2c::Mock::new(&expectations);

        let mut bh1730 = Bh1730::new(mock);
        bh1730.power_on().unwrap();

        let mut mock = bh1730.destroy();
        mock.done(); // verify expectations
    }

    #[test]
    fn set_gain_writes_mapped_code() {
        let cases = [
            (Gain::X1, 0x00u8),
            (Gain::X2, 0x01),
            (Gain::X64, 0x02),
            (Gain::X128, 0x03),
        ];

        for (gain, code) in cases {
            let expectations = [i2c::Transaction::write(
                BH1730_ADDR,
                std::vec![Register::GAIN | BH1730_CMD, code],
            )];
            let mock = i2c::Mock::new(&expectations);

            let mut bh1730 = Bh1730::new(mock);
            bh1730.set_gain(gain).unwrap();

            let mut mock = bh1730.destroy();
            mock.done(); // verify expectations
        }
    }

    #[test]
    fn trigger_requests_one_shot_conversion() {
        // power | adc_en | one_time in a single write
        let expectations = [i2c::Transaction::write(
            BH1730_ADDR,
            std::vec![Register::CONTROL | BH1730_CMD, 0x0B],
        )];
        let mock = i2c::Mock::new(&expectations);

        let mut bh1730 = Bh1730::new(mock);
        bh1730.trigger_measurement().unwrap();

        let mut mock = bh1730.destroy();
        mock.done(); // verify expectations
    }

    #[test]
    fn read_raw_decodes_little_endian_pair() {
        let expectations = [i2c::Transaction::write_read(
            BH1730_ADDR,
            std::vec![Register::DATA0_LOW | BH1730_CMD],
            std::vec![0xAD, 0xDE, 0xEF, 0xBE],
        )];
        let mock = i2c::Mock::new(&expectations);

        let mut bh1730 = Bh1730::new(mock);
        let sample = bh1730.read_raw().unwrap();

        assert_eq!(sample.data0, 0xDEAD);
        assert_eq!(sample.data1, 0xBEEF);

        let mut mock = bh1730.destroy();
        mock.done(); // verify expectations
    }

    #[cfg(test)]
    mod unit_tests {
        use crate::{
            raw_to_lux, AdcDataStatus, AdcEnable, ControlRegister, Field, Gain, GainRegister,
            MeasurementMode, Power, ITIME_MS,
        };

        #[test]
        fn lux_low_ratio_band() {
            // ratio = 0.2 falls in the first band
            let lux = raw_to_lux(100, 20, Gain::X1);
            let expected = (1.29 * 100.0 - 2.733 * 20.0) / 1.0 * (102.6 / ITIME_MS);

            assert_eq!(lux, expected);
        }

        #[test]
        fn lux_band_boundary_is_exclusive() {
            // ratio = exactly 0.26 belongs to the second band, not the first
            let lux = raw_to_lux(100, 26, Gain::X1);
            let expected = (0.795 * 100.0 - 0.859 * 26.0) / 1.0 * (102.6 / ITIME_MS);

            assert_eq!(lux, expected);
        }

        #[test]
        fn lux_infrared_dominated_is_zero() {
            // ratio = 2.5 is past the last band for every gain
            assert_eq!(raw_to_lux(100, 250, Gain::X1), 0.0);
            assert_eq!(raw_to_lux(100, 250, Gain::X2), 0.0);
            assert_eq!(raw_to_lux(100, 250, Gain::X64), 0.0);
            assert_eq!(raw_to_lux(100, 250, Gain::X128), 0.0);
        }

        #[test]
        fn lux_zero_data0_has_defined_fallback() {
            // data1/data0 is unbounded here; the documented policy is 0 lx
            let lux = raw_to_lux(0, 500, Gain::X1);
            assert_eq!(lux, 0.0);
            assert!(!lux.is_nan());

            assert_eq!(raw_to_lux(0, 0, Gain::X1), 0.0);
        }

        #[test]
        fn lux_scales_with_gain() {
            let expected_x2 = (1.29 * 100.0 - 2.733 * 20.0) / 2.0 * (102.6 / ITIME_MS);
            assert_eq!(raw_to_lux(100, 20, Gain::X2), expected_x2);

            let expected_x64 = (1.29 * 100.0 - 2.733 * 20.0) / 64.0 * (102.6 / ITIME_MS);
            assert_eq!(raw_to_lux(100, 20, Gain::X64), expected_x64);
        }

        #[test]
        fn integration_time_constant() {
            // 2.8/1000 * 964 * (256 - 0xDA)
            assert!(ITIME_MS > 0.0);
            assert!((ITIME_MS - 102.5696).abs() < 0.01);
        }

        #[test]
        fn gain_code_fallback() {
            // out-of-range register codes decode as x1
            assert_eq!(Gain::from(0x00), Gain::X1);
            assert_eq!(Gain::from(0x01), Gain::X2);
            assert_eq!(Gain::from(0x02), Gain::X64);
            assert_eq!(Gain::from(0x03), Gain::X128);
            assert_eq!(Gain::from(0x04), Gain::X1);
            assert_eq!(Gain::from(0xFF), Gain::X1);
        }

        #[test]
        fn test_registers() {
            let control_reg = ControlRegister::default()
                .with_power(Power::On)
                .with_adc_enable(AdcEnable::Enabled)
                .with_measurement_mode(MeasurementMode::OneShot);
            assert_eq!(control_reg.value(), 0b0000_1011);

            let gain_reg = GainRegister::default().with_gain(Gain::X128);
            assert_eq!(gain_reg.value(), 0b0000_0011);
        }

        #[test]
        fn test_register_from_u8() {
            let control_reg: ControlRegister = 0b0001_1011u8.into();

            assert_eq!(control_reg.power.value, Power::On);
            assert_eq!(control_reg.adc_enable.value, AdcEnable::Enabled);
            assert_eq!(control_reg.measurement_mode.value, MeasurementMode::OneShot);
            assert_eq!(control_reg.data_status.value, AdcDataStatus::Valid);

            let gain_reg: GainRegister = 0b0000_0010u8.into();
            assert_eq!(gain_reg.gain.value, Gain::X64);
        }

        #[test]
        fn test_fields() {
            let field = Field {
                start_index: 3,
                width: 1,
                value: MeasurementMode::OneShot,
            };
            assert_eq!(field.bits(), 0b0000_1000)
        }
    }
}
