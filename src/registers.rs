extern crate num as num_renamed;
use crate::create_register;
use crate::fields::*;
use num_renamed::FromPrimitive;
use num_renamed::ToPrimitive;
use paste::paste;

pub mod helpers {
    #[inline]
    pub fn get_mask(start_index: u8, width: u8) -> u8 {
        ((1u8 << width) - 1u8) << start_index
    }
}

/// Register definitions
///
/// Addresses are the bare 7-bit register addresses; the driver ORs in
/// [`BH1730_CMD`] before every transaction, as the device protocol
/// requires.
pub struct Register;
impl Register {
    pub const CONTROL: u8 = 0x00;
    /// Integration-time register. Never written by this driver: the
    /// power-on default ([`ITIME`]) is used as-is.
    pub const TIMING: u8 = 0x01;
    pub const GAIN: u8 = 0x07;
    pub const DATA0_LOW: u8 = 0x14;
    pub const DATA0_HIGH: u8 = 0x15;
    pub const DATA1_LOW: u8 = 0x16;
    pub const DATA1_HIGH: u8 = 0x17;
}

/// Command prefix bit, ORed into every register address on the wire.
pub const BH1730_CMD: u8 = 0x80;

/// Power-on default of the TIMING register.
pub const ITIME: u8 = 0xDA;

/// Internal clock period of one integration step, in milliseconds.
pub const T_INT_MS: f32 = 2.8 / 1000.0;

/// Duration of one conversion with the default TIMING value, in
/// milliseconds (~102.57 ms).
pub const ITIME_MS: f32 = T_INT_MS * 964.0 * (256 - ITIME as u16) as f32;

// General Field structure used by registers
pub struct Field<T> {
    pub start_index: u8,
    pub width: u8,
    pub value: T,
}

impl<T> Field<T>
where
    T: ToPrimitive,
{
    pub fn bits(self) -> u8 {
        // First create a mask of N '1' bits to be used to truncate the value
        // The algorithm: ((1 << length) - 1) << pos
        let mask: u8 = self::helpers::get_mask(self.start_index, self.width);

        let val: u8 = num_renamed::ToPrimitive::to_u8(&self.value).unwrap();
        let tmp: u8 = (val << self.start_index) & mask;
        tmp
    }
}

/// Defines a standard structure for a 8-bit register.
///
/// This macro takes `StructName, {structfield1: type1, structfield2: type2, ...}` as arguments
/// and generates a structure:
///
/// ```compile_fail
/// struct StructName {
///     structfield1: Field<type1>,
///     structfield2: Field<type2>,
///     ...
/// }
/// ```
///
/// The structure will have automatic `with_structfieldX()` factory methods created, as well
/// as a `value()` function that returns the encoded u8 data.
///
#[macro_export]
macro_rules! create_register {
    ($reg_name:ident, {$($element: ident: $ty: ty),*}) => {
        pub struct $reg_name { $(pub $element: Field<$ty>),* }

        paste! {
            impl $reg_name {
                pub fn value(self) -> u8 {
                    let mut temp: u8 = 0x00;
                    $(
                        temp |= self.$element.bits();
                    )*
                    temp
                }

            // Creates with_<variable> methods
            $(
                pub fn [<with_ $element>] (self, paste!{[<new_ $element>]}: $ty) -> Self {
                    let mut tmp = $reg_name{..self};
                    tmp.$element.value = paste!{[<new_ $element>]};
                    tmp
                }
            )*
            }
        }

        paste! {
            // Creates a From<u8> implementation for this register
            impl From<u8> for $reg_name {
                fn from(val: u8) -> Self {
                    let new_reg = $reg_name::default();

                    $(
                        let [<$element _mask>] = self::helpers::get_mask(new_reg.$element.start_index, new_reg.$element.width);
                        let [<$element _val>] = FromPrimitive::from_u8( (val & [<$element _mask>]) >> new_reg.$element.start_index ).unwrap();
                        let new_reg = new_reg.[<with_ $element>]([<$element _val>]);
                    )*

                    new_reg
                }
            }
        }
    }
}

create_register!(ControlRegister, {power: Power, adc_enable: AdcEnable, measurement_mode: MeasurementMode, data_status: AdcDataStatus});

impl Default for ControlRegister {
    fn default() -> Self {
        ControlRegister {
            power: Field {
                start_index: 0,
                width: 1,
                value: Power::Off,
            },
            adc_enable: Field {
                start_index: 1,
                width: 1,
                value: AdcEnable::Disabled,
            },
            measurement_mode: Field {
                start_index: 3,
                width: 1,
                value: MeasurementMode::Continuous,
            },
            data_status: Field {
                start_index: 4,
                width: 1,
                value: AdcDataStatus::Invalid,
            },
        }
    }
}

create_register!(GainRegister, {gain: Gain});

impl Default for GainRegister {
    fn default() -> Self {
        GainRegister {
            gain: Field {
                start_index: 0,
                width: 2,
                value: Gain::X1,
            },
        }
    }
}
