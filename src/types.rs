/// All possible errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I²C bus error.
    I2C(E),
    /// A measurement was requested while the driver is not in the Ready
    /// state (either never set up, or failed during setup).
    NotReady,
}

/// One conversion's worth of raw photodiode counts.
///
/// `data0` is the combined visible + infrared channel, `data1` the
/// infrared-only channel.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub data0: u16,
    pub data1: u16,
}

/// Lifecycle state of the measurement controller.
///
/// `Ready` is entered only once both setup transactions (power-on and
/// gain select) have succeeded. `Failed` is terminal until the driver is
/// re-initialized from outside.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    Uninitialized,
    Ready,
    Failed,
}
