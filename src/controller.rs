//! Measurement controller for the BH1730.
//!
//! Runs the sensor's duty cycle on behalf of a host that ticks it
//! periodically: power-up and gain configuration once at setup, then one
//! one-shot conversion per tick. Because a conversion needs more than
//! one integration period before the counts are readable, the cycle is
//! split into two phases:
//!
//! 1. [`Bh1730Controller::update`] triggers the conversion and returns a
//!    [`PendingRead`] ticket carrying the delay to wait.
//! 2. The host schedules a callback [`PendingRead::delay_ms`]
//!    milliseconds later and passes the ticket back to
//!    [`Bh1730Controller::complete_read`], which reads the counts,
//!    converts them and publishes to the bound [`Sink`]s.
//!
//! Every trigger bumps a generation counter that is captured in the
//! ticket. If a new tick fires while a previous deferred read is still
//! outstanding, the older ticket no longer matches and is discarded on
//! arrival instead of racing the fresh conversion.

use embedded_hal::blocking::i2c;

use crate::raw_to_lux;
use crate::types::{DriverState, Error, RawSample};
use crate::{Bh1730, Bh1730Config, Gain};

/// Delay between triggering a conversion and reading it back, in
/// milliseconds. A fixed literal, deliberately not derived from
/// [`crate::ITIME_MS`]: it is a safe upper bound above one integration
/// period, not the integration time itself.
pub const READ_DELAY_MS: u32 = 150;

/// Receiver for one of the controller's numeric outputs.
///
/// Publishing `f32::NAN` is the documented way to signal "no valid
/// reading this cycle".
pub trait Sink {
    fn publish(&mut self, value: f32);
}

/// Ticket for a triggered conversion, returned by
/// [`Bh1730Controller::update`].
///
/// Hand it back to [`Bh1730Controller::complete_read`] after waiting
/// [`PendingRead::delay_ms`] milliseconds. A ticket from an older tick
/// is recognized by its generation and discarded.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingRead {
    generation: u32,
    delay_ms: u32,
}

impl PendingRead {
    /// How long to wait before calling
    /// [`Bh1730Controller::complete_read`] with this ticket.
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    AwaitingRead { generation: u32 },
}

/// Orchestrates the BH1730 duty cycle and publishes the three outputs.
///
/// Up to three sinks can be bound: the raw visible+infrared count
/// (`data0`), the raw infrared count (`data1`), and the converted
/// illuminance. Unbound outputs are simply not published.
pub struct Bh1730Controller<'a, I2C> {
    sensor: Bh1730<I2C>,
    gain: Gain,
    state: DriverState,
    phase: Phase,
    generation: u32,
    visible_sink: Option<&'a mut dyn Sink>,
    infrared_sink: Option<&'a mut dyn Sink>,
    illuminance_sink: Option<&'a mut dyn Sink>,
}

impl<'a, I2C, E> Bh1730Controller<'a, I2C>
where
    I2C: i2c::WriteRead<Error = E> + i2c::Write<Error = E>,
{
    /// Creates an uninitialized controller; call
    /// [`Bh1730Controller::setup`] before the first tick.
    pub fn new(i2c: I2C, config: &Bh1730Config) -> Self {
        Bh1730Controller {
            sensor: Bh1730::new(i2c),
            gain: config.gain,
            state: DriverState::Uninitialized,
            phase: Phase::Idle,
            generation: 0,
            visible_sink: None,
            infrared_sink: None,
            illuminance_sink: None,
        }
    }

    /// Binds the raw visible+infrared channel output.
    pub fn with_visible_sink(mut self, sink: &'a mut dyn Sink) -> Self {
        self.visible_sink = Some(sink);
        self
    }

    /// Binds the raw infrared channel output.
    pub fn with_infrared_sink(mut self, sink: &'a mut dyn Sink) -> Self {
        self.infrared_sink = Some(sink);
        self
    }

    /// Binds the converted illuminance output.
    pub fn with_illuminance_sink(mut self, sink: &'a mut dyn Sink) -> Self {
        self.illuminance_sink = Some(sink);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Destroy the controller, returning the I²C bus instance.
    pub fn destroy(self) -> I2C {
        self.sensor.destroy()
    }

    /// Powers the sensor on and programs the configured gain. Run once
    /// before periodic updates.
    ///
    /// Any bus failure here is fatal: the controller enters
    /// [`DriverState::Failed`] and all subsequent ticks are no-ops until
    /// it is re-created.
    pub fn setup(&mut self) -> Result<(), Error<E>> {
        if let Err(e) = self.sensor.power_on() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Turning on BH1730 failed");
            self.state = DriverState::Failed;
            return Err(e);
        }

        if let Err(e) = self.sensor.set_gain(self.gain) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Failed to set gain {}", self.gain);
            self.state = DriverState::Failed;
            return Err(e);
        }

        self.state = DriverState::Ready;
        Ok(())
    }

    /// Starts one measurement cycle. Call once per periodic tick.
    ///
    /// Returns [`Error::NotReady`] without touching the bus when the
    /// controller has not been set up or has failed. A bus failure while
    /// triggering is transient: the error is returned, the state stays
    /// [`DriverState::Ready`] and the next tick retries from the
    /// trigger.
    pub fn update(&mut self) -> Result<PendingRead, Error<E>> {
        if self.state != DriverState::Ready {
            return Err(Error::NotReady);
        }

        if let Err(e) = self.sensor.trigger_measurement() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Triggering BH1730 one-shot conversion failed");
            return Err(e);
        }

        self.generation = self.generation.wrapping_add(1);
        self.phase = Phase::AwaitingRead {
            generation: self.generation,
        };

        Ok(PendingRead {
            generation: self.generation,
            delay_ms: READ_DELAY_MS,
        })
    }

    /// Finishes a measurement cycle: reads the counts, converts and
    /// publishes.
    ///
    /// A stale ticket (one superseded by a later [`Bh1730Controller::update`],
    /// or already completed) is discarded without bus traffic. When the
    /// raw read fails, every bound sink receives `f32::NAN` exactly once
    /// and the cycle is abandoned; the controller stays ready for the
    /// next tick.
    pub fn complete_read(&mut self, pending: PendingRead) -> Result<(), Error<E>> {
        if self.state != DriverState::Ready {
            return Err(Error::NotReady);
        }

        match self.phase {
            Phase::AwaitingRead { generation } if generation == pending.generation => {}
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "Discarding stale BH1730 read (generation {})",
                    pending.generation
                );
                return Ok(());
            }
        }
        self.phase = Phase::Idle;

        let sample = match self.sensor.read_raw() {
            Ok(sample) => sample,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Reading BH1730 data failed");
                self.publish_no_data();
                return Err(e);
            }
        };

        self.publish_sample(sample);
        Ok(())
    }

    /// Logs the controller configuration (gain, state, bound outputs).
    pub fn dump_config(&self) {
        #[cfg(feature = "defmt")]
        {
            defmt::info!("BH1730:");
            defmt::info!("  Gain: {}", self.gain);
            defmt::info!("  State: {}", self.state);
            defmt::info!("  Visible output bound: {}", self.visible_sink.is_some());
            defmt::info!("  Infrared output bound: {}", self.infrared_sink.is_some());
            defmt::info!(
                "  Illuminance output bound: {}",
                self.illuminance_sink.is_some()
            );
        }
    }

    fn publish_sample(&mut self, sample: RawSample) {
        if let Some(sink) = self.visible_sink.as_mut() {
            sink.publish(f32::from(sample.data0));
        }
        if let Some(sink) = self.infrared_sink.as_mut() {
            sink.publish(f32::from(sample.data1));
        }
        if let Some(sink) = self.illuminance_sink.as_mut() {
            sink.publish(raw_to_lux(sample.data0, sample.data1, self.gain));
        }
    }

    fn publish_no_data(&mut self) {
        if let Some(sink) = self.visible_sink.as_mut() {
            sink.publish(f32::NAN);
        }
        if let Some(sink) = self.infrared_sink.as_mut() {
            sink.publish(f32::NAN);
        }
        if let Some(sink) = self.illuminance_sink.as_mut() {
            sink.publish(f32::NAN);
        }
    }
}
