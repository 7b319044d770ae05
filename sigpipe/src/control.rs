//! Hardware seams.
//!
//! The pipeline never touches peripherals directly. Board support code
//! implements these traits for the real ADC/DMA engine, output timer and DAC;
//! tests implement them with plain structs.

use crate::config::{OutputChannel, TimerPeriod};
use crate::io::acquisition::AcquisitionSession;

/// DMA-driven ADC acquisition engine.
pub trait AcquisitionHardware {
    /// Error type for configuration rejections.
    type Error: core::fmt::Debug;

    /// Configure and arm continuous block acquisition.
    ///
    /// After this returns `Ok`, the platform delivers each completed block
    /// to the pipeline's block-completion handler.
    fn arm(&mut self, session: &AcquisitionSession) -> Result<(), Self::Error>;

    /// Stop acquisition. No block callbacks may start after this returns.
    fn disarm(&mut self);
}

/// Periodic timer driving output synthesis.
pub trait SynthesisHardware {
    /// Error type for configuration rejections.
    type Error: core::fmt::Debug;

    /// Enable `channel` and start a periodic timer with `period`.
    fn arm(&mut self, channel: OutputChannel, period: TimerPeriod) -> Result<(), Self::Error>;

    /// Stop the timer. No firings may start after this returns.
    fn disarm(&mut self);
}

/// Output data register written once per timer firing.
///
/// Implementations must be a single bounded register write: no buffering,
/// no logging, no waiting.
pub trait OutputRegister {
    fn write(&mut self, code: u16);
}

/// [`OutputRegister`] backed by a PWM channel's duty cycle, for boards that
/// synthesize through a filtered PWM pin instead of a DAC.
///
/// Codes are written as raw duty values, so the table's [`CodecRange`](crate::config::CodecRange)
/// should match the channel's `max_duty_cycle()`.
#[cfg(feature = "pwm")]
pub struct PwmOutput<P> {
    pwm: P,
    errors: u32,
}

#[cfg(feature = "pwm")]
impl<P: embedded_hal::pwm::SetDutyCycle> PwmOutput<P> {
    pub fn new(pwm: P) -> Self {
        PwmOutput { pwm, errors: 0 }
    }

    /// Writes the channel refused.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

#[cfg(feature = "pwm")]
impl<P: embedded_hal::pwm::SetDutyCycle> OutputRegister for PwmOutput<P> {
    #[inline]
    fn write(&mut self, code: u16) {
        let duty = code.min(self.pwm.max_duty_cycle());
        if self.pwm.set_duty_cycle(duty).is_err() {
            self.errors = self.errors.wrapping_add(1);
        }
    }
}
