//! Timer-driven lookup-table output synthesis.
//!
//! [`SynthesisDriver`] owns the [`WaveformTable`] and a periodic hardware
//! timer. Every firing writes exactly one table entry to the output register
//! and advances the index, wrapping at the table length. Output frequency is
//! therefore `timer rate / table length` (6000 Hz / 100 entries = 60 Hz).
//!
//! ## State machine
//!
//! ```text
//!                generate_table()          start()
//! Uninitialized ───────────────► Ready ──────────► Running
//!                                  ▲                 │ stop()
//!                  generate_table()│                 ▼
//!                                  └───────────── Stopped ──start()──► Running
//! ```
//!
//! `stop()` is valid from any state and is a no-op unless running.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! // In init:
//! synth.generate_table(100, 70.0, 100.0, CodecRange::BITS_8)?;
//! synth.start(OutputChannel(1), 6_000)?;
//!
//! // In the timer ISR, with the DAC data register as a local resource:
//! synth.on_timer(&mut dac);
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::config::{CodecRange, OutputChannel, TimerPeriod};
use crate::control::{OutputRegister, SynthesisHardware};
use crate::dsp::WaveformTable;
use crate::error::{ConfigError, Error};

use super::fault::{FaultFlags, Faults};

/// Lifecycle state of the synthesis driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SynthesisState {
    /// No waveform table yet.
    Uninitialized,
    /// Table generated, never started since.
    Ready,
    Running,
    Stopped,
}

/// Parameters of a running synthesis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SynthesisSession {
    pub channel: OutputChannel,
    pub period: TimerPeriod,
}

/// Bridges periodic timer interrupts into sequential table reads and
/// output-register writes.
pub struct SynthesisDriver<H> {
    hw: H,
    table: Option<WaveformTable>,
    state: SynthesisState,
    session: Option<SynthesisSession>,
    /// ISR-visible mirror of `state == Running`.
    running: AtomicBool,
    /// Set for the duration of a timer handler.
    in_handler: AtomicBool,
    /// Next table entry; always `< table.len()`.
    index: AtomicUsize,
    firings: AtomicU32,
    faults: FaultFlags,
}

impl<H: SynthesisHardware> SynthesisDriver<H> {
    pub const fn new(hw: H) -> Self {
        SynthesisDriver {
            hw,
            table: None,
            state: SynthesisState::Uninitialized,
            session: None,
            running: AtomicBool::new(false),
            in_handler: AtomicBool::new(false),
            index: AtomicUsize::new(0),
            firings: AtomicU32::new(0),
            faults: FaultFlags::new(),
        }
    }

    /// Build the waveform table: `offset + amplitude * sin(2π·i/sample_count)`,
    /// rounded and clamped to `range`.
    ///
    /// Rejected with [`ConfigError::SessionActive`] while running; the
    /// existing table is left untouched on any error.
    pub fn generate_table(
        &mut self,
        sample_count: usize,
        amplitude: f32,
        offset: f32,
        range: CodecRange,
    ) -> Result<(), ConfigError> {
        if self.state == SynthesisState::Running {
            return Err(ConfigError::SessionActive);
        }
        let table = WaveformTable::generate(sample_count, amplitude, offset, range)?;
        self.table = Some(table);
        self.index.store(0, Ordering::Relaxed);
        self.state = SynthesisState::Ready;
        Ok(())
    }

    /// Start output at `output_rate_hz` table entries per second.
    pub fn start(
        &mut self,
        channel: OutputChannel,
        output_rate_hz: u32,
    ) -> Result<(), Error<H::Error>> {
        let period = TimerPeriod::from_rate_hz(output_rate_hz)?;
        self.start_with_period(channel, period)
    }

    /// Start output with an explicit timer period.
    ///
    /// Valid from `Ready` or `Stopped`. The table index restarts at 0.
    pub fn start_with_period(
        &mut self,
        channel: OutputChannel,
        period: TimerPeriod,
    ) -> Result<(), Error<H::Error>> {
        match self.state {
            SynthesisState::Uninitialized => return Err(ConfigError::NotReady.into()),
            SynthesisState::Running => return Err(ConfigError::SessionActive.into()),
            SynthesisState::Ready | SynthesisState::Stopped => {}
        }

        self.index.store(0, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        if let Err(e) = self.hw.arm(channel, period) {
            self.running.store(false, Ordering::Release);
            log::warn!("synthesis on channel {} rejected: {:?}", channel.0, e);
            return Err(Error::Hardware(e));
        }

        log::info!(
            "synthesis started: channel {}, {} us period",
            channel.0,
            period.as_micros()
        );
        self.session = Some(SynthesisSession { channel, period });
        self.state = SynthesisState::Running;
        Ok(())
    }

    /// Disarm the timer. Idempotent; a no-op unless running.
    ///
    /// A firing already in flight may still complete its single write.
    pub fn stop(&mut self) {
        if self.state != SynthesisState::Running {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.hw.disarm();
        self.session = None;
        self.state = SynthesisState::Stopped;
        log::info!("synthesis stopped");
    }

    /// Handle one timer firing (interrupt context).
    ///
    /// Performs exactly one register write and one index increment. Returns
    /// `false` without writing if the session is not running, or if this
    /// firing overlapped an unfinished previous one (raising
    /// [`Faults::TIMER_OVERRUN`]).
    #[inline]
    pub fn on_timer<R: OutputRegister>(&self, out: &mut R) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        if self.in_handler.swap(true, Ordering::Acquire) {
            self.faults.raise(Faults::TIMER_OVERRUN);
            return false;
        }

        let wrote = match &self.table {
            Some(table) => {
                let i = self.index.load(Ordering::Relaxed);
                out.write(table.get(i));
                let next = i + 1;
                self.index
                    .store(if next >= table.len() { 0 } else { next }, Ordering::Relaxed);
                self.firings.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        };

        self.in_handler.store(false, Ordering::Release);
        wrote
    }

    /// Close the interrupt-side gate without touching the timer.
    ///
    /// Later firings write nothing. The session stays open until
    /// [`stop()`](Self::stop) disarms the timer from the owning context.
    pub fn quiesce(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether timer firings currently produce output.
    pub fn is_live(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SynthesisState {
        self.state
    }

    pub fn session(&self) -> Option<&SynthesisSession> {
        self.session.as_ref()
    }

    /// Index of the entry the next firing will write.
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    pub fn table(&self) -> Option<&WaveformTable> {
        self.table.as_ref()
    }

    /// Timer firings serviced since creation.
    pub fn firings(&self) -> u32 {
        self.firings.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> Faults {
        self.faults.get()
    }

    pub fn clear_faults(&self) -> Faults {
        self.faults.clear()
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Stop and hand back the hardware.
    pub fn release(mut self) -> H {
        self.stop();
        self.hw
    }
}
