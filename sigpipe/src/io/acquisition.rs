//! DMA-driven ADC acquisition adapter.
//!
//! [`AcquisitionDriver`] owns the lifecycle of one hardware acquisition
//! channel and copies every completed DMA block into the [`SampleRing`].
//!
//! ## Architecture
//!
//! ```text
//! ADC ──DMA──► [hw block buffer] ──on_block()──► SampleRing ──pop()──► Coordinator::tick()
//!                  (reused by hw)     (ISR, copy)               (cooperative)
//! ```
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! // In init (cooperative context):
//! driver.start(&RING, InputChannel(6), 1_000, 1_000)?;
//!
//! // In the DMA transfer-complete ISR:
//! driver.on_block(&RING, &dma_block[..]);
//!
//! // Teardown:
//! driver.stop();
//! ```
//!
//! The hardware block buffer is overwritten as soon as the ISR returns, so
//! [`on_block()`](AcquisitionDriver::on_block) copies rather than retains.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::config::InputChannel;
use crate::control::AcquisitionHardware;
use crate::error::{ConfigError, Error};

use super::fault::{FaultFlags, Faults};
use super::ring::SampleRing;

/// Parameters of a running acquisition. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionSession {
    pub channel: InputChannel,
    pub sample_rate_hz: u32,
    /// Samples per block-completion callback.
    pub block_size: usize,
}

/// Bridges DMA block-completion callbacks into [`SampleRing`] writes.
///
/// `start()`/`stop()` run in the cooperative context and take `&mut self`.
/// [`on_block()`](Self::on_block) runs in interrupt context and takes `&self`;
/// everything it touches is atomic.
pub struct AcquisitionDriver<H> {
    hw: H,
    session: Option<AcquisitionSession>,
    /// Cleared before the hardware is disarmed so late callbacks are dropped.
    armed: AtomicBool,
    /// Set for the duration of a callback.
    in_callback: AtomicBool,
    block_size: AtomicUsize,
    blocks: AtomicU32,
    faults: FaultFlags,
}

impl<H: AcquisitionHardware> AcquisitionDriver<H> {
    pub const fn new(hw: H) -> Self {
        AcquisitionDriver {
            hw,
            session: None,
            armed: AtomicBool::new(false),
            in_callback: AtomicBool::new(false),
            block_size: AtomicUsize::new(0),
            blocks: AtomicU32::new(0),
            faults: FaultFlags::new(),
        }
    }

    /// Configure and arm the acquisition hardware.
    ///
    /// Fails fast, without retrying, if a session is already running, if
    /// the rate is zero, if `block_size` is zero or larger than `ring`, or
    /// if the hardware rejects the configuration. On failure the driver
    /// stays stopped.
    pub fn start<const C: usize>(
        &mut self,
        ring: &SampleRing<C>,
        channel: InputChannel,
        sample_rate_hz: u32,
        block_size: usize,
    ) -> Result<(), Error<H::Error>> {
        if self.session.is_some() {
            return Err(ConfigError::SessionActive.into());
        }
        if sample_rate_hz == 0 {
            return Err(ConfigError::InvalidRate.into());
        }
        if block_size == 0 || block_size > ring.capacity() {
            return Err(ConfigError::InvalidBlockSize {
                requested: block_size,
                max: ring.capacity(),
            }
            .into());
        }

        let session = AcquisitionSession {
            channel,
            sample_rate_hz,
            block_size,
        };
        self.block_size.store(block_size, Ordering::Relaxed);
        // Armed before the hardware so the very first block is accepted.
        self.armed.store(true, Ordering::Release);
        if let Err(e) = self.hw.arm(&session) {
            self.armed.store(false, Ordering::Release);
            log::warn!("acquisition on channel {} rejected: {:?}", channel.0, e);
            return Err(Error::Hardware(e));
        }

        log::info!(
            "acquisition started: channel {} at {} Hz, {} samples/block",
            channel.0,
            sample_rate_hz,
            block_size
        );
        self.session = Some(session);
        Ok(())
    }

    /// Disarm the hardware. Idempotent; a no-op if never started.
    ///
    /// A callback already in flight may still complete; it is dropped.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            self.armed.store(false, Ordering::Release);
            self.hw.disarm();
            log::info!("acquisition stopped: channel {}", session.channel.0);
        }
    }

    /// Handle a DMA block-completion event (interrupt context).
    ///
    /// Copies `samples` into `ring` before returning. Returns `false` if the
    /// block was dropped: the session is stopped, or this call overlapped an
    /// unfinished previous callback (raising
    /// [`Faults::ACQUISITION_OVERRUN`]). A block whose length differs from
    /// the configured block size is still copied but raises
    /// [`Faults::ACQUISITION_DESYNC`].
    pub fn on_block<const C: usize>(&self, ring: &SampleRing<C>, samples: &[u16]) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            return false;
        }
        if self.in_callback.swap(true, Ordering::Acquire) {
            self.faults.raise(Faults::ACQUISITION_OVERRUN);
            return false;
        }

        if samples.len() != self.block_size.load(Ordering::Relaxed) {
            self.faults.raise(Faults::ACQUISITION_DESYNC);
        }
        ring.push(samples);
        self.blocks.fetch_add(1, Ordering::Relaxed);

        self.in_callback.store(false, Ordering::Release);
        true
    }

    /// Close the interrupt-side gate without touching the hardware.
    ///
    /// Later callbacks are dropped. The session stays open until
    /// [`stop()`](Self::stop) disarms the hardware from the owning context.
    pub fn quiesce(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// Whether block callbacks are currently accepted.
    pub fn is_live(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AcquisitionSession> {
        self.session.as_ref()
    }

    /// Blocks accepted since creation.
    pub fn blocks_received(&self) -> u32 {
        self.blocks.load(Ordering::Relaxed)
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
