//! Pipeline coordinator.
//!
//! [`Pipeline`] owns every piece of pipeline state: the [`SampleRing`], both
//! driver adapters, and the telemetry sink. Lifecycle calls (`boot`, `start`,
//! `shutdown`) go through `&mut Pipeline`. While the sessions run, the
//! pipeline is [`split`](Pipeline::split) into two halves that share nothing
//! but atomics:
//!
//! - [`Handlers`]: `Copy` handle for the interrupt contexts. Exposes
//!   [`on_block_complete`](Handlers::on_block_complete),
//!   [`on_timer`](Handlers::on_timer) and [`dispatch`](Handlers::dispatch).
//! - [`Coordinator`]: the cooperative half. Owns the sink and the drain
//!   scratch buffer and pops through `&SampleRing`.
//!
//! Neither half ever waits on the other. A sink that stalls inside
//! `publish` stalls only the cooperative loop.
//!
//! ## Execution contexts
//!
//! | Context | Entry point | May block | Touches |
//! |---------|-------------|-----------|---------|
//! | DMA block-complete ISR | `Handlers::on_block_complete` | no | ring (write cursor), acquisition flags |
//! | Output timer ISR | `Handlers::on_timer` | no | table (read-only), index, synthesis flags |
//! | Cooperative loop | `Coordinator::tick`, `Coordinator::run_once` | no | ring (read cursor), sink |
//! | Owner (init/teardown) | `boot`, `start`, `shutdown`, `into_parts` | no | everything |
//!
//! The two interrupt sources are independent; nothing here assumes any phase
//! relationship between them.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! // init: the pipeline lives in a StaticCell so the halves are 'static.
//! let pipeline = PIPELINE.init(Pipeline::new(config, adc_dma, dac_timer, plotter)?);
//! pipeline.boot(&mut board)?;
//! let (handlers, coordinator) = pipeline.split();
//! // `handlers` is copied into both ISR tasks' locals,
//! // `coordinator` into the idle task's locals. No #[shared] resource.
//!
//! // DMA transfer-complete ISR:
//! cx.local.handlers.on_block_complete(&dma_block[..]);
//!
//! // Timer ISR:
//! cx.local.handlers.on_timer(cx.local.dac);
//!
//! // idle:
//! loop {
//!     cx.local.coordinator.run_once(cx.local.board);
//! }
//! ```
//!
//! ## Halting and shutdown order
//!
//! On a fault with `halt_on_fault` set, [`Coordinator::tick`] closes both
//! interrupt gates at once (synthesis first); the hardware itself is
//! disarmed by the next [`Pipeline::shutdown`]. [`Pipeline::tick`] has the
//! whole pipeline and disarms immediately.
//!
//! Shutdown stops synthesis first, then acquisition. Samples acquired before
//! shutdown remain in the ring and are still drained by later ticks.

use crate::config::PipelineConfig;
use crate::constants::{MAX_DRAIN_BATCH, RING_CAPACITY};
use crate::control::{AcquisitionHardware, OutputRegister, SynthesisHardware};
use crate::error::{ConfigError, StartError};
use crate::io::{AcquisitionDriver, Faults, SampleRing, SynthesisDriver};
use crate::platform::Platform;
use crate::telemetry::TelemetrySink;

#[cfg(test)]
mod integration_tests;

/// Hardware events routed to the pipeline's fixed handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt<'a> {
    /// A DMA transfer finished; the slice is the hardware block buffer.
    BlockComplete(&'a [u16]),
    /// The output timer fired.
    TimerFired,
}

/// Outcome of one cooperative tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Samples forwarded to the sink during this tick.
    pub drained: usize,
    /// Sticky runtime faults currently raised.
    pub faults: Faults,
    /// Samples lost to ring overflow since creation.
    pub dropped: usize,
    /// Both sessions were halted during this tick because of a fault.
    pub halted: bool,
}

/// Cooperative-side state: the sink and everything the drain loop tracks.
struct Telemetry<K> {
    sink: K,
    scratch: [u16; MAX_DRAIN_BATCH],
    ticks: u32,
    seen_faults: Faults,
    seen_dropped: usize,
    published: usize,
}

impl<K: TelemetrySink> Telemetry<K> {
    fn new(sink: K) -> Self {
        Telemetry {
            sink,
            scratch: [0; MAX_DRAIN_BATCH],
            ticks: 0,
            seen_faults: Faults::NONE,
            seen_dropped: 0,
            published: 0,
        }
    }

    /// Log faults not seen before. Returns whether the pipeline should halt.
    fn observe_faults(&mut self, config: &PipelineConfig, faults: Faults, live: bool) -> bool {
        self.ticks = self.ticks.wrapping_add(1);

        let fresh = faults.difference(self.seen_faults);
        if !fresh.is_empty() {
            log::warn!("runtime fault raised: {:?}", fresh);
            self.seen_faults = faults;
        }

        let halt = config.halt_on_fault && !faults.is_empty() && live;
        if halt {
            log::warn!("halting pipeline on fault");
        }
        halt
    }

    /// Drain at most one batch and report.
    fn drain<const C: usize>(
        &mut self,
        config: &PipelineConfig,
        ring: &SampleRing<C>,
        faults: Faults,
        halted: bool,
    ) -> TickReport {
        let mut drained = 0;
        if self.ticks % config.drain_interval_ticks == 0 {
            let count = ring.pop(&mut self.scratch[..config.drain_batch]);
            if count > 0 {
                self.sink.publish(
                    config.telemetry_label,
                    config.telemetry_format,
                    &self.scratch[..count],
                );
                self.published = self.published.wrapping_add(count);
                drained = count;
            }
        }

        let dropped = ring.overflow_count();
        let lost = dropped.wrapping_sub(self.seen_dropped);
        if lost != 0 {
            log::warn!("sample ring overflow: {} samples dropped", lost);
            self.seen_dropped = dropped;
        }

        TickReport {
            drained,
            faults,
            dropped,
            halted,
        }
    }
}

/// Acquisition/synthesis pipeline.
///
/// # Type Parameters
///
/// - `A`: acquisition hardware.
/// - `S`: synthesis (timer) hardware.
/// - `K`: telemetry sink.
/// - `C`: sample ring capacity, a power of two no smaller than the
///   configured block size.
pub struct Pipeline<A, S, K, const C: usize = RING_CAPACITY> {
    config: PipelineConfig,
    ring: SampleRing<C>,
    acquisition: AcquisitionDriver<A>,
    synthesis: SynthesisDriver<S>,
    telemetry: Telemetry<K>,
}

impl<A, S, K, const C: usize> Pipeline<A, S, K, C>
where
    A: AcquisitionHardware,
    S: SynthesisHardware,
    K: TelemetrySink,
{
    /// Validate `config` and assemble a stopped pipeline.
    pub fn new(
        config: PipelineConfig,
        acquisition: A,
        synthesis: S,
        sink: K,
    ) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate::<C>() {
            log::warn!("pipeline configuration rejected: {}", e);
            return Err(e);
        }
        Ok(Pipeline {
            config,
            ring: SampleRing::new(),
            acquisition: AcquisitionDriver::new(acquisition),
            synthesis: SynthesisDriver::new(synthesis),
            telemetry: Telemetry::new(sink),
        })
    }

    /// Bring up the platform, then start the pipeline.
    pub fn boot<P: Platform>(&mut self, platform: &mut P) -> Result<(), StartError<A::Error, S::Error>> {
        platform.setup();
        self.start()
    }

    /// Generate the waveform table, then start acquisition and synthesis.
    ///
    /// Sticky faults from a previous run are cleared before the hardware is
    /// armed. If synthesis fails to start, the already running acquisition
    /// session is stopped again so a failed start never leaves half a
    /// pipeline running.
    pub fn start(&mut self) -> Result<(), StartError<A::Error, S::Error>> {
        let waveform = self.config.waveform;
        self.synthesis.generate_table(
            waveform.samples,
            waveform.amplitude,
            waveform.offset,
            waveform.range,
        )?;

        let stale = self.clear_faults();
        if !stale.is_empty() {
            log::info!("clearing faults from previous run: {:?}", stale);
        }

        self.acquisition
            .start(
                &self.ring,
                self.config.input_channel,
                self.config.acquisition_rate_hz,
                self.config.block_size,
            )
            .map_err(StartError::Acquisition)?;

        if let Err(e) = self
            .synthesis
            .start_with_period(self.config.output_channel, self.config.output_period)
        {
            self.acquisition.stop();
            return Err(StartError::Synthesis(e));
        }

        log::info!("pipeline running");
        Ok(())
    }

    /// Split into the interrupt-side [`Handlers`] and the cooperative
    /// [`Coordinator`]. Both halves borrow the pipeline; lifecycle calls
    /// resume once they are dropped.
    pub fn split(&mut self) -> (Handlers<'_, A, S, C>, Coordinator<'_, A, S, K, C>) {
        let handlers = Handlers {
            ring: &self.ring,
            acquisition: &self.acquisition,
            synthesis: &self.synthesis,
        };
        let coordinator = Coordinator {
            config: &self.config,
            ring: &self.ring,
            acquisition: &self.acquisition,
            synthesis: &self.synthesis,
            telemetry: &mut self.telemetry,
        };
        (handlers, coordinator)
    }

    /// Interrupt-side handle for single-context use, such as host tests.
    pub fn handlers(&self) -> Handlers<'_, A, S, C> {
        Handlers {
            ring: &self.ring,
            acquisition: &self.acquisition,
            synthesis: &self.synthesis,
        }
    }

    /// One cooperative step with exclusive access: surface faults, disarm
    /// both sessions if halting, then drain at most one batch. Never waits
    /// for samples.
    pub fn tick(&mut self) -> TickReport {
        let faults = self.faults();
        let live = self.is_running();
        let halted = self.telemetry.observe_faults(&self.config, faults, live);
        if halted {
            self.shutdown();
        }
        self.telemetry.drain(&self.config, &self.ring, faults, halted)
    }

    /// One loop iteration: pipeline `tick()`, then `platform.tick()`.
    pub fn run_once<P: Platform>(&mut self, platform: &mut P) -> TickReport {
        let report = self.tick();
        platform.tick();
        report
    }

    /// Stop synthesis, then acquisition. Idempotent.
    pub fn shutdown(&mut self) {
        let was_running = self.is_running();
        self.synthesis.stop();
        self.acquisition.stop();
        if was_running {
            log::info!(
                "pipeline stopped: {} samples published, {} dropped",
                self.telemetry.published,
                self.ring.overflow_count()
            );
        }
    }

    /// Clear sticky faults on both paths, returning what was raised.
    pub fn clear_faults(&mut self) -> Faults {
        self.telemetry.seen_faults = Faults::NONE;
        self.acquisition
            .clear_faults()
            .union(self.synthesis.clear_faults())
    }

    /// Stop everything and hand back the owned hardware and sink.
    pub fn into_parts(mut self) -> (A, S, K) {
        self.shutdown();
        let Pipeline {
            acquisition,
            synthesis,
            telemetry,
            ..
        } = self;
        (acquisition.release(), synthesis.release(), telemetry.sink)
    }

    /// Faults raised on either path.
    pub fn faults(&self) -> Faults {
        self.acquisition.faults().union(self.synthesis.faults())
    }

    /// Whether either session is open.
    pub fn is_running(&self) -> bool {
        self.acquisition.is_running() || self.synthesis.session().is_some()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ring(&self) -> &SampleRing<C> {
        &self.ring
    }

    pub fn acquisition(&self) -> &AcquisitionDriver<A> {
        &self.acquisition
    }

    pub fn synthesis(&self) -> &SynthesisDriver<S> {
        &self.synthesis
    }

    /// Total samples handed to the sink.
    pub fn published(&self) -> usize {
        self.telemetry.published
    }

    pub fn sink(&self) -> &K {
        &self.telemetry.sink
    }
}

/// Interrupt-context entry points. Every call is bounded and lock-free.
pub struct Handlers<'a, A, S, const C: usize = RING_CAPACITY> {
    ring: &'a SampleRing<C>,
    acquisition: &'a AcquisitionDriver<A>,
    synthesis: &'a SynthesisDriver<S>,
}

impl<A, S, const C: usize> Clone for Handlers<'_, A, S, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, S, const C: usize> Copy for Handlers<'_, A, S, C> {}

impl<A, S, const C: usize> Handlers<'_, A, S, C>
where
    A: AcquisitionHardware,
    S: SynthesisHardware,
{
    /// DMA block-completion handler.
    #[inline]
    pub fn on_block_complete(&self, samples: &[u16]) -> bool {
        self.acquisition.on_block(self.ring, samples)
    }

    /// Output timer handler. `out` is the DAC data register, owned by the
    /// interrupt.
    #[inline]
    pub fn on_timer<R: OutputRegister>(&self, out: &mut R) -> bool {
        self.synthesis.on_timer(out)
    }

    /// Route `irq` to its handler. `out` is only written for
    /// [`Interrupt::TimerFired`].
    #[inline]
    pub fn dispatch<R: OutputRegister>(&self, irq: Interrupt<'_>, out: &mut R) -> bool {
        match irq {
            Interrupt::BlockComplete(samples) => self.on_block_complete(samples),
            Interrupt::TimerFired => self.on_timer(out),
        }
    }
}

/// Cooperative half of a split pipeline.
pub struct Coordinator<'a, A, S, K, const C: usize = RING_CAPACITY> {
    config: &'a PipelineConfig,
    ring: &'a SampleRing<C>,
    acquisition: &'a AcquisitionDriver<A>,
    synthesis: &'a SynthesisDriver<S>,
    telemetry: &'a mut Telemetry<K>,
}

impl<A, S, K, const C: usize> Coordinator<'_, A, S, K, C>
where
    A: AcquisitionHardware,
    S: SynthesisHardware,
    K: TelemetrySink,
{
    /// One cooperative step: surface faults, close both interrupt gates if
    /// halting, then drain at most one batch. Never waits for samples and
    /// never blocks the handlers.
    pub fn tick(&mut self) -> TickReport {
        let faults = self.faults();
        let live = self.is_live();
        let halted = self.telemetry.observe_faults(self.config, faults, live);
        if halted {
            self.synthesis.quiesce();
            self.acquisition.quiesce();
        }
        self.telemetry.drain(self.config, self.ring, faults, halted)
    }

    /// One loop iteration: `tick()`, then `platform.tick()`.
    pub fn run_once<P: Platform>(&mut self, platform: &mut P) -> TickReport {
        let report = self.tick();
        platform.tick();
        report
    }

    /// Faults raised on either path.
    pub fn faults(&self) -> Faults {
        self.acquisition.faults().union(self.synthesis.faults())
    }

    /// Clear sticky faults on both paths, returning what was raised.
    pub fn clear_faults(&mut self) -> Faults {
        self.telemetry.seen_faults = Faults::NONE;
        self.acquisition
            .clear_faults()
            .union(self.synthesis.clear_faults())
    }

    /// Whether either interrupt path is still accepting events.
    pub fn is_live(&self) -> bool {
        self.acquisition.is_live() || self.synthesis.is_live()
    }

    /// Total samples handed to the sink.
    pub fn published(&self) -> usize {
        self.telemetry.published
    }

    pub fn sink(&self) -> &K {
        &self.telemetry.sink
    }
}
