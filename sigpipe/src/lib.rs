//! # sigpipe
//!
//! A `no_std`, zero-allocation, dual-direction signal I/O pipeline for
//! microcontrollers. Two independent interrupt-driven paths run side by side:
//!
//! - **Acquisition:** a DMA block-completion interrupt copies raw ADC codes
//!   into a lock-free SPSC ring; the cooperative loop drains the ring into a
//!   telemetry sink in bounded batches.
//! - **Synthesis:** a periodic timer interrupt steps through a precomputed
//!   sine table, writing one code to the DAC per firing.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Config | [`config`] / [`constants`] | Startup parameters and defaults |
//! | Trait | [`control`] / [`platform`] | Hardware and platform seams |
//! | DSP | [`dsp`] | Waveform lookup table |
//! | I/O | [`io`] | Ring buffer, acquisition and synthesis drivers, fault flags |
//! | Telemetry | [`telemetry`] | Sink trait and serial-plotter encoder (feature-gated) |
//! | Coordinator | [`pipeline`] | Owns all state; splits into ISR handlers and the draining coordinator |
//!
//! ```text
//! timer ISR ──► SynthesisDriver ──► DAC register
//! DMA ISR ────► AcquisitionDriver ──► SampleRing ──► Coordinator::tick() ──► TelemetrySink
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use sigpipe::config::PipelineConfig;
//! use sigpipe::pipeline::Pipeline;
//!
//! let mut pipeline: Pipeline<_, _, _> =
//!     Pipeline::new(PipelineConfig::default(), adc_dma, dac_timer, plotter)?;
//! pipeline.boot(&mut board)?;
//! let (handlers, mut coordinator) = pipeline.split();
//!
//! // DMA transfer-complete ISR:
//! handlers.on_block_complete(&dma_block[..]);
//!
//! // Timer ISR:
//! handlers.on_timer(&mut dac);
//!
//! // Main loop, never holding anything the ISRs need:
//! loop {
//!     coordinator.run_once(&mut board);
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `pwm` | yes | [`control::PwmOutput`] over `embedded-hal` PWM channels |
//! | `plot` | yes | [`telemetry::PlotEncoder`] over `embedded-io` transports |
//! | `defmt` | no | `defmt::Format` on public value types |
//!
//! ## Defaults
//!
//! - **Acquisition:** 1000 Hz, 1000 samples/block ([`constants::ACQUISITION_RATE_HZ`])
//! - **Ring:** 1024 samples, drop-oldest ([`constants::RING_CAPACITY`])
//! - **Synthesis:** 100-entry table, 166 µs timer period ([`constants::OUTPUT_PERIOD_US`])
//! - **Drain:** at most 256 samples per tick ([`constants::MAX_DRAIN_BATCH`])

#![no_std]

pub mod config;
pub mod constants;
pub mod control;
pub mod dsp;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod platform;
pub mod telemetry;

pub use error::{ConfigError, Error, StartError};
