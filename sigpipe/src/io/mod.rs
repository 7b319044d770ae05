//! Interrupt-facing drivers and the buffer between them and the
//! cooperative loop.
//!
//! ## Components
//!
//! | Component | Runs in | Description |
//! |-----------|---------|-------------|
//! | [`AcquisitionDriver`] | DMA ISR + cooperative | Copies completed ADC blocks into the ring |
//! | [`SynthesisDriver`] | Timer ISR + cooperative | Steps through the waveform table, one DAC write per firing |
//! | [`SampleRing`] | both | Lock-free SPSC sample buffer, drop-oldest on overflow |
//! | [`FaultFlags`] | both | Sticky runtime fault bits |
//!
//! ## Interrupt discipline
//!
//! Handlers take `&self`, never block, never allocate, never log and never
//! take a lock. Every piece of state they share with the cooperative context
//! is an atomic. Each handler guards itself against reentry; an overlapping
//! invocation is dropped and recorded as a fault.

pub mod acquisition;
pub mod fault;
pub mod ring;
pub mod synthesis;

pub use acquisition::{AcquisitionDriver, AcquisitionSession};
pub use fault::{FaultFlags, Faults};
pub use ring::SampleRing;
pub use synthesis::{SynthesisDriver, SynthesisSession, SynthesisState};
