//! Waveform generation for lookup-table synthesis.

pub mod wavetable;

pub use wavetable::WaveformTable;
