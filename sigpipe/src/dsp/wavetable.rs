//! Precomputed single-period sine table for lookup-table synthesis.
//!
//! Entry `i` of an `N`-entry table is
//! `round(offset + amplitude * sin(2π·i / N))`, clamped to the output
//! device's [`CodecRange`]. The table is built once before synthesis starts
//! and never mutated afterwards, so the timer handler reads it without
//! synchronization.

use core::f32::consts::PI;

use heapless::Vec;

use crate::config::{CodecRange, WaveformConfig};
use crate::constants::MAX_TABLE_SAMPLES;
use crate::error::ConfigError;

/// Immutable lookup table of output codes, one period long.
#[derive(Clone, PartialEq, Eq)]
pub struct WaveformTable {
    entries: Vec<u16, MAX_TABLE_SAMPLES>,
    range: CodecRange,
}

impl WaveformTable {
    /// Build an `sample_count`-entry sine table.
    ///
    /// Fails with [`ConfigError::InvalidTableSize`] unless
    /// `1 <= sample_count <= MAX_TABLE_SAMPLES`.
    pub fn generate(
        sample_count: usize,
        amplitude: f32,
        offset: f32,
        range: CodecRange,
    ) -> Result<Self, ConfigError> {
        if sample_count == 0 || sample_count > MAX_TABLE_SAMPLES {
            return Err(ConfigError::InvalidTableSize {
                requested: sample_count,
                max: MAX_TABLE_SAMPLES,
            });
        }

        let top = range.max() as f32;
        let step = 2.0 * PI / sample_count as f32;
        let mut entries = Vec::new();
        for i in 0..sample_count {
            let value = offset + amplitude * libm::sinf(step * i as f32);
            // NaN casts to 0
            let code = libm::roundf(value).clamp(0.0, top) as u16;
            // Capacity checked above
            let _ = entries.push(code);
        }

        Ok(WaveformTable { entries, range })
    }

    pub fn from_config(config: &WaveformConfig) -> Result<Self, ConfigError> {
        Self::generate(config.samples, config.amplitude, config.offset, config.range)
    }

    /// Number of entries (the period length).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a generated table has at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`. `index` must be `< len()`.
    #[inline(always)]
    pub fn get(&self, index: usize) -> u16 {
        self.entries[index]
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.entries
    }

    pub fn range(&self) -> CodecRange {
        self.range
    }
}

impl core::fmt::Debug for WaveformTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WaveformTable")
            .field("len", &self.entries.len())
            .field("range", &self.range)
            .finish()
    }
}
