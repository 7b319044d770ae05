//! Startup configuration.
//!
//! Everything here is fixed once the pipeline starts; there is no runtime
//! reconfiguration. Defaults come from [`crate::constants`].

use crate::constants::*;
use crate::error::ConfigError;
use crate::telemetry::PlotFormat;

/// ADC input channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputChannel(pub u8);

/// DAC output channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputChannel(pub u8);

/// Period of the output synthesis timer.
///
/// One table entry is written per firing, so the output sample rate equals
/// the timer firing rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerPeriod {
    micros: u32,
}

impl TimerPeriod {
    /// Period for a desired output sample rate, truncated to whole
    /// microseconds (`6000 Hz → 166 µs`).
    pub const fn from_rate_hz(rate_hz: u32) -> Result<Self, ConfigError> {
        if rate_hz == 0 || rate_hz > 1_000_000 {
            return Err(ConfigError::InvalidRate);
        }
        Ok(TimerPeriod {
            micros: 1_000_000 / rate_hz,
        })
    }

    pub const fn from_micros(micros: u32) -> Result<Self, ConfigError> {
        if micros == 0 {
            return Err(ConfigError::InvalidRate);
        }
        Ok(TimerPeriod { micros })
    }

    pub const fn as_micros(self) -> u32 {
        self.micros
    }

    /// Firing rate in Hz (truncated).
    pub const fn rate_hz(self) -> u32 {
        1_000_000 / self.micros
    }
}

/// Numeric range accepted by the output device (DAC or PWM duty register).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecRange {
    max: u16,
}

impl CodecRange {
    /// 8-bit DAC: `0..=255`.
    pub const BITS_8: CodecRange = CodecRange { max: 255 };
    /// 12-bit DAC: `0..=4095`.
    pub const BITS_12: CodecRange = CodecRange { max: 4095 };

    /// Range of an `n`-bit converter, `n` in `1..=16`.
    pub const fn bits(n: u8) -> Result<Self, ConfigError> {
        if n == 0 || n > 16 {
            return Err(ConfigError::InvalidResolution(n));
        }
        Ok(CodecRange {
            max: (((1u32) << n) - 1) as u16,
        })
    }

    /// Largest valid code. The smallest is always 0.
    pub const fn max(self) -> u16 {
        self.max
    }

    pub const fn contains(self, value: u16) -> bool {
        value <= self.max
    }
}

/// Parameters of the generated output waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformConfig {
    /// Entries per period.
    pub samples: usize,
    /// Peak deviation from `offset`, in output codes.
    pub amplitude: f32,
    /// Midpoint, in output codes.
    pub offset: f32,
    pub range: CodecRange,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        WaveformConfig {
            samples: TABLE_SAMPLES,
            amplitude: TABLE_AMPLITUDE,
            offset: TABLE_OFFSET,
            range: CodecRange::BITS_8,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub input_channel: InputChannel,
    pub acquisition_rate_hz: u32,
    /// Samples per DMA block-completion callback.
    pub block_size: usize,

    pub output_channel: OutputChannel,
    pub output_period: TimerPeriod,
    pub waveform: WaveformConfig,

    /// Drain on every N-th `tick()`.
    pub drain_interval_ticks: u32,
    /// Maximum samples forwarded to telemetry per drain.
    pub drain_batch: usize,
    pub telemetry_label: &'static str,
    pub telemetry_format: PlotFormat,

    /// Stop both sessions as soon as a runtime fault is observed.
    pub halt_on_fault: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_channel: InputChannel(INPUT_CHANNEL),
            acquisition_rate_hz: ACQUISITION_RATE_HZ,
            block_size: ACQUISITION_BLOCK_SAMPLES,
            output_channel: OutputChannel(OUTPUT_CHANNEL),
            output_period: TimerPeriod {
                micros: OUTPUT_PERIOD_US,
            },
            waveform: WaveformConfig::default(),
            drain_interval_ticks: 1,
            drain_batch: MAX_DRAIN_BATCH,
            telemetry_label: TELEMETRY_LABEL,
            telemetry_format: PlotFormat::Raw,
            halt_on_fault: false,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration against a sample ring of capacity `C`.
    pub fn validate<const C: usize>(&self) -> Result<(), ConfigError> {
        if self.acquisition_rate_hz == 0 {
            return Err(ConfigError::InvalidRate);
        }
        if self.block_size == 0 || self.block_size > C {
            return Err(ConfigError::InvalidBlockSize {
                requested: self.block_size,
                max: C,
            });
        }
        if self.waveform.samples == 0 || self.waveform.samples > MAX_TABLE_SAMPLES {
            return Err(ConfigError::InvalidTableSize {
                requested: self.waveform.samples,
                max: MAX_TABLE_SAMPLES,
            });
        }
        if self.drain_batch == 0 || self.drain_batch > MAX_DRAIN_BATCH {
            return Err(ConfigError::InvalidBatchSize {
                requested: self.drain_batch,
                max: MAX_DRAIN_BATCH,
            });
        }
        if self.drain_interval_ticks == 0 {
            return Err(ConfigError::InvalidDrainInterval);
        }
        Ok(())
    }
}
