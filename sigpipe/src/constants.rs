/// Default acquisition sample rate in Hz.
pub const ACQUISITION_RATE_HZ: u32 = 1_000;

/// Default number of samples delivered per DMA block-completion callback.
///
/// At 1 kHz this yields roughly one callback per second.
pub const ACQUISITION_BLOCK_SAMPLES: usize = 1_000;

/// Default ADC input channel.
pub const INPUT_CHANNEL: u8 = 6;

/// Default DAC output channel.
pub const OUTPUT_CHANNEL: u8 = 1;

/// Capacity of the sample ring in samples. Must be a power of two and at
/// least one acquisition block.
pub const RING_CAPACITY: usize = 1_024;

/// Upper bound on samples forwarded to telemetry per `tick()`.
pub const MAX_DRAIN_BATCH: usize = 256;

/// Upper bound on waveform table length.
pub const MAX_TABLE_SAMPLES: usize = 1_024;

/// Default waveform table length (one period).
pub const TABLE_SAMPLES: usize = 100;

/// Default sine amplitude in output codes.
pub const TABLE_AMPLITUDE: f32 = 70.0;

/// Default sine offset (midpoint) in output codes.
pub const TABLE_OFFSET: f32 = 100.0;

/// Default output timer period in microseconds.
///
/// 100-entry table at 60 Hz → 6000 Hz → 166 µs.
pub const OUTPUT_PERIOD_US: u32 = 166;

/// Default telemetry variable name.
pub const TELEMETRY_LABEL: &str = "adcValue";
