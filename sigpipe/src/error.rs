//! Error taxonomy.
//!
//! Configuration problems are reported synchronously from `start` calls as
//! [`ConfigError`]. Hardware rejections carry the hardware trait's own error
//! type inside [`Error::Hardware`]. Runtime faults raised in interrupt context
//! are never errors; see [`crate::io::fault`].

/// A configuration rejected before any hardware is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Sample or output rate was zero or produced a zero timer period.
    #[error("rate must be non-zero")]
    InvalidRate,
    /// Block size was zero or larger than the sample ring.
    #[error("block size {requested} outside 1..={max}")]
    InvalidBlockSize { requested: usize, max: usize },
    /// Table length was zero or larger than the table storage.
    #[error("table size {requested} outside 1..={max}")]
    InvalidTableSize { requested: usize, max: usize },
    /// Drain batch was zero or larger than the drain scratch buffer.
    #[error("drain batch {requested} outside 1..={max}")]
    InvalidBatchSize { requested: usize, max: usize },
    /// Drain interval of zero ticks.
    #[error("drain interval must be at least one tick")]
    InvalidDrainInterval,
    /// Output resolution outside 1..=16 bits.
    #[error("codec resolution of {0} bits is not supported")]
    InvalidResolution(u8),
    /// The session is already running.
    #[error("session already running")]
    SessionActive,
    /// Synthesis was started before a waveform table was generated.
    #[error("waveform table not generated")]
    NotReady,
}

/// Failure to start a driver session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The peripheral refused the configuration (unsupported rate, busy channel, ...).
    #[error("hardware rejected configuration: {0:?}")]
    Hardware(E),
}

/// Failure to start the pipeline, tagged with the path that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError<A, S> {
    #[error("acquisition: {0}")]
    Acquisition(Error<A>),
    #[error("synthesis: {0}")]
    Synthesis(Error<S>),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
