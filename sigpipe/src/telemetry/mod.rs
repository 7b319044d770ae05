//! Telemetry sink interface.
//!
//! The sink is a pure consumer: the pipeline hands it batches of raw ADC
//! codes from the cooperative context and never looks at a result. A slow
//! sink only slows the cooperative loop; the per-tick batch bound limits how
//! much.

#[cfg(feature = "plot")]
mod plot;

#[cfg(feature = "plot")]
pub use plot::PlotEncoder;

/// How a batch should be rendered by the plotter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlotFormat {
    /// One text line per sample.
    Text,
    /// One binary frame per batch.
    Raw,
}

/// Consumer of acquired sample batches.
pub trait TelemetrySink {
    /// Publish one batch. Fire-and-forget.
    fn publish(&mut self, label: &str, format: PlotFormat, samples: &[u16]);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    fn publish(&mut self, label: &str, format: PlotFormat, samples: &[u16]) {
        (**self).publish(label, format, samples)
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&mut self, _label: &str, _format: PlotFormat, _samples: &[u16]) {}
}
