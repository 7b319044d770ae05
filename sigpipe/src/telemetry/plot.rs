//! Serial plotter wire encoding.
//!
//! Two formats, both terminated by a `|g` marker:
//!
//! ```text
//! Text (per sample):  >{label}:{timestamp_ms}:{value}|g\n
//! Raw  (per batch):   <{label}:{ts0};{dt_ms};{min:f32le}{max:f32le}{u16le...}[§{unit}]|g\r\n
//! ```
//!
//! The receiver dequantizes raw points as `min + p / 65535 * (max - min)`.
//! Raw ADC codes are sent with `min = 0`, `max = 65535`, so they arrive
//! unchanged.

use embedded_io::{Write, WriteFmtError};

use super::{PlotFormat, TelemetrySink};

const RAW_MIN: f32 = 0.0;
const RAW_MAX: f32 = u16::MAX as f32;
/// UTF-8 section sign introducing the optional unit.
const UNIT_MARKER: &[u8] = b"\xC2\xA7";

/// [`TelemetrySink`] that encodes batches for a serial plotter onto any
/// [`embedded_io::Write`] transport.
///
/// Timestamps are synthesized from the sample step: each published batch
/// advances the clock by `samples × dt_ms`. Transport errors are counted and
/// otherwise ignored.
pub struct PlotEncoder<W> {
    writer: W,
    dt_ms: u32,
    timestamp_ms: u32,
    unit: Option<&'static str>,
    write_errors: u32,
}

impl<W: Write> PlotEncoder<W> {
    /// Encoder with an explicit sample step in milliseconds.
    pub fn new(writer: W, dt_ms: u32) -> Self {
        PlotEncoder {
            writer,
            dt_ms,
            timestamp_ms: 0,
            unit: None,
            write_errors: 0,
        }
    }

    /// Encoder whose step matches an acquisition rate (at least 1 ms).
    pub fn for_rate(writer: W, sample_rate_hz: u32) -> Self {
        let dt_ms = 1_000u32.checked_div(sample_rate_hz).unwrap_or(1).max(1);
        Self::new(writer, dt_ms)
    }

    /// Attach a unit string to raw frames.
    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Timestamp the next published sample will carry.
    pub fn timestamp_ms(&self) -> u32 {
        self.timestamp_ms
    }

    /// Number of batches the transport failed to accept.
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode_text(&mut self, label: &str, samples: &[u16]) -> Result<(), WriteFmtError<W::Error>> {
        let mut ts = self.timestamp_ms;
        for &value in samples {
            write!(self.writer, ">{}:{}:{}|g\n", label, ts, value)?;
            ts = ts.wrapping_add(self.dt_ms);
        }
        Ok(())
    }

    fn encode_raw(&mut self, label: &str, samples: &[u16]) -> Result<(), WriteFmtError<W::Error>> {
        write!(self.writer, "<{}:{};{};", label, self.timestamp_ms, self.dt_ms)?;

        let mut bounds = [0u8; 8];
        bounds[..4].copy_from_slice(&RAW_MIN.to_le_bytes());
        bounds[4..].copy_from_slice(&RAW_MAX.to_le_bytes());
        self.writer.write_all(&bounds).map_err(WriteFmtError::Other)?;

        let mut chunk = [0u8; 64];
        for points in samples.chunks(chunk.len() / 2) {
            for (bytes, &point) in chunk.chunks_exact_mut(2).zip(points) {
                bytes.copy_from_slice(&point.to_le_bytes());
            }
            self.writer
                .write_all(&chunk[..points.len() * 2])
                .map_err(WriteFmtError::Other)?;
        }

        if let Some(unit) = self.unit {
            self.writer.write_all(UNIT_MARKER).map_err(WriteFmtError::Other)?;
            self.writer.write_all(unit.as_bytes()).map_err(WriteFmtError::Other)?;
        }
        self.writer.write_all(b"|g\r\n").map_err(WriteFmtError::Other)?;
        Ok(())
    }
}

impl<W: Write> TelemetrySink for PlotEncoder<W> {
    fn publish(&mut self, label: &str, format: PlotFormat, samples: &[u16]) {
        if samples.is_empty() {
            return;
        }
        let result = match format {
            PlotFormat::Text => self.encode_text(label, samples),
            PlotFormat::Raw => self.encode_raw(label, samples),
        };
        let flushed = self.writer.flush();
        if result.is_err() || flushed.is_err() {
            self.write_errors = self.write_errors.wrapping_add(1);
        }
        let span = self.dt_ms.wrapping_mul(samples.len() as u32);
        self.timestamp_ms = self.timestamp_ms.wrapping_add(span);
    }
}
