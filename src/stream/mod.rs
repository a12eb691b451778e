//! Decoded audio streams
//!
//! A [`DecodedStream`] is a seekable source of interleaved `f32` frames with a
//! fixed sample rate. Positions and lengths are *sample offsets*: one unit per
//! frame, whatever the channel count.

pub mod decoder;

pub use decoder::SymphoniaStream;

use crate::error::SeekError;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Sample rate in Hz with conversions between sample offsets and durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRate(u32);

impl SampleRate {
    /// Wrap a rate in Hz. A zero rate is bumped to 1 Hz.
    pub fn new(hz: u32) -> Self {
        Self(hz.max(1))
    }

    /// Rate in Hz.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Duration of `samples` at this rate (integer division, nanosecond resolution).
    pub fn duration(self, samples: u64) -> Duration {
        let nanos = samples as u128 * NANOS_PER_SEC / self.0 as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Number of samples covering `duration` at this rate.
    pub fn samples(self, duration: Duration) -> u64 {
        let samples = duration.as_nanos() * self.0 as u128 / NANOS_PER_SEC;
        u64::try_from(samples).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Seekable, sample-rate-tagged source of interleaved frames.
///
/// Implementations must keep `position() <= len()` at all times; reading at
/// the end returns 0 frames.
pub trait DecodedStream: Send {
    /// Sample rate of the decoded audio.
    fn sample_rate(&self) -> SampleRate;

    /// Interleaved channel count, at least 1.
    fn channels(&self) -> u16;

    /// Total length in samples.
    fn len(&self) -> u64;

    /// True when the stream holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read cursor in samples.
    fn position(&self) -> u64;

    /// Move the read cursor to `position`.
    fn seek(&mut self, position: u64) -> Result<(), SeekError>;

    /// Fill `out` with whole interleaved frames and return how many were written.
    ///
    /// Returns 0 once the stream is exhausted.
    fn read_frames(&mut self, out: &mut [f32]) -> usize;
}

impl<S: DecodedStream + ?Sized> DecodedStream for Box<S> {
    fn sample_rate(&self) -> SampleRate {
        (**self).sample_rate()
    }

    fn channels(&self) -> u16 {
        (**self).channels()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        (**self).seek(position)
    }

    fn read_frames(&mut self, out: &mut [f32]) -> usize {
        (**self).read_frames(out)
    }
}

/// Fully decoded stream held in memory.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: SampleRate,
    position: u64,
}

impl MemoryStream {
    /// Wrap interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, channels: u16, sample_rate: SampleRate) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate,
            position: 0,
        }
    }

    /// Mono stream of `len` samples, sample `i` having value `i as f32`.
    pub fn ramp(len: u64, sample_rate: SampleRate) -> Self {
        Self::new((0..len).map(|i| i as f32).collect(), 1, sample_rate)
    }
}

impl DecodedStream for MemoryStream {
    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn len(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        if position > self.len() {
            return Err(SeekError::new(
                position,
                format!("position out of range 0..={}", self.len()),
            ));
        }
        self.position = position;
        Ok(())
    }

    fn read_frames(&mut self, out: &mut [f32]) -> usize {
        let channels = self.channels as usize;
        let wanted = out.len() / channels;
        let available = (self.len() - self.position) as usize;
        let frames = wanted.min(available);
        let start = self.position as usize * channels;
        let count = frames * channels;
        out[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position += frames as u64;
        frames
    }
}
