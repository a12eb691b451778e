//! Playback state values shared between the controller and the display

use crate::stream::SampleRate;
use std::time::Duration;

/// Inclusive volume bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLimits {
    min: f64,
    max: f64,
}

impl VolumeLimits {
    /// Bounds `min..=max`; the pair is swapped if given in the wrong order.
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamp `volume` into the bounds.
    pub fn clamp(&self, volume: f64) -> f64 {
        volume.clamp(self.min, self.max)
    }

    /// True when `volume` is within the bounds.
    pub fn contains(&self, volume: f64) -> bool {
        (self.min..=self.max).contains(&volume)
    }
}

impl Default for VolumeLimits {
    fn default() -> Self {
        Self::new(crate::config::MIN_VOLUME, crate::config::MAX_VOLUME)
    }
}

/// Immutable copy of the playback state taken under the playback lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Volume exponent
    pub volume: f64,
    /// Whether output is paused
    pub paused: bool,
    /// Read cursor in samples
    pub position: u64,
    /// Track length in samples
    pub length: u64,
    /// Track sample rate
    pub sample_rate: SampleRate,
}

impl Snapshot {
    /// Time played so far.
    pub fn elapsed(&self) -> Duration {
        self.sample_rate.duration(self.position)
    }

    /// Track duration.
    pub fn total(&self) -> Duration {
        self.sample_rate.duration(self.length)
    }
}
