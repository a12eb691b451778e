//! Status quantities derived from a snapshot, and the renderer contract

use crate::playback::{Snapshot, VolumeLimits};
use std::time::Duration;

/// Volume as a 0-100 percentage of the configured range.
pub fn volume_percent(volume: f64, limits: VolumeLimits) -> u8 {
    let span = limits.max() - limits.min();
    let pct = ((volume - limits.min()) / span * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Share of the track played, in percent.
///
/// A position of exactly zero reports 0, including after a loop back to the
/// first sample.
pub fn completion_percent(position_secs: f64, length_secs: f64) -> f64 {
    if position_secs == 0.0 {
        return 0.0;
    }
    position_secs / length_secs * 100.0
}

/// Round to the nearest whole second.
pub fn round_secs(duration: Duration) -> u64 {
    (duration + Duration::from_millis(500)).as_secs()
}

/// Format whole seconds as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Everything a renderer draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusView {
    /// Volume, 0-100
    pub volume_percent: u8,
    /// Paused flag
    pub paused: bool,
    /// Elapsed time, whole seconds
    pub elapsed_secs: u64,
    /// Track length, whole seconds
    pub total_secs: u64,
    /// Time left, whole seconds
    pub remaining_secs: u64,
    /// Share played, 0-100
    pub completion_percent: f64,
}

impl StatusView {
    /// Derive the view from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, limits: VolumeLimits) -> Self {
        let elapsed = snapshot.elapsed();
        let total = snapshot.total();
        Self {
            volume_percent: volume_percent(snapshot.volume, limits),
            paused: snapshot.paused,
            elapsed_secs: round_secs(elapsed),
            total_secs: round_secs(total),
            remaining_secs: round_secs(total.saturating_sub(elapsed)),
            completion_percent: completion_percent(elapsed.as_secs_f64(), total.as_secs_f64()),
        }
    }
}

/// Something that can show a [`StatusView`].
pub trait Renderer {
    /// Clear, draw and flush one frame.
    fn render(&mut self, view: &StatusView);
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(&mut self, view: &StatusView) {
        (**self).render(view);
    }
}
