//! Playback controller
//!
//! Owns the shared pipeline and the output device. Every operation takes the
//! playback lock once, does its field access and clamping, and releases it
//! before returning. Nothing here renders or touches the terminal.

use super::pipeline::{Pipeline, SharedPipeline};
use super::state::{Snapshot, VolumeLimits};
use crate::config::PlayerConfig;
use crate::error::{Result, SeekError};
use crate::stream::{DecodedStream, SampleRate};
use crate::streaming::AudioDevice;
use tracing::debug;

/// Key-press step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steps {
    /// Added by volume up
    pub volume_up: f64,
    /// Removed by volume down
    pub volume_down: f64,
    /// Seek distance in samples
    pub seek: i64,
}

impl Steps {
    /// Steps from `config` for a stream at `rate`.
    pub fn from_config(config: &PlayerConfig, rate: SampleRate) -> Self {
        Self {
            volume_up: config.volume_up_step,
            volume_down: config.volume_down_step,
            seek: config.seek_step_samples(rate),
        }
    }
}

/// Thread-safe control surface over the playing track.
///
/// Field order is teardown order: the device is released before the pipeline,
/// which owns the decoder, which owns the file.
pub struct PlaybackController<D: AudioDevice> {
    device: D,
    pipeline: SharedPipeline,
    sample_rate: SampleRate,
    limits: VolumeLimits,
    steps: Steps,
}

impl<D: AudioDevice> PlaybackController<D> {
    /// Build the pipeline around `stream` and take ownership of `device`.
    ///
    /// Volume starts at 0 (unity gain), clamped into the configured bounds.
    pub fn new(stream: Box<dyn DecodedStream>, device: D, config: &PlayerConfig) -> Self {
        let sample_rate = stream.sample_rate();
        let limits = config.volume_limits();

        let mut pipeline = Pipeline::new(stream, config);
        pipeline.set_volume(limits.clamp(0.0));

        Self {
            device,
            pipeline: pipeline.into_shared(),
            sample_rate,
            limits,
            steps: Steps::from_config(config, sample_rate),
        }
    }

    /// Hand the pipeline to the device; pulling starts on the device thread.
    pub fn play(&mut self) -> Result<()> {
        self.device.play(SharedPipeline::clone(&self.pipeline))
    }

    /// Add `delta` to the volume, clamped to the bounds.
    ///
    /// Returns whether the volume changed.
    pub fn adjust_volume(&self, delta: f64) -> bool {
        let mut pipeline = self.pipeline.lock();
        let before = pipeline.volume();
        let after = self.limits.clamp(before + delta);
        pipeline.set_volume(after);
        after != before
    }

    /// Raise the volume by one step.
    pub fn volume_up(&self) -> bool {
        self.adjust_volume(self.steps.volume_up)
    }

    /// Lower the volume by one step.
    pub fn volume_down(&self) -> bool {
        self.adjust_volume(-self.steps.volume_down)
    }

    /// Flip the paused flag. Always reports a change.
    pub fn toggle_pause(&self) -> bool {
        let mut pipeline = self.pipeline.lock();
        let paused = !pipeline.paused();
        pipeline.set_paused(paused);
        true
    }

    /// Move the read cursor by `delta` samples, clamped to `0..=length-1`.
    ///
    /// On error the stream stays wherever it ended up and playback continues.
    pub fn seek(&self, delta: i64) -> std::result::Result<bool, SeekError> {
        let mut pipeline = self.pipeline.lock();
        if pipeline.is_empty() {
            return Ok(true);
        }
        let last = pipeline.len() - 1;
        let target = if delta >= 0 {
            pipeline.position().saturating_add(delta.unsigned_abs())
        } else {
            pipeline.position().saturating_sub(delta.unsigned_abs())
        }
        .min(last);
        pipeline.seek(target)?;
        drop(pipeline);

        debug!(target, "seeked");
        Ok(true)
    }

    /// Seek forward by one step.
    pub fn seek_forward(&self) -> std::result::Result<bool, SeekError> {
        self.seek(self.steps.seek)
    }

    /// Seek backward by one step.
    pub fn seek_backward(&self) -> std::result::Result<bool, SeekError> {
        self.seek(-self.steps.seek)
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> Snapshot {
        let pipeline = self.pipeline.lock();
        Snapshot {
            volume: pipeline.volume(),
            paused: pipeline.paused(),
            position: pipeline.position(),
            length: pipeline.len(),
            sample_rate: self.sample_rate,
        }
    }

    /// Volume bounds in force.
    pub fn limits(&self) -> VolumeLimits {
        self.limits
    }

    /// Step sizes in force.
    pub fn steps(&self) -> Steps {
        self.steps
    }

    /// Shared pipeline handle, as given to the device.
    pub fn pipeline(&self) -> &SharedPipeline {
        &self.pipeline
    }

    /// Output device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Release the device, then the pipeline and its decoder.
    pub fn close(mut self) {
        self.device.close();
        debug!("playback controller closed");
    }
}
