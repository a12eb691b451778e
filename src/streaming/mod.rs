//! Audio output
//!
//! The device runs its own real-time thread and pulls fixed-size blocks from
//! the shared pipeline, taking the playback lock once per block.

pub mod audio_device;

pub use audio_device::RodioDevice;

use crate::error::Result;
use crate::playback::SharedPipeline;
use crate::stream::SampleRate;
use std::time::Duration;

/// Output device contract.
///
/// Construction plays the role of `init(sample_rate, buffer_size)`. The lock
/// the device must take around every pull is the mutex inside the
/// [`SharedPipeline`] it is handed.
pub trait AudioDevice {
    /// Start pulling from `pipeline`. Called once.
    fn play(&mut self, pipeline: SharedPipeline) -> Result<()>;

    /// Stop pulling and release the device. Safe to call more than once.
    fn close(&mut self);
}

/// Pull side of the pipeline, one block per lock acquisition.
///
/// Yields interleaved `f32` samples forever; silence once the pipeline has
/// nothing left to play.
pub struct PipelineSource {
    pipeline: SharedPipeline,
    block: Vec<f32>,
    pos: usize,
    channels: u16,
    sample_rate: SampleRate,
}

impl PipelineSource {
    /// Source pulling `buffer_size` frames at a time.
    pub fn new(pipeline: SharedPipeline, buffer_size: usize) -> Self {
        let (channels, sample_rate) = {
            let guard = pipeline.lock();
            (guard.channels(), guard.output_rate())
        };
        let len = buffer_size.max(1) * channels as usize;
        Self {
            pipeline,
            block: vec![0.0; len],
            // Start by pulling a fresh block
            pos: len,
            channels,
            sample_rate,
        }
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Output rate.
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Samples per pull.
    pub fn block_len(&self) -> usize {
        self.block.len()
    }

    /// Wall-clock time covered by one pull.
    pub fn block_duration(&self) -> Duration {
        self.sample_rate
            .duration((self.block.len() / self.channels as usize) as u64)
    }

    fn refill(&mut self) {
        let mut pipeline = self.pipeline.lock();
        pipeline.fill(&mut self.block);
        drop(pipeline);
        self.pos = 0;
    }
}

impl Iterator for PipelineSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.block.len() {
            self.refill();
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl rodio::Source for PipelineSource {
    fn current_frame_len(&self) -> Option<usize> {
        // Format never changes for the lifetime of the source
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.get()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
