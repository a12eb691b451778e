//! Audio device integration using rodio
//!
//! Rodio's mixer thread iterates a [`PipelineSource`], which takes the
//! playback lock once per block.

use super::{AudioDevice, PipelineSource};
use crate::error::{PlayerError, Result};
use crate::playback::SharedPipeline;
use crate::stream::SampleRate;
use rodio::{OutputStream, Sink};
use tracing::{debug, info};

/// Audio playback device using rodio
pub struct RodioDevice {
    /// Stream handle and sink; `None` once closed
    output: Option<(OutputStream, Sink)>,
    sample_rate: SampleRate,
    buffer_size: usize,
}

impl RodioDevice {
    /// Open the default output device.
    ///
    /// # Arguments
    /// * `sample_rate` - Rate of the samples that will be handed to the device
    /// * `buffer_size` - Frames pulled from the pipeline per lock acquisition
    pub fn init(sample_rate: SampleRate, buffer_size: usize) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PlayerError::AudioInit(format!("failed to open output stream: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| PlayerError::AudioInit(format!("failed to create sink: {e}")))?;

        debug!(%sample_rate, buffer_size, "audio device initialised");
        Ok(Self {
            output: Some((stream, sink)),
            sample_rate,
            buffer_size: buffer_size.max(1),
        })
    }

    /// Frames per pull.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl AudioDevice for RodioDevice {
    fn play(&mut self, pipeline: SharedPipeline) -> Result<()> {
        let (_, sink) = self
            .output
            .as_ref()
            .ok_or_else(|| PlayerError::AudioInit("device already closed".into()))?;

        let source = PipelineSource::new(pipeline, self.buffer_size);
        if source.sample_rate() != self.sample_rate {
            return Err(PlayerError::AudioInit(format!(
                "pipeline produces {} but the device was opened for {}",
                source.sample_rate(),
                self.sample_rate
            )));
        }

        info!(
            rate = %self.sample_rate,
            channels = source.channels(),
            block = ?source.block_duration(),
            "playback started"
        );
        sink.append(source);
        sink.play();
        Ok(())
    }

    fn close(&mut self) {
        if let Some((stream, sink)) = self.output.take() {
            sink.stop();
            drop(sink);
            drop(stream);
            debug!("audio device closed");
        }
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::playback::Pipeline;
    use crate::stream::MemoryStream;

    fn try_device(rate: u32) -> Option<RodioDevice> {
        match RodioDevice::init(SampleRate::new(rate), rate as usize / 30) {
            Ok(device) => Some(device),
            Err(err) => {
                eprintln!("Skipping audio_device test (audio backend unavailable): {err}");
                None
            }
        }
    }

    fn shared(rate: u32) -> SharedPipeline {
        Pipeline::new(
            Box::new(MemoryStream::ramp(rate as u64, SampleRate::new(rate))),
            &PlayerConfig::default(),
        )
        .into_shared()
    }

    #[test]
    fn play_then_close_is_idempotent() {
        let Some(mut device) = try_device(44_100) else {
            return;
        };
        assert_eq!(device.buffer_size(), 1470);
        device.play(shared(44_100)).unwrap();
        device.close();
        device.close();
        assert!(device.play(shared(44_100)).is_err());
    }

    #[test]
    fn rate_mismatch_is_rejected() {
        let Some(mut device) = try_device(48_000) else {
            return;
        };
        let err = device.play(shared(44_100)).unwrap_err();
        assert!(matches!(err, PlayerError::AudioInit(_)));
    }
}
