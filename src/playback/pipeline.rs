//! Sample pipeline between the decoded stream and the audio device
//!
//! ```text
//! DecodedStream -> Looped -> Resampler -> pause gate -> Gain -> device
//! ```
//!
//! The whole pipeline lives behind one [`SharedPipeline`] lock. The device
//! thread calls [`Pipeline::fill`] under that lock; the controller mutates
//! volume, pause and position under the same lock.

use crate::config::PlayerConfig;
use crate::error::SeekError;
use crate::stream::{DecodedStream, SampleRate};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// The pipeline as shared between the device thread and the controller.
pub type SharedPipeline = Arc<Mutex<Pipeline>>;

/// Replays a stream a fixed number of times, or forever.
///
/// Position and seeking pass straight through to the wrapped stream. After
/// the last pass the stream stays at its end; seeking back makes it audible
/// again.
#[derive(Debug)]
pub struct Looped<S> {
    inner: S,
    /// Total passes, `None` for endless
    passes: Option<u32>,
    completed: u32,
}

impl<S: DecodedStream> Looped<S> {
    /// Wrap `inner`; `loop_count == 0` loops forever.
    pub fn new(inner: S, loop_count: u32) -> Self {
        Self {
            inner,
            passes: (loop_count > 0).then_some(loop_count),
            completed: 0,
        }
    }

    /// Finished passes so far.
    pub fn completed_passes(&self) -> u32 {
        self.completed
    }

    /// Wrapped stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn has_passes_left(&self) -> bool {
        self.passes.map_or(true, |total| self.completed < total)
    }
}

impl<S: DecodedStream> DecodedStream for Looped<S> {
    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        self.inner.seek(position)
    }

    fn read_frames(&mut self, out: &mut [f32]) -> usize {
        let channels = self.inner.channels() as usize;
        let wanted = out.len() / channels;
        let mut written = 0;
        // A pass that yields nothing right after a rewind would spin forever.
        let mut rewound_empty = false;

        while written < wanted {
            let n = self.inner.read_frames(&mut out[written * channels..wanted * channels]);
            if n > 0 {
                written += n;
                rewound_empty = false;
                continue;
            }
            if rewound_empty {
                break;
            }

            // End of pass, even when the stream ran dry before its declared length.
            self.completed = self.completed.saturating_add(1);
            if !self.has_passes_left() || self.inner.is_empty() {
                break;
            }
            rewound_empty = true;
            if let Err(e) = self.inner.seek(0) {
                warn!("Cannot rewind stream for next loop: {e}");
                break;
            }
        }
        written
    }
}

/// Linear-interpolating rate converter.
///
/// `ratio` is input frames consumed per output frame, i.e.
/// `source_rate / output_rate`. A ratio of exactly 1 passes frames through.
#[derive(Debug, Clone)]
pub struct Resampler {
    ratio: f64,
    /// Buffered input frames, interleaved
    window: Vec<f32>,
    /// Fractional read position into `window`, in frames
    pos: f64,
    scratch: Vec<f32>,
}

impl Resampler {
    /// Converter from `from` to `to`.
    pub fn new(from: SampleRate, to: SampleRate) -> Self {
        Self::with_ratio(from.get() as f64 / to.get() as f64)
    }

    /// Converter with an explicit input/output ratio.
    pub fn with_ratio(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        Self {
            ratio,
            window: Vec::new(),
            pos: 0.0,
            scratch: Vec::new(),
        }
    }

    /// Input frames per output frame.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// True when no conversion is performed.
    pub fn is_passthrough(&self) -> bool {
        self.ratio == 1.0
    }

    /// Drop buffered input, e.g. after a seek.
    pub fn reset(&mut self) {
        self.window.clear();
        self.pos = 0.0;
    }

    /// Produce up to `out.len() / channels` frames from `source`.
    pub fn process<S: DecodedStream + ?Sized>(&mut self, source: &mut S, out: &mut [f32]) -> usize {
        if self.is_passthrough() {
            return source.read_frames(out);
        }

        let ch = source.channels() as usize;
        let frames = out.len() / ch;
        let mut written = 0;
        let mut exhausted = false;

        while written < frames {
            let i = self.pos as usize;
            let buffered = self.window.len() / ch;

            if i + 1 >= buffered && !exhausted {
                let want = ((frames - written) as f64 * self.ratio).ceil() as usize + 2;
                self.scratch.resize(want * ch, 0.0);
                let n = source.read_frames(&mut self.scratch);
                if n == 0 {
                    exhausted = true;
                } else {
                    self.window.extend_from_slice(&self.scratch[..n * ch]);
                }
                continue;
            }
            if i >= buffered {
                break;
            }

            let t = (self.pos - i as f64) as f32;
            let dst = &mut out[written * ch..(written + 1) * ch];
            let a = &self.window[i * ch..(i + 1) * ch];
            if i + 1 < buffered {
                let b = &self.window[(i + 1) * ch..(i + 2) * ch];
                for c in 0..ch {
                    dst[c] = a[c] + (b[c] - a[c]) * t;
                }
            } else {
                dst.copy_from_slice(a);
            }

            written += 1;
            self.pos += self.ratio;
        }

        let consumed = (self.pos as usize).min(self.window.len() / ch);
        self.window.drain(..consumed * ch);
        self.pos -= consumed as f64;
        written
    }
}

/// Exponential gain: `multiplier = base^volume`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    base: f64,
    volume: f64,
}

impl Gain {
    /// Gain curve with the given base, starting at volume 0 (unity).
    pub fn new(base: f64) -> Self {
        Self { base, volume: 0.0 }
    }

    /// Current volume exponent
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the volume exponent
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    /// Sample multiplier for the current volume.
    pub fn multiplier(&self) -> f32 {
        self.base.powf(self.volume) as f32
    }

    /// Scale `samples` in place.
    pub fn apply(&self, samples: &mut [f32]) {
        let m = self.multiplier();
        if m == 1.0 {
            return;
        }
        for s in samples.iter_mut() {
            *s *= m;
        }
    }
}

/// Looping, resampling, pausable, gain-controlled view of a decoded stream.
pub struct Pipeline {
    source: Looped<Box<dyn DecodedStream>>,
    resampler: Resampler,
    gain: Gain,
    paused: bool,
    output_rate: SampleRate,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("position", &self.source.position())
            .field("length", &self.source.len())
            .field("gain", &self.gain)
            .field("paused", &self.paused)
            .field("output_rate", &self.output_rate)
            .finish()
    }
}

impl Pipeline {
    /// Build the pipeline for `stream` using loop count, gain base and output rate from `config`.
    pub fn new(stream: Box<dyn DecodedStream>, config: &PlayerConfig) -> Self {
        let source_rate = stream.sample_rate();
        let output_rate = config
            .output_sample_rate
            .map(SampleRate::new)
            .unwrap_or(source_rate);
        Self {
            source: Looped::new(stream, config.loop_count),
            resampler: Resampler::new(source_rate, output_rate),
            gain: Gain::new(config.volume_base),
            paused: false,
            output_rate,
        }
    }

    /// Wrap into the shared, lock-guarded handle.
    pub fn into_shared(self) -> SharedPipeline {
        Arc::new(Mutex::new(self))
    }

    /// Fill `out` completely: audio while playing, silence when paused or exhausted.
    ///
    /// Returns the number of audible frames written.
    pub fn fill(&mut self, out: &mut [f32]) -> usize {
        if self.paused {
            out.fill(0.0);
            return 0;
        }
        let ch = self.channels() as usize;
        let frames = self.resampler.process(&mut self.source, out);
        self.gain.apply(&mut out[..frames * ch]);
        out[frames * ch..].fill(0.0);
        frames
    }

    /// Reposition the underlying stream.
    pub fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        let result = self.source.seek(position);
        self.resampler.reset();
        result
    }

    /// Underlying stream read cursor in samples.
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Underlying stream length in samples.
    pub fn len(&self) -> u64 {
        self.source.len()
    }

    /// True when the underlying stream is empty.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Sample rate of the decoded stream.
    pub fn sample_rate(&self) -> SampleRate {
        self.source.sample_rate()
    }

    /// Rate of the samples handed to the device.
    pub fn output_rate(&self) -> SampleRate {
        self.output_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.source.channels()
    }

    /// Volume exponent
    pub fn volume(&self) -> f64 {
        self.gain.volume()
    }

    /// Set the volume exponent; bounds are the controller's business.
    pub fn set_volume(&mut self, volume: f64) {
        self.gain.set_volume(volume);
    }

    /// Whether output is paused
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;
    use approx::assert_relative_eq;

    fn ramp_pipeline(len: u64, config: &PlayerConfig) -> Pipeline {
        Pipeline::new(
            Box::new(MemoryStream::ramp(len, SampleRate::new(100))),
            config,
        )
    }

    #[test]
    fn gain_follows_exponential_curve() {
        let mut gain = Gain::new(2.0);
        assert_relative_eq!(gain.multiplier(), 1.0);
        gain.set_volume(1.0);
        assert_relative_eq!(gain.multiplier(), 2.0);
        gain.set_volume(-10.0);
        assert_relative_eq!(gain.multiplier(), 1.0 / 1024.0);

        let mut samples = [0.5, -0.25];
        gain.set_volume(1.0);
        gain.apply(&mut samples);
        assert_eq!(samples, [1.0, -0.5]);
    }

    #[test]
    fn fill_advances_position() {
        let mut pipeline = ramp_pipeline(10, &PlayerConfig::default());
        let mut out = [0.0f32; 4];
        assert_eq!(pipeline.fill(&mut out), 4);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(pipeline.position(), 4);
    }

    #[test]
    fn paused_pipeline_emits_silence_without_advancing() {
        let mut pipeline = ramp_pipeline(10, &PlayerConfig::default());
        pipeline.seek(3).unwrap();
        pipeline.set_paused(true);

        let mut out = [9.0f32; 4];
        assert_eq!(pipeline.fill(&mut out), 0);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(pipeline.position(), 3);
    }

    #[test]
    fn single_pass_ends_in_silence_at_stream_end() {
        let mut pipeline = ramp_pipeline(3, &PlayerConfig::default());
        let mut out = [9.0f32; 5];
        assert_eq!(pipeline.fill(&mut out), 3);
        assert_eq!(out, [0.0, 1.0, 2.0, 0.0, 0.0]);
        assert_eq!(pipeline.position(), 3);

        assert_eq!(pipeline.fill(&mut out), 0);
        assert_eq!(pipeline.position(), 3);
    }

    #[test]
    fn seeking_back_after_the_end_resumes_output() {
        let mut pipeline = ramp_pipeline(3, &PlayerConfig::default());
        let mut out = [0.0f32; 8];
        pipeline.fill(&mut out);

        pipeline.seek(1).unwrap();
        assert_eq!(pipeline.fill(&mut out), 2);
        assert_eq!(&out[..2], &[1.0, 2.0]);
    }

    #[test]
    fn loop_count_replays_stream() {
        let config = PlayerConfig {
            loop_count: 2,
            ..PlayerConfig::default()
        };
        let mut pipeline = ramp_pipeline(3, &config);
        let mut out = [9.0f32; 8];
        assert_eq!(pipeline.fill(&mut out), 6);
        assert_eq!(out, [0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn endless_loop_never_runs_dry() {
        let config = PlayerConfig {
            loop_count: 0,
            ..PlayerConfig::default()
        };
        let mut pipeline = ramp_pipeline(2, &config);
        let mut out = [0.0f32; 7];
        assert_eq!(pipeline.fill(&mut out), 7);
        assert_eq!(out, [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    /// Declares more samples than it can produce.
    struct Overstated {
        inner: MemoryStream,
        declared: u64,
    }

    impl DecodedStream for Overstated {
        fn sample_rate(&self) -> SampleRate {
            self.inner.sample_rate()
        }

        fn channels(&self) -> u16 {
            self.inner.channels()
        }

        fn len(&self) -> u64 {
            self.declared
        }

        fn position(&self) -> u64 {
            self.inner.position()
        }

        fn seek(&mut self, position: u64) -> Result<(), SeekError> {
            self.inner.seek(position.min(self.inner.len()))
        }

        fn read_frames(&mut self, out: &mut [f32]) -> usize {
            self.inner.read_frames(out)
        }
    }

    #[test]
    fn stream_running_dry_early_still_loops() {
        let stream = Overstated {
            inner: MemoryStream::ramp(3, SampleRate::new(100)),
            declared: 5,
        };
        let mut looped = Looped::new(stream, 0);
        let mut out = [9.0f32; 8];
        assert_eq!(looped.read_frames(&mut out), 8);
        assert_eq!(out, [0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0]);
        assert_eq!(looped.completed_passes(), 2);
    }

    #[test]
    fn stream_yielding_nothing_does_not_spin() {
        let stream = Overstated {
            inner: MemoryStream::ramp(0, SampleRate::new(100)),
            declared: 5,
        };
        let mut looped = Looped::new(stream, 0);
        let mut out = [0.0f32; 4];
        assert_eq!(looped.read_frames(&mut out), 0);
        assert_eq!(looped.read_frames(&mut out), 0);
    }

    #[test]
    fn volume_scales_output() {
        let mut pipeline = ramp_pipeline(4, &PlayerConfig::default());
        pipeline.set_volume(1.0);
        let mut out = [0.0f32; 4];
        pipeline.fill(&mut out);
        assert_eq!(out, [0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn resampler_doubles_rate_by_interpolating() {
        let mut stream = MemoryStream::ramp(4, SampleRate::new(100));
        let mut resampler = Resampler::new(SampleRate::new(100), SampleRate::new(200));
        assert_relative_eq!(resampler.ratio(), 0.5);

        let mut out = [0.0f32; 6];
        assert_eq!(resampler.process(&mut stream, &mut out), 6);
        assert_eq!(out, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn resampler_halves_rate_by_skipping() {
        let mut stream = MemoryStream::ramp(8, SampleRate::new(200));
        let mut resampler = Resampler::new(SampleRate::new(200), SampleRate::new(100));

        let mut out = [0.0f32; 3];
        assert_eq!(resampler.process(&mut stream, &mut out), 3);
        assert_eq!(out, [0.0, 2.0, 4.0]);

        // Frame 8 does not exist, so only frame 6 remains on the 2:1 grid.
        assert_eq!(resampler.process(&mut stream, &mut out), 1);
        assert_eq!(out[0], 6.0);
    }

    #[test]
    fn output_rate_from_config_sets_ratio() {
        let config = PlayerConfig {
            output_sample_rate: Some(200),
            ..PlayerConfig::default()
        };
        let pipeline = ramp_pipeline(4, &config);
        assert_eq!(pipeline.output_rate(), SampleRate::new(200));
        assert_eq!(pipeline.sample_rate(), SampleRate::new(100));
    }
}
