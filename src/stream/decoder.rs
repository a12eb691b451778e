//! File-backed stream decoded with symphonia
//!
//! Packets are decoded lazily as the pipeline pulls frames. Seeking uses
//! symphonia's accurate mode and discards the frames between the packet
//! boundary and the requested offset, so positions stay sample exact.

use super::{DecodedStream, SampleRate};
use crate::error::{PlayerError, Result, SeekError};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, error, warn};

/// Decoded stream over an audio file.
pub struct SymphoniaStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: SampleRate,
    channels: u16,
    time_base: Option<TimeBase>,
    length: u64,
    position: u64,
    /// Interleaved samples decoded but not yet handed out
    pending: Vec<f32>,
    pending_pos: usize,
    /// Frames still to drop after an accurate seek landed early
    skip: u64,
    sample_buf: Option<SampleBuffer<f32>>,
    finished: bool,
}

impl std::fmt::Debug for SymphoniaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymphoniaStream")
            .field("track_id", &self.track_id)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("length", &self.length)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

fn probe(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|source| PlayerError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Decode(format!("unsupported or corrupt file: {e}")))?;
    Ok(probed.format)
}

impl SymphoniaStream {
    /// Open `path`, pick its first audio track and prepare the decoder.
    pub fn open(path: &Path) -> Result<Self> {
        let format = probe(path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PlayerError::Decode("no audio track found".into()))?;

        let params = track.codec_params.clone();
        let track_id = track.id;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| PlayerError::Decode("unknown sample rate".into()))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(2).max(1);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| PlayerError::Decode(format!("no decoder for track: {e}")))?;

        let mut stream = Self {
            format,
            decoder,
            track_id,
            sample_rate: SampleRate::new(sample_rate),
            channels,
            time_base: params.time_base,
            length: 0,
            position: 0,
            pending: Vec::new(),
            pending_pos: 0,
            skip: 0,
            sample_buf: None,
            finished: false,
        };

        stream.length = match params.n_frames {
            Some(frames) => frames,
            None => stream.count_frames(path)?,
        };

        debug!(
            path = %path.display(),
            rate = sample_rate,
            channels,
            length = stream.length,
            "opened audio stream"
        );
        Ok(stream)
    }

    /// Sum packet durations over a second reader when the container has no frame count.
    fn count_frames(&self, path: &Path) -> Result<u64> {
        let mut format = probe(path)?;
        let mut total_ts = 0u64;
        loop {
            match format.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => total_ts += packet.dur(),
                Ok(_) => {}
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {}
                Err(e) => {
                    return Err(PlayerError::Decode(format!("cannot measure length: {e}")));
                }
            }
        }
        Ok(self.ts_to_frames(total_ts))
    }

    fn native_time_base(&self) -> bool {
        match self.time_base {
            Some(tb) => tb.numer == 1 && tb.denom == self.sample_rate.get(),
            None => true,
        }
    }

    fn ts_to_frames(&self, ts: u64) -> u64 {
        match self.time_base {
            Some(tb) if !self.native_time_base() => {
                let frames = ts as u128 * tb.numer as u128 * self.sample_rate.get() as u128
                    / tb.denom as u128;
                u64::try_from(frames).unwrap_or(u64::MAX)
            }
            _ => ts,
        }
    }

    fn frames_to_ts(&self, frames: u64) -> u64 {
        match self.time_base {
            Some(tb) if !self.native_time_base() => {
                let ts = frames as u128 * tb.denom as u128
                    / (tb.numer as u128 * self.sample_rate.get() as u128);
                u64::try_from(ts).unwrap_or(u64::MAX)
            }
            _ => frames,
        }
    }

    /// The audio ran out at `end`, before the length the container declared.
    fn truncate_at(&mut self, end: u64) {
        if end < self.length {
            warn!(
                declared = self.length,
                actual = end,
                "Stream ended early, shortening track"
            );
            self.length = end;
        }
    }

    /// Decode the next packet of our track into `pending`.
    ///
    /// Returns false at end of stream.
    fn decode_next(&mut self) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return false;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    error!("Failed to read packet, ending stream: {e}");
                    return false;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping packet): {e}");
                    continue;
                }
                Err(e) => {
                    error!("Decoder failed, ending stream: {e}");
                    return false;
                }
            };

            let spec = *decoded.spec();
            let needs_new_buf = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < decoded.capacity() * spec.channels.count());
            if needs_new_buf {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = self.sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            let source_channels = spec.channels.count().max(1);
            self.pending.clear();
            self.pending_pos = 0;
            remap_channels(
                buf.samples(),
                source_channels,
                self.channels as usize,
                &mut self.pending,
            );
            if !self.pending.is_empty() {
                return true;
            }
        }
    }
}

/// Copy interleaved frames from `from` channels to `to` channels.
///
/// Extra source channels are dropped; missing ones repeat the last source channel.
fn remap_channels(samples: &[f32], from: usize, to: usize, out: &mut Vec<f32>) {
    if from == to {
        out.extend_from_slice(samples);
        return;
    }
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
}

impl DecodedStream for SymphoniaStream {
    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn len(&self) -> u64 {
        self.length
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, position: u64) -> std::result::Result<(), SeekError> {
        if position > self.length {
            return Err(SeekError::new(
                position,
                format!("position out of range 0..={}", self.length),
            ));
        }

        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: self.frames_to_ts(position),
                    track_id: self.track_id,
                },
            )
            .map_err(|e| SeekError::new(position, e.to_string()))?;

        self.decoder.reset();
        self.pending.clear();
        self.pending_pos = 0;
        self.finished = false;

        let actual = self.ts_to_frames(seeked.actual_ts).min(position);
        self.skip = position - actual;
        self.position = position;
        Ok(())
    }

    fn read_frames(&mut self, out: &mut [f32]) -> usize {
        let channels = self.channels as usize;
        let wanted = (out.len() / channels) as u64;
        let wanted = wanted.min(self.length - self.position) as usize;
        let mut written = 0;

        while written < wanted && !self.finished {
            if self.pending_pos >= self.pending.len() {
                if !self.decode_next() {
                    self.finished = true;
                    self.truncate_at(self.position + written as u64);
                    break;
                }
            }

            if self.skip > 0 {
                let available = ((self.pending.len() - self.pending_pos) / channels) as u64;
                let dropped = self.skip.min(available);
                self.pending_pos += dropped as usize * channels;
                self.skip -= dropped;
                continue;
            }

            let available = (self.pending.len() - self.pending_pos) / channels;
            let frames = available.min(wanted - written);
            let src = &self.pending[self.pending_pos..self.pending_pos + frames * channels];
            out[written * channels..(written + frames) * channels].copy_from_slice(src);
            self.pending_pos += frames * channels;
            written += frames;
        }

        self.position += written as u64;
        written
    }
}
