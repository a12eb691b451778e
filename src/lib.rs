//! Terminal audio player
//!
//! Plays a single audio file and shows a live status screen driven by single
//! key presses: volume up/down, pause, seek back/forward and quit.
//!
//! # Layers
//! - [`stream`]: decoded, seekable PCM sources (symphonia for real files)
//! - [`playback`]: the shared pipeline (loop, resample, pause, gain) and the
//!   controller that mutates it under one lock
//! - [`streaming`]: the audio device that pulls blocks from the pipeline
//! - [`event`]: key decoding and the input/tick loop
//! - [`display`] and [`tui`]: status quantities and the ratatui screen
//!
//! # Quick start
//! ```no_run
//! use termtune::playback::PlaybackController;
//! use termtune::stream::SymphoniaStream;
//! use termtune::streaming::RodioDevice;
//! use termtune::PlayerConfig;
//!
//! let config = PlayerConfig::default();
//! let stream = SymphoniaStream::open(std::path::Path::new("song.mp3")).unwrap();
//! let rate = termtune::stream::DecodedStream::sample_rate(&stream);
//! let device = RodioDevice::init(rate, config.buffer_size(rate)).unwrap();
//! let mut controller = PlaybackController::new(Box::new(stream), device, &config);
//! controller.play().unwrap();
//! controller.volume_up();
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod logging;
pub mod playback;
pub mod stream;
pub mod streaming;
pub mod tui;

pub use config::PlayerConfig;
pub use error::{ConfigError, PlayerError, Result, SeekError};
pub use playback::{PlaybackController, Snapshot, VolumeLimits};
pub use stream::{DecodedStream, SampleRate};
