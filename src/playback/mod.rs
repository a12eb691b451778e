//! Playback-control core
//!
//! - [`pipeline`]: looping, resampling, pausing and gain over a decoded stream
//! - [`controller`]: lock-guarded operations on the shared pipeline
//! - [`state`]: snapshot and volume bounds

pub mod controller;
pub mod pipeline;
pub mod state;

pub use controller::{PlaybackController, Steps};
pub use pipeline::{Gain, Looped, Pipeline, Resampler, SharedPipeline};
pub use state::{Snapshot, VolumeLimits};
