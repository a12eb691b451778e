//! Player configuration
//!
//! Defaults reproduce the classic key feel: `+0.4`/`-0.6` volume steps on a
//! base-2 gain curve between `-10.0` and `2.0`, five second seeks, a one second
//! status tick and thirty device pulls per second.
//!
//! A JSON file named by [`CONFIG_ENV`] may override any field.

use crate::error::ConfigError;
use crate::playback::VolumeLimits;
use crate::stream::SampleRate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the path of an optional JSON config file.
pub const CONFIG_ENV: &str = "TERMTUNE_CONFIG";

/// Lowest volume exponent.
pub const MIN_VOLUME: f64 = -10.0;

/// Highest volume exponent.
pub const MAX_VOLUME: f64 = 2.0;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Lower volume bound (exponent)
    pub min_volume: f64,
    /// Upper volume bound (exponent)
    pub max_volume: f64,
    /// Base of the exponential gain curve
    pub volume_base: f64,
    /// Amount added by a volume-up key press
    pub volume_up_step: f64,
    /// Amount removed by a volume-down key press
    pub volume_down_step: f64,
    /// Seek distance in seconds
    pub seek_step_secs: f64,
    /// Status refresh interval in milliseconds
    pub tick_interval_ms: u64,
    /// How many blocks per second the device pulls from the pipeline
    pub pulls_per_second: u32,
    /// Number of passes over the file; `0` loops forever
    pub loop_count: u32,
    /// Device rate; `None` plays at the file's own rate
    pub output_sample_rate: Option<u32>,
    /// Log file; `None` uses `termtune.log` in the temp directory
    pub log_file: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_volume: MIN_VOLUME,
            max_volume: MAX_VOLUME,
            volume_base: 2.0,
            volume_up_step: 0.4,
            volume_down_step: 0.6,
            seek_step_secs: 5.0,
            tick_interval_ms: 1000,
            pulls_per_second: 30,
            loop_count: 1,
            output_sample_rate: None,
            log_file: None,
        }
    }
}

impl PlayerConfig {
    /// Load the file named by [`CONFIG_ENV`], or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that the controller and loop rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("min_volume", self.min_volume),
            ("max_volume", self.max_volume),
            ("volume_base", self.volume_base),
            ("volume_up_step", self.volume_up_step),
            ("volume_down_step", self.volume_down_step),
            ("seek_step_secs", self.seek_step_secs),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be a finite number")));
        }
        if self.min_volume >= self.max_volume {
            return Err(ConfigError::Invalid(format!(
                "min_volume ({}) must be below max_volume ({})",
                self.min_volume, self.max_volume
            )));
        }
        if self.volume_base <= 0.0 {
            return Err(ConfigError::Invalid("volume_base must be positive".into()));
        }
        if self.volume_up_step < 0.0 || self.volume_down_step < 0.0 || self.seek_step_secs < 0.0 {
            return Err(ConfigError::Invalid("step sizes must not be negative".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be greater than 0".into()));
        }
        if self.pulls_per_second == 0 {
            return Err(ConfigError::Invalid("pulls_per_second must be greater than 0".into()));
        }
        if self.output_sample_rate == Some(0) {
            return Err(ConfigError::Invalid("output_sample_rate must be greater than 0".into()));
        }
        Ok(())
    }

    /// Volume bounds as used by the controller and the display.
    pub fn volume_limits(&self) -> VolumeLimits {
        VolumeLimits::new(self.min_volume, self.max_volume)
    }

    /// Status refresh interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Seek distance in samples at `rate`.
    ///
    /// Saturates for steps too large to represent; negative or NaN steps give 0.
    pub fn seek_step_samples(&self, rate: SampleRate) -> i64 {
        let samples = match Duration::try_from_secs_f64(self.seek_step_secs) {
            Ok(step) => rate.samples(step),
            Err(_) if self.seek_step_secs > 0.0 => u64::MAX,
            Err(_) => 0,
        };
        i64::try_from(samples).unwrap_or(i64::MAX)
    }

    /// Device block size in samples at `rate`, never zero.
    pub fn buffer_size(&self, rate: SampleRate) -> usize {
        (rate.get() / self.pulls_per_second).max(1) as usize
    }

    /// Where log output goes.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("termtune.log"))
    }
}
