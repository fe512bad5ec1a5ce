//! Top-level configuration.

use crate::effects::{
    EngineProfile, GearShiftConfig, ImpactConfig, RoadConfig, RpmConfig, SuspensionConfig,
    TractionConfig,
};
use crate::error::{ConfigError, ConfigResult, check_range};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Output routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShakerMode {
    /// Mono downmix on both channels, for a single transducer.
    Single,
    /// Rear on the first channel, front on the second.
    #[default]
    Dual,
}

/// How race flags gate the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Mute when paused or off track.
    #[default]
    Strict,
    /// Ignore pause/off-track so replays play through.
    Replay,
}

/// Console link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Console address. Default `192.168.1.116`.
    pub console_ip: IpAddr,
    /// Local receive port. Default `33740`.
    pub recv_port: u16,
    /// Console heartbeat port. Default `33739`.
    pub heartbeat_port: u16,
    /// Heartbeat cadence (ms). Default `1500`.
    pub heartbeat_interval_ms: u64,
    /// Receive timeout (ms). Default `1000`.
    pub recv_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            console_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 116)),
            recv_port: 33740,
            heartbeat_port: 33739,
            heartbeat_interval_ms: 1500,
            recv_timeout_ms: 1000,
        }
    }
}

impl NetworkConfig {
    /// Heartbeat cadence.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Receive timeout.
    #[must_use]
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::invalid("network.heartbeat_interval_ms", "must be > 0"));
        }
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::invalid("network.recv_timeout_ms", "must be > 0"));
        }
        Ok(())
    }
}

/// Audio device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name; `None` uses the system default.
    pub device: Option<String>,
    /// Sample rate (Hz). Default `48000`.
    pub sample_rate: u32,
    /// Frames per buffer. Default `2048`.
    pub buffer_size: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 48_000,
            buffer_size: 2048,
        }
    }
}

impl AudioConfig {
    /// Duration of one buffer.
    #[must_use]
    pub fn buffer_period(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.buffer_size) / f64::from(self.sample_rate))
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(ConfigError::invalid(
                "audio.sample_rate",
                format!("{} outside [8000, 192000]", self.sample_rate),
            ));
        }
        if !(16..=16_384).contains(&self.buffer_size) {
            return Err(ConfigError::invalid(
                "audio.buffer_size",
                format!("{} outside [16, 16384]", self.buffer_size),
            ));
        }
        Ok(())
    }
}

/// Complete shaker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakerConfig {
    /// Overall volume. Default `0.5`.
    pub master_volume: f32,
    /// Fixed headroom multiplied into the master volume. Default `0.42`.
    pub output_headroom: f32,
    /// Output routing. Default `Dual`.
    pub shaker_mode: ShakerMode,
    /// Flag gating. Default `Strict`.
    pub playback_mode: PlaybackMode,
    /// Console link.
    pub network: NetworkConfig,
    /// Audio device.
    pub audio: AudioConfig,
    /// Engine layer.
    pub rpm: RpmConfig,
    /// Gear-shift thump.
    pub gear_shift: GearShiftConfig,
    /// Suspension layer.
    pub suspension: SuspensionConfig,
    /// Traction/ABS layer.
    pub traction: TractionConfig,
    /// Obstacle-impact layer.
    pub impact: ImpactConfig,
    /// Simulated road.
    pub sim_road: RoadConfig,
}

impl Default for ShakerConfig {
    fn default() -> Self {
        Self {
            master_volume: 0.5,
            output_headroom: 0.42,
            shaker_mode: ShakerMode::Dual,
            playback_mode: PlaybackMode::Strict,
            network: NetworkConfig::default(),
            audio: AudioConfig::default(),
            rpm: RpmConfig::default(),
            gear_shift: GearShiftConfig::default(),
            suspension: SuspensionConfig::default(),
            traction: TractionConfig::default(),
            impact: ImpactConfig::default(),
            sim_road: RoadConfig::default(),
        }
    }
}

impl ShakerConfig {
    /// Master volume after headroom; the gain every layer is scaled by.
    #[must_use]
    pub fn safe_gain(&self) -> f32 {
        self.master_volume * self.output_headroom
    }

    /// Validate every block.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("master_volume", self.master_volume, 0.0, 1.0)?;
        check_range("output_headroom", self.output_headroom, 0.0, 1.0)?;
        self.network.validate()?;
        self.audio.validate()?;
        self.rpm.validate()?;
        self.gear_shift.validate()?;
        self.suspension.validate()?;
        self.traction.validate()?;
        self.impact.validate()?;
        self.sim_road.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str, origin: &Path) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or is invalid.
    pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content, path)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load a configuration file, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> ShakerConfigBuilder {
        ShakerConfigBuilder::default()
    }
}

/// Builder for [`ShakerConfig`].
#[derive(Debug, Default)]
pub struct ShakerConfigBuilder {
    config: ShakerConfig,
}

impl ShakerConfigBuilder {
    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: ShakerConfig) -> Self {
        Self { config }
    }

    /// Set the master volume.
    #[must_use]
    pub fn master_volume(mut self, volume: f32) -> Self {
        self.config.master_volume = volume;
        self
    }

    /// Set the output headroom.
    #[must_use]
    pub fn output_headroom(mut self, headroom: f32) -> Self {
        self.config.output_headroom = headroom;
        self
    }

    /// Set the shaker routing mode.
    #[must_use]
    pub fn shaker_mode(mut self, mode: ShakerMode) -> Self {
        self.config.shaker_mode = mode;
        self
    }

    /// Set the playback (muting) mode.
    #[must_use]
    pub fn playback_mode(mut self, mode: PlaybackMode) -> Self {
        self.config.playback_mode = mode;
        self
    }

    /// Set the console address.
    #[must_use]
    pub fn console_ip(mut self, ip: IpAddr) -> Self {
        self.config.network.console_ip = ip;
        self
    }

    /// Set the output device name.
    #[must_use]
    pub fn device(mut self, device: Option<String>) -> Self {
        self.config.audio.device = device;
        self
    }

    /// Set the sample rate.
    #[must_use]
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.audio.sample_rate = rate;
        self
    }

    /// Set the buffer size in frames.
    #[must_use]
    pub fn buffer_size(mut self, frames: u32) -> Self {
        self.config.audio.buffer_size = frames;
        self
    }

    /// Set the engine waveform.
    #[must_use]
    pub fn engine_profile(mut self, profile: EngineProfile) -> Self {
        self.config.rpm.profile = profile;
        self
    }

    /// Enable or disable the simulated road.
    #[must_use]
    pub fn sim_road(mut self, enabled: bool) -> Self {
        self.config.sim_road.enabled = enabled;
        self
    }

    /// Enable or disable traction priority ducking.
    #[must_use]
    pub fn traction_priority(mut self, priority: bool) -> Self {
        self.config.traction.priority = priority;
        self
    }

    /// Enable or disable suspension priority ducking.
    #[must_use]
    pub fn suspension_priority(mut self, priority: bool) -> Self {
        self.config.suspension.priority = priority;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any value is invalid.
    pub fn build(self) -> ConfigResult<ShakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
