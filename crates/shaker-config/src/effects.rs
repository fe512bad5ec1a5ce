//! Per-effect configuration blocks.
//!
//! Balance is `0.0` = 100 % rear, `0.5` = both, `1.0` = 100 % front.

use crate::error::{ConfigError, ConfigResult, check_positive, check_range};
use serde::{Deserialize, Serialize};

const MAX_VOLUME: f32 = 2.0;
const MAX_FREQ_HZ: f32 = 200.0;

/// Engine waveform family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineProfile {
    /// Sine with a second harmonic that grows with RPM.
    Sine,
    /// Amplitude-modulated sine.
    Boxer,
    /// Quartic-folded, saturated cross-plane rumble.
    #[default]
    V8,
}

/// Engine layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpmConfig {
    /// Layer enabled. Default `true`.
    pub enabled: bool,
    /// Driving volume. Default `0.25`.
    pub volume: f32,
    /// Volume at standstill, blended out by 5 km/h. Default `0.8`.
    pub idle_boost: f32,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
    /// Output frequency at idle (Hz). Default `25`.
    pub min_freq: f32,
    /// Output frequency at the redline (Hz). Default `60`.
    pub max_freq: f32,
    /// Waveform. Default `V8`.
    pub profile: EngineProfile,
}

impl Default for RpmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.25,
            idle_boost: 0.8,
            balance: 0.5,
            min_freq: 25.0,
            max_freq: 60.0,
            profile: EngineProfile::V8,
        }
    }
}

impl RpmConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("rpm.volume", self.volume, 0.0, MAX_VOLUME)?;
        check_range("rpm.idle_boost", self.idle_boost, 0.0, MAX_VOLUME)?;
        check_range("rpm.balance", self.balance, 0.0, 1.0)?;
        check_range("rpm.min_freq", self.min_freq, 1.0, MAX_FREQ_HZ)?;
        check_range("rpm.max_freq", self.max_freq, 1.0, MAX_FREQ_HZ)?;
        if self.min_freq >= self.max_freq {
            return Err(ConfigError::invalid(
                "rpm.max_freq",
                format!("{} must exceed min_freq {}", self.max_freq, self.min_freq),
            ));
        }
        Ok(())
    }
}

/// Gear-shift thump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearShiftConfig {
    /// Layer enabled. Default `true`.
    pub enabled: bool,
    /// Volume. Default `1.0`.
    pub volume: f32,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
}

impl Default for GearShiftConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
            balance: 0.5,
        }
    }
}

impl GearShiftConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("gear_shift.volume", self.volume, 0.0, MAX_VOLUME)?;
        check_range("gear_shift.balance", self.balance, 0.0, 1.0)
    }
}

/// Suspension layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    /// Layer enabled. Default `true`.
    pub enabled: bool,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
    /// Road-rumble sensitivity threshold. Default `0.2`.
    pub threshold: f32,
    /// Impact threshold. Default `3.0`.
    pub impact_threshold: f32,
    /// Road-rumble volume. Default `1.0`.
    pub road_volume: f32,
    /// Impact volume. Default `1.0`.
    pub impact_volume: f32,
    /// Duck engine and road texture on suspension activity. Default `false`.
    pub priority: bool,
    /// Engine dimming depth when prioritised. Default `0.5`.
    pub rpm_dim: f32,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            balance: 0.5,
            threshold: 0.2,
            impact_threshold: 3.0,
            road_volume: 1.0,
            impact_volume: 1.0,
            priority: false,
            rpm_dim: 0.5,
        }
    }
}

impl SuspensionConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("suspension.balance", self.balance, 0.0, 1.0)?;
        check_range("suspension.threshold", self.threshold, 0.0, 10.0)?;
        check_range("suspension.impact_threshold", self.impact_threshold, 0.0, 100.0)?;
        check_range("suspension.road_volume", self.road_volume, 0.0, MAX_VOLUME)?;
        check_range("suspension.impact_volume", self.impact_volume, 0.0, MAX_VOLUME)?;
        check_range("suspension.rpm_dim", self.rpm_dim, 0.0, 1.0)
    }
}

/// Traction-control and ABS layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TractionConfig {
    /// Layer enabled. Default `true`.
    pub enabled: bool,
    /// Slip ratio where the trigger starts. Default `0.05`.
    pub threshold: f32,
    /// Slip range over which the trigger ramps to full. Default `0.15`.
    pub sensitivity: f32,
    /// Learn per-wheel radius corrections while coasting. Default `true`.
    pub auto_calibrate: bool,
    /// Volume. Default `0.8`.
    pub volume: f32,
    /// Front axle oscillator (Hz). Default `58`.
    pub front_freq: f32,
    /// Rear axle oscillator (Hz). Default `42`.
    pub rear_freq: f32,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
    /// Duck engine, suspension and road texture while slipping. Default `false`.
    pub priority: bool,
}

impl Default for TractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.05,
            sensitivity: 0.15,
            auto_calibrate: true,
            volume: 0.8,
            front_freq: 58.0,
            rear_freq: 42.0,
            balance: 0.5,
            priority: false,
        }
    }
}

impl TractionConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("traction.threshold", self.threshold, 0.0, 1.0)?;
        check_positive("traction.sensitivity", self.sensitivity)?;
        check_range("traction.volume", self.volume, 0.0, MAX_VOLUME)?;
        check_range("traction.front_freq", self.front_freq, 1.0, MAX_FREQ_HZ)?;
        check_range("traction.rear_freq", self.rear_freq, 1.0, MAX_FREQ_HZ)?;
        check_range("traction.balance", self.balance, 0.0, 1.0)
    }
}

/// Obstacle-impact burst triggered by surge/sway spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Layer enabled. Default `true`.
    pub enabled: bool,
    /// Volume. Default `0.8`.
    pub volume: f32,
    /// Spike magnitude that fires a burst (g). Default `2.5`.
    pub threshold_g: f32,
    /// Burst frequency (Hz). Default `38`.
    pub frequency: f32,
    /// Time for the burst to fall to 1/e (ms). Default `180`.
    pub decay_ms: f32,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.8,
            threshold_g: 2.5,
            frequency: 38.0,
            decay_ms: 180.0,
            balance: 0.5,
        }
    }
}

impl ImpactConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("impact.volume", self.volume, 0.0, MAX_VOLUME)?;
        check_positive("impact.threshold_g", self.threshold_g)?;
        check_range("impact.frequency", self.frequency, 1.0, MAX_FREQ_HZ)?;
        check_positive("impact.decay_ms", self.decay_ms)?;
        check_range("impact.balance", self.balance, 0.0, 1.0)
    }
}

/// Simulated road texture and bumps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// Layer enabled. Default `false`.
    pub enabled: bool,
    /// Bump volume. Default `0.5`.
    pub volume: f32,
    /// Continuous texture volume. Default `0.5`.
    pub texture_volume: f32,
    /// Texture base frequency (Hz). Default `30`.
    pub texture_freq: f32,
    /// Surface roughness driving bump density and strength. Default `0.3`.
    pub roughness: f32,
    /// Channel balance. Default `0.5`.
    pub balance: f32,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: 0.5,
            texture_volume: 0.5,
            texture_freq: 30.0,
            roughness: 0.3,
            balance: 0.5,
        }
    }
}

impl RoadConfig {
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        check_range("sim_road.volume", self.volume, 0.0, MAX_VOLUME)?;
        check_range("sim_road.texture_volume", self.texture_volume, 0.0, MAX_VOLUME)?;
        check_range("sim_road.texture_freq", self.texture_freq, 1.0, MAX_FREQ_HZ)?;
        check_range("sim_road.roughness", self.roughness, 0.0, 1.0)?;
        check_range("sim_road.balance", self.balance, 0.0, 1.0)
    }
}
