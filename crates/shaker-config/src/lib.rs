//! # shaker-config
//!
//! Typed configuration for the haptic shaker pipeline.
//!
//! Every struct carries `#[serde(default)]`, so a partial JSON file only
//! overrides the fields it names. Defaults are documented on each field.
//! Loading is read-only; whoever edits the file owns persistence.
//!
//! ## Example
//!
//! ```rust
//! use shaker_config::{EngineProfile, ShakerConfig};
//!
//! let config = ShakerConfig::builder()
//!     .master_volume(0.7)
//!     .engine_profile(EngineProfile::Boxer)
//!     .build()
//!     .map_err(|e| e.to_string())?;
//! assert!((config.master_volume - 0.7).abs() < f32::EPSILON);
//! # Ok::<(), String>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod effects;
pub mod error;

pub use config::{
    AudioConfig, NetworkConfig, PlaybackMode, ShakerConfig, ShakerConfigBuilder, ShakerMode,
};
pub use effects::{
    EngineProfile, GearShiftConfig, ImpactConfig, RoadConfig, RpmConfig, SuspensionConfig,
    TractionConfig,
};
pub use error::{ConfigError, ConfigResult};
