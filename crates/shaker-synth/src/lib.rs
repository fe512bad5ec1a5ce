//! # shaker-synth
//!
//! Real-time haptic synthesis for a two-channel shaker rig.
//!
//! ## Architecture
//!
//! - [`oscillator`] - phase accumulators and the pure per-sample waveform math
//! - [`tire_slip`] - traction-control and ABS trigger estimation with
//!   per-wheel self-calibration
//! - [`road`] - simulated road texture and axle-delayed bumps
//! - [`mixer`] - the layered mixer with priority ducking, balance routing and
//!   the output limiter
//! - [`metrics`] - live metrics published once per buffer
//! - [`test_tone`] - short decaying tone for checking channel wiring
//!
//! ## RT Safety
//!
//! Everything called per buffer is allocation-free once buffers of the
//! running size have been seen, performs no I/O and takes no locks. State is
//! owned by a single caller (the audio callback) and mutated once per buffer.
//!
//! ## Example
//!
//! ```rust
//! use shaker_config::ShakerConfig;
//! use shaker_synth::prelude::*;
//!
//! let config = ShakerConfig::default();
//! let mut mixer = HapticMixer::new(48_000.0);
//! let mut rear = vec![0.0f32; 256];
//! let mut front = vec![0.0f32; 256];
//! let mut metrics = LiveMetrics::default();
//!
//! // No telemetry yet: silence.
//! mixer.process(&MixInput::idle(&config), &mut rear, &mut front, &mut metrics);
//! assert!(rear.iter().all(|s| *s == 0.0));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod metrics;
pub mod mixer;
pub mod oscillator;
pub mod road;
pub mod test_tone;
pub mod tire_slip;

pub mod prelude;

pub use metrics::{LiveMetrics, MetricsCell};
pub use mixer::{HapticMixer, MixInput, MixerState};
pub use oscillator::Phase;
pub use road::{BumpEvent, RoadParams, RoadTextureSynthesizer};
pub use test_tone::{TestTone, ToneSide};
pub use tire_slip::{CalibrationState, SlipSettings, SlipTriggers, TireSlipEstimator};
