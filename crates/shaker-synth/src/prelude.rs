//! Convenience re-exports.

pub use crate::metrics::{LiveMetrics, MetricsCell};
pub use crate::mixer::{HapticMixer, MixInput, MixerState};
pub use crate::oscillator::{Phase, angular_step, soft_limit, speed_ramp, stereo_gains};
pub use crate::road::{BumpEvent, RoadParams, RoadTextureSynthesizer};
pub use crate::test_tone::{TestTone, ToneSide};
pub use crate::tire_slip::{CalibrationState, SlipSettings, SlipTriggers, TireSlipEstimator};
