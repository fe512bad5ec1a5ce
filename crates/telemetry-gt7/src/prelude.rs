//! Convenience re-exports.

pub use crate::client::{ClientConfig, ClientStats, TelemetryClient};
pub use crate::decoder::Gt7Decoder;
pub use crate::error::{TelemetryError, TelemetryResult};
pub use crate::frame::{RaceFlags, TelemetryFrame, Wheels};
pub use crate::slot::LatestFrameSlot;
pub use crate::smoothing::{AccelerationTracker, RpmSmoother};
pub use crate::telemetry_now_ns;
