//! Decoded telemetry snapshot.

use serde::Serialize;
use std::time::Duration;

/// Per-wheel values in `FL, FR, RL, RR` order.
pub type Wheels = [f32; 4];

/// Wheel index helpers.
pub mod wheel {
    /// Front left.
    pub const FL: usize = 0;
    /// Front right.
    pub const FR: usize = 1;
    /// Rear left.
    pub const RL: usize = 2;
    /// Rear right.
    pub const RR: usize = 3;
}

/// Race state flags from the packet flag word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RaceFlags {
    /// Car is on track (in a session, not in menus).
    pub on_track: bool,
    /// Simulation is paused.
    pub paused: bool,
    /// Game is loading or processing.
    pub loading: bool,
}

/// Immutable telemetry snapshot created once per accepted packet.
///
/// Frames are shared behind `Arc` and never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryFrame {
    /// Monotonic arrival timestamp (see [`crate::telemetry_now_ns`]).
    pub timestamp_ns: u64,
    /// Race state flags.
    pub flags: RaceFlags,

    /// Current lap (0 before the first lap).
    pub lap: i16,
    /// Total laps in the race (0 for time trials).
    pub total_laps: i16,
    /// Best lap time, `None` if no lap has been set.
    pub best_lap: Option<Duration>,
    /// Last lap time, `None` if no lap has been completed.
    pub last_lap: Option<Duration>,
    /// Race position (1-based, -1 if unavailable).
    pub race_position: i16,
    /// Number of cars in the race.
    pub total_cars: i16,

    /// World-frame position (m).
    pub position: [f32; 3],
    /// World-frame velocity (m/s), `y` is vertical.
    pub velocity: [f32; 3],
    /// Heading around the vertical axis (rad).
    pub yaw: f32,

    /// Engine RPM as decoded from this packet.
    pub raw_rpm: f32,
    /// Engine RPM averaged over the recent ring buffer.
    pub rpm: f32,
    /// RPM where the shift light starts.
    pub shift_rpm: u16,
    /// RPM where the limiter engages.
    pub max_rpm: u16,
    /// Car speed (km/h).
    pub speed_kmh: f32,
    /// Current gear (0 = neutral/reverse).
    pub gear: u8,
    /// Gear the game suggests.
    pub suggested_gear: u8,
    /// Throttle position (0-100 %).
    pub throttle: f32,
    /// Brake position (0-100 %).
    pub brake: f32,
    /// Rev limiter engaged.
    pub rev_limiter: bool,

    /// Tyre surface temperatures (°C).
    pub tyre_temp: Wheels,
    /// Wheel angular speeds (rad/s, absolute).
    pub wheel_speed: Wheels,
    /// Wheel radii (m).
    pub wheel_radius: Wheels,
    /// Suspension heights (m).
    pub suspension: Wheels,

    /// Longitudinal acceleration in the car frame (g, positive forward).
    pub surge_g: f32,
    /// Lateral acceleration in the car frame (g, positive right).
    pub sway_g: f32,
}

impl TelemetryFrame {
    /// Car speed in m/s.
    #[must_use]
    pub fn speed_ms(&self) -> f32 {
        self.speed_kmh / 3.6
    }

    /// Vertical body velocity (m/s).
    #[must_use]
    pub fn vertical_velocity(&self) -> f32 {
        self.velocity[1]
    }

    /// Hottest tyre temperature.
    #[must_use]
    pub fn max_tyre_temp(&self) -> f32 {
        self.tyre_temp.iter().copied().fold(f32::MIN, f32::max)
    }

    /// RPM as a fraction of the redline, guarded against a missing redline.
    #[must_use]
    pub fn rpm_ratio(&self) -> f32 {
        if self.max_rpm == 0 {
            0.0
        } else {
            (self.rpm / f32::from(self.max_rpm)).clamp(0.0, 1.0)
        }
    }

    /// Whether the driver is on the brake.
    #[must_use]
    pub fn is_braking(&self) -> bool {
        self.brake > 0.0
    }
}
