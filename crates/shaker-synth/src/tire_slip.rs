//! Traction-control and ABS trigger estimation.
//!
//! Wheel surface speed is `angular speed × radius × calibration`. Slip is
//! measured against the car's ground speed: wheels faster than the car under
//! power (TC), slower than the car under braking (ABS). ABS triggers later
//! than TC by [`ABS_THRESHOLD_OFFSET`].
//!
//! Calibration learns a per-wheel correction while the car coasts straight,
//! absorbing tyre wear and radius reporting errors.

use shaker_config::TractionConfig;
use shaker_telemetry_gt7::TelemetryFrame;

/// Extra slip tolerated under braking before ABS triggers.
pub const ABS_THRESHOLD_OFFSET: f32 = 0.09;

/// Calibration learning rate.
pub const CALIBRATION_ALPHA: f32 = 0.001;

/// Below this car speed (m/s) all triggers are zero.
pub const MIN_CAR_SPEED_MS: f32 = 1.0;

/// Calibration only runs below this throttle (%).
pub const CALIBRATION_MAX_THROTTLE: f32 = 30.0;

/// Front wheel angular speeds must agree within this to count as straight.
pub const STRAIGHT_TOLERANCE: f32 = 0.1;

const MIN_WHEEL_SPEED: f32 = 0.1;
const MIN_SURFACE_SPEED: f32 = 1e-3;

/// Per-wheel calibration factors in `FL, FR, RL, RR` order.
///
/// # RT Safety
///
/// - `#[repr(C)]`, `Copy`
/// - No heap allocations
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CalibrationState {
    /// Correction factors, `1.0` when uncalibrated.
    pub factors: [f32; 4],
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self { factors: [1.0; 4] }
    }
}

/// Trigger intensities in `[0, 1]`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SlipTriggers {
    /// Front axle wheelspin.
    pub tc_front: f32,
    /// Rear axle wheelspin.
    pub tc_rear: f32,
    /// Front axle lock-up.
    pub abs_front: f32,
    /// Rear axle lock-up.
    pub abs_rear: f32,
}

impl SlipTriggers {
    /// Largest of the four triggers.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.tc_front
            .max(self.tc_rear)
            .max(self.abs_front)
            .max(self.abs_rear)
    }

    /// Combined front intensity.
    #[must_use]
    pub fn front(&self) -> f32 {
        self.tc_front.max(self.abs_front)
    }

    /// Combined rear intensity.
    #[must_use]
    pub fn rear(&self) -> f32 {
        self.tc_rear.max(self.abs_rear)
    }
}

/// Thresholds taken from [`TractionConfig`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlipSettings {
    /// Slip ratio where the trigger starts.
    pub threshold: f32,
    /// Slip span to full trigger.
    pub sensitivity: f32,
    /// Learn calibration factors.
    pub auto_calibrate: bool,
}

impl Default for SlipSettings {
    fn default() -> Self {
        Self::from(&TractionConfig::default())
    }
}

impl From<&TractionConfig> for SlipSettings {
    fn from(config: &TractionConfig) -> Self {
        Self {
            threshold: config.threshold,
            sensitivity: config.sensitivity,
            auto_calibrate: config.auto_calibrate,
        }
    }
}

/// Slip estimator owning the calibration state.
///
/// Owned by the audio callback; not shared.
#[derive(Debug, Clone, Default)]
pub struct TireSlipEstimator {
    settings: SlipSettings,
    calibration: CalibrationState,
}

impl TireSlipEstimator {
    /// Create an estimator with neutral calibration.
    #[must_use]
    pub fn new(settings: SlipSettings) -> Self {
        Self {
            settings,
            calibration: CalibrationState::default(),
        }
    }

    /// Replace thresholds; calibration is kept.
    pub fn configure(&mut self, settings: SlipSettings) {
        self.settings = settings;
    }

    /// Current calibration factors.
    #[must_use]
    pub const fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    /// Forget learned calibration.
    pub fn reset_calibration(&mut self) {
        self.calibration = CalibrationState::default();
    }

    /// Compute trigger intensities for one frame.
    pub fn compute(&mut self, frame: &TelemetryFrame) -> SlipTriggers {
        let car = frame.speed_ms();
        if !car.is_finite() || car < MIN_CAR_SPEED_MS {
            return SlipTriggers::default();
        }
        let braking = frame.is_braking();

        if self.settings.auto_calibrate && calibration_allowed(frame, braking) {
            self.learn(frame, car);
        }

        let mut surface = [0.0f32; 4];
        for (((out, w), r), k) in surface
            .iter_mut()
            .zip(frame.wheel_speed)
            .zip(frame.wheel_radius)
            .zip(self.calibration.factors)
        {
            *out = w.abs() * r * k;
        }
        let [fl, fr, rl, rr] = surface;

        if braking {
            let trigger = |slip| {
                slip_trigger(
                    slip,
                    self.settings.threshold + ABS_THRESHOLD_OFFSET,
                    self.settings.sensitivity,
                )
            };
            SlipTriggers {
                abs_front: trigger(lock_slip(car, fl).max(lock_slip(car, fr))),
                abs_rear: trigger(lock_slip(car, rl).max(lock_slip(car, rr))),
                ..SlipTriggers::default()
            }
        } else {
            let trigger =
                |slip| slip_trigger(slip, self.settings.threshold, self.settings.sensitivity);
            SlipTriggers {
                tc_front: trigger(spin_slip(car, fl).max(spin_slip(car, fr))),
                tc_rear: trigger(spin_slip(car, rl).max(spin_slip(car, rr))),
                ..SlipTriggers::default()
            }
        }
    }

    fn learn(&mut self, frame: &TelemetryFrame, car: f32) {
        for ((factor, w), r) in self
            .calibration
            .factors
            .iter_mut()
            .zip(frame.wheel_speed)
            .zip(frame.wheel_radius)
        {
            let ratio = calibration_ratio(car, w, r);
            *factor = (1.0 - CALIBRATION_ALPHA) * *factor + CALIBRATION_ALPHA * ratio;
        }
    }
}

fn calibration_allowed(frame: &TelemetryFrame, braking: bool) -> bool {
    let [fl, fr, _, _] = frame.wheel_speed;
    !braking
        && (0.0..CALIBRATION_MAX_THROTTLE).contains(&frame.throttle)
        && (fl - fr).abs() < STRAIGHT_TOLERANCE
}

/// Instantaneous `car / (|w| × r)`, `1.0` when the wheel gives no signal.
#[inline]
#[must_use]
pub fn calibration_ratio(car_ms: f32, wheel_speed: f32, radius: f32) -> f32 {
    let surface = wheel_speed.abs() * radius;
    if wheel_speed.abs() > MIN_WHEEL_SPEED && surface > MIN_SURFACE_SPEED && surface.is_finite() {
        car_ms / surface
    } else {
        1.0
    }
}

/// Wheelspin slip: wheel faster than the car.
#[inline]
#[must_use]
pub fn spin_slip(car_ms: f32, wheel_ms: f32) -> f32 {
    if car_ms <= 0.0 {
        return 0.0;
    }
    ((wheel_ms - car_ms) / car_ms).max(0.0)
}

/// Lock-up slip: wheel slower than the car.
#[inline]
#[must_use]
pub fn lock_slip(car_ms: f32, wheel_ms: f32) -> f32 {
    if car_ms <= 0.0 {
        return 0.0;
    }
    ((car_ms - wheel_ms) / car_ms).max(0.0)
}

/// Linear ramp from `threshold` over `sensitivity`, clamped to `[0, 1]`.
#[inline]
#[must_use]
pub fn slip_trigger(slip: f32, threshold: f32, sensitivity: f32) -> f32 {
    if !slip.is_finite() || slip <= threshold || sensitivity <= 0.0 {
        return 0.0;
    }
    ((slip - threshold) / sensitivity).clamp(0.0, 1.0)
}
