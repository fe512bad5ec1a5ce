//! RPM smoothing and car-frame acceleration estimation.
//!
//! Both types are plain state structs updated once per decoded packet on the
//! receive thread. Neither allocates after construction.

/// Number of raw RPM samples averaged by [`RpmSmoother`].
pub const RPM_WINDOW: usize = 10;

/// Minimum time between acceleration recomputations (ns).
pub const ACCEL_MIN_DT_NS: u64 = 10_000_000;

/// Per-update decay applied to held acceleration peaks.
pub const PEAK_DECAY: f32 = 0.90;

const STANDARD_GRAVITY: f32 = 9.806_65;

/// Fixed-length ring buffer averaging the most recent raw RPM values.
///
/// Early on the mean covers only the samples pushed so far.
#[derive(Debug, Clone, Copy)]
pub struct RpmSmoother {
    samples: [f32; RPM_WINDOW],
    next: usize,
    len: usize,
}

impl Default for RpmSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl RpmSmoother {
    /// Create an empty smoother.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: [0.0; RPM_WINDOW],
            next: 0,
            len: 0,
        }
    }

    /// Push a raw sample and return the current mean.
    pub fn push(&mut self, rpm: f32) -> f32 {
        if let Some(slot) = self.samples.get_mut(self.next) {
            *slot = rpm;
        }
        self.next = (self.next + 1) % RPM_WINDOW;
        self.len = (self.len + 1).min(RPM_WINDOW);
        self.mean()
    }

    /// Mean of the buffered samples, `0.0` when empty.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().take(self.len).sum();
        sum / self.len as f32
    }

    /// Number of buffered samples.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no samples have been pushed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop all samples.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Converts world-frame velocity differences into car-frame surge and sway.
///
/// Recomputes only when at least [`ACCEL_MIN_DT_NS`] has passed since the
/// previous sample. Each axis keeps a decaying peak: a larger magnitude
/// replaces the held value immediately, otherwise the held value is scaled
/// by [`PEAK_DECAY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelerationTracker {
    last_velocity: Option<[f32; 3]>,
    last_ns: u64,
    surge_g: f32,
    sway_g: f32,
}

impl AccelerationTracker {
    /// Create a tracker with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_velocity: None,
            last_ns: 0,
            surge_g: 0.0,
            sway_g: 0.0,
        }
    }

    /// Feed a world-frame velocity sample and return the held `(surge, sway)`
    /// in g.
    ///
    /// `yaw` is the heading in radians; forward at yaw 0 is world `+z`.
    pub fn update(&mut self, velocity: [f32; 3], yaw: f32, now_ns: u64) -> (f32, f32) {
        let Some(prev) = self.last_velocity else {
            self.last_velocity = Some(velocity);
            self.last_ns = now_ns;
            return (self.surge_g, self.sway_g);
        };

        let dt_ns = now_ns.saturating_sub(self.last_ns);
        if dt_ns < ACCEL_MIN_DT_NS {
            return (self.surge_g, self.sway_g);
        }
        let dt = dt_ns as f32 * 1e-9;

        let ax = (velocity[0] - prev[0]) / dt;
        let az = (velocity[2] - prev[2]) / dt;

        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        let surge = (ax * sin_yaw + az * cos_yaw) / STANDARD_GRAVITY;
        let sway = (ax * cos_yaw - az * sin_yaw) / STANDARD_GRAVITY;

        self.surge_g = hold_peak(self.surge_g, surge);
        self.sway_g = hold_peak(self.sway_g, sway);
        self.last_velocity = Some(velocity);
        self.last_ns = now_ns;
        (self.surge_g, self.sway_g)
    }

    /// Currently held surge (g).
    #[must_use]
    pub const fn surge_g(&self) -> f32 {
        self.surge_g
    }

    /// Currently held sway (g).
    #[must_use]
    pub const fn sway_g(&self) -> f32 {
        self.sway_g
    }
}

#[inline]
fn hold_peak(held: f32, sample: f32) -> f32 {
    if !sample.is_finite() {
        return held * PEAK_DECAY;
    }
    if sample.abs() > held.abs() {
        sample
    } else {
        held * PEAK_DECAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const MS: u64 = 1_000_000;

    #[test]
    fn test_rpm_mean_of_partial_window() -> TestResult {
        let mut smoother = RpmSmoother::new();
        let mut pushed = Vec::new();
        for k in 1..=RPM_WINDOW {
            let rpm = (k * 1000) as f32;
            pushed.push(rpm);
            let mean = smoother.push(rpm);
            let expected = pushed.iter().sum::<f32>() / pushed.len() as f32;
            assert!((mean - expected).abs() < 1e-3, "k={k}: {mean} != {expected}");
        }
        Ok(())
    }

    #[test]
    fn test_rpm_mean_of_last_ten_after_wrap() -> TestResult {
        let mut smoother = RpmSmoother::new();
        let raw: Vec<f32> = (1..=15).map(|k| (k * 1000) as f32).collect();
        let mut mean = 0.0;
        for &r in &raw {
            mean = smoother.push(r);
        }
        let tail = raw.get(raw.len() - RPM_WINDOW..).ok_or("tail")?;
        let expected = tail.iter().sum::<f32>() / RPM_WINDOW as f32;
        assert!((mean - expected).abs() < 1e-3);
        assert_eq!(smoother.len(), RPM_WINDOW);
        Ok(())
    }

    #[test]
    fn test_empty_smoother_mean_is_zero() {
        let smoother = RpmSmoother::new();
        assert!(smoother.is_empty());
        assert!(smoother.mean().abs() < f32::EPSILON);
    }

    #[test]
    fn test_accel_first_sample_is_zero() {
        let mut tracker = AccelerationTracker::new();
        let (surge, sway) = tracker.update([0.0, 0.0, 10.0], 0.0, 0);
        assert!(surge.abs() < f32::EPSILON);
        assert!(sway.abs() < f32::EPSILON);
    }

    #[test]
    fn test_accel_skips_short_interval() {
        let mut tracker = AccelerationTracker::new();
        tracker.update([0.0, 0.0, 0.0], 0.0, 0);
        let (surge, _) = tracker.update([0.0, 0.0, 5.0], 0.0, 5 * MS);
        assert!(surge.abs() < f32::EPSILON);
        // The skipped sample did not move the reference point.
        let (surge, _) = tracker.update([0.0, 0.0, 0.981], 0.0, 100 * MS);
        assert!((surge - 0.981 / 0.1 / STANDARD_GRAVITY).abs() < 1e-3);
    }

    #[test]
    fn test_forward_acceleration_is_positive_surge() {
        let mut tracker = AccelerationTracker::new();
        tracker.update([0.0, 0.0, 0.0], 0.0, 0);
        // 9.80665 m/s^2 forward for 100 ms.
        let (surge, sway) = tracker.update([0.0, 0.0, 0.980_665], 0.0, 100 * MS);
        assert!((surge - 1.0).abs() < 1e-3, "surge {surge}");
        assert!(sway.abs() < 1e-3);
    }

    #[test]
    fn test_yaw_rotates_into_sway() {
        let mut tracker = AccelerationTracker::new();
        tracker.update([0.0, 0.0, 0.0], std::f32::consts::FRAC_PI_2, 0);
        // Heading +x; acceleration along world +z is lateral.
        let (surge, sway) = tracker.update(
            [0.0, 0.0, 0.980_665],
            std::f32::consts::FRAC_PI_2,
            100 * MS,
        );
        assert!(surge.abs() < 1e-3, "surge {surge}");
        assert!((sway.abs() - 1.0).abs() < 1e-3, "sway {sway}");
    }

    #[test]
    fn test_peak_hold_decays() {
        let mut tracker = AccelerationTracker::new();
        tracker.update([0.0, 0.0, 0.0], 0.0, 0);
        let (peak, _) = tracker.update([0.0, 0.0, 0.980_665], 0.0, 100 * MS);
        // Constant velocity: zero acceleration, held peak decays.
        let (held, _) = tracker.update([0.0, 0.0, 0.980_665], 0.0, 200 * MS);
        assert!((held - peak * PEAK_DECAY).abs() < 1e-4);
        let (held2, _) = tracker.update([0.0, 0.0, 0.980_665], 0.0, 300 * MS);
        assert!((held2 - peak * PEAK_DECAY * PEAK_DECAY).abs() < 1e-4);
    }

    #[test]
    fn test_larger_peak_replaces_immediately() {
        let mut tracker = AccelerationTracker::new();
        tracker.update([0.0, 0.0, 0.0], 0.0, 0);
        tracker.update([0.0, 0.0, 0.5], 0.0, 100 * MS);
        let (surge, _) = tracker.update([0.0, 0.0, -1.5], 0.0, 200 * MS);
        // -2.0 m/s over 100 ms is a 20 m/s^2 deceleration.
        assert!((surge + 20.0 / STANDARD_GRAVITY).abs() < 1e-3);
    }
}
