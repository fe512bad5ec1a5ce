//! Phase accumulators and per-sample waveform functions.
//!
//! Oscillators evaluate `sin(phase + i * step)` across a buffer, then advance
//! the stored phase by `len * step` modulo 2π. The value at the start of the
//! next buffer is therefore exactly the value one step past the end of the
//! previous one, whatever the buffer sizes.
//!
//! Phases are kept in `f64`; samples are produced as `f32`.

use shaker_config::EngineProfile;
use std::f64::consts::{PI, TAU};

/// Soft limiter knee.
pub const LIMITER_KNEE: f32 = 0.85;

/// Hard output ceiling.
pub const OUTPUT_CEILING: f32 = 0.98;

/// Speed below which road effects are silent (km/h).
pub const ROAD_MIN_SPEED_KMH: f32 = 3.0;

/// Speed span of the road ramp (km/h).
pub const ROAD_RAMP_SPAN_KMH: f32 = 197.0;

/// Upper clamp of the road ramp.
pub const ROAD_RAMP_MAX: f32 = 2.0;

/// Persistent oscillator phase in `[0, 2π)`.
///
/// # RT Safety
///
/// - `#[repr(C)]`, `Copy`
/// - No heap allocations
/// - O(1) advance
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Phase {
    value: f64,
}

impl Phase {
    /// Phase at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0.0 }
    }

    /// Phase starting at `value`, wrapped into range.
    #[must_use]
    pub fn at(value: f64) -> Self {
        Self {
            value: wrap_phase(value),
        }
    }

    /// Current phase in radians.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Phase of sample `i` in the current buffer (not wrapped).
    #[inline]
    #[must_use]
    pub fn offset(&self, step: f64, i: usize) -> f64 {
        self.value + step * i as f64
    }

    /// Advance by `len` samples of `step` radians.
    ///
    /// Returns the number of whole cycles completed, modulo 4, for
    /// oscillators that need a sub-harmonic of the phase.
    pub fn advance(&mut self, step: f64, len: usize) -> u64 {
        let raw = self.value + step * len as f64;
        let cycles = if raw.is_finite() && raw > 0.0 {
            (raw / TAU).floor()
        } else {
            0.0
        };
        self.value = wrap_phase(raw);
        (cycles as u64) & 0x3
    }

    /// Reset to zero.
    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Radians per sample for `freq_hz` at `sample_rate`, `0.0` for a
/// non-positive rate.
#[inline]
#[must_use]
pub fn angular_step(freq_hz: f32, sample_rate: f32) -> f64 {
    if sample_rate > 0.0 && freq_hz.is_finite() {
        TAU * f64::from(freq_hz) / f64::from(sample_rate)
    } else {
        0.0
    }
}

/// Wrap any angle into `[0, 2π)`; non-finite input maps to `0.0`.
#[inline]
#[must_use]
pub fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Channel gains `(rear, front)` for a balance in `[0, 1]`.
///
/// `0.0` is rear only, `0.5` is both at full level, `1.0` is front only.
#[inline]
#[must_use]
pub fn stereo_gains(balance: f32) -> (f32, f32) {
    let bal = if balance.is_finite() {
        balance.clamp(0.0, 1.0)
    } else {
        0.5
    };
    if bal <= 0.5 {
        (1.0, bal * 2.0)
    } else {
        ((1.0 - bal) * 2.0, 1.0)
    }
}

/// Pass through below the knee, `tanh` above it.
#[inline]
#[must_use]
pub fn soft_limit(x: f32) -> f32 {
    if x.abs() > LIMITER_KNEE { x.tanh() } else { x }
}

/// Final stage: envelope gain, hard clip, and NaN scrub.
#[inline]
#[must_use]
pub fn finish_sample(x: f32, gain: f32) -> f32 {
    let y = soft_limit(x) * gain;
    if y.is_finite() {
        y.clamp(-OUTPUT_CEILING, OUTPUT_CEILING)
    } else {
        0.0
    }
}

/// Road-effect speed ramp: `min(((|speed| - 3) / 197)², 2.0)`, zero below
/// 3 km/h.
#[must_use]
pub fn speed_ramp(speed_kmh: f32) -> f32 {
    let speed = speed_kmh.abs();
    if !speed.is_finite() || speed < ROAD_MIN_SPEED_KMH {
        return 0.0;
    }
    let x = (speed - ROAD_MIN_SPEED_KMH) / ROAD_RAMP_SPAN_KMH;
    (x * x).min(ROAD_RAMP_MAX)
}

/// Engine waveform for phase `x` (radians, may exceed 2π for the
/// sub-harmonic terms) and RPM ratio.
#[inline]
#[must_use]
pub fn engine_wave(profile: EngineProfile, x: f64, ratio: f64) -> f64 {
    match profile {
        EngineProfile::Sine => x.sin() + 0.4 * ratio * (2.0 * x).sin(),
        EngineProfile::Boxer => x.sin() * (1.0 + 0.5 * (0.5 * x).sin()) * (0.7 + 0.3 * ratio),
        EngineProfile::V8 => {
            let s = x.sin();
            let pulse = s.signum() * s.abs().powi(4);
            let growl = 0.8 * (0.5 * x).sin() + 0.4 * (0.25 * x + 0.5).cos();
            ((pulse * (1.0 + 0.5 * growl) + 0.5 * (0.5 * x).sin()) * 1.5).tanh()
        }
    }
}

/// Blend a sine toward a square wave; `mix` in `[0, 1]`.
#[inline]
#[must_use]
pub fn square_mix(s: f64, mix: f64) -> f64 {
    let sign = if s > 0.0 {
        1.0
    } else if s < 0.0 {
        -1.0
    } else {
        0.0
    };
    (1.0 - mix) * s + mix * sign
}

/// Half-sine window value for sample `k` of `len`.
#[inline]
#[must_use]
pub fn half_sine_window(k: usize, len: usize) -> f64 {
    if len == 0 || k >= len {
        return 0.0;
    }
    (PI * k as f64 / len as f64).sin()
}

/// Gain envelope value at sample `i` of a linear ramp from `from` to `to`
/// over `len` samples (inclusive end points).
#[inline]
#[must_use]
pub fn ramp_at(from: f32, to: f32, i: usize, len: usize) -> f32 {
    if len <= 1 {
        return to;
    }
    from + (to - from) * (i as f32 / (len - 1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_phase_stays_in_range() {
        let mut phase = Phase::new();
        let step = angular_step(57.3, 48_000.0);
        for len in [1usize, 17, 256, 2048, 4096, 3] {
            for _ in 0..1000 {
                phase.advance(step, len);
                assert!((0.0..TAU).contains(&phase.value()));
            }
        }
    }

    #[test]
    fn test_phase_continuity_across_buffers() -> TestResult {
        let step = angular_step(42.0, 48_000.0);
        let mut phase = Phase::at(1.0);
        let first_len = 300;
        let last_of_first = phase.offset(step, first_len - 1).sin();
        let extrapolated = phase.offset(step, first_len).sin();
        phase.advance(step, first_len);
        let first_of_second = phase.offset(step, 0).sin();
        assert!((first_of_second - extrapolated).abs() < 1e-9);
        // Adjacent samples differ by at most one step's worth of slope.
        assert!((first_of_second - last_of_first).abs() <= step + 1e-9);
        Ok(())
    }

    #[test]
    fn test_advance_reports_cycles() {
        let mut phase = Phase::new();
        assert_eq!(phase.advance(TAU / 4.0, 4), 1);
        assert!(phase.value() < 1e-9 || (TAU - phase.value()) < 1e-9);
        let mut phase = Phase::new();
        assert_eq!(phase.advance(TAU / 4.0, 3), 0);
    }

    #[test]
    fn test_wrap_handles_negative_and_nan() {
        assert!((wrap_phase(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!(wrap_phase(f64::NAN).abs() < f64::EPSILON);
        assert!(wrap_phase(f64::INFINITY).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stereo_gains_table() {
        let (r, f) = stereo_gains(0.0);
        assert!((r - 1.0).abs() < f32::EPSILON && f.abs() < f32::EPSILON);
        let (r, f) = stereo_gains(0.5);
        assert!((r - 1.0).abs() < f32::EPSILON && (f - 1.0).abs() < f32::EPSILON);
        let (r, f) = stereo_gains(1.0);
        assert!(r.abs() < f32::EPSILON && (f - 1.0).abs() < f32::EPSILON);
        let (r, f) = stereo_gains(0.25);
        assert!((r - 1.0).abs() < f32::EPSILON && (f - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_soft_limit_passes_below_knee() {
        assert!((soft_limit(0.5) - 0.5).abs() < f32::EPSILON);
        assert!((soft_limit(-0.85) + 0.85).abs() < f32::EPSILON);
        assert!((soft_limit(2.0) - 2.0f32.tanh()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_finish_sample_clamps_and_scrubs() {
        assert!((finish_sample(50.0, 1.0) - OUTPUT_CEILING).abs() < f32::EPSILON);
        assert!((finish_sample(-50.0, 1.0) + OUTPUT_CEILING).abs() < f32::EPSILON);
        assert!(finish_sample(f32::NAN, 1.0).abs() < f32::EPSILON);
        assert!(finish_sample(0.5, 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_speed_ramp_shape() {
        assert!(speed_ramp(2.9).abs() < f32::EPSILON);
        assert!(speed_ramp(3.0).abs() < f32::EPSILON);
        assert!((speed_ramp(200.0) - 1.0).abs() < 1e-6);
        assert!((speed_ramp(-200.0) - 1.0).abs() < 1e-6);
        // Saturates at ~281.6 km/h.
        assert!((speed_ramp(300.0) - ROAD_RAMP_MAX).abs() < f32::EPSILON);
        assert!((speed_ramp(400.0) - ROAD_RAMP_MAX).abs() < f32::EPSILON);
        assert!(speed_ramp(250.0) < ROAD_RAMP_MAX);
    }

    #[test]
    fn test_engine_waves_bounded() {
        for profile in [EngineProfile::Sine, EngineProfile::Boxer, EngineProfile::V8] {
            for i in 0..2000 {
                let x = i as f64 * 0.0131;
                let w = engine_wave(profile, x, 1.0);
                assert!(w.is_finite());
                assert!(w.abs() <= 1.6, "{profile:?} at {x}: {w}");
            }
        }
    }

    #[test]
    fn test_square_mix_endpoints() {
        assert!((square_mix(0.3, 0.0) - 0.3).abs() < 1e-12);
        assert!((square_mix(0.3, 1.0) - 1.0).abs() < 1e-12);
        assert!((square_mix(-0.3, 1.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ramp_endpoints() {
        assert!(ramp_at(0.0, 1.0, 0, 10).abs() < f32::EPSILON);
        assert!((ramp_at(0.0, 1.0, 9, 10) - 1.0).abs() < f32::EPSILON);
        assert!((ramp_at(0.3, 1.0, 0, 1) - 1.0).abs() < f32::EPSILON);
    }
}
