//! Simulated road surface.
//!
//! Two layers:
//!
//! - **texture**: a continuous oscillator at `texture_freq + 0.3 × speed(m/s)`,
//!   phase-modulated by a 10 Hz jitter oscillator and saturated with `tanh`.
//!   Identical on both channels.
//! - **bumps**: stochastic [`BumpEvent`]s, each a 22 Hz half-sine-windowed
//!   burst that hits the leading axle immediately and the trailing axle one
//!   wheelbase later.
//!
//! Time is stream time (samples rendered / sample rate), so output depends
//! only on the inputs and the RNG seed.

use crate::oscillator::{Phase, ROAD_MIN_SPEED_KMH, angular_step, half_sine_window, speed_ramp};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

/// Distance between axles (m).
pub const WHEELBASE_M: f32 = 2.75;
/// Bump burst frequency (Hz).
pub const BUMP_FREQ_HZ: f32 = 22.0;
/// Bump burst length per axle (s).
pub const BUMP_DURATION_S: f32 = 0.15;
/// Minimum spacing between spawned bumps (s).
pub const BUMP_MIN_SPACING_S: f64 = 0.1;
/// Jitter oscillator frequency (Hz).
pub const JITTER_FREQ_HZ: f32 = 10.0;
/// Texture frequency gained per m/s of speed.
pub const TEXTURE_SPEED_COEFF: f32 = 0.3;
/// Peak phase deviation from the jitter oscillator (rad).
pub const JITTER_DEPTH: f64 = 0.6;
/// Drive into the texture saturator.
pub const TEXTURE_DRIVE: f64 = 1.5;
/// Live bumps kept at most; more are not spawned.
pub const MAX_BUMPS: usize = 16;
/// Trailing legs further out than this are dropped at spawn (s).
pub const MAX_AXLE_DELAY_S: f64 = 2.0;

const SPAWN_ROUGHNESS_COEFF: f32 = 0.15;
const SPAWN_SPEED_COEFF: f32 = 0.05;

/// One bump travelling under the car.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BumpEvent {
    /// Peak amplitude.
    pub intensity: f32,
    /// Samples left on the leading axle.
    pub lead_remaining: usize,
    /// Samples left on the trailing axle.
    pub trail_remaining: usize,
    /// Stream time at which the trailing axle reaches the bump (s).
    pub trail_at: f64,
    /// Trailing leg has started (or was dropped as unreachable).
    pub trail_active: bool,
    duration: usize,
}

impl BumpEvent {
    /// Whether both legs have finished.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.lead_remaining == 0 && self.trail_active && self.trail_remaining == 0
    }
}

/// Per-buffer road inputs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoadParams {
    /// Car speed (km/h).
    pub speed_kmh: f32,
    /// Surface roughness in `[0, 1]`.
    pub roughness: f32,
    /// Texture layer volume.
    pub texture_volume: f32,
    /// Bump layer volume.
    pub effects_volume: f32,
    /// Texture base frequency (Hz).
    pub texture_freq: f32,
    /// Travelling backwards: rear axle leads.
    pub reversed: bool,
}

/// Road texture and bump generator with persistent phase and event queue.
#[derive(Debug, Clone)]
pub struct RoadTextureSynthesizer {
    sample_rate: f32,
    texture: Phase,
    jitter: Phase,
    events: Vec<BumpEvent>,
    clock_s: f64,
    last_spawn_s: f64,
    rng: SmallRng,
}

impl RoadTextureSynthesizer {
    /// Create a synthesizer seeded from the OS.
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self::with_rng(sample_rate, SmallRng::from_os_rng())
    }

    /// Create a deterministic synthesizer.
    #[must_use]
    pub fn with_seed(sample_rate: f32, seed: u64) -> Self {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: f32, rng: SmallRng) -> Self {
        Self {
            sample_rate,
            texture: Phase::new(),
            jitter: Phase::new(),
            events: Vec::with_capacity(MAX_BUMPS),
            clock_s: 0.0,
            last_spawn_s: f64::NEG_INFINITY,
            rng,
        }
    }

    /// Live bump events.
    #[must_use]
    pub fn events(&self) -> &[BumpEvent] {
        &self.events
    }

    /// Texture and jitter phases.
    #[must_use]
    pub fn phases(&self) -> (Phase, Phase) {
        (self.texture, self.jitter)
    }

    /// Stream time rendered so far (s).
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock_s
    }

    /// Drop every live bump. Called while the layer is switched off, since
    /// `generate` is then not driven.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Render one buffer into `front` and `rear` (overwritten).
    ///
    /// Buffers shorter than the other are treated as the common length.
    pub fn generate(&mut self, params: &RoadParams, front: &mut [f32], rear: &mut [f32]) {
        let len = front.len().min(rear.len());
        front.fill(0.0);
        rear.fill(0.0);
        let buffer_s = if self.sample_rate > 0.0 {
            len as f64 / f64::from(self.sample_rate)
        } else {
            0.0
        };

        let speed = params.speed_kmh.abs();
        if !speed.is_finite() || speed < ROAD_MIN_SPEED_KMH || self.sample_rate <= 0.0 {
            self.events.clear();
            self.clock_s += buffer_s;
            return;
        }

        let ramp = speed_ramp(speed);
        let speed_ms = speed / 3.6;

        if params.texture_volume > 0.0 {
            self.render_texture(params, speed_ms, ramp, front, rear, len);
        }

        let (lead, trail) = if params.reversed {
            (rear, front)
        } else {
            (front, rear)
        };
        if params.effects_volume > 0.0 && params.roughness > 0.0 {
            self.maybe_spawn(params.roughness, speed_ms);
            let gain = params.effects_volume * ramp;
            self.render_bumps(gain, lead, trail, len);
            self.events.retain(|e| !e.is_expired());
        } else {
            // Silent bumps must not resume later with a stale trailing leg.
            self.events.clear();
        }
        self.clock_s += buffer_s;
    }

    fn render_texture(
        &mut self,
        params: &RoadParams,
        speed_ms: f32,
        ramp: f32,
        front: &mut [f32],
        rear: &mut [f32],
        len: usize,
    ) {
        let step = angular_step(
            params.texture_freq + TEXTURE_SPEED_COEFF * speed_ms,
            self.sample_rate,
        );
        let jitter_step = angular_step(JITTER_FREQ_HZ, self.sample_rate);
        let amp = params.texture_volume * ramp;

        for (i, (f, r)) in front.iter_mut().zip(rear.iter_mut()).enumerate() {
            let jitter = JITTER_DEPTH * self.jitter.offset(jitter_step, i).sin();
            let x = self.texture.offset(step, i) + jitter;
            let s = (x.sin() * TEXTURE_DRIVE).tanh() as f32 * amp;
            *f = s;
            *r = s;
        }
        self.texture.advance(step, len);
        self.jitter.advance(jitter_step, len);
    }

    fn maybe_spawn(&mut self, roughness: f32, speed_ms: f32) {
        if self.events.len() >= MAX_BUMPS
            || self.clock_s - self.last_spawn_s < BUMP_MIN_SPACING_S
        {
            return;
        }
        let chance = roughness * SPAWN_ROUGHNESS_COEFF * speed_ms * SPAWN_SPEED_COEFF;
        if self.rng.random::<f32>() >= chance {
            return;
        }

        let intensity = self.rng.random_range(0.5f32..=1.0) * roughness;
        let duration = (BUMP_DURATION_S * self.sample_rate) as usize;
        let delay = f64::from(WHEELBASE_M / speed_ms);
        let reachable = delay.is_finite() && delay <= MAX_AXLE_DELAY_S;
        self.events.push(BumpEvent {
            intensity,
            lead_remaining: duration,
            trail_remaining: if reachable { duration } else { 0 },
            trail_at: self.clock_s + delay,
            trail_active: !reachable,
            duration,
        });
        self.last_spawn_s = self.clock_s;
    }

    fn render_bumps(&mut self, gain: f32, lead: &mut [f32], trail: &mut [f32], len: usize) {
        let sample_rate = f64::from(self.sample_rate);
        let step = TAU * f64::from(BUMP_FREQ_HZ) / sample_rate;
        let buffer_end = self.clock_s + len as f64 / sample_rate;

        for event in &mut self.events {
            let amp = f64::from(event.intensity * gain);

            if event.lead_remaining > 0 {
                let played = event.duration - event.lead_remaining;
                let n = event.lead_remaining.min(len);
                let out = lead.get_mut(..n).unwrap_or_default();
                add_burst(out, played, event.duration, step, amp);
                event.lead_remaining -= n;
            }

            if !event.trail_active && event.trail_at < buffer_end {
                event.trail_active = true;
                let offset = ((event.trail_at - self.clock_s) * sample_rate).max(0.0) as usize;
                let n = event.trail_remaining.min(len.saturating_sub(offset));
                let out = trail.get_mut(offset..offset + n).unwrap_or_default();
                add_burst(out, 0, event.duration, step, amp);
                event.trail_remaining -= n;
            } else if event.trail_active && event.trail_remaining > 0 {
                let played = event.duration - event.trail_remaining;
                let n = event.trail_remaining.min(len);
                let out = trail.get_mut(..n).unwrap_or_default();
                add_burst(out, played, event.duration, step, amp);
                event.trail_remaining -= n;
            }
        }
    }
}

/// Add `out.len()` samples of a windowed burst starting at sample `played`.
fn add_burst(out: &mut [f32], played: usize, duration: usize, step: f64, amp: f64) {
    for (i, s) in out.iter_mut().enumerate() {
        let k = played + i;
        *s += ((k as f64 * step).sin() * half_sine_window(k, duration) * amp) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const SR: f32 = 48_000.0;

    fn params(speed_kmh: f32) -> RoadParams {
        RoadParams {
            speed_kmh,
            roughness: 1.0,
            texture_volume: 0.5,
            effects_volume: 1.0,
            texture_freq: 30.0,
            reversed: false,
        }
    }

    #[test]
    fn test_below_min_speed_is_silent() {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 1);
        let mut front = vec![1.0f32; 512];
        let mut rear = vec![1.0f32; 512];
        for _ in 0..100 {
            synth.generate(&params(2.9), &mut front, &mut rear);
            assert!(front.iter().chain(rear.iter()).all(|s| s.abs() < f32::EPSILON));
        }
        assert!(synth.events().is_empty());
    }

    #[test]
    fn test_texture_identical_on_both_channels() {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 2);
        let p = RoadParams {
            effects_volume: 0.0,
            ..params(120.0)
        };
        let mut front = vec![0.0f32; 1024];
        let mut rear = vec![0.0f32; 1024];
        synth.generate(&p, &mut front, &mut rear);
        assert_eq!(front, rear);
        assert!(front.iter().any(|s| s.abs() > 1e-3));
    }

    #[test]
    fn test_bump_reaches_trailing_axle_later() -> TestResult {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 3);
        let p = RoadParams {
            texture_volume: 0.0,
            ..params(200.0)
        };
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        let mut first_front = None;
        let mut first_rear = None;
        for buffer in 0..2000 {
            synth.generate(&p, &mut front, &mut rear);
            if first_front.is_none() && front.iter().any(|s| s.abs() > 1e-6) {
                first_front = Some(buffer);
            }
            if first_rear.is_none() && rear.iter().any(|s| s.abs() > 1e-6) {
                first_rear = Some(buffer);
            }
            if first_rear.is_some() {
                break;
            }
        }
        let lead = first_front.ok_or("no bump spawned")?;
        let trail = first_rear.ok_or("trailing leg never fired")?;
        assert!(trail >= lead, "trail {trail} before lead {lead}");
        Ok(())
    }

    #[test]
    fn test_reverse_swaps_leading_axle() -> TestResult {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 4);
        let p = RoadParams {
            texture_volume: 0.0,
            reversed: true,
            ..params(60.0)
        };
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        for _ in 0..5000 {
            synth.generate(&p, &mut front, &mut rear);
            let rear_hit = rear.iter().any(|s| s.abs() > 1e-6);
            let front_hit = front.iter().any(|s| s.abs() > 1e-6);
            if rear_hit || front_hit {
                assert!(rear_hit, "rear axle must lead in reverse");
                return Ok(());
            }
        }
        Err("no bump spawned".into())
    }

    #[test]
    fn test_events_bounded_and_pruned() {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 5);
        let p = params(250.0);
        let mut front = vec![0.0f32; 128];
        let mut rear = vec![0.0f32; 128];
        for _ in 0..20_000 {
            synth.generate(&p, &mut front, &mut rear);
            assert!(synth.events().len() <= MAX_BUMPS);
            assert!(synth.events().iter().all(|e| !e.is_expired()));
        }
    }

    #[test]
    fn test_stopping_clears_events() {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 6);
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        for _ in 0..2000 {
            synth.generate(&params(150.0), &mut front, &mut rear);
        }
        synth.generate(&params(0.0), &mut front, &mut rear);
        assert!(synth.events().is_empty());
    }

    /// Drive `synth` until a bump is live, returning how many buffers it took.
    fn spawn_bump(synth: &mut RoadTextureSynthesizer, p: &RoadParams) -> Option<usize> {
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        (0..5000).find(|_| {
            synth.generate(p, &mut front, &mut rear);
            !synth.events().is_empty()
        })
    }

    #[test]
    fn test_muted_bump_layer_drops_events() -> TestResult {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 8);
        let p = RoadParams {
            texture_volume: 0.0,
            ..params(200.0)
        };
        spawn_bump(&mut synth, &p).ok_or("no bump spawned")?;

        let muted = RoadParams {
            effects_volume: 0.0,
            ..p
        };
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        for _ in 0..1000 {
            synth.generate(&muted, &mut front, &mut rear);
            assert!(synth.events().is_empty());
        }

        // Back on with no new bumps possible: nothing left over to replay.
        let resumed = RoadParams {
            roughness: 1e-9,
            ..p
        };
        synth.generate(&resumed, &mut front, &mut rear);
        assert!(front.iter().chain(rear.iter()).all(|s| s.abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_zero_roughness_drops_events() -> TestResult {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 9);
        let p = RoadParams {
            texture_volume: 0.0,
            ..params(200.0)
        };
        spawn_bump(&mut synth, &p).ok_or("no bump spawned")?;
        let mut front = vec![0.0f32; 256];
        let mut rear = vec![0.0f32; 256];
        synth.generate(&RoadParams { roughness: 0.0, ..p }, &mut front, &mut rear);
        assert!(synth.events().is_empty());
        Ok(())
    }

    #[test]
    fn test_clear_events() -> TestResult {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 10);
        spawn_bump(&mut synth, &params(200.0)).ok_or("no bump spawned")?;
        synth.clear_events();
        assert!(synth.events().is_empty());
        Ok(())
    }

    #[test]
    fn test_clock_advances_with_buffers() {
        let mut synth = RoadTextureSynthesizer::with_seed(SR, 7);
        let mut front = vec![0.0f32; 480];
        let mut rear = vec![0.0f32; 480];
        for _ in 0..100 {
            synth.generate(&params(0.0), &mut front, &mut rear);
        }
        assert!((synth.clock() - 1.0).abs() < 1e-9);
    }
}
