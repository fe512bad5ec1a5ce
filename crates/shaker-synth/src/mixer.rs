//! Layered haptic mixer.
//!
//! Stages run in priority order once per buffer; earlier stages may duck
//! later ones:
//!
//! 1. gain envelope (linear ramp toward 0 when muted or without telemetry)
//! 2. traction ducking factor (smoothed)
//! 3. obstacle-impact bursts from surge/sway spikes (never ducked)
//! 4. suspension road rumble and impacts (ducked by traction only); produces
//!    the suspension ducking factor
//! 5. simulated road texture and bumps (ducked by traction × suspension)
//! 6. engine (ducked by traction × suspension, dimmed by suspension impacts)
//! 7. gear-shift thump (traction ducking floored at 0.5)
//! 8. traction/ABS tones (never ducked)
//! 9. per-layer balance, applied inside each stage
//! 10. optional mono downmix
//! 11. soft limiter
//! 12. envelope gain and hard clip to ±0.98
//!
//! # RT Safety
//!
//! - No allocation unless a buffer longer than any seen before arrives
//! - No locks, no I/O
//! - O(n) in the buffer length

use crate::metrics::LiveMetrics;
use crate::oscillator::{
    Phase, angular_step, engine_wave, finish_sample, ramp_at, square_mix, stereo_gains,
};
use crate::road::{RoadParams, RoadTextureSynthesizer};
use crate::tire_slip::SlipTriggers;
use shaker_config::{ShakerConfig, ShakerMode};
use shaker_telemetry_gt7::TelemetryFrame;
use std::f64::consts::TAU;

/// Smoothing weight kept from the previous ducking value.
pub const DUCK_SMOOTHING: f32 = 0.85;
/// Lowest traction ducking factor.
pub const TRACTION_DUCK_FLOOR: f32 = 0.2;
/// Trigger level above which traction ducking engages.
pub const TRACTION_DUCK_THRESHOLD: f32 = 0.01;
/// Lowest suspension ducking factor.
pub const SUSPENSION_DUCK_FLOOR: f32 = 0.1;
/// Traction ducking never pushes the gear thump below this.
pub const GEAR_DUCK_FLOOR: f32 = 0.5;

/// Gear thump frequency (Hz).
pub const GEAR_THUMP_HZ: f32 = 32.0;
/// Gear thump level on a shift.
pub const GEAR_THUMP_KICK: f32 = 2.5;
/// Gear thump decay per buffer.
pub const GEAR_THUMP_DECAY: f32 = 0.15;

/// Suspension road-rumble frequency (Hz).
pub const SUSPENSION_ROAD_HZ: f32 = 30.0;
/// Suspension impact frequency (Hz).
pub const SUSPENSION_IMPACT_HZ: f32 = 52.0;
/// Suspension layer is silent at or below this speed (km/h).
pub const SUSPENSION_MIN_SPEED_KMH: f32 = 4.0;
/// Summed impact below this is treated as noise.
pub const IMPACT_NOISE_FLOOR: f32 = 0.05;

/// Traction tone gain.
pub const TRACTION_GAIN: f32 = 2.5;
/// Traction tone is silent at or below this trigger.
pub const TRACTION_ACTIVE: f32 = 0.001;
/// Square-wave share of the traction tone under braking.
pub const BRAKE_SQUARE_MIX: f64 = 0.6;

/// Mono downmix gain.
pub const MONO_DOWNMIX: f32 = 0.75;

const ENGINE_MIN_RPM: f32 = 10.0;
const ENGINE_FALLBACK_REDLINE: f32 = 8000.0;
const ENGINE_MIN_REDLINE: u16 = 500;
const ENGINE_IDLE_BLEND_KMH: f32 = 5.0;
const ENGINE_RPM_SMOOTHING: f32 = 0.2;
const ENGINE_DIM_THRESHOLD: f32 = 0.1;
const ENGINE_DIM_FLOOR: f32 = 0.3;
const ENGINE_DIM_MAX_G: f32 = 0.7;

const SUSPENSION_ROAD_SCALE: f32 = 0.012;
const SUSPENSION_IMPACT_SCALE: f32 = 0.040 / 40.0;
const SUSPENSION_ROAD_GAIN: f32 = 400.0;
const SUSPENSION_ROAD_EXPONENT: f32 = 1.2;
const SUSPENSION_IMPACT_GAIN: f32 = 180.0;
const BODY_IMPACT_THRESHOLD: f32 = 0.05;
const BODY_IMPACT_GAIN: f32 = 15.0;
const ROAD_NOISE_CAP: f32 = 2.0;
const G_FORCE_CAP: f32 = 4.0;

const IMPACT_LATERAL_SHARE: f32 = 0.5;
const IMPACT_MAX_LEVEL: f32 = 2.0;
const IMPACT_SILENT: f32 = 1e-4;

const ROAD_SATURATION_DRIVE: f32 = 2.0;

const REAR: usize = 0;
const FRONT: usize = 1;

/// Everything the mixer carries from one buffer to the next.
///
/// Mutated once per buffer by the single owner; never shared.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MixerState {
    /// Engine oscillator.
    pub engine: Phase,
    /// Whole engine cycles modulo 4, for the sub-harmonic terms.
    pub engine_cycle: u8,
    /// Suspension rumble oscillator.
    pub suspension_road: Phase,
    /// Suspension impact oscillator.
    pub suspension_impact: Phase,
    /// Gear thump oscillator.
    pub gear_thump: Phase,
    /// Front traction oscillator.
    pub traction_front: Phase,
    /// Rear traction oscillator.
    pub traction_rear: Phase,
    /// Obstacle-impact oscillators, `[rear, front]`.
    pub impact: [Phase; 2],
    /// Obstacle-impact envelopes, `[rear, front]`.
    pub impact_level: [f32; 2],
    /// Obstacle-impact drive seen last buffer, `[rear, front]`.
    pub impact_drive: [f32; 2],
    /// Smoothed traction ducking factor.
    pub traction_duck: f32,
    /// Smoothed suspension ducking factor.
    pub suspension_duck: f32,
    /// Suspension heights last buffer.
    pub last_suspension: Option<[f32; 4]>,
    /// Suspension height deltas last buffer.
    pub last_suspension_velocity: [f32; 4],
    /// Vertical body velocity last buffer.
    pub last_body_velocity: f32,
    /// Gain reached at the end of the last buffer.
    pub gain: f32,
    /// Gear seen last buffer.
    pub last_gear: Option<u8>,
    /// Smoothed engine RPM.
    pub smooth_rpm: f32,
    /// Remaining gear thump level.
    pub gear_kick: f32,
}

impl Default for MixerState {
    fn default() -> Self {
        Self {
            engine: Phase::new(),
            engine_cycle: 0,
            suspension_road: Phase::new(),
            suspension_impact: Phase::new(),
            gear_thump: Phase::new(),
            traction_front: Phase::new(),
            traction_rear: Phase::new(),
            impact: [Phase::new(); 2],
            impact_level: [0.0; 2],
            impact_drive: [0.0; 2],
            traction_duck: 1.0,
            suspension_duck: 1.0,
            last_suspension: None,
            last_suspension_velocity: [0.0; 4],
            last_body_velocity: 0.0,
            gain: 0.0,
            last_gear: None,
            smooth_rpm: 1000.0,
            gear_kick: 0.0,
        }
    }
}

/// Per-buffer mixer inputs.
#[derive(Copy, Clone, Debug)]
pub struct MixInput<'a> {
    /// Current telemetry, if any.
    pub frame: Option<&'a TelemetryFrame>,
    /// Configuration snapshot.
    pub config: &'a ShakerConfig,
    /// Mute decision for this buffer.
    pub muted: bool,
    /// Slip estimator output.
    pub triggers: SlipTriggers,
    /// Driver is braking.
    pub braking: bool,
}

impl<'a> MixInput<'a> {
    /// Input with no telemetry.
    #[must_use]
    pub fn idle(config: &'a ShakerConfig) -> Self {
        Self {
            frame: None,
            config,
            muted: true,
            triggers: SlipTriggers::default(),
            braking: false,
        }
    }
}

/// Two-channel haptic mixer. Channel 0 drives the rear shaker, channel 1
/// the front.
#[derive(Debug, Clone)]
pub struct HapticMixer {
    sample_rate: f32,
    state: MixerState,
    road: RoadTextureSynthesizer,
    road_front: Vec<f32>,
    road_rear: Vec<f32>,
}

impl HapticMixer {
    /// Create a mixer for `sample_rate`.
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self::with_road(sample_rate, RoadTextureSynthesizer::new(sample_rate))
    }

    /// Create a mixer with a deterministic road generator.
    #[must_use]
    pub fn with_seed(sample_rate: f32, seed: u64) -> Self {
        let road = RoadTextureSynthesizer::with_seed(sample_rate, seed);
        Self::with_road(sample_rate, road)
    }

    fn with_road(sample_rate: f32, road: RoadTextureSynthesizer) -> Self {
        Self {
            sample_rate,
            state: MixerState::default(),
            road,
            road_front: Vec::new(),
            road_rear: Vec::new(),
        }
    }

    /// Pre-size scratch buffers so `process` never allocates for buffers up
    /// to `frames` long.
    pub fn reserve(&mut self, frames: usize) {
        if self.road_front.len() < frames {
            self.road_front.resize(frames, 0.0);
            self.road_rear.resize(frames, 0.0);
        }
    }

    /// Sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Carried state.
    #[must_use]
    pub const fn state(&self) -> &MixerState {
        &self.state
    }

    /// Road generator.
    #[must_use]
    pub const fn road(&self) -> &RoadTextureSynthesizer {
        &self.road
    }

    /// Render one buffer into `rear` and `front` (overwritten).
    ///
    /// Both slices are treated as the shorter one's length.
    pub fn process(
        &mut self,
        input: &MixInput<'_>,
        rear: &mut [f32],
        front: &mut [f32],
        metrics: &mut LiveMetrics,
    ) {
        let len = rear.len().min(front.len());
        rear.fill(0.0);
        front.fill(0.0);
        let rear = rear.get_mut(..len).unwrap_or_default();
        let front = front.get_mut(..len).unwrap_or_default();

        let target_gain = if input.muted || input.frame.is_none() {
            0.0
        } else {
            1.0
        };
        let start_gain = self.state.gain;
        self.state.gain = target_gain;

        *metrics = LiveMetrics {
            traction_front: input.triggers.front(),
            traction_rear: input.triggers.rear(),
            ..LiveMetrics::default()
        };

        let Some(frame) = input.frame else {
            return;
        };
        let config = input.config;
        let safe_gain = config.safe_gain();

        self.update_traction_duck(config, &input.triggers);
        self.render_impact(frame, config, safe_gain, rear, front);
        self.render_suspension(frame, config, safe_gain, rear, front, metrics);
        self.render_road(frame, config, safe_gain, rear, front, metrics);

        let gear_changed = self.state.last_gear != Some(frame.gear);
        let g_force = metrics.g_force;
        self.render_engine(frame, config, safe_gain, gear_changed, g_force, rear, front);
        if config.gear_shift.enabled && gear_changed && self.state.last_gear.is_some() {
            self.state.gear_kick = GEAR_THUMP_KICK;
        }
        self.render_gear_thump(config, safe_gain, rear, front);
        self.render_traction(config, safe_gain, &input.triggers, input.braking, rear, front);
        self.state.last_gear = Some(frame.gear);

        if config.shaker_mode == ShakerMode::Single {
            for (r, f) in rear.iter_mut().zip(front.iter_mut()) {
                let mono = (*r + *f) * MONO_DOWNMIX;
                *r = mono;
                *f = mono;
            }
        }

        for (i, (r, f)) in rear.iter_mut().zip(front.iter_mut()).enumerate() {
            let gain = ramp_at(start_gain, target_gain, i, len);
            *r = finish_sample(*r, gain);
            *f = finish_sample(*f, gain);
        }
    }

    fn update_traction_duck(&mut self, config: &ShakerConfig, triggers: &SlipTriggers) {
        let peak = triggers.max();
        let target = if config.traction.priority && peak > TRACTION_DUCK_THRESHOLD {
            (1.0 - (1.0 - TRACTION_DUCK_FLOOR) * peak.min(1.0)).max(TRACTION_DUCK_FLOOR)
        } else {
            1.0
        };
        self.state.traction_duck = smooth(self.state.traction_duck, target);
    }

    fn render_impact(
        &mut self,
        frame: &TelemetryFrame,
        config: &ShakerConfig,
        safe_gain: f32,
        rear: &mut [f32],
        front: &mut [f32],
    ) {
        let cfg = &config.impact;
        if !cfg.enabled {
            self.state.impact_level = [0.0; 2];
            self.state.impact_drive = [0.0; 2];
            return;
        }

        let lateral = frame.sway_g.abs() * IMPACT_LATERAL_SHARE;
        let drive = [
            frame.surge_g.max(0.0) + lateral,
            (-frame.surge_g).max(0.0) + lateral,
        ];
        for ch in [REAR, FRONT] {
            let (Some(&now), Some(prev), Some(level)) = (
                drive.get(ch),
                self.state.impact_drive.get_mut(ch),
                self.state.impact_level.get_mut(ch),
            ) else {
                continue;
            };
            if now.is_finite() && now > cfg.threshold_g && *prev <= cfg.threshold_g {
                *level = level.max((now / cfg.threshold_g).min(IMPACT_MAX_LEVEL));
            }
            *prev = if now.is_finite() { now } else { 0.0 };
        }

        let step = angular_step(cfg.frequency, self.sample_rate);
        let tau_samples = cfg.decay_ms * 0.001 * self.sample_rate;
        let decay = if tau_samples > 0.0 {
            (-1.0 / tau_samples).exp()
        } else {
            0.0
        };
        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let amp = cfg.volume * safe_gain;

        for (ch, out, gain) in [(REAR, &mut *rear, g_rear), (FRONT, &mut *front, g_front)] {
            let (Some(phase), Some(level)) = (
                self.state.impact.get_mut(ch),
                self.state.impact_level.get_mut(ch),
            ) else {
                continue;
            };
            if *level <= IMPACT_SILENT {
                *level = 0.0;
                continue;
            }
            let mut env = *level;
            for (i, s) in out.iter_mut().enumerate() {
                *s += phase.offset(step, i).sin() as f32 * env * amp * gain;
                env *= decay;
            }
            *level = env;
            phase.advance(step, out.len());
        }
    }

    fn render_suspension(
        &mut self,
        frame: &TelemetryFrame,
        config: &ShakerConfig,
        safe_gain: f32,
        rear: &mut [f32],
        front: &mut [f32],
        metrics: &mut LiveMetrics,
    ) {
        let cfg = &config.suspension;
        let current = frame.suspension;
        let previous = self.state.last_suspension.unwrap_or(current);
        self.state.last_suspension = Some(current);
        let body_velocity = frame.vertical_velocity();
        let body_delta = (body_velocity - self.state.last_body_velocity).abs();
        self.state.last_body_velocity = body_velocity;

        let road_threshold = cfg.threshold * SUSPENSION_ROAD_SCALE;
        let impact_threshold = cfg.impact_threshold * SUSPENSION_IMPACT_SCALE;
        let mut road = [0.0f32; 2];
        let mut impact = [0.0f32; 2];
        for (wheel, ((curr, prev), last_v)) in current
            .iter()
            .zip(previous)
            .zip(self.state.last_suspension_velocity.iter_mut())
            .enumerate()
        {
            let v = curr - prev;
            let a = (v - *last_v).abs();
            *last_v = v;
            let r = ((a - road_threshold).max(0.0) * SUSPENSION_ROAD_GAIN)
                .powf(SUSPENSION_ROAD_EXPONENT);
            let k = (a - impact_threshold).max(0.0) * SUSPENSION_IMPACT_GAIN;
            let axle = if wheel < 2 { FRONT } else { REAR };
            if let (Some(road_acc), Some(impact_acc)) = (road.get_mut(axle), impact.get_mut(axle))
            {
                *road_acc += if r.is_finite() { r } else { 0.0 };
                *impact_acc = impact_acc.max(if k.is_finite() { k } else { 0.0 });
            }
        }

        let active = cfg.enabled && frame.speed_kmh > SUSPENSION_MIN_SPEED_KMH;
        if !active {
            self.state.suspension_duck = smooth(self.state.suspension_duck, 1.0);
            return;
        }

        if body_delta > BODY_IMPACT_THRESHOLD && body_delta.is_finite() {
            let body = body_delta * BODY_IMPACT_GAIN;
            impact[REAR] += body;
            impact[FRONT] += body;
        }
        if impact[REAR] + impact[FRONT] < IMPACT_NOISE_FLOOR {
            impact = [0.0; 2];
        }

        metrics.road_noise = (road[REAR] + road[FRONT]).min(ROAD_NOISE_CAP);
        metrics.g_force = (impact[REAR] + impact[FRONT]).min(G_FORCE_CAP);

        let duck_target = if cfg.priority {
            (1.0 - impact[REAR].max(impact[FRONT]) * 0.25).max(SUSPENSION_DUCK_FLOOR)
        } else {
            1.0
        };
        self.state.suspension_duck = smooth(self.state.suspension_duck, duck_target);

        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let duck = self.state.traction_duck;
        let road_step = angular_step(SUSPENSION_ROAD_HZ, self.sample_rate);
        let impact_step = angular_step(SUSPENSION_IMPACT_HZ, self.sample_rate);
        let rear_level = [
            road[REAR] * cfg.road_volume,
            impact[REAR] * cfg.impact_volume,
        ];
        let front_level = [
            road[FRONT] * cfg.road_volume,
            impact[FRONT] * cfg.impact_volume,
        ];

        for (i, (r, f)) in rear.iter_mut().zip(front.iter_mut()).enumerate() {
            let rumble = self.state.suspension_road.offset(road_step, i).sin() as f32 * safe_gain;
            let thump = self.state.suspension_impact.offset(impact_step, i).sin().abs() as f32
                * safe_gain;
            *r += (rumble * rear_level[0] + thump * rear_level[1]) * g_rear * duck;
            *f += (rumble * front_level[0] + thump * front_level[1]) * g_front * duck;
        }
        self.state.suspension_road.advance(road_step, rear.len());
        self.state.suspension_impact.advance(impact_step, rear.len());
    }

    fn render_road(
        &mut self,
        frame: &TelemetryFrame,
        config: &ShakerConfig,
        safe_gain: f32,
        rear: &mut [f32],
        front: &mut [f32],
        metrics: &mut LiveMetrics,
    ) {
        let cfg = &config.sim_road;
        if !cfg.enabled {
            self.road.clear_events();
            return;
        }
        let len = rear.len();
        self.reserve(len);
        let (Some(road_front), Some(road_rear)) =
            (self.road_front.get_mut(..len), self.road_rear.get_mut(..len))
        else {
            return;
        };

        let params = RoadParams {
            speed_kmh: frame.speed_kmh,
            roughness: cfg.roughness,
            texture_volume: cfg.texture_volume,
            effects_volume: cfg.volume,
            texture_freq: cfg.texture_freq,
            reversed: frame.gear == 0,
        };
        self.road.generate(&params, road_front, road_rear);

        let peak_front = road_front.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let peak_rear = road_rear.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        metrics.sim_road = peak_front + peak_rear;

        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let duck = self.state.traction_duck * self.state.suspension_duck;
        for ((r, f), (rr, rf)) in rear
            .iter_mut()
            .zip(front.iter_mut())
            .zip(road_rear.iter().zip(road_front.iter()))
        {
            *r += (rr * ROAD_SATURATION_DRIVE).tanh() * safe_gain * duck * g_rear;
            *f += (rf * ROAD_SATURATION_DRIVE).tanh() * safe_gain * duck * g_front;
        }
    }

    #[expect(clippy::too_many_arguments, reason = "single call site")]
    fn render_engine(
        &mut self,
        frame: &TelemetryFrame,
        config: &ShakerConfig,
        safe_gain: f32,
        gear_changed: bool,
        g_force: f32,
        rear: &mut [f32],
        front: &mut [f32],
    ) {
        let cfg = &config.rpm;
        if !cfg.enabled || frame.rpm.is_nan() || frame.rpm <= ENGINE_MIN_RPM {
            return;
        }

        self.state.smooth_rpm = if gear_changed {
            frame.rpm
        } else {
            self.state.smooth_rpm * ENGINE_RPM_SMOOTHING
                + frame.rpm * (1.0 - ENGINE_RPM_SMOOTHING)
        };
        let redline = if frame.max_rpm > ENGINE_MIN_REDLINE {
            f32::from(frame.max_rpm)
        } else {
            ENGINE_FALLBACK_REDLINE
        };
        let ratio = (self.state.smooth_rpm.max(0.0) / redline).min(1.0);
        let freq = cfg.min_freq + ratio * (cfg.max_freq - cfg.min_freq);
        let step = angular_step(freq, self.sample_rate);

        let speed_factor = (frame.speed_kmh / ENGINE_IDLE_BLEND_KMH).clamp(0.0, 1.0);
        let volume = cfg.idle_boost * (1.0 - speed_factor) + cfg.volume * speed_factor;
        let mut amp = (0.6 + ratio.powf(1.5) * 0.8) * volume * safe_gain;
        if config.suspension.priority && g_force > ENGINE_DIM_THRESHOLD {
            let reduction = 1.0 - config.suspension.rpm_dim * g_force.min(ENGINE_DIM_MAX_G);
            amp *= reduction.max(ENGINE_DIM_FLOOR);
        }
        amp *= self.state.traction_duck * self.state.suspension_duck;

        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let cycle_offset = TAU * f64::from(self.state.engine_cycle);
        let ratio = f64::from(ratio);
        for (i, (r, f)) in rear.iter_mut().zip(front.iter_mut()).enumerate() {
            let x = self.state.engine.offset(step, i) + cycle_offset;
            let wave = engine_wave(cfg.profile, x, ratio) as f32 * amp;
            *r += wave * g_rear;
            *f += wave * g_front;
        }
        let cycles = self.state.engine.advance(step, rear.len());
        self.state.engine_cycle = ((u64::from(self.state.engine_cycle) + cycles) % 4) as u8;
    }

    fn render_gear_thump(
        &mut self,
        config: &ShakerConfig,
        safe_gain: f32,
        rear: &mut [f32],
        front: &mut [f32],
    ) {
        if self.state.gear_kick <= 0.0 {
            return;
        }
        let cfg = &config.gear_shift;
        let start = self.state.gear_kick;
        let end = (start - GEAR_THUMP_DECAY).max(0.0);
        let step = angular_step(GEAR_THUMP_HZ, self.sample_rate);
        let duck = self.state.traction_duck.max(GEAR_DUCK_FLOOR);
        let amp = cfg.volume * safe_gain * duck;
        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let len = rear.len();

        for (i, (r, f)) in rear.iter_mut().zip(front.iter_mut()).enumerate() {
            let level = ramp_at(start, end, i, len);
            let wave = self.state.gear_thump.offset(step, i).sin() as f32 * level * amp;
            *r += wave * g_rear;
            *f += wave * g_front;
        }
        self.state.gear_thump.advance(step, len);
        self.state.gear_kick = end;
    }

    fn render_traction(
        &mut self,
        config: &ShakerConfig,
        safe_gain: f32,
        triggers: &SlipTriggers,
        braking: bool,
        rear: &mut [f32],
        front: &mut [f32],
    ) {
        let cfg = &config.traction;
        if !cfg.enabled {
            return;
        }
        let mix = if braking { BRAKE_SQUARE_MIX } else { 0.0 };
        let (g_rear, g_front) = stereo_gains(cfg.balance);
        let base = safe_gain * cfg.volume * TRACTION_GAIN;

        let layers = [
            (triggers.rear(), cfg.rear_freq, g_rear, &mut self.state.traction_rear, rear),
            (triggers.front(), cfg.front_freq, g_front, &mut self.state.traction_front, front),
        ];
        for (trigger, freq, gain, phase, out) in layers {
            if trigger.is_nan() || trigger <= TRACTION_ACTIVE {
                continue;
            }
            let step = angular_step(freq, self.sample_rate);
            let amp = base * trigger * gain;
            for (i, s) in out.iter_mut().enumerate() {
                *s += square_mix(phase.offset(step, i).sin(), mix) as f32 * amp;
            }
            phase.advance(step, out.len());
        }
    }
}

#[inline]
fn smooth(previous: f32, target: f32) -> f32 {
    DUCK_SMOOTHING * previous + (1.0 - DUCK_SMOOTHING) * target
}
