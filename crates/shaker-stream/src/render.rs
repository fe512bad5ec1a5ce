//! Per-callback orchestration.
//!
//! [`RenderEngine`] owns everything the audio callback mutates: slip
//! estimator, mixer, cached frame and scratch buffers. It outlives any one
//! stream so calibration and oscillator phases survive a reopen.
//!
//! # RT Safety
//!
//! - Frame hand-off uses `try_lock`; on contention the cached frame is kept
//! - Scratch buffers are sized at construction; longer buffers render in chunks
//! - A panic inside rendering is caught here and becomes a silent buffer

use crate::backend::RenderCallback;
use crate::mute::mute_decision;
use parking_lot::Mutex;
use shaker_config::ShakerConfig;
use shaker_synth::{
    HapticMixer, LiveMetrics, MetricsCell, MixInput, SlipSettings, SlipTriggers, TestTone,
    TireSlipEstimator,
};
use shaker_telemetry_gt7::TelemetryFrame;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Smallest scratch buffer the engine allocates, in frames.
pub const MIN_SCRATCH_FRAMES: usize = 4096;

/// State shared between the supervisor poll loop and the audio callback.
#[derive(Debug, Default)]
pub struct CallbackLink {
    frame: Mutex<Option<Arc<TelemetryFrame>>>,
    running: AtomicBool,
    stagnant: AtomicBool,
    callbacks: AtomicU64,
    failures: AtomicU64,
}

impl CallbackLink {
    /// Create a link in the stopped state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the newest frame to the callback, replacing one not yet picked
    /// up.
    pub fn offer_frame(&self, frame: Arc<TelemetryFrame>) {
        *self.frame.lock() = Some(frame);
    }

    fn take_frame(&self) -> Option<Arc<TelemetryFrame>> {
        self.frame.try_lock().and_then(|mut pending| pending.take())
    }

    /// Set the running flag seen by the mute decision.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Whether the pipeline is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Set the stagnation flag seen by the mute decision.
    pub fn set_stagnant(&self, stagnant: bool) {
        self.stagnant.store(stagnant, Ordering::Release);
    }

    /// Whether the feed is stagnant.
    #[must_use]
    pub fn is_stagnant(&self) -> bool {
        self.stagnant.load(Ordering::Acquire)
    }

    /// Callbacks that completed normally.
    #[must_use]
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Acquire)
    }

    /// Callbacks that failed and emitted silence.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }
}

/// Callback-side pipeline: frame → slip estimator → mixer → interleaved
/// output → live metrics.
#[derive(Debug)]
pub struct RenderEngine {
    config: Arc<ShakerConfig>,
    link: Arc<CallbackLink>,
    metrics: Arc<MetricsCell>,
    estimator: TireSlipEstimator,
    mixer: HapticMixer,
    frame: Option<Arc<TelemetryFrame>>,
    rear: Vec<f32>,
    front: Vec<f32>,
    live: LiveMetrics,
}

impl RenderEngine {
    /// Create an engine sized for the configured buffer.
    #[must_use]
    pub fn new(
        config: Arc<ShakerConfig>,
        link: Arc<CallbackLink>,
        metrics: Arc<MetricsCell>,
    ) -> Self {
        let frames = usize::try_from(config.audio.buffer_size)
            .unwrap_or(0)
            .max(MIN_SCRATCH_FRAMES);
        let mut mixer = HapticMixer::new(config.audio.sample_rate as f32);
        mixer.reserve(frames);
        Self {
            estimator: TireSlipEstimator::new(SlipSettings::from(&config.traction)),
            mixer,
            config,
            link,
            metrics,
            frame: None,
            rear: vec![0.0; frames],
            front: vec![0.0; frames],
            live: LiveMetrics::default(),
        }
    }

    /// Shared link.
    #[must_use]
    pub fn link(&self) -> &Arc<CallbackLink> {
        &self.link
    }

    /// Frame currently rendered from.
    #[must_use]
    pub fn current_frame(&self) -> Option<&TelemetryFrame> {
        self.frame.as_deref()
    }

    /// Slip estimator.
    #[must_use]
    pub const fn estimator(&self) -> &TireSlipEstimator {
        &self.estimator
    }

    /// Render one interleaved stereo buffer. Never panics; any failure
    /// yields silence.
    pub fn render(&mut self, out: &mut [f32]) {
        let link = Arc::clone(&self.link);
        guarded_render(&link, out, |out| self.render_inner(out));
    }

    fn render_inner(&mut self, out: &mut [f32]) {
        if let Some(frame) = self.link.take_frame() {
            self.frame = Some(frame);
        }

        let config = &*self.config;
        let frame = self.frame.as_deref();
        let muted = mute_decision(
            self.link.is_running(),
            frame,
            config.playback_mode,
            self.link.is_stagnant(),
        );
        let (triggers, braking) = match frame {
            Some(f) => (self.estimator.compute(f), f.is_braking()),
            None => (SlipTriggers::default(), false),
        };
        let input = MixInput {
            frame,
            config,
            muted,
            triggers,
            braking,
        };

        // Scratch is sized once; longer device buffers render in chunks.
        let chunk = self.rear.len().min(self.front.len()) * 2;
        if chunk == 0 {
            out.fill(0.0);
            return;
        }
        for part in out.chunks_mut(chunk) {
            let frames = part.len() / 2;
            let (Some(rear), Some(front)) =
                (self.rear.get_mut(..frames), self.front.get_mut(..frames))
            else {
                part.fill(0.0);
                continue;
            };
            self.mixer.process(&input, rear, front, &mut self.live);
            interleave(part, rear, front);
        }
        self.metrics.publish(&self.live);
    }
}

/// Run `render` on `out`, converting a panic into a silent buffer.
///
/// Counts a completed callback or a failure on `link`.
pub fn guarded_render<F>(link: &CallbackLink, out: &mut [f32], render: F)
where
    F: FnOnce(&mut [f32]),
{
    let result = catch_unwind(AssertUnwindSafe(|| render(&mut *out)));
    if result.is_ok() {
        link.callbacks.fetch_add(1, Ordering::AcqRel);
    } else {
        out.fill(0.0);
        link.failures.fetch_add(1, Ordering::AcqRel);
    }
}

/// Callback that plays `tone` and then silence, setting `finished` once the
/// tone has ended.
#[must_use]
pub fn tone_callback(
    mut tone: TestTone,
    safe_gain: f32,
    finished: Arc<AtomicBool>,
) -> RenderCallback {
    let mut rear = Vec::new();
    let mut front = Vec::new();
    Box::new(move |out: &mut [f32]| {
        let frames = out.len() / 2;
        if rear.len() < frames {
            rear.resize(frames, 0.0);
            front.resize(frames, 0.0);
        }
        let (Some(r), Some(f)) = (rear.get_mut(..frames), front.get_mut(..frames)) else {
            out.fill(0.0);
            return;
        };
        if tone.render(r, f, safe_gain) {
            interleave(out, r, f);
        } else {
            out.fill(0.0);
            finished.store(true, Ordering::Release);
        }
    })
}

/// Interleave two channels into `out`; a trailing odd sample is zeroed.
pub fn interleave(out: &mut [f32], rear: &[f32], front: &[f32]) {
    let mut pairs = out.chunks_exact_mut(2);
    for ((pair, r), f) in (&mut pairs).zip(rear).zip(front) {
        if let [left, right] = pair {
            *left = *r;
            *right = *f;
        }
    }
    pairs.into_remainder().fill(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaker_synth::ToneSide;
    use shaker_telemetry_gt7::RaceFlags;

    fn engine(config: ShakerConfig) -> (RenderEngine, Arc<CallbackLink>, Arc<MetricsCell>) {
        let link = Arc::new(CallbackLink::new());
        let metrics = Arc::new(MetricsCell::new());
        let engine = RenderEngine::new(Arc::new(config), Arc::clone(&link), Arc::clone(&metrics));
        (engine, link, metrics)
    }

    fn racing_frame() -> TelemetryFrame {
        TelemetryFrame {
            flags: RaceFlags {
                on_track: true,
                paused: false,
                loading: false,
            },
            rpm: 4500.0,
            gear: 3,
            max_rpm: 8000,
            speed_kmh: 100.0,
            ..TelemetryFrame::default()
        }
    }

    fn peak(buf: &[f32]) -> f32 {
        buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_interleave_orders_rear_then_front() {
        let mut out = [9.0f32; 5];
        interleave(&mut out, &[1.0, 2.0], &[-1.0, -2.0]);
        assert_eq!(out, [1.0, -1.0, 2.0, -2.0, 0.0]);
    }

    #[test]
    fn test_silent_until_running_with_frame() {
        let (mut engine, link, _) = engine(ShakerConfig::default());
        let mut out = vec![1.0f32; 1024];
        engine.render(&mut out);
        assert!(peak(&out) < f32::EPSILON);
        assert_eq!(link.callbacks(), 1);

        link.offer_frame(Arc::new(racing_frame()));
        engine.render(&mut out);
        assert!(peak(&out) < f32::EPSILON, "not running yet");
        assert!(engine.current_frame().is_some());

        link.set_running(true);
        engine.render(&mut out);
        assert!(peak(&out) > 0.001);
        assert!(peak(&out) <= 0.98);
    }

    #[test]
    fn test_frame_cached_between_offers() {
        let (mut engine, link, _) = engine(ShakerConfig::default());
        link.set_running(true);
        link.offer_frame(Arc::new(racing_frame()));
        let mut out = vec![0.0f32; 512];
        engine.render(&mut out);
        engine.render(&mut out);
        assert!(engine.current_frame().is_some());
        assert!(peak(&out) > 0.001);
    }

    #[test]
    fn test_stagnant_feed_goes_silent() {
        let (mut engine, link, _) = engine(ShakerConfig::default());
        link.set_running(true);
        link.offer_frame(Arc::new(racing_frame()));
        let mut out = vec![0.0f32; 512];
        engine.render(&mut out);
        link.set_stagnant(true);
        engine.render(&mut out);
        engine.render(&mut out);
        assert!(peak(&out) < f32::EPSILON);
    }

    #[test]
    fn test_metrics_published_per_callback() {
        let (mut engine, link, metrics) = engine(ShakerConfig::default());
        link.set_running(true);
        link.offer_frame(Arc::new(racing_frame()));
        let mut out = vec![0.0f32; 256];
        engine.render(&mut out);
        engine.render(&mut out);
        assert_eq!(metrics.updates(), 2);
    }

    #[test]
    #[expect(clippy::panic, reason = "a panicking renderer is the case under test")]
    fn test_failed_render_is_silent() {
        let link = CallbackLink::new();
        let mut out = vec![0.7f32; 64];
        guarded_render(&link, &mut out, |out| {
            out.fill(0.9);
            panic!("mixer fault");
        });
        assert!(out.iter().all(|s| s.abs() < f32::EPSILON));
        assert_eq!(link.failures(), 1);
        assert_eq!(link.callbacks(), 0);

        guarded_render(&link, &mut out, |out| out.fill(0.25));
        assert!(out.iter().all(|s| (s - 0.25).abs() < f32::EPSILON));
        assert_eq!(link.failures(), 1);
        assert_eq!(link.callbacks(), 1);
    }

    #[test]
    fn test_long_device_buffer_renders_in_chunks() {
        let mut config = ShakerConfig::default();
        config.audio.buffer_size = 256;
        let (mut engine, link, metrics) = engine(config);
        link.set_running(true);
        link.offer_frame(Arc::new(racing_frame()));
        let scratch = engine.rear.len();
        assert_eq!(scratch, MIN_SCRATCH_FRAMES);

        let mut out = vec![0.0f32; (scratch * 2 + 100) * 2];
        engine.render(&mut out);
        engine.render(&mut out);
        assert_eq!(engine.rear.len(), scratch);
        assert_eq!(link.failures(), 0);
        assert_eq!(metrics.updates(), 2);
        let tail = out.get(scratch * 4..).unwrap_or_default();
        assert!(peak(tail) > 0.001);
        assert!(peak(&out) <= 0.98);
    }

    #[test]
    fn test_tone_callback_finishes() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut callback = tone_callback(
            TestTone::new(ToneSide::Front, 48_000.0),
            0.42,
            Arc::clone(&finished),
        );
        let mut out = vec![0.0f32; 1024];
        callback(&mut out);
        let rear: Vec<f32> = out.iter().step_by(2).copied().collect();
        let front: Vec<f32> = out.iter().skip(1).step_by(2).copied().collect();
        assert!(peak(&rear) < f32::EPSILON);
        assert!(peak(&front) > 0.1);

        for _ in 0..30 {
            callback(&mut out);
        }
        assert!(finished.load(Ordering::Acquire));
        assert!(peak(&out) < f32::EPSILON);
    }
}
