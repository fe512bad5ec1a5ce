//! Supervisor lifecycle tests against a scripted backend and an injected
//! clock.

use parking_lot::Mutex;
use shaker_config::ShakerConfig;
use shaker_stream::prelude::*;
use shaker_synth::MetricsCell;
use shaker_telemetry_gt7::{LatestFrameSlot, RaceFlags, TelemetryFrame};
use std::sync::Arc;
use std::time::{Duration, Instant};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Default)]
struct MockState {
    opens: u32,
    closes: u32,
    fail: bool,
    callback: Option<RenderCallback>,
}

#[derive(Clone, Default)]
struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

struct MockStream {
    state: Arc<Mutex<MockState>>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.closes += 1;
        state.callback = None;
    }
}

impl MockBackend {
    fn set_fail(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    fn closes(&self) -> u32 {
        self.state.lock().closes
    }

    /// Drive one device callback, as the audio thread would.
    fn pump(&self, samples: usize) -> Option<Vec<f32>> {
        let mut state = self.state.lock();
        let callback = state.callback.as_mut()?;
        let mut out = vec![0.0f32; samples];
        callback(&mut out);
        Some(out)
    }
}

impl AudioBackend for MockBackend {
    type Stream = MockStream;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, _spec: &StreamSpec, callback: RenderCallback) -> StreamResult<MockStream> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(StreamError::device_unavailable("scripted failure"));
        }
        state.opens += 1;
        state.callback = Some(callback);
        Ok(MockStream {
            state: Arc::clone(&self.state),
        })
    }
}

fn racing_frame(rpm: f32) -> TelemetryFrame {
    TelemetryFrame {
        flags: RaceFlags {
            on_track: true,
            paused: false,
            loading: false,
        },
        rpm,
        gear: 3,
        max_rpm: 8000,
        speed_kmh: 90.0,
        ..TelemetryFrame::default()
    }
}

fn setup() -> (StreamSupervisor<MockBackend>, MockBackend, Arc<LatestFrameSlot>) {
    let backend = MockBackend::default();
    let slot = Arc::new(LatestFrameSlot::new());
    let supervisor = StreamSupervisor::new(
        backend.clone(),
        Arc::new(ShakerConfig::default()),
        Arc::clone(&slot),
        Arc::new(MetricsCell::new()),
    );
    (supervisor, backend, slot)
}

fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn test_stays_closed_without_telemetry() {
    let (mut supervisor, backend, _slot) = setup();
    let t0 = Instant::now();
    for step in 0..100u64 {
        supervisor.tick(t0 + Duration::from_millis(step * 10));
    }
    assert_eq!(supervisor.state(), SessionState::Closed);
    assert_eq!(backend.opens(), 0);
}

#[test]
fn test_wake_sleep_wake() {
    let (mut supervisor, backend, slot) = setup();
    let t0 = Instant::now();

    slot.publish(racing_frame(3000.0));
    supervisor.tick(t0);
    assert_eq!(supervisor.state(), SessionState::Open);
    assert_eq!(backend.opens(), 1);

    // Callbacks keep arriving, telemetry stops.
    for secs in 1..10u64 {
        assert!(backend.pump(512).is_some());
        supervisor.tick(t0 + Duration::from_secs(secs));
        assert_eq!(supervisor.state(), SessionState::Open, "open at {secs}s");
    }

    supervisor.tick(t0 + Duration::from_secs(10));
    assert_eq!(supervisor.state(), SessionState::Closed);
    assert_eq!(backend.closes(), 1);
    assert!(backend.pump(512).is_none());

    slot.publish(racing_frame(3100.0));
    supervisor.tick(t0 + Duration::from_secs(11));
    assert_eq!(supervisor.state(), SessionState::Open);
    assert_eq!(backend.opens(), 2);
    assert_eq!(supervisor.status().forced_reopens, 0);
}

#[test]
fn test_stalled_callback_reopens_exactly_once() {
    let (mut supervisor, backend, slot) = setup();
    let t0 = Instant::now();
    slot.publish(racing_frame(3000.0));
    supervisor.tick(t0);

    supervisor.tick(t0 + Duration::from_millis(1000));
    supervisor.tick(t0 + Duration::from_millis(2000));
    assert_eq!(supervisor.status().forced_reopens, 0);

    supervisor.tick(t0 + Duration::from_millis(2100));
    assert_eq!(supervisor.status().forced_reopens, 1);
    assert_eq!(backend.opens(), 2);
    assert_eq!(backend.closes(), 1);

    // Still no callbacks: the reopen restarted the timeout.
    for ms in (2110..=4100u64).step_by(10) {
        supervisor.tick(t0 + Duration::from_millis(ms));
    }
    assert_eq!(supervisor.status().forced_reopens, 1);
    assert_eq!(backend.opens(), 2);
    assert_eq!(supervisor.state(), SessionState::Open);
}

#[test]
fn test_live_callbacks_never_trigger_watchdog() {
    let (mut supervisor, backend, slot) = setup();
    let t0 = Instant::now();
    for step in 0..500u64 {
        if step % 10 == 0 {
            slot.publish(racing_frame(3000.0 + step as f32));
        }
        supervisor.tick(t0 + Duration::from_millis(step * 20));
        assert!(backend.pump(256).is_some());
    }
    assert_eq!(supervisor.status().forced_reopens, 0);
    assert_eq!(backend.opens(), 1);
    assert_eq!(supervisor.link().callbacks(), 500);
}

#[test]
fn test_open_failure_stays_closed_and_retries() {
    let (mut supervisor, backend, slot) = setup();
    backend.set_fail(true);
    let t0 = Instant::now();
    slot.publish(racing_frame(3000.0));

    supervisor.tick(t0);
    assert_eq!(supervisor.state(), SessionState::Closed);
    assert_eq!(supervisor.status().failed_opens, 1);

    supervisor.tick(t0 + Duration::from_millis(500));
    assert_eq!(supervisor.status().failed_opens, 1, "no retry inside the back-off");

    supervisor.tick(t0 + Duration::from_millis(1000));
    assert_eq!(supervisor.status().failed_opens, 2);

    backend.set_fail(false);
    supervisor.tick(t0 + Duration::from_millis(2000));
    assert_eq!(supervisor.state(), SessionState::Open);
    assert_eq!(supervisor.status().opens, 1);
}

#[test]
fn test_renders_audio_then_mutes_on_stagnation() -> TestResult {
    let (mut supervisor, backend, slot) = setup();
    supervisor.set_running(true);
    let t0 = Instant::now();
    slot.publish(racing_frame(4000.0));
    supervisor.tick(t0);

    let out = backend.pump(2048).ok_or("stream not open")?;
    assert!(peak(&out) > 0.001);
    assert!(peak(&out) <= 0.98);

    // Same frame content for longer than the stagnation timeout.
    slot.publish(racing_frame(4000.0));
    supervisor.tick(t0 + Duration::from_millis(800));
    backend.pump(2048).ok_or("stream not open")?;
    supervisor.tick(t0 + Duration::from_millis(1600));
    assert!(supervisor.link().is_stagnant());

    backend.pump(2048).ok_or("stream not open")?;
    let out = backend.pump(2048).ok_or("stream not open")?;
    assert!(peak(&out) < f32::EPSILON);
    Ok(())
}

#[test]
fn test_shutdown_releases_device() {
    let (mut supervisor, backend, slot) = setup();
    slot.publish(racing_frame(3000.0));
    supervisor.tick(Instant::now());
    supervisor.shutdown();
    assert_eq!(supervisor.state(), SessionState::Closed);
    assert_eq!(backend.closes(), 1);
    assert!(!supervisor.link().is_running());
}

#[test]
fn test_handle_runs_null_backend() -> TestResult {
    let mut config = ShakerConfig::default();
    config.audio.buffer_size = 256;
    let slot = Arc::new(LatestFrameSlot::new());
    let metrics = Arc::new(MetricsCell::new());
    let mut handle = SupervisorHandle::spawn(
        || Ok(NullBackend::new()),
        Arc::new(config),
        Arc::clone(&slot),
        Arc::clone(&metrics),
    )?;

    slot.publish(racing_frame(3000.0));
    let deadline = Instant::now() + Duration::from_secs(2);
    while handle.status().callbacks < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let status = handle.status();
    assert_eq!(status.state, SessionState::Open);
    assert!(status.callbacks >= 3);
    assert!(metrics.updates() >= 3);

    handle.stop();
    assert!(!handle.is_running());
    assert_eq!(handle.status().state, SessionState::Closed);
    Ok(())
}

#[test]
fn test_handle_reports_backend_init_failure() {
    let result = SupervisorHandle::spawn(
        || -> StreamResult<NullBackend> { Err(StreamError::BackendInit("no host".into())) },
        Arc::new(ShakerConfig::default()),
        Arc::new(LatestFrameSlot::new()),
        Arc::new(MetricsCell::new()),
    );
    assert!(matches!(result, Err(StreamError::BackendInit(_))));
}
