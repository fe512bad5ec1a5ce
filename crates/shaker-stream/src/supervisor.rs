//! Stream lifecycle supervisor.
//!
//! A poll loop on its own thread, ticking every [`POLL_INTERVAL`]:
//!
//! - **wake**: `Closed → Open` when telemetry arrived within [`WAKE_WINDOW`]
//! - **sleep**: `Open → Closed` after [`WAKE_WINDOW`] without telemetry,
//!   releasing the device
//! - **watchdog**: while `Open`, no completed callback for longer than
//!   [`CALLBACK_TIMEOUT`] forces one close/reopen. The reopen restarts the
//!   timeout, so a dead backend is retried once per timeout, never in a
//!   storm.
//!
//! The supervisor is the only consumer of the telemetry slot. It forwards
//! each new frame to the callback and tracks stagnation for muting.
//!
//! Every decision is made in [`StreamSupervisor::tick`] against an injected
//! `now`, so the state machine is testable without sleeping.

use crate::backend::{AudioBackend, RenderCallback, StreamSpec};
use crate::error::{StreamError, StreamResult};
use crate::mute::StagnationTracker;
use crate::render::{CallbackLink, RenderEngine};
use parking_lot::Mutex;
use serde::Serialize;
use shaker_config::ShakerConfig;
use shaker_synth::MetricsCell;
use shaker_telemetry_gt7::LatestFrameSlot;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Telemetry freshness window for wake and sleep.
pub const WAKE_WINDOW: Duration = Duration::from_secs(10);
/// Longest tolerated gap between completed callbacks while open.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(2);
/// Poll loop tick.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Delay before retrying a failed device open.
pub const OPEN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Device session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No device held.
    #[default]
    Closed,
    /// Stream running.
    Open,
}

/// Supervisor counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SupervisorStatus {
    /// Current session state.
    pub state: SessionState,
    /// Successful opens, including forced reopens.
    pub opens: u64,
    /// Reopens forced by the watchdog.
    pub forced_reopens: u64,
    /// Failed open attempts.
    pub failed_opens: u64,
    /// Callbacks completed.
    pub callbacks: u64,
    /// Callbacks that failed and emitted silence.
    pub callback_failures: u64,
}

struct Session<S> {
    _stream: S,
    last_callback_at: Instant,
    seen_callbacks: u64,
}

/// Wake/sleep/watchdog state machine around an [`AudioBackend`].
pub struct StreamSupervisor<B: AudioBackend> {
    backend: B,
    spec: StreamSpec,
    slot: Arc<LatestFrameSlot>,
    link: Arc<CallbackLink>,
    engine: Arc<Mutex<RenderEngine>>,
    session: Option<Session<B::Stream>>,
    last_frame_at: Option<Instant>,
    stagnation: StagnationTracker,
    next_open_at: Option<Instant>,
    consecutive_failures: u32,
    status: SupervisorStatus,
    published: Arc<Mutex<SupervisorStatus>>,
}

impl<B: AudioBackend> fmt::Debug for StreamSupervisor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSupervisor")
            .field("backend", &self.backend.name())
            .field("spec", &self.spec)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<B: AudioBackend> StreamSupervisor<B> {
    /// Create a closed supervisor reading frames from `slot`.
    #[must_use]
    pub fn new(
        backend: B,
        config: Arc<ShakerConfig>,
        slot: Arc<LatestFrameSlot>,
        metrics: Arc<MetricsCell>,
    ) -> Self {
        let spec = StreamSpec::from_config(&config);
        let link = Arc::new(CallbackLink::new());
        let engine = RenderEngine::new(config, Arc::clone(&link), metrics);
        Self {
            backend,
            spec,
            slot,
            link,
            engine: Arc::new(Mutex::new(engine)),
            session: None,
            last_frame_at: None,
            stagnation: StagnationTracker::new(),
            next_open_at: None,
            consecutive_failures: 0,
            status: SupervisorStatus::default(),
            published: Arc::new(Mutex::new(SupervisorStatus::default())),
        }
    }

    /// Link shared with the callback.
    #[must_use]
    pub fn link(&self) -> &Arc<CallbackLink> {
        &self.link
    }

    /// Backend in use.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    /// Counters as of the last tick.
    #[must_use]
    pub const fn status(&self) -> SupervisorStatus {
        self.status
    }

    /// Mark the pipeline running or stopped; a stopped pipeline renders
    /// silence.
    pub fn set_running(&self, running: bool) {
        self.link.set_running(running);
    }

    /// Run one supervision step at `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(frame) = self.slot.take() {
            self.last_frame_at = Some(now);
            self.stagnation.observe(&frame, now);
            self.link.offer_frame(frame);
        }
        self.link.set_stagnant(self.stagnation.is_stagnant(now));

        let fresh = self
            .last_frame_at
            .is_some_and(|at| now.saturating_duration_since(at) < WAKE_WINDOW);

        match (self.session.is_some(), fresh) {
            (false, true) => self.open(now),
            (true, false) => {
                self.close("telemetry idle");
                self.consecutive_failures = 0;
                self.next_open_at = None;
            }
            (true, true) => self.check_callbacks(now),
            (false, false) => {
                self.consecutive_failures = 0;
                self.next_open_at = None;
            }
        }

        self.status.state = self.state();
        self.status.callbacks = self.link.callbacks();
        self.status.callback_failures = self.link.failures();
        *self.published.lock() = self.status;
    }

    /// Close the session, if any.
    pub fn shutdown(&mut self) {
        self.link.set_running(false);
        self.close("shutdown");
        self.status.state = SessionState::Closed;
        *self.published.lock() = self.status;
    }

    /// Tick until `stop` is set, then shut down.
    pub fn run(mut self, stop: &AtomicBool) {
        self.set_running(true);
        info!(backend = self.backend.name(), "stream supervisor started");
        while !stop.load(Ordering::Acquire) {
            self.tick(Instant::now());
            std::thread::sleep(POLL_INTERVAL);
        }
        self.shutdown();
        info!(
            opens = self.status.opens,
            forced_reopens = self.status.forced_reopens,
            "stream supervisor stopped"
        );
    }

    fn make_callback(&self) -> RenderCallback {
        let engine = Arc::clone(&self.engine);
        Box::new(move |out: &mut [f32]| match engine.try_lock() {
            Some(mut engine) => engine.render(out),
            None => out.fill(0.0),
        })
    }

    fn open(&mut self, now: Instant) {
        if self.next_open_at.is_some_and(|at| now < at) {
            return;
        }
        let callback = self.make_callback();
        match self.backend.open(&self.spec, callback) {
            Ok(stream) => {
                info!(
                    backend = self.backend.name(),
                    device = self.spec.device.as_deref().unwrap_or("default"),
                    sample_rate = self.spec.sample_rate,
                    buffer_frames = self.spec.buffer_frames,
                    "audio stream opened"
                );
                self.session = Some(Session {
                    _stream: stream,
                    last_callback_at: now,
                    seen_callbacks: self.link.callbacks(),
                });
                self.status.opens += 1;
                self.consecutive_failures = 0;
                self.next_open_at = None;
            }
            Err(e) => {
                self.status.failed_opens += 1;
                if self.consecutive_failures == 0 {
                    warn!(
                        error = %e,
                        backend = self.backend.name(),
                        "failed to open audio device"
                    );
                } else {
                    debug!(
                        error = %e,
                        attempt = self.consecutive_failures + 1,
                        "audio device still unavailable"
                    );
                }
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.next_open_at = now.checked_add(OPEN_RETRY_INTERVAL);
            }
        }
    }

    fn close(&mut self, reason: &'static str) {
        if self.session.take().is_some() {
            info!(reason, "audio stream closed");
        }
    }

    fn check_callbacks(&mut self, now: Instant) {
        let seen = self.link.callbacks();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if seen != session.seen_callbacks {
            session.seen_callbacks = seen;
            session.last_callback_at = now;
            return;
        }
        let silent_for = now.saturating_duration_since(session.last_callback_at);
        if silent_for > CALLBACK_TIMEOUT {
            warn!(
                silent_ms = silent_for.as_millis(),
                "audio callback stalled, reopening stream"
            );
            self.status.forced_reopens += 1;
            self.close("callback stalled");
            self.next_open_at = None;
            self.open(now);
        }
    }
}

/// Handle to a supervisor running on its own thread.
#[derive(Debug)]
pub struct SupervisorHandle {
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<SupervisorStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Start a supervisor thread. The backend is created on that thread by
    /// `make_backend`, since device handles are often tied to their thread.
    ///
    /// # Errors
    ///
    /// Returns the backend's init error, or a spawn error if the thread could
    /// not be started.
    pub fn spawn<B, F>(
        make_backend: F,
        config: Arc<ShakerConfig>,
        slot: Arc<LatestFrameSlot>,
        metrics: Arc<MetricsCell>,
    ) -> StreamResult<Self>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> StreamResult<B> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(SupervisorStatus::default()));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<StreamResult<()>>(1);

        let thread = {
            let stop = Arc::clone(&stop);
            let status = Arc::clone(&status);
            std::thread::Builder::new()
                .name("stream-supervisor".into())
                .spawn(move || {
                    let backend = match make_backend() {
                        Ok(backend) => backend,
                        Err(e) => {
                            error!(error = %e, "audio backend init failed");
                            if ready_tx.send(Err(e)).is_err() {
                                debug!("supervisor spawner went away");
                            }
                            return;
                        }
                    };
                    let mut supervisor = StreamSupervisor::new(backend, config, slot, metrics);
                    supervisor.published = status;
                    if ready_tx.send(Ok(())).is_err() {
                        debug!("supervisor spawner went away");
                        return;
                    }
                    supervisor.run(&stop);
                })
                .map_err(|e| StreamError::spawn("stream-supervisor", e.to_string()))?
        };

        let mut handle = Self {
            stop,
            status,
            thread: Some(thread),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => {
                handle.join();
                Err(e)
            }
            Err(_) => {
                handle.join();
                Err(StreamError::BackendInit(
                    "supervisor thread exited during init".into(),
                ))
            }
        }
    }

    /// Latest published counters.
    #[must_use]
    pub fn status(&self) -> SupervisorStatus {
        *self.status.lock()
    }

    /// Whether the supervisor thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and release the device. Returns once the stream is
    /// closed.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("stream supervisor thread panicked");
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
