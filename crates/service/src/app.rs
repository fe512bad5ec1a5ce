//! Application context.

use anyhow::Context;
use shaker_config::ShakerConfig;
use shaker_stream::{
    AudioBackend, NullBackend, StreamResult, StreamSpec, SupervisorHandle, SupervisorStatus,
    tone_callback,
};
use shaker_synth::{LiveMetrics, MetricsCell, TestTone, ToneSide};
use shaker_synth::test_tone::TONE_BUFFERS;
use shaker_telemetry_gt7::{ClientConfig, ClientStats, TelemetryClient};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TONE_POLL: Duration = Duration::from_millis(10);
const TONE_GRACE: Duration = Duration::from_secs(1);

/// Audio output backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// No device; a paced thread renders and discards buffers.
    Null,
    /// System audio output.
    #[cfg(feature = "cpal")]
    Cpal,
}

impl Default for BackendKind {
    fn default() -> Self {
        #[cfg(feature = "cpal")]
        {
            Self::Cpal
        }
        #[cfg(not(feature = "cpal"))]
        {
            Self::Null
        }
    }
}

/// Telemetry client settings for `config`.
#[must_use]
pub fn client_config(config: &ShakerConfig) -> ClientConfig {
    ClientConfig {
        console_ip: config.network.console_ip,
        bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        recv_port: config.network.recv_port,
        heartbeat_port: config.network.heartbeat_port,
        heartbeat_interval: config.network.heartbeat_interval(),
        recv_timeout: config.network.recv_timeout(),
    }
}

/// Owns every long-lived component of the daemon.
#[derive(Debug)]
pub struct ShakerApp {
    config: Arc<ShakerConfig>,
    client: TelemetryClient,
    metrics: Arc<MetricsCell>,
    supervisor: Option<SupervisorHandle>,
}

impl ShakerApp {
    /// Create a stopped application.
    #[must_use]
    pub fn new(config: ShakerConfig) -> Self {
        let client = TelemetryClient::new(client_config(&config));
        Self {
            config: Arc::new(config),
            client,
            metrics: Arc::new(MetricsCell::new()),
            supervisor: None,
        }
    }

    /// Configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &Arc<ShakerConfig> {
        &self.config
    }

    /// Telemetry client.
    #[must_use]
    pub const fn client(&self) -> &TelemetryClient {
        &self.client
    }

    /// Start telemetry and the stream supervisor on the chosen backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the telemetry sockets cannot be bound or the
    /// supervisor cannot start.
    pub fn start(&mut self, backend: BackendKind) -> anyhow::Result<()> {
        match backend {
            BackendKind::Null => self.start_with(|| Ok(NullBackend::new())),
            #[cfg(feature = "cpal")]
            BackendKind::Cpal => self.start_with(|| Ok(shaker_stream::CpalBackend::new())),
        }
    }

    /// Start with a caller-supplied backend factory, run on the supervisor
    /// thread.
    ///
    /// # Errors
    ///
    /// See [`ShakerApp::start`].
    pub fn start_with<B, F>(&mut self, make_backend: F) -> anyhow::Result<()>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> StreamResult<B> + Send + 'static,
    {
        self.client.start().context("starting GT7 telemetry client")?;
        let supervisor = SupervisorHandle::spawn(
            make_backend,
            Arc::clone(&self.config),
            self.client.slot(),
            Arc::clone(&self.metrics),
        );
        match supervisor {
            Ok(handle) => {
                self.supervisor = Some(handle);
                info!(
                    console = %self.config.network.console_ip,
                    mode = ?self.config.shaker_mode,
                    playback = ?self.config.playback_mode,
                    "shaker pipeline started"
                );
                Ok(())
            }
            Err(e) => {
                self.client.stop();
                Err(e).context("starting stream supervisor")
            }
        }
    }

    /// Stop the stream first, releasing the device, then telemetry.
    pub fn stop(&mut self) {
        if let Some(mut supervisor) = self.supervisor.take() {
            supervisor.stop();
        }
        self.client.stop();
        info!("shaker pipeline stopped");
    }

    /// Latest live metrics.
    #[must_use]
    pub fn metrics(&self) -> LiveMetrics {
        self.metrics.snapshot()
    }

    /// Supervisor counters, if running.
    #[must_use]
    pub fn stream_status(&self) -> Option<SupervisorStatus> {
        self.supervisor.as_ref().map(SupervisorHandle::status)
    }

    /// Telemetry client counters.
    #[must_use]
    pub fn client_stats(&self) -> ClientStats {
        self.client.stats()
    }

    /// Log a one-line snapshot at debug level.
    pub fn log_metrics(&self) {
        let metrics = self.metrics();
        let stats = self.client_stats();
        let status = self.stream_status().unwrap_or_default();
        debug!(
            metrics = %serde_json::to_string(&metrics).unwrap_or_default(),
            state = ?status.state,
            opens = status.opens,
            forced_reopens = status.forced_reopens,
            callback_failures = status.callback_failures,
            packets = stats.packets,
            rejected = stats.rejected,
            last_packet_age = ?stats.last_packet_age,
            "live metrics"
        );
    }
}

impl Drop for ShakerApp {
    fn drop(&mut self) {
        if self.supervisor.is_some() || self.client.is_running() {
            self.stop();
        }
    }
}

/// Play the channel test tone on `backend` and block until it has finished.
///
/// # Errors
///
/// Returns an error if the stream cannot be opened.
pub fn play_test_tone<B: AudioBackend>(
    backend: &mut B,
    config: &ShakerConfig,
    side: ToneSide,
) -> anyhow::Result<()> {
    let spec = StreamSpec::from_config(config);
    let finished = Arc::new(AtomicBool::new(false));
    let tone = TestTone::new(side, config.audio.sample_rate as f32);
    let callback = tone_callback(tone, config.safe_gain(), Arc::clone(&finished));
    let stream = backend
        .open(&spec, callback)
        .with_context(|| format!("opening {} backend for test tone", backend.name()))?;
    info!(?side, "playing test tone");

    let tone_length = spec.buffer_period().saturating_mul(TONE_BUFFERS + 2);
    let deadline = Instant::now() + tone_length + TONE_GRACE;
    while !finished.load(Ordering::Acquire) && Instant::now() < deadline {
        std::thread::sleep(TONE_POLL);
    }
    drop(stream);

    if !finished.load(Ordering::Acquire) {
        warn!("test tone did not finish before the deadline");
    }
    Ok(())
}
