//! UDP telemetry client.
//!
//! Two background threads:
//!
//! - **heartbeat**: sends [`HEARTBEAT_PAYLOAD`] to the console at a fixed
//!   cadence, plus one extra mid-period beat while no packets arrive, so
//!   NAT bindings and the console's subscriber list stay alive.
//! - **receive**: blocking `recv_from` bounded by a read timeout. Timeouts are
//!   the normal state during track transitions and simply loop.
//!
//! Both observe a shared running flag; [`TelemetryClient::stop`] clears it and
//! joins them, which completes within one receive timeout.

use crate::decoder::Gt7Decoder;
use crate::error::{TelemetryError, TelemetryResult};
use crate::frame::TelemetryFrame;
use crate::protocol::{GT7_HEARTBEAT_PORT, GT7_RECV_PORT, HEARTBEAT_PAYLOAD, MAX_DATAGRAM};
use crate::slot::LatestFrameSlot;
use crate::telemetry_now_ns;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const HEARTBEAT_TICK: Duration = Duration::from_millis(50);
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);
const NEVER: u64 = u64::MAX;

/// Client network settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Console address heartbeats are sent to.
    pub console_ip: IpAddr,
    /// Local address the receive socket binds to.
    pub bind_ip: IpAddr,
    /// Local receive port (0 picks an ephemeral port).
    pub recv_port: u16,
    /// Console heartbeat port.
    pub heartbeat_port: u16,
    /// Regular heartbeat cadence.
    pub heartbeat_interval: Duration,
    /// Upper bound on a single blocking receive.
    pub recv_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            console_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 116)),
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            recv_port: GT7_RECV_PORT,
            heartbeat_port: GT7_HEARTBEAT_PORT,
            heartbeat_interval: Duration::from_millis(1500),
            recv_timeout: Duration::from_secs(1),
        }
    }
}

/// Counters exposed by a running client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Datagrams received.
    pub packets: u64,
    /// Packets decoded into frames.
    pub frames: u64,
    /// Packets dropped by the decoder.
    pub rejected: u64,
    /// Heartbeats sent.
    pub heartbeats: u64,
    /// Time since the last accepted packet.
    pub last_packet_age: Option<Duration>,
}

#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    last_packet_ns: AtomicU64,
    packets: AtomicU64,
    frames: AtomicU64,
    rejected: AtomicU64,
    heartbeats: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            last_packet_ns: AtomicU64::new(NEVER),
            packets: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn last_packet_age(&self) -> Option<Duration> {
        let last = self.last_packet_ns.load(Ordering::Acquire);
        if last == NEVER {
            return None;
        }
        Some(Duration::from_nanos(telemetry_now_ns().saturating_sub(last)))
    }
}

/// GT7 telemetry client owning the sockets and background threads.
#[derive(Debug)]
pub struct TelemetryClient {
    config: ClientConfig,
    slot: Arc<LatestFrameSlot>,
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl TelemetryClient {
    /// Create a stopped client.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            slot: Arc::new(LatestFrameSlot::new()),
            shared: Arc::new(Shared::new()),
            threads: Vec::new(),
            local_addr: None,
        }
    }

    /// Bind the sockets and start the heartbeat and receive threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is already running, a socket cannot be
    /// bound or configured, or a thread cannot be spawned.
    pub fn start(&mut self) -> TelemetryResult<()> {
        if self.shared.is_running() {
            return Err(TelemetryError::AlreadyRunning);
        }

        let bind_addr = SocketAddr::new(self.config.bind_ip, self.config.recv_port);
        let recv_socket =
            UdpSocket::bind(bind_addr).map_err(|e| TelemetryError::bind(bind_addr, e))?;
        recv_socket.set_read_timeout(Some(self.config.recv_timeout))?;
        let local_addr = recv_socket.local_addr()?;

        let any = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        let heartbeat_socket = UdpSocket::bind(any).map_err(|e| TelemetryError::bind(any, e))?;
        let console = SocketAddr::new(self.config.console_ip, self.config.heartbeat_port);

        self.shared.running.store(true, Ordering::Release);

        let heartbeat = spawn_named("gt7-heartbeat", {
            let shared = Arc::clone(&self.shared);
            let interval = self.config.heartbeat_interval;
            move || heartbeat_loop(&heartbeat_socket, console, interval, &shared)
        });
        let heartbeat = match heartbeat {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(e);
            }
        };
        self.threads.push(heartbeat);

        let receive = spawn_named("gt7-recv", {
            let shared = Arc::clone(&self.shared);
            let slot = Arc::clone(&self.slot);
            move || receive_loop(&recv_socket, &slot, &shared)
        });
        match receive {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.stop();
                return Err(e);
            }
        }

        self.local_addr = Some(local_addr);
        info!(
            local = %local_addr,
            console = %console,
            "GT7 telemetry client started"
        );
        Ok(())
    }

    /// Stop both threads and wait for them to exit.
    pub fn stop(&mut self) {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("GT7 client thread panicked");
            }
        }
        if was_running {
            info!("GT7 telemetry client stopped");
        }
    }

    /// Whether the background threads are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Bound receive address, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Shared handle to the latest-frame slot.
    #[must_use]
    pub fn slot(&self) -> Arc<LatestFrameSlot> {
        Arc::clone(&self.slot)
    }

    /// Take the newest frame, if one arrived since the last call.
    #[must_use]
    pub fn take_latest(&self) -> Option<Arc<TelemetryFrame>> {
        self.slot.take()
    }

    /// Time since the last accepted packet, `None` if none yet.
    #[must_use]
    pub fn last_packet_age(&self) -> Option<Duration> {
        self.shared.last_packet_age()
    }

    /// Snapshot of the client counters.
    #[must_use]
    pub fn stats(&self) -> ClientStats {
        ClientStats {
            packets: self.shared.packets.load(Ordering::Relaxed),
            frames: self.shared.frames.load(Ordering::Relaxed),
            rejected: self.shared.rejected.load(Ordering::Relaxed),
            heartbeats: self.shared.heartbeats.load(Ordering::Relaxed),
            last_packet_age: self.shared.last_packet_age(),
        }
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_named<F>(name: &'static str, f: F) -> TelemetryResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(f)
        .map_err(|e| TelemetryError::spawn(name, e.to_string()))
}

fn heartbeat_loop(socket: &UdpSocket, console: SocketAddr, interval: Duration, shared: &Shared) {
    let mut last_regular: Option<Instant> = None;
    let mut extra_sent = false;
    let mut send_failed = false;

    while shared.is_running() {
        let due_regular = last_regular.is_none_or(|t| t.elapsed() >= interval);
        let stale = shared.last_packet_age().is_none_or(|age| age >= interval);
        let due_extra = !extra_sent
            && stale
            && last_regular.is_some_and(|t| t.elapsed() >= interval / 2);

        if due_regular || due_extra {
            match socket.send_to(HEARTBEAT_PAYLOAD, console) {
                Ok(_) => {
                    shared.heartbeats.fetch_add(1, Ordering::Relaxed);
                    if send_failed {
                        debug!(console = %console, "heartbeat send recovered");
                        send_failed = false;
                    }
                }
                Err(e) => {
                    if !send_failed {
                        warn!(console = %console, error = %e, "heartbeat send failed");
                        send_failed = true;
                    }
                }
            }
            if due_regular {
                last_regular = Some(Instant::now());
                extra_sent = false;
            } else {
                extra_sent = true;
            }
        }

        std::thread::sleep(HEARTBEAT_TICK);
    }
    debug!("heartbeat loop exited");
}

fn receive_loop(socket: &UdpSocket, slot: &LatestFrameSlot, shared: &Shared) {
    let mut decoder = Gt7Decoder::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while shared.is_running() {
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                shared.packets.fetch_add(1, Ordering::Relaxed);
                let packet = buf.get(..len).unwrap_or_default();
                match decoder.decode(packet) {
                    Some(frame) => {
                        shared
                            .last_packet_ns
                            .store(frame.timestamp_ns, Ordering::Release);
                        slot.publish(frame);
                        shared.frames.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {
                        shared.rejected.fetch_add(1, Ordering::Relaxed);
                        trace!(len, src = %src, "dropped GT7 packet");
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                if !shared.is_running() {
                    break;
                }
                warn!(error = %e, "GT7 UDP receive error");
                std::thread::sleep(RECV_ERROR_BACKOFF);
            }
        }
    }
    debug!("receive loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_protocol_ports() {
        let config = ClientConfig::default();
        assert_eq!(config.recv_port, 33740);
        assert_eq!(config.heartbeat_port, 33739);
        assert_eq!(config.recv_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_stopped_client_has_no_age() {
        let client = TelemetryClient::new(ClientConfig::default());
        assert!(!client.is_running());
        assert!(client.last_packet_age().is_none());
        assert!(client.take_latest().is_none());
        assert_eq!(client.stats().packets, 0);
    }
}
