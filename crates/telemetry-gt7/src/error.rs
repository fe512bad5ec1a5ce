//! Error types for the telemetry client.
//!
//! Decode failures are not errors: rejected packets are dropped and the
//! decoder returns `None`. These variants cover socket setup and thread
//! lifecycle only.

use std::net::SocketAddr;
use thiserror::Error;

/// Telemetry client error.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The receive socket could not be bound.
    #[error("failed to bind telemetry socket on {addr}: {source}")]
    Bind {
        /// Local address that was requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The console address could not be parsed.
    #[error("invalid console address '{0}'")]
    InvalidConsoleAddress(String),

    /// A socket option or send failed.
    #[error("telemetry socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A background thread could not be started.
    #[error("failed to spawn {name} thread: {reason}")]
    Spawn {
        /// Thread name.
        name: &'static str,
        /// Spawn failure reason.
        reason: String,
    },

    /// The client is already running.
    #[error("telemetry client already running")]
    AlreadyRunning,
}

impl TelemetryError {
    /// Create a bind error.
    #[must_use]
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }

    /// Create a spawn error.
    #[must_use]
    pub fn spawn(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Spawn {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for telemetry client operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
