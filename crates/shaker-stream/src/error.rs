//! Error types for the audio stream.
//!
//! Nothing here reaches the audio callback: failures inside a callback are
//! converted to a silent buffer and counted instead.

use thiserror::Error;

/// Stream error.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// No output device, or the named device does not exist.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device rejected the requested stream parameters.
    #[error("unsupported stream config: {0}")]
    UnsupportedConfig(String),

    /// The backend failed to build the stream.
    #[error("failed to build stream: {0}")]
    Build(String),

    /// The stream was built but could not be started.
    #[error("failed to start stream: {0}")]
    Play(String),

    /// The backend could not be initialised.
    #[error("audio backend init failed: {0}")]
    BackendInit(String),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {reason}")]
    Spawn {
        /// Thread name.
        name: &'static str,
        /// Spawn failure reason.
        reason: String,
    },
}

impl StreamError {
    /// Create a device-unavailable error.
    #[must_use]
    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable(reason.into())
    }

    /// Create a build error.
    #[must_use]
    pub fn build(reason: impl Into<String>) -> Self {
        Self::Build(reason.into())
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

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
