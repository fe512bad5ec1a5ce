//! # shaker-stream
//!
//! Audio device lifecycle for the shaker rig.
//!
//! ## Architecture
//!
//! - [`backend`] - the [`AudioBackend`] seam and stream parameters
//! - [`null_backend`] - headless paced backend
//! - `cpal_backend` - system audio output (feature `cpal`)
//! - [`render`] - per-callback pipeline with silence on failure
//! - [`mute`] - mute rules and stagnation tracking
//! - [`supervisor`] - wake/sleep state machine and callback watchdog
//!
//! ## Threads
//!
//! The supervisor polls on its own thread and is the only consumer of the
//! telemetry slot. The audio callback runs on the backend's thread and never
//! blocks: frames arrive through a `try_lock` hand-off and the render engine
//! is reached through `try_lock` as well.
//!
//! ## Example
//!
//! ```rust
//! use shaker_config::ShakerConfig;
//! use shaker_stream::prelude::*;
//! use shaker_synth::MetricsCell;
//! use shaker_telemetry_gt7::LatestFrameSlot;
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let slot = Arc::new(LatestFrameSlot::new());
//! let mut supervisor = StreamSupervisor::new(
//!     NullBackend::new(),
//!     Arc::new(ShakerConfig::default()),
//!     Arc::clone(&slot),
//!     Arc::new(MetricsCell::new()),
//! );
//!
//! // No telemetry: the device stays closed.
//! supervisor.tick(Instant::now());
//! assert_eq!(supervisor.state(), SessionState::Closed);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod backend;
#[cfg(feature = "cpal")]
pub mod cpal_backend;
pub mod error;
pub mod mute;
pub mod null_backend;
pub mod render;
pub mod supervisor;

pub mod prelude;

pub use backend::{AudioBackend, RenderCallback, StreamSpec};
#[cfg(feature = "cpal")]
pub use cpal_backend::CpalBackend;
pub use error::{StreamError, StreamResult};
pub use mute::{StagnationTracker, mute_decision};
pub use null_backend::{NullBackend, NullStream};
pub use render::{
    CallbackLink, MIN_SCRATCH_FRAMES, RenderEngine, guarded_render, interleave, tone_callback,
};
pub use supervisor::{SessionState, StreamSupervisor, SupervisorHandle, SupervisorStatus};
