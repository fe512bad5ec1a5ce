//! # shaker-telemetry-gt7
//!
//! Gran Turismo 7 telemetry client for the haptic shaker pipeline.
//!
//! The console broadcasts 296-byte Salsa20-encrypted UDP packets to any host
//! that keeps sending a one-byte heartbeat. This crate decrypts and decodes
//! those packets into immutable [`TelemetryFrame`]s and publishes only the
//! newest one through a [`LatestFrameSlot`].
//!
//! ## Architecture
//!
//! - [`protocol`] - ports, key, offsets and the decryption step
//! - [`frame`] - the decoded, immutable telemetry snapshot
//! - [`smoothing`] - RPM ring-buffer smoothing and surge/sway estimation
//! - [`decoder`] - stateful packet decoder tying the above together
//! - [`slot`] - single-slot, last-write-wins frame hand-off
//! - [`client`] - heartbeat and receive threads around a UDP socket
//! - [`error`] - client error types
//!
//! ## Failure model
//!
//! Undersized packets, packets that fail the magic check and socket read
//! timeouts are steady-state events. [`Gt7Decoder::decode_at`] returns `None`
//! for rejected packets and the previous frame stays current.
//!
//! ## Example
//!
//! ```rust
//! use shaker_telemetry_gt7::prelude::*;
//!
//! let mut decoder = Gt7Decoder::new();
//! // Too short to be a GT7 packet.
//! assert!(decoder.decode_at(&[0u8; 64], 0).is_none());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod client;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod slot;
pub mod smoothing;

pub mod prelude;

pub use client::{ClientConfig, ClientStats, TelemetryClient};
pub use decoder::Gt7Decoder;
pub use error::{TelemetryError, TelemetryResult};
pub use frame::{RaceFlags, TelemetryFrame, Wheels};
pub use slot::LatestFrameSlot;
pub use smoothing::{AccelerationTracker, RpmSmoother};

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic nanoseconds since the first call in this process.
///
/// Used to timestamp frames and packet arrivals without wall-clock jumps.
#[must_use]
pub fn telemetry_now_ns() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
