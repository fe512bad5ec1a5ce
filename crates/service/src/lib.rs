//! # shaker-service
//!
//! Application context and command-line surface of the `shakerd` daemon.
//!
//! [`ShakerApp`] owns every long-lived component explicitly: the telemetry
//! client, the live metrics cell and the stream supervisor. There are no
//! process-wide singletons; the configuration is an immutable snapshot
//! shared by `Arc`.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod app;
pub mod cli;
pub mod logging;

pub use app::{BackendKind, ShakerApp, client_config, play_test_tone};
pub use cli::{Cli, Command};
