//! Per-callback mute rules and telemetry stagnation tracking.

use shaker_config::PlaybackMode;
use shaker_telemetry_gt7::TelemetryFrame;
use std::time::{Duration, Instant};

/// Output mutes once RPM and speed have held still this long.
pub const STAGNATION_TIMEOUT: Duration = Duration::from_millis(1500);
/// Smallest RPM or speed change that counts as movement.
pub const STAGNATION_EPSILON: f32 = 0.1;

/// Whether the next buffer must be silent.
///
/// Always mutes when stopped, without a frame, while loading, or when the
/// feed is stagnant. [`PlaybackMode::Strict`] also mutes when paused or off
/// track; [`PlaybackMode::Replay`] ignores those two flags.
#[must_use]
pub fn mute_decision(
    running: bool,
    frame: Option<&TelemetryFrame>,
    mode: PlaybackMode,
    stagnant: bool,
) -> bool {
    if !running || stagnant {
        return true;
    }
    let Some(frame) = frame else {
        return true;
    };
    if frame.flags.loading {
        return true;
    }
    match mode {
        PlaybackMode::Strict => frame.flags.paused || !frame.flags.on_track,
        PlaybackMode::Replay => false,
    }
}

/// Detects a frozen feed: a paused replay keeps sending identical packets
/// even when its flags say otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagnationTracker {
    reference: Option<(f32, f32)>,
    changed_at: Option<Instant>,
}

impl StagnationTracker {
    /// Create a tracker that has seen nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reference: None,
            changed_at: None,
        }
    }

    /// Record a frame observed at `now`.
    pub fn observe(&mut self, frame: &TelemetryFrame, now: Instant) {
        let moved = self.reference.is_none_or(|(rpm, speed)| {
            (frame.rpm - rpm).abs() > STAGNATION_EPSILON
                || (frame.speed_kmh - speed).abs() > STAGNATION_EPSILON
                || frame.rpm.is_nan()
                || frame.speed_kmh.is_nan()
        });
        if moved {
            self.reference = Some((frame.rpm, frame.speed_kmh));
            self.changed_at = Some(now);
        }
    }

    /// `true` once nothing has moved for [`STAGNATION_TIMEOUT`].
    #[must_use]
    pub fn is_stagnant(&self, now: Instant) -> bool {
        self.changed_at
            .is_some_and(|at| now.saturating_duration_since(at) >= STAGNATION_TIMEOUT)
    }

    /// Forget everything seen.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
