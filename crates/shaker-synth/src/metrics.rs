//! Live metrics published once per audio buffer.
//!
//! The audio callback writes a [`LiveMetrics`] into a [`MetricsCell`] with
//! relaxed atomic stores; readers take a [`MetricsCell::snapshot`] at their
//! own pace. No locks on either side.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// One buffer's worth of effect levels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LiveMetrics {
    /// Suspension road-rumble level, `0..=2`.
    pub road_noise: f32,
    /// Suspension impact level, `0..=4`.
    pub g_force: f32,
    /// Simulated road peak level.
    pub sim_road: f32,
    /// Front traction/ABS trigger.
    pub traction_front: f32,
    /// Rear traction/ABS trigger.
    pub traction_rear: f32,
}

#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Lock-free holder for the latest [`LiveMetrics`].
#[derive(Debug, Default)]
pub struct MetricsCell {
    road_noise: AtomicF32,
    g_force: AtomicF32,
    sim_road: AtomicF32,
    traction_front: AtomicF32,
    traction_rear: AtomicF32,
    updates: AtomicU64,
}

impl MetricsCell {
    /// Create a zeroed cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new set of values. RT-safe.
    pub fn publish(&self, metrics: &LiveMetrics) {
        self.road_noise.store(metrics.road_noise);
        self.g_force.store(metrics.g_force);
        self.sim_road.store(metrics.sim_road);
        self.traction_front.store(metrics.traction_front);
        self.traction_rear.store(metrics.traction_rear);
        self.updates.fetch_add(1, Ordering::Release);
    }

    /// Read the latest values.
    ///
    /// Fields are loaded individually and may straddle two publishes.
    #[must_use]
    pub fn snapshot(&self) -> LiveMetrics {
        LiveMetrics {
            road_noise: self.road_noise.load(),
            g_force: self.g_force.load(),
            sim_road: self.sim_road.load(),
            traction_front: self.traction_front.load(),
            traction_rear: self.traction_rear.load(),
        }
    }

    /// Number of publishes so far.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}
