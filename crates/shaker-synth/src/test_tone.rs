//! Short decaying tone used to check which physical shaker each channel
//! drives.

use crate::oscillator::{Phase, angular_step, finish_sample};

/// Tone frequency (Hz).
pub const TONE_FREQ_HZ: f32 = 60.0;
/// Number of buffers the tone lasts.
pub const TONE_BUFFERS: u32 = 25;
/// Amplitude multiplier applied after each buffer.
pub const TONE_DECAY: f32 = 0.9;

/// Which channel(s) a test tone plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToneSide {
    /// Channel 0.
    Rear,
    /// Channel 1.
    Front,
    /// Both channels.
    Both,
}

impl ToneSide {
    const fn gains(self) -> (f32, f32) {
        match self {
            Self::Rear => (1.0, 0.0),
            Self::Front => (0.0, 1.0),
            Self::Both => (1.0, 1.0),
        }
    }
}

impl std::str::FromStr for ToneSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rear" => Ok(Self::Rear),
            "front" => Ok(Self::Front),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown side '{other}', expected rear, front or both")),
        }
    }
}

/// A one-shot tone that replaces the mixer output while it plays.
#[derive(Debug, Clone)]
pub struct TestTone {
    side: ToneSide,
    phase: Phase,
    step: f64,
    amplitude: f32,
    remaining: u32,
}

impl TestTone {
    /// Start a tone on `side` at `sample_rate`.
    #[must_use]
    pub fn new(side: ToneSide, sample_rate: f32) -> Self {
        Self {
            side,
            phase: Phase::new(),
            step: angular_step(TONE_FREQ_HZ, sample_rate),
            amplitude: 1.0,
            remaining: TONE_BUFFERS,
        }
    }

    /// Side the tone plays on.
    #[must_use]
    pub const fn side(&self) -> ToneSide {
        self.side
    }

    /// Buffers left to play.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// `true` once every buffer has been rendered.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Render the next buffer into `rear` and `front` (overwritten).
    ///
    /// Returns `false`, leaving the buffers untouched, once finished.
    pub fn render(&mut self, rear: &mut [f32], front: &mut [f32], safe_gain: f32) -> bool {
        if self.is_finished() {
            return false;
        }
        let (g_rear, g_front) = self.side.gains();
        let amp = self.amplitude * safe_gain;
        let len = rear.len().min(front.len());
        rear.fill(0.0);
        front.fill(0.0);
        for (i, (r, f)) in rear.iter_mut().zip(front.iter_mut()).enumerate() {
            let s = self.phase.offset(self.step, i).sin() as f32 * amp;
            *r = finish_sample(s * g_rear, 1.0);
            *f = finish_sample(s * g_front, 1.0);
        }
        self.phase.advance(self.step, len);
        self.amplitude *= TONE_DECAY;
        self.remaining = self.remaining.saturating_sub(1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_rear_tone_leaves_front_silent() {
        let mut tone = TestTone::new(ToneSide::Rear, 48_000.0);
        let mut rear = vec![0.0f32; 512];
        let mut front = vec![1.0f32; 512];
        assert!(tone.render(&mut rear, &mut front, 0.42));
        assert!(front.iter().all(|s| s.abs() < f32::EPSILON));
        assert!(rear.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_tone_decays_and_finishes() {
        let mut tone = TestTone::new(ToneSide::Both, 48_000.0);
        let mut rear = vec![0.0f32; 800];
        let mut front = vec![0.0f32; 800];
        assert!(tone.render(&mut rear, &mut front, 0.42));
        let first_peak = rear.iter().fold(0.0f32, |m, s| m.max(s.abs()));

        let mut rendered = 1;
        while tone.render(&mut rear, &mut front, 0.42) {
            rendered += 1;
        }
        let last_peak = rear.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert_eq!(rendered, TONE_BUFFERS);
        assert!(last_peak < first_peak * 0.2);
        assert!(tone.is_finished());
        assert!(!tone.render(&mut rear, &mut front, 0.42));
    }

    #[test]
    fn test_side_parsing() -> TestResult {
        assert_eq!("FRONT".parse::<ToneSide>()?, ToneSide::Front);
        assert_eq!("both".parse::<ToneSide>()?, ToneSide::Both);
        assert!("left".parse::<ToneSide>().is_err());
        Ok(())
    }
}
