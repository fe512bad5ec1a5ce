//! Audio backend seam.

use crate::error::StreamResult;
use shaker_config::ShakerConfig;
use std::time::Duration;

/// Render callback over an interleaved stereo `f32` buffer
/// (`[rear, front, rear, front, ..]`).
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Parameters of an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    /// Output device name, `None` for the system default.
    pub device: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per callback.
    pub buffer_frames: u32,
}

impl StreamSpec {
    /// Output channel count. Channel 0 is the rear shaker, channel 1 the
    /// front.
    pub const CHANNELS: u16 = 2;

    /// Stream parameters from the audio section of `config`.
    #[must_use]
    pub fn from_config(config: &ShakerConfig) -> Self {
        Self {
            device: config.audio.device.clone(),
            sample_rate: config.audio.sample_rate,
            buffer_frames: config.audio.buffer_size,
        }
    }

    /// Duration of one callback buffer.
    #[must_use]
    pub fn buffer_period(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.buffer_frames) / f64::from(self.sample_rate))
    }
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self::from_config(&ShakerConfig::default())
    }
}

/// Something that can open an output stream driving a [`RenderCallback`].
///
/// Implementations need not be `Send`: the supervisor creates its backend on
/// the thread that uses it.
pub trait AudioBackend {
    /// Open stream handle. Dropping it stops the stream and releases the
    /// device before `drop` returns.
    type Stream;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open and start a stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is missing, rejects `spec`, or the
    /// stream cannot be started.
    fn open(&mut self, spec: &StreamSpec, callback: RenderCallback) -> StreamResult<Self::Stream>;
}
