//! System audio output through `cpal`.
//!
//! Only `f32` output is supported. A fixed buffer size is requested when the
//! device advertises it; otherwise the host default applies and the render
//! engine adapts to whatever length arrives.

use crate::backend::{AudioBackend, RenderCallback, StreamSpec};
use crate::error::{StreamError, StreamResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, warn};

/// Backend on the platform default audio host.
pub struct CpalBackend {
    host: cpal::Host,
}

impl std::fmt::Debug for CpalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalBackend")
            .field("host", &self.host.id())
            .finish()
    }
}

impl CpalBackend {
    /// Use the default host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Names of the available output devices.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot enumerate devices.
    pub fn output_device_names(&self) -> StreamResult<Vec<String>> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| StreamError::device_unavailable(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn find_device(&self, name: Option<&str>) -> StreamResult<cpal::Device> {
        match name {
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| StreamError::device_unavailable("no default output device")),
            Some(wanted) => self
                .host
                .output_devices()
                .map_err(|e| StreamError::device_unavailable(e.to_string()))?
                .find(|d| d.name().is_ok_and(|n| n == wanted))
                .ok_or_else(|| {
                    StreamError::device_unavailable(format!("no output device named '{wanted}'"))
                }),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Stream = cpal::Stream;

    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(
        &mut self,
        spec: &StreamSpec,
        mut callback: RenderCallback,
    ) -> StreamResult<cpal::Stream> {
        let device = self.find_device(spec.device.as_deref())?;
        let config = cpal::StreamConfig {
            channels: StreamSpec::CHANNELS,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: buffer_size_for(&device, spec),
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback(data),
                |e| warn!(error = %e, "audio stream error"),
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::StreamConfigNotSupported => StreamError::UnsupportedConfig(
                    format!("{} Hz stereo f32", spec.sample_rate),
                ),
                other => StreamError::build(other.to_string()),
            })?;
        stream.play().map_err(|e| StreamError::Play(e.to_string()))?;
        Ok(stream)
    }
}

fn buffer_size_for(device: &cpal::Device, spec: &StreamSpec) -> cpal::BufferSize {
    let Ok(mut configs) = device.supported_output_configs() else {
        return cpal::BufferSize::Default;
    };
    let fits = configs.any(|c| {
        c.channels() >= StreamSpec::CHANNELS
            && c.sample_format() == cpal::SampleFormat::F32
            && matches!(
                c.buffer_size(),
                cpal::SupportedBufferSize::Range { min, max }
                    if (*min..=*max).contains(&spec.buffer_frames)
            )
    });
    if fits {
        cpal::BufferSize::Fixed(spec.buffer_frames)
    } else {
        debug!(
            buffer_frames = spec.buffer_frames,
            "fixed buffer size not supported, using device default"
        );
        cpal::BufferSize::Default
    }
}
