//! Headless backend: a paced thread invoking the callback once per buffer
//! period and discarding the output.

use crate::backend::{AudioBackend, RenderCallback, StreamSpec};
use crate::error::{StreamError, StreamResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Backend with no device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    /// Create the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Stream handle of [`NullBackend`].
#[derive(Debug)]
pub struct NullStream {
    running: Arc<AtomicBool>,
    callbacks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl NullStream {
    /// Callbacks invoked so far.
    #[must_use]
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                debug!("null stream thread panicked");
            }
        }
    }
}

impl AudioBackend for NullBackend {
    type Stream = NullStream;

    fn name(&self) -> &'static str {
        "null"
    }

    fn open(
        &mut self,
        spec: &StreamSpec,
        mut callback: RenderCallback,
    ) -> StreamResult<NullStream> {
        if spec.sample_rate == 0 || spec.buffer_frames == 0 {
            return Err(StreamError::UnsupportedConfig(format!(
                "{} Hz x {} frames",
                spec.sample_rate, spec.buffer_frames
            )));
        }
        let period = spec.buffer_period().max(MIN_PERIOD);
        let samples = usize::try_from(spec.buffer_frames)
            .map_err(|e| StreamError::UnsupportedConfig(e.to_string()))?
            .saturating_mul(usize::from(StreamSpec::CHANNELS));

        let running = Arc::new(AtomicBool::new(true));
        let callbacks = Arc::new(AtomicU64::new(0));
        let thread = {
            let running = Arc::clone(&running);
            let callbacks = Arc::clone(&callbacks);
            std::thread::Builder::new()
                .name("null-audio".into())
                .spawn(move || {
                    let mut buffer = vec![0.0f32; samples];
                    let mut deadline = Instant::now();
                    while running.load(Ordering::Acquire) {
                        callback(&mut buffer);
                        callbacks.fetch_add(1, Ordering::Relaxed);
                        deadline += period;
                        let now = Instant::now();
                        if deadline > now {
                            std::thread::sleep(deadline.saturating_duration_since(now));
                        } else {
                            deadline = now;
                        }
                    }
                })
                .map_err(|e| StreamError::spawn("null-audio", e.to_string()))?
        };

        debug!(period_ms = period.as_millis(), "null stream started");
        Ok(NullStream {
            running,
            callbacks,
            thread: Some(thread),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_null_stream_paces_callbacks() -> TestResult {
        let seen = Arc::new(AtomicUsize::new(0));
        let spec = StreamSpec {
            device: None,
            sample_rate: 48_000,
            buffer_frames: 96,
        };
        let stream = {
            let seen = Arc::clone(&seen);
            NullBackend::new().open(
                &spec,
                Box::new(move |buf: &mut [f32]| {
                    seen.store(buf.len(), Ordering::Relaxed);
                }),
            )?
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(stream.callbacks() >= 2);
        drop(stream);
        assert_eq!(seen.load(Ordering::Relaxed), 192);
        Ok(())
    }

    #[test]
    fn test_zero_rate_rejected() {
        let spec = StreamSpec {
            device: None,
            sample_rate: 0,
            buffer_frames: 256,
        };
        let result = NullBackend::new().open(&spec, Box::new(|_: &mut [f32]| {}));
        assert!(matches!(result, Err(StreamError::UnsupportedConfig(_))));
    }
}
