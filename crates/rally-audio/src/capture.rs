use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use crate::error::AudioError;
use crate::fft::SnapshotPipeline;
use crate::snapshot::{FrequencySnapshot, SnapshotSource};

/// FFT window size, matching the analyser contract the heuristic expects.
const FFT_SIZE: usize = 2048;

/// Live microphone snapshot source: cpal capture plus windowed FFT.
///
/// The cpal callback downmixes to mono and pushes samples into a lock-free
/// ring buffer; `poll` drains the buffer into a rolling window and runs the
/// FFT over the most recent `FFT_SIZE` samples. Created closed; `open`
/// acquires the device and `close` releases it.
///
/// # Example
/// ```no_run
/// use rally_audio::capture::MicSource;
/// use rally_audio::snapshot::SnapshotSource;
/// let mut source = MicSource::new();
/// source.open().unwrap();
/// ```
pub struct MicSource {
    inner: Option<OpenCapture>,
    pipeline: SnapshotPipeline,
    /// Rolling window of the most recent mono samples.
    window: Vec<f32>,
    drain_buf: Vec<f32>,
}

struct OpenCapture {
    stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
}

impl MicSource {
    /// Create a closed source. No hardware is touched until `open`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: None,
            pipeline: SnapshotPipeline::new(FFT_SIZE),
            window: Vec::with_capacity(FFT_SIZE),
            drain_buf: Vec::new(),
        }
    }

    fn acquire() -> Result<OpenCapture, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no input device found".into()))?;

        let config = device
            .default_input_config()
            .map_err(|err| map_cpal_error(&err.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // Ring buffer: 2 seconds of audio @ sample_rate
        let buf_size = sample_rate as usize * 2;
        let (mut producer, consumer) = RingBuffer::new(buf_size);

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Downmix to mono and push into the ring buffer
                    for chunk in data.chunks(channels) {
                        let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                        let _ = producer.push(mono);
                    }
                },
                |err| {
                    log::error!("audio stream error: {err}");
                },
                None,
            )
            .map_err(|err| map_cpal_error(&err.to_string()))?;

        // If play fails the stream drops here, so a partially opened capture
        // never leaks past this function.
        stream
            .play()
            .map_err(|err| map_cpal_error(&err.to_string()))?;

        Ok(OpenCapture {
            stream,
            consumer,
            sample_rate,
        })
    }
}

impl Default for MicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for MicSource {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.inner.is_some() {
            // Already capturing: reuse the existing handle.
            return Ok(());
        }
        let capture = Self::acquire()?;
        log::info!("microphone capture started @ {}Hz", capture.sample_rate);
        self.inner = Some(capture);
        self.window.clear();
        Ok(())
    }

    fn poll(&mut self) -> Option<FrequencySnapshot> {
        let capture = self.inner.as_mut()?;

        self.drain_buf.clear();
        while let Ok(sample) = capture.consumer.pop() {
            self.drain_buf.push(sample);
        }
        self.window.extend_from_slice(&self.drain_buf);
        if self.window.len() > FFT_SIZE {
            self.window.drain(0..self.window.len() - FFT_SIZE);
        }

        if self.window.len() < FFT_SIZE {
            return None;
        }

        let bins = self.pipeline.process(&self.window);
        Some(FrequencySnapshot {
            bins,
            sample_rate: capture.sample_rate,
        })
    }

    fn close(&mut self) {
        if let Some(capture) = self.inner.take() {
            // Dropping the cpal stream stops and releases the device.
            drop(capture.stream);
            log::info!("microphone capture released");
        }
        self.window.clear();
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a cpal error message onto the capture error contract.
///
/// cpal reports permission problems as backend-specific errors, so the text
/// is the only portable signal.
fn map_cpal_error(message: &str) -> AudioError {
    let lower = message.to_lowercase();
    if lower.contains("denied") || lower.contains("permission") {
        AudioError::PermissionDenied
    } else {
        AudioError::DeviceUnavailable(message.to_string())
    }
}
