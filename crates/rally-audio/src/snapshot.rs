use crate::error::AudioError;

/// One frequency-magnitude sample taken at a scheduler tick.
///
/// Magnitudes are byte-scaled (0–255 per bin), matching the wire format the
/// classifier and feature extractor were tuned against. Ephemeral: produced,
/// consumed, and dropped within a single tick.
#[derive(Clone, Debug)]
pub struct FrequencySnapshot {
    /// Magnitude per frequency bin, 0–255.
    pub bins: Vec<u8>,
    /// Sample rate the snapshot was produced at, in Hz.
    pub sample_rate: u32,
}

impl FrequencySnapshot {
    /// Width of one frequency bin in Hz: `(sample_rate / 2) / bins`.
    #[must_use]
    pub fn bin_width_hz(&self) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        (self.sample_rate as f32 / 2.0) / self.bins.len() as f32
    }
}

/// Provides frequency snapshots to the detection pipeline.
///
/// Implemented by [`crate::capture::MicSource`] for live microphone input
/// and by scripted sources in tests.
///
/// Lifecycle contract:
/// - `open` acquires the capture resource. Opening an already-open source is
///   a no-op that reuses the existing handle.
/// - `open` must not leak partially acquired resources on failure.
/// - `poll` never blocks; it returns `None` when no fresh snapshot is
///   available (not yet enough samples, or the stream went silent).
/// - `close` releases the resource and is idempotent.
pub trait SnapshotSource: Send {
    /// Acquire the capture resource.
    ///
    /// # Errors
    /// [`AudioError::PermissionDenied`] or [`AudioError::DeviceUnavailable`]
    /// when the microphone cannot be acquired.
    fn open(&mut self) -> Result<(), AudioError>;

    /// Latest snapshot, if one is available this tick.
    fn poll(&mut self) -> Option<FrequencySnapshot>;

    /// Release the capture resource. Second and later calls are no-ops.
    fn close(&mut self);

    /// `true` while the capture resource is held.
    fn is_open(&self) -> bool;
}
