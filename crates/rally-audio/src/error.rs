use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Microphone access was denied by the platform or the user.
    #[error("microphone access denied")]
    PermissionDenied,

    /// No usable input device, or the device rejected the configuration.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The capture stream failed after it was opened.
    #[error("audio stream error: {0}")]
    Stream(String),
}
