use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistent storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// A persisted value did not match the expected shape.
    #[error("malformed stored value under key \"{key}\"")]
    MalformedValue {
        /// Storage key holding the malformed value.
        key: String,
    },
}
