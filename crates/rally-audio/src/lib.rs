// Audio capture, spectral features, and hit classification for rallycounter.

pub mod capture;
pub mod classifier;
pub mod error;
pub mod features;
pub mod fft;
pub mod snapshot;

pub use classifier::HitClassifier;
pub use error::AudioError;
pub use features::{extract_band_features, BandFeatures};
pub use snapshot::{FrequencySnapshot, SnapshotSource};
