use serde::{Deserialize, Serialize};

use crate::store::{self, KeyValueStore};
use crate::SETTINGS_KEY;

/// User-tunable detection settings, persisted as JSON.
///
/// Read once per session start; edits made while a session is running take
/// effect on the next start. Each field has a sane default.
///
/// # Example
/// ```
/// use rally_core::Settings;
/// let settings = Settings::default();
/// assert_eq!(settings.sensitivity, 25);
/// assert_eq!(settings.min_hit_interval_ms, 200);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Detection sensitivity in percent [1, 95]. Lower = more sensitive.
    pub sensitivity: u8,
    /// Minimum interval between two counted hits, in milliseconds.
    #[serde(rename = "minHitInterval")]
    pub min_hit_interval_ms: u64,
    /// Inactivity timeout in seconds. 0 = session never times out.
    #[serde(rename = "sessionTimeout")]
    pub session_timeout_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: 25,
            min_hit_interval_ms: 200,
            session_timeout_secs: 3.0,
        }
    }
}

impl Settings {
    /// Clamp all fields to their valid ranges.
    /// Called after deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.sensitivity = self.sensitivity.clamp(1, 95);
        self.min_hit_interval_ms = self.min_hit_interval_ms.clamp(50, 2000);
        self.session_timeout_secs = self.session_timeout_secs.clamp(0.0, 600.0);
    }

    /// Load settings from the store, falling back to defaults on missing or
    /// corrupt data. The result is always clamped.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut settings: Self = store::read_or_default(store, SETTINGS_KEY);
        settings.clamp_all();
        settings
    }
}

/// Immutable snapshot of the detection parameters for one run.
///
/// Captured from [`Settings`] when detection starts; never changes for the
/// duration of that run, even if the underlying settings are edited.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionConfig {
    /// Detection sensitivity in percent [1, 95].
    pub sensitivity: u8,
    /// Minimum interval between two counted hits, in milliseconds.
    pub min_hit_interval_ms: u64,
    /// Lower bound of the analyzed frequency range, in Hz.
    pub frequency_min_hz: f32,
    /// Upper bound of the analyzed frequency range, in Hz.
    pub frequency_max_hz: f32,
}

impl DetectionConfig {
    /// Paddle impacts concentrate between 2 and 8 kHz.
    pub const FREQUENCY_MIN_HZ: f32 = 2000.0;
    /// Upper edge of the analyzed range.
    pub const FREQUENCY_MAX_HZ: f32 = 8000.0;

    /// Snapshot the run-time detection parameters from settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sensitivity: settings.sensitivity,
            min_hit_interval_ms: settings.min_hit_interval_ms,
            frequency_min_hz: Self::FREQUENCY_MIN_HZ,
            frequency_max_hz: Self::FREQUENCY_MAX_HZ,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.sensitivity, 25);
        assert_eq!(s.min_hit_interval_ms, 200);
        assert!((s.session_timeout_secs - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_all_bounds_sensitivity() {
        let mut s = Settings {
            sensitivity: 0,
            ..Settings::default()
        };
        s.clamp_all();
        assert_eq!(s.sensitivity, 1);

        s.sensitivity = 100;
        s.clamp_all();
        assert_eq!(s.sensitivity, 95);
    }

    #[test]
    fn load_falls_back_to_defaults_on_corrupt_value() {
        let mut store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, serde_json::json!("not an object"))
            .ok();
        let s = Settings::load(&store);
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn load_clamps_persisted_values() {
        let mut store = MemoryStore::new();
        store
            .set(
                SETTINGS_KEY,
                serde_json::json!({
                    "sensitivity": 99,
                    "minHitInterval": 10,
                    "sessionTimeout": -5.0
                }),
            )
            .ok();
        let s = Settings::load(&store);
        assert_eq!(s.sensitivity, 95);
        assert_eq!(s.min_hit_interval_ms, 50);
        assert!((s.session_timeout_secs - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn detection_config_snapshots_settings() {
        let s = Settings {
            sensitivity: 40,
            min_hit_interval_ms: 300,
            session_timeout_secs: 0.0,
        };
        let cfg = DetectionConfig::from_settings(&s);
        assert_eq!(cfg.sensitivity, 40);
        assert_eq!(cfg.min_hit_interval_ms, 300);
        assert!((cfg.frequency_min_hz - 2000.0).abs() < f32::EPSILON);
        assert!((cfg.frequency_max_hz - 8000.0).abs() < f32::EPSILON);
    }
}
