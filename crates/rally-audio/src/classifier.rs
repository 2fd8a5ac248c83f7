use std::collections::VecDeque;

use crate::features::BandFeatures;

/// Sliding window of recent levels kept for attack detection.
const HISTORY_LEN: usize = 10;
/// Number of snapshots used to calibrate the noise floor.
const CALIBRATION_SAMPLES: u32 = 100;
/// Attack-ratio window (newest sample included).
const ATTACK_WINDOW: usize = 5;
/// A counted hit must exceed its recent average by this factor.
const MIN_ATTACK_RATIO: f32 = 2.5;
/// Minimum high-to-low frequency energy ratio for an impact signature.
const MIN_HIGH_FREQ_RATIO: f32 = 0.8;

/// Adaptive paddle-hit classifier.
///
/// Owns the calibrated noise floor (running mean of the first 100 observed
/// levels, frozen thereafter) and a 10-sample level history. Per snapshot,
/// `observe` feeds both; `classify` then applies four ordered checks, any of
/// which rejects:
///
/// 1. level below `max(sensitivity/100, noise_floor * 3)`
/// 2. attack ratio below 2.5 against the recent average (skipped until at
///    least 3 history samples exist)
/// 3. high-frequency energy ratio below 0.8
/// 4. neither high band individually carries the adaptive threshold
///
/// The epsilon terms in the two ratios (0.01 and 1) keep the divisions
/// finite and must not be removed.
///
/// # Example
/// ```
/// use rally_audio::HitClassifier;
/// let classifier = HitClassifier::new();
/// assert!(classifier.is_calibrating());
/// ```
pub struct HitClassifier {
    /// Recent `current_level` samples, oldest first.
    history: VecDeque<f32>,
    /// Running mean of observed levels, frozen after calibration.
    noise_floor: f32,
    /// How many samples have fed the noise floor so far.
    calibrated: u32,
}

impl HitClassifier {
    /// Create a classifier with empty history and an uncalibrated floor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_LEN),
            noise_floor: 0.0,
            calibrated: 0,
        }
    }

    /// Feed one snapshot's level into the history and, during the
    /// calibration phase, into the noise floor's incremental mean.
    pub fn observe(&mut self, current_level: f32) {
        self.history.push_back(current_level);
        if self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }

        if self.calibrated < CALIBRATION_SAMPLES {
            self.noise_floor = (self.noise_floor * self.calibrated as f32 + current_level)
                / (self.calibrated + 1) as f32;
            self.calibrated += 1;
        }
    }

    /// Decide whether the snapshot just observed was a paddle hit.
    ///
    /// Checks run in a fixed order and short-circuit on the first failure.
    #[must_use]
    pub fn classify(&self, features: &BandFeatures, sensitivity_percent: u8) -> bool {
        let base_threshold = f32::from(sensitivity_percent) / 100.0;
        let adaptive_threshold = base_threshold.max(self.noise_floor * 3.0);

        // 1. Volume gate: quiet frames can never be hits.
        if features.current_level < adaptive_threshold {
            return false;
        }

        // 2. Sharp attack: the level must jump well above the recent
        // average. Impacts spike; speech and sustained tones ramp.
        let recent_len = self.history.len().min(ATTACK_WINDOW);
        if recent_len > 2 {
            let start = self.history.len() - recent_len;
            let prior: f32 = self
                .history
                .range(start..self.history.len() - 1)
                .sum::<f32>();
            let recent_avg = prior / (recent_len - 1) as f32;
            let attack_ratio = features.current_level / (recent_avg + 0.01);
            if attack_ratio < MIN_ATTACK_RATIO {
                return false;
            }
        }

        // 3. Frequency signature: impact energy sits above 3 kHz, speech
        // below.
        let high_freq_ratio =
            (features.high_avg + features.very_high_avg) / (features.low_mid_avg + 1.0);
        if high_freq_ratio < MIN_HIGH_FREQ_RATIO {
            return false;
        }

        // 4. The ratio alone is not enough: at least one high band must
        // carry the adaptive threshold's worth of energy itself.
        let normalized_high = features.high_avg / 255.0;
        let normalized_very_high = features.very_high_avg / 255.0;
        if normalized_high < adaptive_threshold && normalized_very_high < adaptive_threshold {
            return false;
        }

        true
    }

    /// Clear history and calibration. Called at every detection start.
    pub fn reset(&mut self) {
        self.history.clear();
        self.noise_floor = 0.0;
        self.calibrated = 0;
    }

    /// Calibrated ambient level.
    #[must_use]
    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    /// `true` while the noise floor is still averaging its first samples.
    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        self.calibrated < CALIBRATION_SAMPLES
    }
}

impl Default for HitClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(current_level: f32, high: f32, very_high: f32, low_mid: f32) -> BandFeatures {
        BandFeatures {
            current_level,
            low_mid_avg: low_mid,
            high_avg: high,
            very_high_avg: very_high,
            normalized_level: current_level,
        }
    }

    #[test]
    fn quiet_frame_never_registers() {
        let mut c = HitClassifier::new();
        let f = features(0.1, 200.0, 200.0, 10.0);
        c.observe(f.current_level);
        // sensitivity 25 -> threshold at least 0.25
        assert!(!c.classify(&f, 25));
    }

    #[test]
    fn noise_floor_scales_the_threshold() {
        let mut c = HitClassifier::new();
        // Loud ambient: floor calibrates near 0.3, threshold becomes ~0.9.
        for _ in 0..50 {
            c.observe(0.3);
        }
        let f = features(0.5, 220.0, 200.0, 10.0);
        c.observe(f.current_level);
        assert!(!c.classify(&f, 25));
    }

    #[test]
    fn sustained_tone_fails_the_attack_check() {
        let mut c = HitClassifier::new();
        // Scenario A: 60 identical loud snapshots produce zero hits.
        let f = features(0.5, 200.0, 180.0, 50.0);
        let mut hits = 0;
        for _ in 0..60 {
            c.observe(f.current_level);
            if c.classify(&f, 25) {
                hits += 1;
            }
        }
        assert_eq!(hits, 0);
    }

    #[test]
    fn isolated_transient_registers_once() {
        let mut c = HitClassifier::new();
        let baseline = features(0.05, 40.0, 30.0, 60.0);
        let spike = features(0.6, 220.0, 200.0, 60.0);

        let mut hits = 0;
        for _ in 0..30 {
            c.observe(baseline.current_level);
            if c.classify(&baseline, 25) {
                hits += 1;
            }
        }
        c.observe(spike.current_level);
        if c.classify(&spike, 25) {
            hits += 1;
        }
        for _ in 0..30 {
            c.observe(baseline.current_level);
            if c.classify(&baseline, 25) {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
    }

    #[test]
    fn sustained_loudness_counts_only_the_leading_edge() {
        let mut c = HitClassifier::new();
        // Calibrate on silence so the volume gate sits at sensitivity/100.
        for _ in 0..100 {
            c.observe(0.0);
        }
        // The jump passes while the recent average still reflects silence
        // (two frames); the plateau then keeps failing the attack check no
        // matter how loud it is.
        let f = features(0.5, 200.0, 180.0, 50.0);
        let mut hits = 0;
        for _ in 0..20 {
            c.observe(f.current_level);
            if c.classify(&f, 25) {
                hits += 1;
            }
        }
        assert_eq!(hits, 2);
    }

    #[test]
    fn speech_signature_fails_the_frequency_check() {
        let mut c = HitClassifier::new();
        let baseline = features(0.02, 5.0, 5.0, 5.0);
        for _ in 0..10 {
            c.observe(baseline.current_level);
        }
        // Loud and sharp, but energy concentrated below 3 kHz.
        let f = features(0.8, 60.0, 40.0, 200.0);
        c.observe(f.current_level);
        assert!(!c.classify(&f, 25));
    }

    #[test]
    fn weak_high_bands_fail_the_final_check() {
        let mut c = HitClassifier::new();
        let baseline = features(0.02, 5.0, 5.0, 5.0);
        for _ in 0..10 {
            c.observe(baseline.current_level);
        }
        // Ratio passes (high/low is large) but neither high band reaches
        // the adaptive threshold on its own.
        let f = features(0.4, 50.0, 40.0, 2.0);
        c.observe(f.current_level);
        assert!(!c.classify(&f, 25));
    }

    #[test]
    fn calibration_freezes_after_100_samples() {
        let mut c = HitClassifier::new();
        for _ in 0..100 {
            c.observe(0.1);
        }
        assert!(!c.is_calibrating());
        let frozen = c.noise_floor();
        for _ in 0..50 {
            c.observe(0.9);
        }
        assert!((c.noise_floor() - frozen).abs() < f32::EPSILON);
    }

    #[test]
    fn history_is_capped_at_ten() {
        let mut c = HitClassifier::new();
        for i in 0..25 {
            c.observe(i as f32 / 25.0);
        }
        assert_eq!(c.history.len(), 10);
    }

    #[test]
    fn reset_clears_calibration_and_history() {
        let mut c = HitClassifier::new();
        for _ in 0..100 {
            c.observe(0.2);
        }
        c.reset();
        assert!(c.is_calibrating());
        assert_eq!(c.noise_floor(), 0.0);
        assert!(c.history.is_empty());
    }
}
