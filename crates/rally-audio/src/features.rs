use rally_core::DetectionConfig;

use crate::snapshot::FrequencySnapshot;

/// Banded energy features of one snapshot.
///
/// Band averages stay on the 0–255 byte scale; the two levels are
/// normalized to [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandFeatures {
    /// `max(low_mid_avg, high_avg, very_high_avg) / 255`.
    pub current_level: f32,
    /// Average magnitude over the low-mid band (range start up to 3 kHz).
    pub low_mid_avg: f32,
    /// Average magnitude over the high band (3–6 kHz).
    pub high_avg: f32,
    /// Average magnitude over the very-high band (6 kHz up to range end).
    pub very_high_avg: f32,
    /// Display-oriented level: `max(overall_avg/255, peak/255 * 0.7)`.
    pub normalized_level: f32,
}

/// Extract banded energy features from one snapshot.
///
/// Pure function of the snapshot and the run's frequency range. The low-mid
/// band covers typical impact body, the high band the paddle "crack" (its
/// peak magnitude also feeds the display level), and the very-high band
/// helps separate impacts from speech.
///
/// Band boundaries that fall outside the snapshot are clamped, and an empty
/// band averages to 0.0 so downstream ratios stay finite.
#[must_use]
pub fn extract_band_features(
    snapshot: &FrequencySnapshot,
    config: &DetectionConfig,
) -> BandFeatures {
    let bin_width = snapshot.bin_width_hz();
    if bin_width <= 0.0 {
        return BandFeatures::default();
    }

    let len = snapshot.bins.len();
    let min_bin = ((config.frequency_min_hz / bin_width) as usize).min(len);
    let max_bin = ((config.frequency_max_hz / bin_width) as usize).min(len);
    let low_mid_bin = ((3000.0 / bin_width) as usize).clamp(min_bin, max_bin);
    let high_mid_bin = ((6000.0 / bin_width) as usize).clamp(low_mid_bin, max_bin);

    let (low_mid_sum, _) = band_sum(&snapshot.bins, min_bin, low_mid_bin);
    let (high_sum, peak) = band_sum(&snapshot.bins, low_mid_bin, high_mid_bin);
    let (very_high_sum, _) = band_sum(&snapshot.bins, high_mid_bin, max_bin);

    let low_mid_avg = band_avg(low_mid_sum, min_bin, low_mid_bin);
    let high_avg = band_avg(high_sum, low_mid_bin, high_mid_bin);
    let very_high_avg = band_avg(very_high_sum, high_mid_bin, max_bin);

    let current_level = low_mid_avg.max(high_avg).max(very_high_avg) / 255.0;

    let overall_avg = band_avg(low_mid_sum + high_sum + very_high_sum, min_bin, max_bin);
    let normalized_level = (overall_avg / 255.0).max(peak / 255.0 * 0.7);

    BandFeatures {
        current_level,
        low_mid_avg,
        high_avg,
        very_high_avg,
        normalized_level,
    }
}

/// Sum of magnitudes over `[lo, hi)` plus the band's peak magnitude.
fn band_sum(bins: &[u8], lo: usize, hi: usize) -> (f32, f32) {
    let mut sum = 0.0f32;
    let mut peak = 0.0f32;
    for &b in &bins[lo..hi] {
        sum += f32::from(b);
        peak = peak.max(f32::from(b));
    }
    (sum, peak)
}

fn band_avg(sum: f32, lo: usize, hi: usize) -> f32 {
    if hi > lo {
        sum / (hi - lo) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DetectionConfig {
        DetectionConfig::default()
    }

    /// 44100 Hz / 1024 bins: bin width ≈ 21.53 Hz, so the 2–8 kHz range
    /// maps to bins [92, 371), split at 139 (3 kHz) and 278 (6 kHz).
    fn snapshot_with(low_mid: u8, high: u8, very_high: u8) -> FrequencySnapshot {
        let mut bins = vec![0u8; 1024];
        for b in &mut bins[92..139] {
            *b = low_mid;
        }
        for b in &mut bins[139..278] {
            *b = high;
        }
        for b in &mut bins[278..371] {
            *b = very_high;
        }
        FrequencySnapshot {
            bins,
            sample_rate: 44100,
        }
    }

    #[test]
    fn band_averages_are_per_band() {
        let f = extract_band_features(&snapshot_with(50, 200, 180), &config());
        assert!((f.low_mid_avg - 50.0).abs() < 0.5);
        assert!((f.high_avg - 200.0).abs() < 0.5);
        assert!((f.very_high_avg - 180.0).abs() < 0.5);
    }

    #[test]
    fn current_level_is_loudest_band_over_255() {
        let f = extract_band_features(&snapshot_with(50, 200, 180), &config());
        assert!((f.current_level - 200.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn normalized_level_tracks_middle_band_peak() {
        // One loud bin in the 3–6 kHz band and nothing else: the peak term
        // dominates the overall average.
        let mut bins = vec![0u8; 1024];
        bins[200] = 255;
        let snap = FrequencySnapshot {
            bins,
            sample_rate: 44100,
        };
        let f = extract_band_features(&snap, &config());
        assert!((f.normalized_level - 0.7).abs() < 0.01);
    }

    #[test]
    fn silent_snapshot_is_all_zero() {
        let snap = FrequencySnapshot {
            bins: vec![0u8; 1024],
            sample_rate: 44100,
        };
        let f = extract_band_features(&snap, &config());
        assert_eq!(f, BandFeatures::default());
    }

    #[test]
    fn tiny_snapshot_does_not_panic_or_produce_nan() {
        // 8 bins at 44.1 kHz: bin width ~2.76 kHz, some bands are empty.
        let snap = FrequencySnapshot {
            bins: vec![100u8; 8],
            sample_rate: 44100,
        };
        let f = extract_band_features(&snap, &config());
        assert!(f.current_level.is_finite());
        assert!(f.normalized_level.is_finite());
    }

    #[test]
    fn empty_snapshot_yields_defaults() {
        let snap = FrequencySnapshot {
            bins: Vec::new(),
            sample_rate: 44100,
        };
        assert_eq!(extract_band_features(&snap, &config()), BandFeatures::default());
    }
}
