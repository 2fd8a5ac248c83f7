use realfft::RealFftPlanner;

/// Windowed real FFT producing byte-scaled magnitude snapshots.
///
/// Reproduces the analyser contract the detection heuristic was tuned
/// against: 2048-point FFT, per-bin exponential smoothing of the linear
/// magnitudes (time constant 0.1), then conversion to decibels mapped onto
/// 0–255 over the [-100 dB, -30 dB] range.
///
/// Pre-allocates the FFT plan and scratch buffers for a zero-allocation hot
/// path.
///
/// # Example
/// ```
/// use rally_audio::fft::SnapshotPipeline;
/// let mut fft = SnapshotPipeline::new(2048);
/// let bins = fft.process(&vec![0.0f32; 2048]);
/// assert_eq!(bins.len(), 1024); // N/2
/// ```
pub struct SnapshotPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
    /// Smoothed linear magnitudes carried across frames.
    smoothed: Vec<f32>,
}

/// Smoothing factor applied to the previous frame's magnitudes.
const SMOOTHING: f32 = 0.1;
/// Magnitudes at or below this level map to byte 0.
const MIN_DECIBELS: f32 = -100.0;
/// Magnitudes at or above this level map to byte 255.
const MAX_DECIBELS: f32 = -30.0;

impl SnapshotPipeline {
    /// Create a pipeline with the given FFT window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            smoothed: vec![0.0; size / 2],
        }
    }

    /// Process `samples` through the windowed FFT and return N/2 byte bins.
    pub fn process(&mut self, samples: &[f32]) -> Vec<u8> {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            return vec![0; self.fft_size / 2];
        }

        // Smooth linear magnitudes, then map dB onto the byte range
        let db_span = MAX_DECIBELS - MIN_DECIBELS;
        self.smoothed
            .iter_mut()
            .zip(self.spectrum_buf.iter())
            .map(|(prev, c)| {
                let mag = (c.re * c.re + c.im * c.im).sqrt() / self.fft_size as f32;
                *prev = SMOOTHING * *prev + (1.0 - SMOOTHING) * mag;
                let db = 20.0 * prev.max(f32::MIN_POSITIVE).log10();
                let scaled = 255.0 * (db - MIN_DECIBELS) / db_span;
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
