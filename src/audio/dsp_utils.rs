// DSP utilities - Audio hygiene and parameter smoothing
//
// Helpers used on the master bus and inside the effect processors.

/// Flush denormals to zero
///
/// Values extremely close to 0 can slow some CPUs down dramatically.
/// Threshold: 1e-15, far below 32-bit float numeric noise.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Keeps the master output inside [-1, 1] without hard edges. Near 0 the
/// curve is almost linear.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// One-pole smoother
///
/// Smooths sudden parameter changes to avoid clicks.
///
/// Formula: y[n] = y[n-1] + α * (x[n] - y[n-1])
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// Create a smoother
    ///
    /// # Arguments
    /// * `initial_value` - Starting value
    /// * `time_constant_ms` - Time to reach ~63% of the target
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Example
    /// ```
    /// use birdsynth::audio::dsp_utils::OnePoleSmoother;
    /// // 10ms smoothing at 44.1kHz
    /// let smoother = OnePoleSmoother::new(0.5, 10.0, 44100.0);
    /// assert_eq!(smoother.get(), 0.5);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        // α ≈ 1 / (τ * sr) for small values
        let time_constant_samples = (time_constant_ms * 0.001 * sample_rate).max(1.0);
        let coefficient = 1.0 / time_constant_samples;

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    /// Move one sample towards `target`
    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    /// Jump to a value without smoothing
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.1), 0.1);
        assert_eq!(flush_denormals_to_zero(-0.1), -0.1);
    }

    #[test]
    fn test_soft_clip() {
        assert!((soft_clip(0.0) - 0.0).abs() < 0.001);
        assert!((soft_clip(0.5) - 0.462).abs() < 0.01);

        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(10.0) > 0.99);
        assert!(soft_clip(-10.0) >= -1.0);
        assert!(soft_clip(-10.0) < -0.99);
    }

    #[test]
    fn test_smoother_convergence() {
        let mut smoother = OnePoleSmoother::new(0.0, 10.0, 44100.0);

        // 100ms is well past the 10ms time constant
        let mut final_value = 0.0;
        for _ in 0..4410 {
            final_value = smoother.process(1.0);
        }

        assert!((final_value - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_smoother_no_overshoot() {
        let mut smoother = OnePoleSmoother::new(0.0, 5.0, 44100.0);

        for _ in 0..100 {
            let value = smoother.process(1.0);
            assert!(value <= 1.0);
            assert!(value >= 0.0);
        }
    }

    #[test]
    fn test_smoother_reset() {
        let mut smoother = OnePoleSmoother::new(0.0, 5.0, 44100.0);
        smoother.reset(0.8);
        assert_eq!(smoother.get(), 0.8);
    }
}
