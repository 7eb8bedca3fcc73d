// Audio timing - Sample-counted logical clock
//
// Every timestamp the sequencer works with comes from this clock. It moves
// forward either one rendered sample at a time (audio callback) or by jumping
// straight to a target time (offline dispatch and tests).

/// Monotonic clock measured in seconds, advanced by rendered samples.
#[derive(Debug, Clone)]
pub struct SampleClock {
    /// Time reached by the last `advance_to` jump
    base_seconds: f64,
    /// Samples rendered since `base_seconds`
    samples_since_base: u64,
    /// Total samples rendered since creation
    sample_position: u64,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            base_seconds: 0.0,
            samples_since_base: 0,
            sample_position: 0,
            sample_rate: sample_rate as f64,
        }
    }

    /// Current time in seconds
    pub fn now(&self) -> f64 {
        self.base_seconds + self.samples_since_base as f64 / self.sample_rate
    }

    /// Advance by rendered frames (called from the audio callback)
    pub fn advance(&mut self, frames: usize) {
        self.samples_since_base += frames as u64;
        self.sample_position += frames as u64;
    }

    /// Jump forward to `time`. Moving backwards is ignored to keep the clock monotonic.
    pub fn advance_to(&mut self, time: f64) {
        if !time.is_finite() || time <= self.now() {
            return;
        }
        self.base_seconds = time;
        self.samples_since_base = 0;
        self.sample_position = self.seconds_to_samples(time);
    }

    /// Total samples rendered (or jumped over)
    pub fn current_sample(&self) -> u64 {
        self.sample_position
    }

    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate) as u64
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_creation() {
        let clock = SampleClock::new(48000.0);
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.current_sample(), 0);
        assert_eq!(clock.sample_rate(), 48000.0);
    }

    #[test]
    fn test_advance_samples() {
        let mut clock = SampleClock::new(48000.0);
        clock.advance(480);
        assert!((clock.now() - 0.01).abs() < 1e-12);
        clock.advance(480);
        assert_eq!(clock.current_sample(), 960);
        assert!((clock.now() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_advance_to_is_exact() {
        let mut clock = SampleClock::new(44100.0);
        clock.advance_to(1.25);
        assert_eq!(clock.now(), 1.25);

        clock.advance(441);
        assert!((clock.now() - 1.26).abs() < 1e-12);
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut clock = SampleClock::new(48000.0);
        clock.advance_to(2.0);
        clock.advance_to(1.0);
        assert_eq!(clock.now(), 2.0);

        clock.advance_to(f64::NAN);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_seconds_to_samples() {
        let clock = SampleClock::new(48000.0);
        assert_eq!(clock.seconds_to_samples(1.0), 48000);
        assert_eq!(clock.seconds_to_samples(0.01), 480);
        assert_eq!(clock.seconds_to_samples(-1.0), 0);
    }
}
