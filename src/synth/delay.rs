// Delay - Feedback delay line used by the echo send
//
// Circular buffer with feedback. The echo send only returns the wet signal;
// the dry path of every voice reaches the master bus on its own.
//
// Real-time constraints:
// - Pre-allocated circular buffer (no allocations during processing)
// - Fixed maximum delay time (set at creation)

use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero};

/// Feedback is kept strictly below 1 to avoid runaway echoes
pub const MAX_FEEDBACK: f32 = 0.95;

/// Echo parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParams {
    /// Delay time in seconds
    pub time: f32,
    /// Amount of the delayed signal fed back into the line
    pub feedback: f32,
    /// Gain of the delayed signal sent to the output
    pub wet: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            time: 0.3,
            feedback: 0.5,
            wet: 0.5,
        }
    }
}

impl DelayParams {
    /// Create new delay parameters with clamping
    pub fn new(time: f32, feedback: f32, wet: f32) -> Self {
        let mut params = Self {
            time,
            feedback,
            wet,
        };
        params.validate(f32::MAX);
        params
    }

    /// Validate and clamp parameters to safe ranges
    pub fn validate(&mut self, max_time: f32) {
        self.time = if self.time.is_finite() {
            self.time.clamp(0.0, max_time)
        } else {
            0.0
        };
        self.feedback = if self.feedback.is_finite() {
            self.feedback.clamp(0.0, MAX_FEEDBACK)
        } else {
            0.0
        };
        self.wet = if self.wet.is_finite() {
            self.wet.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}

pub struct Delay {
    params: DelayParams,
    sample_rate: f32,
    /// Maximum delay time in seconds
    max_time: f32,
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
    feedback_smoother: OnePoleSmoother,
    wet_smoother: OnePoleSmoother,
}

impl Delay {
    /// Create a delay line able to hold `max_time` seconds
    pub fn new(mut params: DelayParams, sample_rate: f32, max_time: f32) -> Self {
        let max_time = max_time.max(0.001);
        params.validate(max_time);

        let max_samples = (max_time * sample_rate) as usize + 1;
        let delay_samples = ((params.time * sample_rate) as usize).min(max_samples - 1);

        Self {
            params,
            sample_rate,
            max_time,
            buffer: vec![0.0; max_samples],
            write_pos: 0,
            delay_samples,
            feedback_smoother: OnePoleSmoother::new(params.feedback, 10.0, sample_rate),
            wet_smoother: OnePoleSmoother::new(params.wet, 10.0, sample_rate),
        }
    }

    pub fn set_params(&mut self, mut params: DelayParams) {
        params.validate(self.max_time);
        self.params = params;

        let new_delay_samples = (params.time * self.sample_rate) as usize;
        self.delay_samples = new_delay_samples.min(self.buffer.len() - 1);
    }

    pub fn params(&self) -> DelayParams {
        self.params
    }

    /// Clear all delayed samples
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Push one input sample and return the wet output
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let feedback = self.feedback_smoother.process(self.params.feedback);
        let wet = self.wet_smoother.process(self.params.wet);

        let read_pos = if self.write_pos >= self.delay_samples {
            self.write_pos - self.delay_samples
        } else {
            self.buffer.len() + self.write_pos - self.delay_samples
        };

        let delayed = self.buffer[read_pos];

        let buffer_input = (input + feedback * delayed).clamp(-2.0, 2.0);
        self.buffer[self.write_pos] = flush_denormals_to_zero(buffer_input);

        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        delayed * wet
    }

    pub fn latency_samples(&self) -> usize {
        self.delay_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_params_clamping() {
        let params = DelayParams::new(0.5, 1.5, -0.5);

        assert_eq!(params.time, 0.5);
        assert_eq!(params.feedback, MAX_FEEDBACK);
        assert_eq!(params.wet, 0.0);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut delay = Delay::new(DelayParams::default(), 44100.0, 1.0);
        for _ in 0..20000 {
            assert_eq!(delay.process(0.0), 0.0);
        }
    }

    #[test]
    fn test_delay_produces_delayed_signal() {
        let sample_rate = 44100.0;
        let params = DelayParams {
            time: 0.01,
            feedback: 0.0,
            wet: 1.0,
        };
        let delay_samples = (0.01 * sample_rate) as usize;
        let mut delay = Delay::new(params, sample_rate, 1.0);

        // Impulse, then nothing comes out before the delay time
        assert_eq!(delay.process(1.0), 0.0);
        for _ in 0..(delay_samples - 1) {
            assert_eq!(delay.process(0.0), 0.0);
        }
        let echoed = delay.process(0.0);
        assert!(echoed > 0.9, "Echo arrived with level {}", echoed);
    }

    #[test]
    fn test_delay_feedback_decays() {
        let sample_rate = 44100.0;
        let params = DelayParams {
            time: 0.01,
            feedback: 0.5,
            wet: 1.0,
        };
        let mut delay = Delay::new(params, sample_rate, 1.0);
        let delay_samples = (0.01 * sample_rate) as usize;

        delay.process(1.0);

        let mut echo_levels = Vec::new();
        let mut max_in_window = 0.0_f32;
        for i in 0..(delay_samples * 4) {
            let output = delay.process(0.0);
            max_in_window = max_in_window.max(output.abs());
            if (i + 1) % delay_samples == 0 {
                echo_levels.push(max_in_window);
                max_in_window = 0.0;
            }
        }

        assert!(echo_levels.len() >= 3);
        assert!(echo_levels[1] < echo_levels[0]);
        assert!(echo_levels[2] < echo_levels[1]);
    }

    #[test]
    fn test_delay_stability_high_feedback() {
        let params = DelayParams {
            time: 0.1,
            feedback: 0.95,
            wet: 1.0,
        };
        let mut delay = Delay::new(params, 44100.0, 1.0);

        for i in 0..44100 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            let output = delay.process(input);
            assert!(output.is_finite());
            assert!(output.abs() <= 2.0);
        }
    }

    #[test]
    fn test_max_time_clamping() {
        let mut delay = Delay::new(DelayParams::default(), 44100.0, 1.0);
        delay.set_params(DelayParams {
            time: 2.0,
            feedback: 0.5,
            wet: 0.5,
        });

        assert_eq!(delay.params().time, 1.0);
        assert_eq!(delay.latency_samples(), 44100);
    }

    #[test]
    fn test_delay_reset() {
        let mut delay = Delay::new(DelayParams::default(), 44100.0, 1.0);
        for _ in 0..1000 {
            delay.process(0.5);
        }

        delay.reset();
        assert!(delay.buffer.iter().all(|&x| x == 0.0));
        assert_eq!(delay.write_pos, 0);
    }
}
