// Waveform analyser - Keeps the most recent master samples for display
//
// Circular buffer written once per rendered sample. The UI pulls a frame
// (oldest → newest) whenever it wants to draw an oscilloscope.

pub const DEFAULT_ANALYSER_SIZE: usize = 2048;

pub struct WaveformAnalyser {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl WaveformAnalyser {
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            write_pos: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Copy the window into `frame`, oldest sample first
    ///
    /// `frame` is resized to the analyser size.
    pub fn copy_frame(&self, frame: &mut Vec<f32>) {
        frame.clear();
        frame.extend_from_slice(&self.buffer[self.write_pos..]);
        frame.extend_from_slice(&self.buffer[..self.write_pos]);
    }

    /// Allocate and return the current window, oldest sample first
    pub fn frame(&self) -> Vec<f32> {
        let mut frame = Vec::with_capacity(self.buffer.len());
        self.copy_frame(&mut frame);
        frame
    }

    /// Peak absolute amplitude in the window
    pub fn peak(&self) -> f32 {
        self.buffer.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for WaveformAnalyser {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYSER_SIZE)
    }
}
