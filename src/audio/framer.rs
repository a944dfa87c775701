use super::backend::AudioFrame;

/// Accumulates device callbacks of arbitrary length into fixed-size frames
///
/// Samples leave in exactly the order they arrived; a partial tail stays
/// buffered until enough audio arrives to fill it.
pub struct FrameSlicer {
    frame_size: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    next_sequence: u64,
    samples_emitted: u64,
}

impl FrameSlicer {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            sample_rate,
            pending: Vec::with_capacity(frame_size),
            next_sequence: 0,
            samples_emitted: 0,
        }
    }

    /// Append mono samples and return every frame completed by them
    pub fn push(&mut self, samples: &[f32]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            let samples = std::mem::replace(&mut self.pending, rest);
            frames.push(self.emit(samples));
        }
        frames
    }

    /// Samples waiting for the next frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn emit(&mut self, samples: Vec<f32>) -> AudioFrame {
        let timestamp_ms = self.samples_emitted * 1000 / self.sample_rate.max(1) as u64;
        self.samples_emitted += samples.len() as u64;

        let frame = AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
            sequence: self.next_sequence,
            timestamp_ms,
        };
        self.next_sequence += 1;
        frame
    }
}
