//! Gapless sequential playback of streamed audio chunks.
//!
//! The scheduler owns a single cursor: the earliest time the next chunk may
//! start. Every chunk starts at `max(cursor, output clock)` and pushes the
//! cursor forward by its own duration, so chunks never overlap and a stalled
//! stream resumes immediately instead of waiting for a stale cursor.

use anyhow::Result;
use tracing::{debug, info};

use super::codec;

/// Opaque id of one scheduled buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackHandle(pub u64);

/// A playback context with its own monotonic clock (seconds)
pub trait AudioOutput: Send {
    /// Current position of the output clock
    fn current_time(&self) -> f64;

    /// Queue mono samples to start at `start_at` on the output clock
    fn play_at(&mut self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> Result<PlaybackHandle>;

    /// Force-stop a scheduled or playing buffer
    fn stop(&mut self, handle: PlaybackHandle);

    /// Release the device
    fn close(&mut self);
}

/// A decoded inbound chunk and where it landed on the output clock
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackChunk {
    pub handle: PlaybackHandle,
    pub start_time: f64,
    pub duration: f64,
}

impl PlaybackChunk {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    sample_rate: u32,
    cursor: f64,
    active: Vec<PlaybackChunk>,
    scheduled_total: u64,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>, sample_rate: u32) -> Self {
        Self {
            output,
            sample_rate,
            cursor: 0.0,
            active: Vec::new(),
            scheduled_total: 0,
        }
    }

    /// Decode a PCM16 LE payload and schedule it right after its predecessor
    pub fn enqueue(&mut self, pcm_bytes: &[u8]) -> Result<Option<PlaybackChunk>> {
        let samples = codec::decode_pcm16_bytes(pcm_bytes);
        if samples.is_empty() {
            return Ok(None);
        }
        self.schedule(samples).map(Some)
    }

    /// Schedule already-decoded samples
    pub fn schedule(&mut self, samples: Vec<f32>) -> Result<PlaybackChunk> {
        let now = self.output.current_time();
        self.prune_finished(now);

        let duration = samples.len() as f64 / self.sample_rate as f64;
        let start_time = self.cursor.max(now);
        let handle = self.output.play_at(samples, self.sample_rate, start_time)?;

        let chunk = PlaybackChunk {
            handle,
            start_time,
            duration,
        };
        self.cursor = chunk.end_time();
        self.active.push(chunk.clone());
        self.scheduled_total += 1;

        debug!(
            "Scheduled chunk {:?}: start={:.3}s duration={:.3}s (clock={:.3}s)",
            handle, start_time, duration, now
        );

        Ok(chunk)
    }

    /// Force-stop everything still scheduled and restart the cursor at the clock
    pub fn interrupt(&mut self) {
        let stopped = self.stop_active();
        self.cursor = self.output.current_time();
        if stopped > 0 {
            info!("Playback interrupted: {} chunks stopped", stopped);
        }
    }

    /// Force-stop everything and release the playback device
    pub fn shutdown(&mut self) {
        let stopped = self.stop_active();
        self.output.close();
        info!(
            "Playback closed: {} chunks scheduled, {} stopped early",
            self.scheduled_total, stopped
        );
    }

    /// Earliest start time for the next chunk
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Chunks scheduled but not yet known to have finished
    pub fn active_handles(&self) -> Vec<PlaybackHandle> {
        self.active.iter().map(|c| c.handle).collect()
    }

    pub fn scheduled_total(&self) -> u64 {
        self.scheduled_total
    }

    fn prune_finished(&mut self, now: f64) {
        self.active.retain(|chunk| chunk.end_time() > now);
    }

    fn stop_active(&mut self) -> usize {
        let stopped = self.active.len();
        for chunk in self.active.drain(..) {
            self.output.stop(chunk.handle);
        }
        stopped
    }
}
