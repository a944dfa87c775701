use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::AudioFrame;
use super::codec::{self, EncodedFrame};

/// Destination for encoded capture frames
///
/// `send_frame` only hands the frame to the transport's outbound queue; it
/// never waits for the remote side to acknowledge a previous frame.
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_frame(&self, frame: EncodedFrame);
}

/// Encodes captured frames and forwards them in capture order
pub struct CapturePipeline {
    sink: Arc<dyn FrameSink>,
}

impl CapturePipeline {
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    /// Drain frames until the backend closes its channel
    ///
    /// Returns the number of frames handed to the sink.
    pub async fn run(self, mut audio_rx: mpsc::Receiver<AudioFrame>) -> u64 {
        info!("Capture pipeline started");

        let mut forwarded = 0u64;
        while let Some(frame) = audio_rx.recv().await {
            let encoded = codec::encode_frame(frame.sequence, &frame.samples, frame.sample_rate);
            debug!(
                "Frame {} captured at {}ms ({} samples)",
                frame.sequence,
                frame.timestamp_ms,
                frame.samples.len()
            );
            self.sink.send_frame(encoded).await;
            forwarded += 1;
        }

        info!("Capture pipeline stopped after {} frames", forwarded);
        forwarded
    }
}
