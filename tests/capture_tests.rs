// Tests for in-order delivery of captured frames

mod common;

use std::sync::Arc;

use common::RecordingSink;
use tokio::sync::mpsc;
use voice_demo::audio::codec::decode_payload;
use voice_demo::audio::{AudioFrame, CapturePipeline, FrameSink, FrameSlicer};

fn frame(sequence: u64, value: f32) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 4096],
        sample_rate: 16000,
        channels: 1,
        sequence,
        timestamp_ms: sequence * 256,
    }
}

#[tokio::test]
async fn test_frames_reach_sink_in_capture_order() {
    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = mpsc::channel(8);

    let pipeline = CapturePipeline::new(Arc::clone(&sink) as Arc<dyn FrameSink>);
    let handle = tokio::spawn(pipeline.run(rx));

    tx.send(frame(0, 0.1)).await.unwrap();
    tx.send(frame(1, 0.2)).await.unwrap();
    tx.send(frame(2, 0.3)).await.unwrap();
    drop(tx);

    let forwarded = handle.await.unwrap();
    assert_eq!(forwarded, 3);

    let frames = sink.frames.lock().unwrap();
    let order: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(frames.iter().all(|f| f.mime_type == "audio/pcm;rate=16000"));
}

#[tokio::test]
async fn test_frame_payload_is_pcm16() {
    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(CapturePipeline::new(Arc::clone(&sink) as Arc<dyn FrameSink>).run(rx));
    tx.send(frame(0, 0.5)).await.unwrap();
    drop(tx);
    handle.await.unwrap();

    let frames = sink.frames.lock().unwrap();
    let bytes = decode_payload(&frames[0].data).unwrap();
    assert_eq!(bytes.len(), 4096 * 2);
    assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 16384);
}

#[test]
fn test_slicer_produces_fixed_frames_from_uneven_callbacks() {
    let mut slicer = FrameSlicer::new(4096, 16000);
    let mut frames = Vec::new();

    for chunk in [1000usize, 3000, 500, 4000, 3800] {
        frames.extend(slicer.push(&vec![0.0; chunk]));
    }

    // 12300 samples → 3 full frames with 12 samples left over
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.samples.len() == 4096));
    assert_eq!(slicer.pending_len(), 12300 - 3 * 4096);
    assert_eq!(
        frames.iter().map(|f| f.sequence).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
