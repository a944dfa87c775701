//! PCM sample conversion and text-safe payload encoding.
//!
//! Float samples are scaled by 32768. Out-of-range input is clamped to
//! [-1.0, 1.0] and the result saturates at the i16 bounds, so a loud input
//! clips instead of wrapping around.

use base64::Engine;

use crate::error::DemoError;

const PCM16_SCALE: f32 = 32768.0;

/// MIME descriptor attached to every outbound audio frame
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}

/// Transport-ready encoding of one captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Capture order, starting at 0 for each session
    pub sequence: u64,
    /// Base64 of 16-bit little-endian PCM
    pub data: String,
    pub mime_type: String,
}

pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * PCM16_SCALE) as i16)
        .collect()
}

pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / PCM16_SCALE).collect()
}

pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// A trailing odd byte is ignored.
pub fn le_bytes_to_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn encode_payload(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_payload(data: &str) -> Result<Vec<u8>, DemoError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| DemoError::Decode(e.to_string()))
}

/// Float samples → PCM16 LE → base64
pub fn encode_frame(sequence: u64, samples: &[f32], sample_rate: u32) -> EncodedFrame {
    let pcm = float_to_pcm16(samples);
    EncodedFrame {
        sequence,
        data: encode_payload(&pcm16_to_le_bytes(&pcm)),
        mime_type: pcm_mime_type(sample_rate),
    }
}

/// Inverse of the outbound path: raw PCM16 LE bytes → normalized floats
pub fn decode_pcm16_bytes(bytes: &[u8]) -> Vec<f32> {
    pcm16_to_float(&le_bytes_to_pcm16(bytes))
}

/// Linear-interpolation resampler for device rate mismatches
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() || source_rate == 0 {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

/// Average interleaved channels down to mono
pub fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
