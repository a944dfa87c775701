use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::playback::AudioOutput;

/// One fixed-size slice of captured input audio
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized float samples in [-1.0, 1.0], mono
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Capture order within the current session
    pub sequence: u64,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
    }
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (device audio is resampled if needed)
    pub sample_rate: u32,
    /// Target channel count
    pub channels: u16,
    /// Samples per delivered frame
    pub frame_size: usize,
    /// Frames buffered between the device callback and the session
    pub queue_depth: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 4096,
            queue_depth: 64,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - cpal microphone (feature `cpal-audio`)
/// - scripted frames (demos and tests)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive frames in capture order
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Access to the host's audio input and output devices
pub trait AudioDevices: Send + Sync {
    /// False when the execution environment has no usable audio API
    fn is_available(&self) -> bool;

    /// Acquire the microphone
    fn open_input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>>;

    /// Acquire a playback context at the given rate
    fn open_output(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>>;
}

/// Devices for environments without an audio API
pub struct UnavailableDevices;

impl AudioDevices for UnavailableDevices {
    fn is_available(&self) -> bool {
        false
    }

    fn open_input(&self, _config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        anyhow::bail!("No audio input API in this environment")
    }

    fn open_output(&self, _sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        anyhow::bail!("No audio output API in this environment")
    }
}

/// Pick the host audio devices for this build
pub fn default_devices() -> Arc<dyn AudioDevices> {
    #[cfg(feature = "cpal-audio")]
    {
        Arc::new(super::cpal_devices::CpalDevices::new())
    }

    #[cfg(not(feature = "cpal-audio"))]
    {
        Arc::new(UnavailableDevices)
    }
}
