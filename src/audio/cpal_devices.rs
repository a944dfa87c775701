//! Microphone and speaker access through CPAL.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioDevices, AudioFrame};
use super::codec;
use super::framer::FrameSlicer;
use super::playback::{AudioOutput, PlaybackHandle};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only created, paused and dropped by its owning
/// backend, which is itself only used behind the session lock.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}
unsafe impl Sync for SendableStream {}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct CpalDevices;

impl CpalDevices {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevices for CpalDevices {
    fn is_available(&self) -> bool {
        let host = cpal::default_host();
        host.default_input_device().is_some() && host.default_output_device().is_some()
    }

    fn open_input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        let device = cpal::default_host()
            .default_input_device()
            .context("No default input device")?;
        Ok(Box::new(MicrophoneBackend::new(device, config.clone())))
    }

    fn open_output(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        let device = cpal::default_host()
            .default_output_device()
            .context("No default output device")?;
        Ok(Box::new(SpeakerOutput::open(device, sample_rate)?))
    }
}

// ============================================================================
// Microphone
// ============================================================================

pub struct MicrophoneBackend {
    device: cpal::Device,
    config: AudioBackendConfig,
    stream: Option<SendableStream>,
}

impl MicrophoneBackend {
    pub fn new(device: cpal::Device, config: AudioBackendConfig) -> Self {
        Self {
            device,
            config,
            stream: None,
        }
    }

    /// Try the exact target format first, then the device's native config
    fn build_stream(&self, tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream> {
        let preferred = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let slicer = Arc::new(Mutex::new(FrameSlicer::new(
            self.config.frame_size,
            self.config.sample_rate,
        )));

        {
            let slicer = Arc::clone(&slicer);
            let tx = tx.clone();
            if let Ok(stream) = self.device.build_input_stream(
                &preferred,
                move |data: &[f32], _: &cpal::InputCallbackInfo| deliver(&slicer, &tx, data),
                |err| error!("Microphone stream error: {}", err),
                None,
            ) {
                return Ok(stream);
            }
        }

        self.build_stream_native(slicer, tx)
    }

    /// Capture at the device's native format with mono mix-down and resampling
    fn build_stream_native(
        &self,
        slicer: Arc<Mutex<FrameSlicer>>,
        tx: mpsc::Sender<AudioFrame>,
    ) -> Result<cpal::Stream> {
        let default_config = self
            .device
            .default_input_config()
            .context("Failed to query default input config")?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.config.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        info!(
            "Microphone using native format ({}ch/{}Hz/{:?})",
            native_channels,
            native_rate,
            default_config.sample_format()
        );

        let convert = move |data: &[f32]| {
            let mono = codec::mix_to_mono(data, native_channels);
            codec::resample_linear(&mono, native_rate, target_rate)
        };

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    deliver(&slicer, &tx, &convert(data))
                },
                |err| error!("Microphone stream error: {}", err),
                None,
            ),
            cpal::SampleFormat::I16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    deliver(&slicer, &tx, &convert(&codec::pcm16_to_float(data)))
                },
                |err| error!("Microphone stream error: {}", err),
                None,
            ),
            fmt => anyhow::bail!("Unsupported microphone sample format: {:?}", fmt),
        };

        stream.context("Failed to build microphone stream")
    }
}

/// Slice device samples into frames and hand them off without blocking the audio thread
fn deliver(slicer: &Mutex<FrameSlicer>, tx: &mpsc::Sender<AudioFrame>, samples: &[f32]) {
    let frames = lock(slicer).push(samples);
    for frame in frames {
        match tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(frame)) => {
                warn!("Capture queue full, dropping frame {}", frame.sequence);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.stream.is_some() {
            anyhow::bail!("Microphone already capturing");
        }

        let (tx, rx) = mpsc::channel(self.config.queue_depth);
        let stream = self.build_stream(tx)?;
        stream.play().context("Failed to start microphone stream")?;
        self.stream = Some(SendableStream(stream));

        info!(
            "Microphone capturing: {}Hz, {} samples per frame",
            self.config.sample_rate, self.config.frame_size
        );
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the stream releases the device and closes the frame channel
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                warn!("Failed to pause microphone stream: {}", e);
            }
            info!("Microphone released");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

// ============================================================================
// Speaker
// ============================================================================

struct Voice {
    start_frame: u64,
    samples: Vec<f32>,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

#[derive(Default)]
struct MixState {
    /// Frames rendered so far; this is the output clock
    rendered: u64,
    voices: BTreeMap<u64, Voice>,
}

impl MixState {
    fn render(&mut self, out: &mut [f32], channels: usize) {
        for frame in out.chunks_mut(channels.max(1)) {
            let t = self.rendered;
            let mut acc = 0.0f32;
            for voice in self.voices.values() {
                if t >= voice.start_frame && t < voice.end_frame() {
                    acc += voice.samples[(t - voice.start_frame) as usize];
                }
            }
            frame.fill(acc.clamp(-1.0, 1.0));
            self.rendered += 1;
        }

        let now = self.rendered;
        self.voices.retain(|_, voice| voice.end_frame() > now);
    }
}

pub struct SpeakerOutput {
    mix: Arc<Mutex<MixState>>,
    device_rate: u32,
    next_handle: u64,
    stream: Option<SendableStream>,
}

impl SpeakerOutput {
    pub fn open(device: cpal::Device, sample_rate: u32) -> Result<Self> {
        let mix = Arc::new(Mutex::new(MixState::default()));

        let preferred = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (stream, device_rate) = {
            let mix_cb = Arc::clone(&mix);
            match device.build_output_stream(
                &preferred,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| lock(&mix_cb).render(data, 1),
                |err| error!("Speaker stream error: {}", err),
                None,
            ) {
                Ok(stream) => (stream, sample_rate),
                Err(_) => Self::build_native(&device, Arc::clone(&mix))?,
            }
        };

        stream.play().context("Failed to start speaker stream")?;
        info!("Speaker opened at {}Hz", device_rate);

        Ok(Self {
            mix,
            device_rate,
            next_handle: 0,
            stream: Some(SendableStream(stream)),
        })
    }

    fn build_native(device: &cpal::Device, mix: Arc<Mutex<MixState>>) -> Result<(cpal::Stream, u32)> {
        let default_config = device
            .default_output_config()
            .context("Failed to query default output config")?;
        let rate = default_config.sample_rate().0;
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    lock(&mix).render(data, channels)
                },
                |err| error!("Speaker stream error: {}", err),
                None,
            ),
            cpal::SampleFormat::I16 => {
                let mut scratch = Vec::new();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0.0);
                        lock(&mix).render(&mut scratch, channels);
                        let pcm = codec::float_to_pcm16(&scratch);
                        data.copy_from_slice(&pcm);
                    },
                    |err| error!("Speaker stream error: {}", err),
                    None,
                )
            }
            fmt => anyhow::bail!("Unsupported speaker sample format: {:?}", fmt),
        };

        Ok((stream.context("Failed to build speaker stream")?, rate))
    }
}

impl AudioOutput for SpeakerOutput {
    fn current_time(&self) -> f64 {
        lock(&self.mix).rendered as f64 / self.device_rate as f64
    }

    fn play_at(&mut self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> Result<PlaybackHandle> {
        if self.stream.is_none() {
            anyhow::bail!("Speaker is closed");
        }

        let samples = codec::resample_linear(&samples, sample_rate, self.device_rate);
        let start_frame = (start_at * self.device_rate as f64).round() as u64;

        let handle = PlaybackHandle(self.next_handle);
        self.next_handle += 1;

        lock(&self.mix).voices.insert(
            handle.0,
            Voice {
                start_frame,
                samples,
            },
        );
        Ok(handle)
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        lock(&self.mix).voices.remove(&handle.0);
    }

    fn close(&mut self) {
        lock(&self.mix).voices.clear();
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                warn!("Failed to pause speaker stream: {}", e);
            }
            info!("Speaker released");
        }
    }
}

impl Drop for SpeakerOutput {
    fn drop(&mut self) {
        self.close();
    }
}
