pub mod backend;
pub mod capture;
pub mod codec;
pub mod framer;
pub mod playback;

#[cfg(feature = "cpal-audio")]
pub mod cpal_devices;

pub use backend::{
    default_devices, AudioBackend, AudioBackendConfig, AudioDevices, AudioFrame, UnavailableDevices,
};
pub use capture::{CapturePipeline, FrameSink};
pub use codec::EncodedFrame;
pub use framer::FrameSlicer;
pub use playback::{AudioOutput, PlaybackChunk, PlaybackHandle, PlaybackScheduler};
