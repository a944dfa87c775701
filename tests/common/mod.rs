// In-memory stand-ins for the remote endpoints and audio devices.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch, Notify};
use voice_demo::audio::{
    AudioBackend, AudioBackendConfig, AudioDevices, AudioFrame, AudioOutput, EncodedFrame,
    FrameSink, PlaybackHandle,
};
use voice_demo::config::VoiceConfig;
use voice_demo::realtime::{ClientMessage, InboundEvent, LinkTasks, RealtimeConnector, RealtimeLink, SetupMessage};
use voice_demo::{DemoError, SessionState, TextGenerator, VoiceSession};

/// Poll until `cond` holds or a second passes
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

// ============================================================================
// Realtime endpoint
// ============================================================================

#[derive(Clone)]
pub enum ConnectBehavior {
    Accept,
    Reject(DemoError),
    Hang,
}

/// The far side of a fake session
pub struct RemoteEnd {
    pub from_client: mpsc::Receiver<ClientMessage>,
    pub to_client: mpsc::Sender<Result<InboundEvent, DemoError>>,
}

impl RemoteEnd {
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        tokio::time::timeout(Duration::from_secs(1), self.from_client.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn send(&self, event: InboundEvent) {
        self.to_client.send(Ok(event)).await.expect("client gone");
    }

    pub async fn fail(&self, error: DemoError) {
        let _ = self.to_client.send(Err(error)).await;
    }
}

pub struct FakeConnector {
    behavior: Mutex<ConnectBehavior>,
    remotes: Mutex<Vec<RemoteEnd>>,
    pub connects: AtomicUsize,
    pub setups: Mutex<Vec<SetupMessage>>,
}

impl FakeConnector {
    pub fn new(behavior: ConnectBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            remotes: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            setups: Mutex::new(Vec::new()),
        })
    }

    pub fn take_remote(&self) -> RemoteEnd {
        self.remotes.lock().unwrap().pop().expect("no session was opened")
    }
}

#[async_trait::async_trait]
impl RealtimeConnector for FakeConnector {
    async fn connect(&self, _credential: &str, setup: SetupMessage) -> Result<RealtimeLink, DemoError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.setups.lock().unwrap().push(setup);

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            ConnectBehavior::Accept => {
                let (out_tx, out_rx) = mpsc::channel(64);
                let (in_tx, in_rx) = mpsc::channel(64);
                self.remotes.lock().unwrap().push(RemoteEnd {
                    from_client: out_rx,
                    to_client: in_tx,
                });
                Ok(RealtimeLink {
                    outbound: out_tx,
                    inbound: in_rx,
                    io: LinkTasks::default(),
                })
            }
            ConnectBehavior::Reject(e) => Err(e),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }
}

// ============================================================================
// Audio devices
// ============================================================================

#[derive(Default)]
pub struct DeviceLog {
    pub mic_opened: AtomicUsize,
    pub mic_released: AtomicUsize,
    pub outputs_opened: AtomicUsize,
    pub outputs_closed: AtomicUsize,
    pub scheduled: Mutex<Vec<(PlaybackHandle, f64)>>,
    pub stopped: Mutex<Vec<PlaybackHandle>>,
    pub mic_feed: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    /// Session state seen each time the microphone was requested
    pub states_at_mic_open: Mutex<Vec<SessionState>>,
}

pub struct FakeDevices {
    pub available: bool,
    pub fail_mic: bool,
    pub clock: Arc<Mutex<f64>>,
    pub log: Arc<DeviceLog>,
    states: Mutex<Option<watch::Receiver<SessionState>>>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::plain())
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            ..Self::plain()
        })
    }

    pub fn without_mic_permission() -> Arc<Self> {
        Arc::new(Self {
            fail_mic: true,
            ..Self::plain()
        })
    }

    fn plain() -> Self {
        Self {
            available: true,
            fail_mic: false,
            clock: Arc::new(Mutex::new(0.0)),
            log: Arc::new(DeviceLog::default()),
            states: Mutex::new(None),
        }
    }

    /// Record the session state whenever the microphone is requested
    pub fn watch_session(&self, session: &VoiceSession) {
        *self.states.lock().unwrap() = Some(session.subscribe());
    }

    pub fn set_clock(&self, secs: f64) {
        *self.clock.lock().unwrap() = secs;
    }

    /// Feed one captured frame into the running microphone
    pub async fn capture(&self, sequence: u64, samples: Vec<f32>) {
        let feed = self.log.mic_feed.lock().unwrap().clone().expect("microphone not started");
        feed.send(AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            sequence,
            timestamp_ms: sequence * 256,
        })
        .await
        .expect("capture pipeline gone");
    }
}

impl AudioDevices for FakeDevices {
    fn is_available(&self) -> bool {
        self.available
    }

    fn open_input(&self, _config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        if let Some(states) = self.states.lock().unwrap().as_ref() {
            self.log.states_at_mic_open.lock().unwrap().push(*states.borrow());
        }
        if self.fail_mic {
            anyhow::bail!("Permission denied");
        }
        self.log.mic_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMic {
            log: Arc::clone(&self.log),
            capturing: false,
        }))
    }

    fn open_output(&self, _sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        self.log.outputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeOutput::with_log(
            Arc::clone(&self.clock),
            Arc::clone(&self.log),
        )))
    }
}

struct FakeMic {
    log: Arc<DeviceLog>,
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioBackend for FakeMic {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(16);
        *self.log.mic_feed.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.capturing {
            self.log.mic_feed.lock().unwrap().take();
            self.capturing = false;
            self.log.mic_released.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "fake-mic"
    }
}

/// Output with a hand-driven clock that records every scheduling call
pub struct FakeOutput {
    clock: Arc<Mutex<f64>>,
    log: Arc<DeviceLog>,
    next: u64,
}

impl FakeOutput {
    pub fn new(clock: Arc<Mutex<f64>>) -> Self {
        Self::with_log(clock, Arc::new(DeviceLog::default()))
    }

    pub fn with_log(clock: Arc<Mutex<f64>>, log: Arc<DeviceLog>) -> Self {
        Self { clock, log, next: 0 }
    }
}

impl AudioOutput for FakeOutput {
    fn current_time(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn play_at(&mut self, _samples: Vec<f32>, _sample_rate: u32, start_at: f64) -> Result<PlaybackHandle> {
        let handle = PlaybackHandle(self.next);
        self.next += 1;
        self.log.scheduled.lock().unwrap().push((handle, start_at));
        Ok(handle)
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        self.log.stopped.lock().unwrap().push(handle);
    }

    fn close(&mut self) {
        self.log.outputs_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// PCM16 LE silence lasting `secs` at 24 kHz
pub fn silence_bytes(secs: f64) -> Vec<u8> {
    vec![0u8; (secs * 24000.0).round() as usize * 2]
}

// ============================================================================
// Sinks and generators
// ============================================================================

/// Records frames in the order they were handed over
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Mutex<Vec<EncodedFrame>>,
}

#[async_trait::async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&self, frame: EncodedFrame) {
        // Yield so a reordering bug would have a chance to show up
        tokio::task::yield_now().await;
        self.frames.lock().unwrap().push(frame);
    }
}

pub struct FakeGenerator {
    reply: Result<String, DemoError>,
    pub prompts: Mutex<Vec<(String, String)>>,
    gate: Option<Notify>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Replies only once `open_gate` is called
    pub fn held(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            gate: Some(Notify::new()),
        })
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn failing(error: DemoError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String, DemoError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_instruction.to_string(), prompt.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone()
    }
}

// ============================================================================
// Session helpers
// ============================================================================

pub fn voice_config() -> VoiceConfig {
    VoiceConfig {
        open_timeout_secs: 1,
        ..VoiceConfig::default()
    }
}

pub fn session_with(
    credential: Option<&str>,
    connector: Arc<FakeConnector>,
    devices: Arc<FakeDevices>,
) -> VoiceSession {
    VoiceSession::new(
        voice_config(),
        credential.map(str::to_string),
        connector,
        devices,
    )
}
