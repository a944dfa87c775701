use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::state::SessionState;
use super::stats::{SessionCounters, SessionStats};
use super::transport::SessionTransport;
use crate::audio::{
    AudioBackend, AudioBackendConfig, AudioDevices, CapturePipeline, FrameSink, PlaybackScheduler,
};
use crate::config::VoiceConfig;
use crate::error::DemoError;
use crate::lead::{LeadRecord, LeadStore};
use crate::persona::{self, Persona};
use crate::realtime::messages::SUBMIT_LEAD;
use crate::realtime::{FunctionCall, InboundEvent, LinkTasks, RealtimeConnector, RealtimeLink, SetupMessage};

const LEAD_ACCEPTED: &str = "Lead submitted successfully. Let the caller know someone will follow up shortly.";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The single realtime voice session of one UI instance
///
/// Every exit path (explicit stop, setup failure, transport failure) goes
/// through one release routine that deactivates the send path, stops the
/// capture and dispatch tasks, releases the microphone, force-stops playback
/// and closes the connection.
#[derive(Clone)]
pub struct VoiceSession {
    shared: Arc<Shared>,
}

struct Shared {
    config: VoiceConfig,
    persona: &'static Persona,
    credential: Option<String>,
    connector: Arc<dyn RealtimeConnector>,
    devices: Arc<dyn AudioDevices>,
    leads: LeadStore,
    state: watch::Sender<SessionState>,
    counters: Arc<SessionCounters>,
    info: Mutex<SessionInfo>,
    active: tokio::sync::Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
}

#[derive(Default)]
struct SessionInfo {
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Resources owned by the open session; filled in as `start` progresses
struct ActiveSession {
    generation: u64,
    session_id: String,
    transport: Option<Arc<SessionTransport>>,
    scheduler: Option<Arc<Mutex<PlaybackScheduler>>>,
    microphone: Option<Box<dyn AudioBackend>>,
    link_io: Option<LinkTasks>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    fn new(generation: u64, session_id: String) -> Self {
        Self {
            generation,
            session_id,
            transport: None,
            scheduler: None,
            microphone: None,
            link_io: None,
            tasks: Vec::new(),
        }
    }
}

impl VoiceSession {
    pub fn new(
        config: VoiceConfig,
        credential: Option<String>,
        connector: Arc<dyn RealtimeConnector>,
        devices: Arc<dyn AudioDevices>,
    ) -> Self {
        let persona = persona::find(&config.persona);
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            shared: Arc::new(Shared {
                config,
                persona,
                credential,
                connector,
                devices,
                leads: LeadStore::new(),
                state,
                counters: Arc::new(SessionCounters::default()),
                info: Mutex::new(SessionInfo::default()),
                active: tokio::sync::Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Open a session, tearing down any session that is already open
    ///
    /// Returns `Ok` without connecting when the environment has no audio
    /// devices. Failures leave the session in `error` with every resource
    /// released.
    pub async fn start(&self) -> Result<(), DemoError> {
        let shared = &self.shared;

        if !shared.devices.is_available() {
            info!("No audio devices available; voice demo disabled");
            return Ok(());
        }

        self.stop().await;

        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        {
            let mut active = shared.active.lock().await;
            if let Some(previous) = active.take() {
                shared.release(previous).await;
            }
            *active = Some(ActiveSession::new(generation, session_id.clone()));
            shared.begin(&session_id);
            shared.set_state(SessionState::Connecting);
        }

        info!(
            "Starting voice session {} (persona={}, model={})",
            session_id, shared.persona.id, shared.config.model
        );

        let Some(credential) = shared.credential.clone() else {
            return Err(shared.fail(generation, DemoError::MissingCredential).await);
        };

        let setup = SetupMessage::new(
            &shared.config.model,
            shared.persona.voice_name,
            shared.persona.system_instruction,
        );
        let timeout = shared.config.open_timeout();
        let link = match tokio::time::timeout(timeout, shared.connector.connect(&credential, setup)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => return Err(shared.fail(generation, e).await),
            Err(_) => {
                let err = DemoError::Timeout(timeout.as_secs());
                return Err(shared.fail(generation, err).await);
            }
        };

        let outcome = {
            let mut active = shared.active.lock().await;
            match active.as_mut() {
                Some(session) if session.generation == generation => {
                    shared.wire_up(session, link).await
                }
                _ => {
                    info!("Session {} stopped while connecting; dropping connection", session_id);
                    return Ok(());
                }
            }
        };

        match outcome {
            Ok(()) => {
                info!("Voice session {} connected", session_id);
                Ok(())
            }
            Err(e) => Err(shared.fail(generation, e).await),
        }
    }

    /// Tear down the open session, if any; safe to call repeatedly
    pub async fn stop(&self) {
        let shared = &self.shared;
        let mut active = shared.active.lock().await;

        if let Some(session) = active.take() {
            info!("Stopping voice session {}", session.session_id);
            shared.set_state(SessionState::Closing);
            let session_id = session.session_id.clone();
            shared.release(session).await;
            info!("Voice session {} stopped", session_id);
        }

        shared.set_state(SessionState::Idle);
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions (for a status indicator)
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn is_available(&self) -> bool {
        self.shared.devices.is_available()
    }

    pub fn persona(&self) -> &'static Persona {
        self.shared.persona
    }

    pub fn leads(&self) -> &LeadStore {
        &self.shared.leads
    }

    pub fn stats(&self) -> SessionStats {
        let shared = &self.shared;
        let info = lock(&shared.info);
        let end = info.ended_at.unwrap_or_else(Utc::now);
        let duration_secs = info
            .started_at
            .map(|t| end.signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            session_id: info.session_id.clone(),
            state: self.state(),
            available: self.is_available(),
            started_at: info.started_at,
            ended_at: info.ended_at,
            duration_secs,
            frames_sent: shared.counters.frames_sent.load(Ordering::SeqCst),
            chunks_scheduled: shared.counters.chunks_scheduled.load(Ordering::SeqCst),
            tool_calls: shared.counters.tool_calls.load(Ordering::SeqCst),
            last_error: info.last_error.clone(),
        }
    }
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Session state: {} -> {}", previous, next);
        }
    }

    fn begin(&self, session_id: &str) {
        self.counters.reset();
        let mut info = lock(&self.info);
        info.session_id = Some(session_id.to_string());
        info.started_at = Some(Utc::now());
        info.ended_at = None;
        info.last_error = None;
    }

    /// Attach the connection, open playback and the microphone, then report
    /// `connected` and start forwarding capture frames
    async fn wire_up(self: &Arc<Self>, session: &mut ActiveSession, link: RealtimeLink) -> Result<(), DemoError> {
        let RealtimeLink {
            outbound,
            inbound,
            io,
        } = link;
        session.link_io = Some(io);

        let transport = Arc::new(SessionTransport::new(outbound, Arc::clone(&self.counters)));
        session.transport = Some(Arc::clone(&transport));

        let output = self
            .devices
            .open_output(self.config.output_sample_rate)
            .map_err(|e| DemoError::AudioOutput(format!("{:#}", e)))?;
        let scheduler = Arc::new(Mutex::new(PlaybackScheduler::new(
            output,
            self.config.output_sample_rate,
        )));
        session.scheduler = Some(Arc::clone(&scheduler));

        session.tasks.push(tokio::spawn(dispatch_inbound(
            Arc::clone(self),
            session.generation,
            inbound,
            Arc::clone(&transport),
            scheduler,
        )));

        let backend_config = AudioBackendConfig {
            sample_rate: self.config.input_sample_rate,
            channels: self.config.channels,
            frame_size: self.config.frame_size,
            ..AudioBackendConfig::default()
        };
        let mut microphone = self
            .devices
            .open_input(&backend_config)
            .map_err(|e| DemoError::Microphone(format!("{:#}", e)))?;

        let audio_rx = match microphone.start().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(stop_err) = microphone.stop().await {
                    warn!("Failed to release microphone: {:#}", stop_err);
                }
                return Err(DemoError::Microphone(format!("{:#}", e)));
            }
        };
        info!("Capturing from {}", microphone.name());
        session.microphone = Some(microphone);

        // Frames wait in the backend queue until the session is reported connected
        self.set_state(SessionState::Connected);

        let sink: Arc<dyn FrameSink> = transport;
        session.tasks.push(tokio::spawn(async move {
            CapturePipeline::new(sink).run(audio_rx).await;
        }));

        Ok(())
    }

    /// Tear down the session of `generation` (if it is still the open one) and enter `error`
    async fn fail(self: &Arc<Self>, generation: u64, error: DemoError) -> DemoError {
        let mut active = self.active.lock().await;

        match active.as_ref() {
            Some(session) if session.generation == generation => {}
            _ => {
                debug!("Ignoring failure of a session that already ended: {}", error);
                return error;
            }
        }

        if let Some(session) = active.take() {
            error!("Voice session {} failed: {}", session.session_id, error);
            self.set_state(SessionState::Closing);
            self.release(session).await;
            lock(&self.info).last_error = Some(error.to_string());
            self.set_state(SessionState::Error);
        }

        error
    }

    /// Release every resource the session holds
    async fn release(&self, mut session: ActiveSession) {
        lock(&self.info).ended_at = Some(Utc::now());

        if let Some(transport) = &session.transport {
            transport.deactivate();
        }

        for task in session.tasks.drain(..) {
            task.abort();
        }

        if let Some(mut microphone) = session.microphone.take() {
            if let Err(e) = microphone.stop().await {
                warn!("Failed to release microphone: {:#}", e);
            }
        }

        if let Some(scheduler) = session.scheduler.take() {
            lock(&scheduler).shutdown();
        }

        if let Some(mut io) = session.link_io.take() {
            io.close();
        }
    }
}

/// Route inbound events until the connection fails or the session is released
async fn dispatch_inbound(
    shared: Arc<Shared>,
    generation: u64,
    mut inbound: mpsc::Receiver<Result<InboundEvent, DemoError>>,
    transport: Arc<SessionTransport>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
) {
    let failure = loop {
        let Some(event) = inbound.recv().await else {
            break DemoError::Closed("inbound stream ended".to_string());
        };

        match event {
            Ok(InboundEvent::Audio(bytes)) => {
                let scheduled = lock(&scheduler).enqueue(&bytes);
                match scheduled {
                    Ok(Some(_)) => {
                        shared.counters.chunks_scheduled.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Dropping audio chunk: {:#}", e),
                }
            }
            Ok(InboundEvent::ToolCall(call)) => {
                shared.counters.tool_calls.fetch_add(1, Ordering::SeqCst);
                let result = handle_tool_call(&shared.leads, &call).await;
                // Answer before reading the next event so the agent never waits on us
                if let Err(e) = transport.send_tool_response(&call.id, &call.name, &result).await {
                    break e;
                }
            }
            Ok(InboundEvent::Interrupted) => {
                lock(&scheduler).interrupt();
            }
            Ok(InboundEvent::TurnComplete) => debug!("Model turn complete"),
            Ok(InboundEvent::SetupComplete) => debug!("Duplicate setupComplete ignored"),
            Ok(InboundEvent::GoAway(detail)) => {
                break DemoError::Closed(format!("server is going away: {}", detail));
            }
            Err(e) => break e,
        }
    };

    // Teardown aborts this task, so it must run on its own
    tokio::spawn(async move {
        shared.fail(generation, failure).await;
    });
}

async fn handle_tool_call(leads: &LeadStore, call: &FunctionCall) -> String {
    if call.name == SUBMIT_LEAD {
        leads.record(LeadRecord::from_args(&call.args)).await;
        LEAD_ACCEPTED.to_string()
    } else {
        warn!("Agent called unknown tool '{}'", call.name);
        format!("Unknown tool: {}", call.name)
    }
}
