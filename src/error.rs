use thiserror::Error;

/// Coarse classification used to pick the user-facing response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration or permission problem; the session never connects
    Precondition,
    /// Connection-level failure; the whole pipeline is torn down
    Transport,
    /// A single request failed; only that turn is affected
    Request,
}

#[derive(Debug, Clone, Error)]
pub enum DemoError {
    #[error("API credential is not configured (set GEMINI_API_KEY)")]
    MissingCredential,

    #[error("microphone unavailable: {0}")]
    Microphone(String),

    #[error("audio output unavailable: {0}")]
    AudioOutput(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("session setup timed out after {0}s")]
    Timeout(u64),

    #[error("remote rejected the session: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid payload encoding: {0}")]
    Decode(String),
}

impl DemoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DemoError::MissingCredential | DemoError::Microphone(_) | DemoError::AudioOutput(_) => {
                ErrorKind::Precondition
            }
            DemoError::Request(_) => ErrorKind::Request,
            DemoError::Connect(_)
            | DemoError::Timeout(_)
            | DemoError::Rejected(_)
            | DemoError::Transport(_)
            | DemoError::Closed(_)
            | DemoError::Protocol(_)
            | DemoError::Decode(_) => ErrorKind::Transport,
        }
    }
}

impl From<serde_json::Error> for DemoError {
    fn from(err: serde_json::Error) -> Self {
        DemoError::Protocol(err.to_string())
    }
}

impl From<reqwest::Error> for DemoError {
    fn from(err: reqwest::Error) -> Self {
        DemoError::Request(err.to_string())
    }
}
