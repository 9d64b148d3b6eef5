use thiserror::Error;

/// Errors a create-Rem exchange can end in. Exactly one of these is
/// produced per request; the correlator never retries.
#[derive(Error, Debug)]
pub enum CreateError {
    /// The connection could not be established, broke around the send, or
    /// closed before a reply arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// A reply arrived but was not parseable as the expected structure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The companion explicitly reported failure; the message is the
    /// remote error verbatim.
    #[error("{0}")]
    Application(String),

    /// No terminal event within the deadline.
    #[error("connection timed out")]
    Timeout,
}

impl CreateError {
    /// Stable lowercase tag for logging and error records.
    pub fn kind(&self) -> &'static str {
        match self {
            CreateError::Transport(_) => "transport",
            CreateError::Protocol(_) => "protocol",
            CreateError::Application(_) => "application",
            CreateError::Timeout => "timeout",
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CreateError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> CreateError {
        CreateError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for CreateError {
    fn from(err: serde_json::Error) -> CreateError {
        CreateError::Protocol(err.to_string())
    }
}
