use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error talking to driver: {0}")]
    Http(#[from] reqwest::Error),

    /// An error object returned by the driver, per the W3C error codes.
    #[error("{error}: {message}")]
    Protocol { error: String, message: String },

    #[error("malformed driver response: {0}")]
    Decode(String),

    #[error("driver process error: {0}")]
    Process(String),

    /// A polling wait ran out of time.
    #[error("{0}")]
    Timeout(String),
}

/// W3C error codes that mean the session itself is gone or unusable.
const SESSION_FAULT_CODES: &[&str] = &[
    "invalid session id",
    "session not created",
    "unknown error",
    "unknown command",
];

impl WebDriverError {
    /// `true` when the browser session is broken rather than the page being
    /// in an unexpected state.
    pub fn is_session_fault(&self) -> bool {
        match self {
            WebDriverError::Io(_)
            | WebDriverError::Http(_)
            | WebDriverError::Decode(_)
            | WebDriverError::Process(_) => true,
            WebDriverError::Protocol { error, .. } => SESSION_FAULT_CODES.contains(&error.as_str()),
            WebDriverError::Timeout(_) => false,
        }
    }

    /// The referenced element is no longer attached to the page.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            WebDriverError::Protocol { error, .. }
                if error == "stale element reference" || error == "no such element"
        )
    }
}
