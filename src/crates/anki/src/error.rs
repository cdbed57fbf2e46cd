//! Error taxonomy for the flashcard service.
//!
//! Three kinds matter to callers: transport failures are retriable, protocol
//! errors carry the server's message and are fatal for the call, and invalid
//! input never reaches the wire at all.

use thiserror::Error;

/// Result type for flashcard operations.
pub type Result<T> = std::result::Result<T, AnkiError>;

/// Errors from the flashcard service client.
#[derive(Debug, Error)]
pub enum AnkiError {
    /// The service could not be reached.
    #[error("Could not connect to AnkiConnect. Make sure Anki is running and the AnkiConnect addon is installed.")]
    ConnectionFailed,

    /// The request timed out.
    #[error("Request to AnkiConnect timed out.")]
    Timeout,

    /// Other HTTP-level failure.
    #[error("AnkiConnect transport error: {0}")]
    Transport(reqwest::Error),

    /// The service answered with a non-null `error` field; the message is
    /// the server's, verbatim.
    #[error("{0}")]
    Protocol(String),

    /// The response did not match the expected shape.
    #[error("Unexpected AnkiConnect response: {0}")]
    InvalidResponse(String),

    /// The caller's arguments were rejected before any request was made.
    #[error("{0}")]
    InvalidInput(String),
}

impl AnkiError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnkiError::ConnectionFailed | AnkiError::Timeout | AnkiError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for AnkiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnkiError::Timeout
        } else if err.is_connect() {
            AnkiError::ConnectionFailed
        } else {
            AnkiError::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(AnkiError::ConnectionFailed.is_retryable());
        assert!(AnkiError::Timeout.is_retryable());
        assert!(!AnkiError::Protocol("deck not found".into()).is_retryable());
        assert!(!AnkiError::InvalidInput("bad ease".into()).is_retryable());
    }

    #[test]
    fn protocol_error_is_verbatim() {
        let err = AnkiError::Protocol("Deck 'X' not found".into());
        assert_eq!(err.to_string(), "Deck 'X' not found");
    }
}
