//! Maps the named D-Bus errors spec.md §6 lists on the wire back to a small
//! client-side enum, so commands can match on error *kind* rather than
//! string-sniffing `zbus::Error`'s `Display` output.
//!
//! Grounded on `original_source/command_line_assistant/commands/chat.py`'s
//! `except (RequestFailedError, MissingHistoryFileError,
//! CorruptedHistoryError)` catch list, generalized to the full set spec.md
//! §7 says the client must recognize.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    RequestFailed(String),
    #[error("{0}")]
    ChatNotFound(String),
    #[error("{0}")]
    HistoryNotAvailable(String),
    #[error("{0}")]
    NotAuthorized(String),
    #[error("{0}")]
    CorruptedHistory(String),
    #[error("{0}")]
    MissingHistoryFile(String),
    /// Input composition failure (spec.md §4.11's `ValueError`).
    #[error("{0}")]
    InvalidInput(String),
    /// Anything else: surfaced to the user as a generic failure (spec.md §7:
    /// "unknown errors to a generic 'Oops! Something went wrong...'").
    #[error("Oops! Something went wrong... {0}")]
    Unknown(String),
}

impl From<zbus::Error> for ClientError {
    fn from(err: zbus::Error) -> Self {
        let zbus::Error::MethodError(name, description, _) = &err else {
            return ClientError::Unknown(err.to_string());
        };

        let message = description.clone().unwrap_or_else(|| err.to_string());
        match name.as_str() {
            "com.redhat.lightspeed.RequestFailedError" => ClientError::RequestFailed(message),
            "com.redhat.lightspeed.ChatNotFoundError" => ClientError::ChatNotFound(message),
            "com.redhat.lightspeed.HistoryNotAvailable" => ClientError::HistoryNotAvailable(message),
            "com.redhat.lightspeed.NotAuthorizedUser" => ClientError::NotAuthorized(message),
            "com.redhat.lightspeed.CorruptedHistoryError" => ClientError::CorruptedHistory(message),
            "com.redhat.lightspeed.MissingHistoryFileError" => ClientError::MissingHistoryFile(message),
            _ => ClientError::Unknown(message),
        }
    }
}
