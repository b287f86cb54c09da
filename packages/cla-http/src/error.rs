use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The literal message is part of the user-visible contract (spec.md
    /// §4.2) — callers must not reword it.
    #[error("There was a problem communicating with the server. Please, try again in a few minutes.")]
    RequestFailed,
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
