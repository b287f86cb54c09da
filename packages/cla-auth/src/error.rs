use thiserror::Error;

/// Error kinds surfaced by session mapping and authorization (spec.md §7).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("failed to resolve the caller's unix user id: {0}")]
    SenderResolution(String),
    #[error("storage error: {0}")]
    Storage(#[from] cla_db::DbError),
}
