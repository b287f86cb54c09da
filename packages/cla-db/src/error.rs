use thiserror::Error;

/// Error kinds surfaced by the database layer, matching spec.md §7's
/// `StorageError` / `StorageUnavailable` split.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("a chat named '{0}' already exists for this user")]
    ChatAlreadyExists(String),
    #[error("chat not found")]
    ChatNotFound,
    #[error("database connection pool exhausted after {0}ms")]
    StorageUnavailable(u64),
    #[error("storage error: {0}")]
    StorageError(#[from] sqlx::Error),
}

/// `idx_chats_user_name_live`'s partial unique index is what actually
/// arbitrates the "two concurrent `CreateChat`s for the same name" race
/// (spec.md §5/§8); a losing `INSERT` surfaces here as a unique-constraint
/// violation rather than an application-level check, so it needs mapping
/// back to `ChatAlreadyExists` the same as the check-then-insert path.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
