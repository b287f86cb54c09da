use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to initialize the global tracing subscriber: {0}")]
    SubscriberInit(String),
}
