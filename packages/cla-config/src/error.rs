use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The requested level '{0}' is not allowed")]
    InvalidLoggingLevel(String),
    #[error("Failed to load configuration: {0}")]
    Figment(#[from] figment::Error),
}
