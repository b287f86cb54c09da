use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to open pty: {0}")]
    Spawn(String),
    #[error("failed to read from pty: {0}")]
    Read(String),
    #[error("failed to write to pty: {0}")]
    Write(String),
    #[error("terminal log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
