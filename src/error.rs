use std::io;

use crate::request::state::ProcessState;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request with identifier <{0}> does not exist")]
    NotFound(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Can't execute command <{command}>: {source}")]
    ProcessExecution { command: String, source: io::Error },

    #[error("Illegal state transition {from} -> {to}")]
    IllegalTransition { from: ProcessState, to: ProcessState },

    #[error("Dispatch queue is full, submission rejected")]
    QueueFull,

    #[error("Dispatch pool has shut down")]
    ShutDown,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DispatchError {
    /// Caller-correctable errors, reported back to whoever asked instead of being recorded as
    /// request state
    pub fn is_validation(&self) -> bool {
        matches!(self,
            DispatchError::Validation(_)
            | DispatchError::NotFound(_)
            | DispatchError::IllegalTransition { .. })
    }
}
