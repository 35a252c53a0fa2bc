//! Domain-level errors: decoding tasks out of posts, and handler failures.

use thiserror::Error;

/// Why a post body did not yield a task.
///
/// The worker loop treats every variant the same way (skip the post), but the
/// variants keep the cause inspectable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no fenced json envelope found")]
    NoEnvelope,

    #[error("envelope is not valid json: {0}")]
    InvalidJson(String),

    #[error("envelope has no `swarm` section")]
    MissingSwarmSection,

    #[error("malformed task: {0}")]
    Malformed(String),
}

/// A skill handler failed to produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
