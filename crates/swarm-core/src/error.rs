use thiserror::Error;

use crate::app::BuildError;
use crate::config::ConfigError;
use crate::domain::{DecodeError, HandlerError};
use crate::ports::PlatformError;

/// Crate-level error. Every concern keeps its own enum; this one only
/// collects them so callers can use a single `?`.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Failure classes as the loop reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Transport,
    Handler,
    RateLimited,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::Transport => "transport",
            ErrorKind::Handler => "handler",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SwarmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwarmError::Decode(_) => ErrorKind::Decode,
            SwarmError::Platform(PlatformError::RateLimited { .. }) => ErrorKind::RateLimited,
            SwarmError::Platform(_) => ErrorKind::Transport,
            SwarmError::Handler(_) => ErrorKind::Handler,
            SwarmError::Config(_) | SwarmError::Build(_) => ErrorKind::Config,
        }
    }
}
