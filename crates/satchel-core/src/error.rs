//! Error types for the arbitration core

use crate::SessionState;
use satchel_util::SessionId;
use thiserror::Error;

/// Errors returned by lifecycle and engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown session: {0}")]
    SessionNotFound(SessionId),

    #[error("Invalid transition from {from:?} to {attempted:?}")]
    InvalidTransition {
        from: SessionState,
        attempted: SessionState,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
