//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::AttemptId;
use quiz_core::{InvalidStateError, ValidationError};
use storage::repository::StorageError;

/// Errors emitted by result sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error("result for attempt {0} was already submitted")]
    Duplicate(AttemptId),
    #[error("remote submission requires a bearer token")]
    Unauthenticated,
    #[error("remote submission failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("remote rejected the result: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by quiz session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
