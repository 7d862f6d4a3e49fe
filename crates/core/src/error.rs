use thiserror::Error;

use crate::quiz::InvalidStateError;

/// Malformed construction input: lessons, items, questions or persisted results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{kind} must not be blank")]
    BlankIdentifier { kind: &'static str },

    #[error("a lesson needs at least one vocabulary item")]
    EmptyItems,

    #[error("duplicate vocabulary id: {id}")]
    DuplicateId { id: String },

    #[error("vocabulary item {id} has an empty meaning")]
    EmptyMeaning { id: String },

    #[error("a quiz session needs at least one question")]
    EmptyQuestions,

    #[error("questions need at least one option, got {count}")]
    InvalidOptionCount { count: usize },

    #[error("duplicate option for item {id}: {option}")]
    DuplicateOption { id: String, option: String },

    #[error("options for item {id} do not contain the correct answer")]
    MissingCorrectAnswer { id: String },

    #[error("stored correct answer for item {id} differs from its meaning")]
    CorrectAnswerMismatch { id: String },

    #[error("response {found} is out of order (expected question {expected})")]
    ResponseOutOfOrder { expected: usize, found: usize },

    #[error("{answered} responses recorded for {total} questions")]
    ResponseCountMismatch { answered: usize, total: usize },

    #[error("stored {field} does not match the recorded responses")]
    InconsistentResult { field: &'static str },

    #[error("invalid attempt id: {raw}")]
    InvalidAttemptId { raw: String },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),
}
