use std::fmt;
use thiserror::Error;

use crate::error::ValidationError;
use crate::model::{LessonId, QuizQuestion, Response, SessionResult};
use crate::quiz::SessionProgress;

/// An operation was called outside the state it requires.
///
/// The session is left exactly as it was; the caller may retry with the right call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidStateError {
    #[error("question {index} has already been answered")]
    AlreadyAnswered { index: usize },

    #[error("question {index} has not been answered yet")]
    NotAnswered { index: usize },

    #[error("quiz session already completed")]
    Completed,

    #[error("quiz session is not complete")]
    NotComplete,

    /// Recorded responses no longer line up with the questions. The state
    /// machine never produces this; it marks a broken session rather than a
    /// caller mistake.
    #[error("quiz session responses are inconsistent: {0}")]
    Inconsistent(#[source] ValidationError),
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAnswer(usize),
    AnswerSubmitted(usize),
    Complete,
}

/// Returned by [`QuizSession::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub index: usize,
    pub done: bool,
}

/// Single-owner state machine stepping a learner through a lesson quiz.
///
/// `AwaitingAnswer(i)` -> `submit_answer` -> `AnswerSubmitted(i)` -> `advance`
/// -> `AwaitingAnswer(i + 1)` ... -> `Complete`.
pub struct QuizSession {
    lesson_id: LessonId,
    questions: Vec<QuizQuestion>,
    phase: SessionPhase,
    responses: Vec<Response>,
    score: usize,
}

impl QuizSession {
    /// Start a session at the first question.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyQuestions` if `questions` is empty.
    pub fn new(lesson_id: LessonId, questions: Vec<QuizQuestion>) -> Result<Self, ValidationError> {
        if questions.is_empty() {
            return Err(ValidationError::EmptyQuestions);
        }
        let capacity = questions.len();
        Ok(Self {
            lesson_id,
            questions,
            phase: SessionPhase::AwaitingAnswer(0),
            responses: Vec::with_capacity(capacity),
            score: 0,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Correct answers so far; never exceeds the question count.
    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    /// Index of the question in play, or the question count once complete.
    #[must_use]
    pub fn current_index(&self) -> usize {
        match self.phase {
            SessionPhase::AwaitingAnswer(i) | SessionPhase::AnswerSubmitted(i) => i,
            SessionPhase::Complete => self.questions.len(),
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_index())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.responses.len();
        SessionProgress {
            total,
            answered,
            correct: self.score,
            remaining: total - answered,
            is_complete: self.is_complete(),
        }
    }

    /// Record the learner's answer to the current question.
    ///
    /// Compares `selected` with the correct answer by exact string equality.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateError::AlreadyAnswered` if the current question has an
    /// answer and `advance` has not been called, or `InvalidStateError::Completed`
    /// once the session is complete.
    pub fn submit_answer(
        &mut self,
        selected: impl Into<String>,
        elapsed_seconds: u32,
    ) -> Result<Response, InvalidStateError> {
        let index = match self.phase {
            SessionPhase::AwaitingAnswer(i) => i,
            SessionPhase::AnswerSubmitted(i) => {
                return Err(InvalidStateError::AlreadyAnswered { index: i });
            }
            SessionPhase::Complete => return Err(InvalidStateError::Completed),
        };

        let question = &self.questions[index];
        let selected_answer = selected.into();
        let is_correct = question.is_correct(&selected_answer);
        let response = Response {
            question_index: index,
            item_id: question.item().id().clone(),
            selected_answer,
            is_correct,
            elapsed_seconds,
        };

        if is_correct {
            self.score += 1;
        }
        self.responses.push(response.clone());
        self.phase = SessionPhase::AnswerSubmitted(index);
        Ok(response)
    }

    /// Move past an answered question.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateError::NotAnswered` if the current question has no
    /// answer yet, or `InvalidStateError::Completed` once the session is complete.
    pub fn advance(&mut self) -> Result<SessionState, InvalidStateError> {
        let index = match self.phase {
            SessionPhase::AnswerSubmitted(i) => i,
            SessionPhase::AwaitingAnswer(i) => {
                return Err(InvalidStateError::NotAnswered { index: i });
            }
            SessionPhase::Complete => return Err(InvalidStateError::Completed),
        };

        if index + 1 < self.questions.len() {
            self.phase = SessionPhase::AwaitingAnswer(index + 1);
            Ok(SessionState {
                index: index + 1,
                done: false,
            })
        } else {
            self.phase = SessionPhase::Complete;
            Ok(SessionState { index, done: true })
        }
    }

    /// Compute the result of a completed session. Does not mutate; repeated calls
    /// return identical values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateError::NotComplete` before the last `advance`, and
    /// `InvalidStateError::Inconsistent` if the recorded responses do not cover
    /// the questions.
    pub fn finalize(&self) -> Result<SessionResult, InvalidStateError> {
        if !self.is_complete() {
            return Err(InvalidStateError::NotComplete);
        }
        SessionResult::from_responses(
            self.lesson_id.clone(),
            self.questions.len(),
            self.responses.clone(),
        )
        .map_err(InvalidStateError::Inconsistent)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("lesson_id", &self.lesson_id)
            .field("questions_len", &self.questions.len())
            .field("phase", &self.phase)
            .field("responses_len", &self.responses.len())
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}
