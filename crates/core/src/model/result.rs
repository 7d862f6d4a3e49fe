use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{LessonId, VocabularyId};

/// The learner's answer to one question. Created once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub question_index: usize,
    pub item_id: VocabularyId,
    pub selected_answer: String,
    pub is_correct: bool,
    pub elapsed_seconds: u32,
}

/// Final score of a completed quiz session, ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionResultRecord")]
pub struct SessionResult {
    lesson_id: LessonId,
    responses: Vec<Response>,
    total_questions: usize,
    correct_count: usize,
    total_elapsed_seconds: u64,
    score_percentage: f64,
}

impl SessionResult {
    /// Build a result from one response per question, in question order.
    ///
    /// Used both when a live session finalizes and when rehydrating a stored result.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyQuestions` when `total_questions` is zero,
    /// `ValidationError::ResponseCountMismatch` when responses do not cover every
    /// question, and `ValidationError::ResponseOutOfOrder` for misnumbered responses.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_responses(
        lesson_id: LessonId,
        total_questions: usize,
        responses: Vec<Response>,
    ) -> Result<Self, ValidationError> {
        if total_questions == 0 {
            return Err(ValidationError::EmptyQuestions);
        }
        if responses.len() != total_questions {
            return Err(ValidationError::ResponseCountMismatch {
                answered: responses.len(),
                total: total_questions,
            });
        }

        let mut correct_count = 0_usize;
        let mut total_elapsed_seconds = 0_u64;
        for (expected, response) in responses.iter().enumerate() {
            if response.question_index != expected {
                return Err(ValidationError::ResponseOutOfOrder {
                    expected,
                    found: response.question_index,
                });
            }
            if response.is_correct {
                correct_count += 1;
            }
            total_elapsed_seconds += u64::from(response.elapsed_seconds);
        }

        let score_percentage = correct_count as f64 / total_questions as f64 * 100.0;

        Ok(Self {
            lesson_id,
            responses,
            total_questions,
            correct_count,
            total_elapsed_seconds,
            score_percentage,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn total_elapsed_seconds(&self) -> u64 {
        self.total_elapsed_seconds
    }

    /// Share of correct answers in `[0, 100]`.
    #[must_use]
    pub fn score_percentage(&self) -> f64 {
        self.score_percentage
    }
}

/// Wire shape of a result. The derived totals are optional on input and, when
/// present, must agree with what the responses produce.
#[derive(Deserialize)]
struct SessionResultRecord {
    lesson_id: LessonId,
    responses: Vec<Response>,
    total_questions: usize,
    #[serde(default)]
    correct_count: Option<usize>,
    #[serde(default)]
    total_elapsed_seconds: Option<u64>,
    #[serde(default)]
    score_percentage: Option<f64>,
}

impl TryFrom<SessionResultRecord> for SessionResult {
    type Error = ValidationError;

    fn try_from(record: SessionResultRecord) -> Result<Self, Self::Error> {
        let result =
            Self::from_responses(record.lesson_id, record.total_questions, record.responses)?;
        if record.correct_count.is_some_and(|c| c != result.correct_count) {
            return Err(ValidationError::InconsistentResult {
                field: "correct_count",
            });
        }
        if record
            .total_elapsed_seconds
            .is_some_and(|s| s != result.total_elapsed_seconds)
        {
            return Err(ValidationError::InconsistentResult {
                field: "total_elapsed_seconds",
            });
        }
        if record
            .score_percentage
            .is_some_and(|p| (p - result.score_percentage).abs() > 1e-9)
        {
            return Err(ValidationError::InconsistentResult {
                field: "score_percentage",
            });
        }
        Ok(result)
    }
}
