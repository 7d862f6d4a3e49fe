use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quiz_core::model::{AttemptId, AuthContext, SessionResult};
use storage::repository::{NewResultRecord, ResultRepository, StorageError};

use crate::error::SinkError;

/// A finalized result plus everything a sink needs to record it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSubmission {
    pub attempt_id: AttemptId,
    pub auth: AuthContext,
    pub submitted_at: DateTime<Utc>,
    pub result: SessionResult,
}

/// What a sink hands back once it has accepted a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionReceipt {
    /// Recorded locally under this id.
    Stored { result_id: i64 },
    /// Accepted by the remote API.
    Accepted {
        message: String,
        words_learned: Option<u32>,
    },
}

/// Destination for finalized quiz results.
///
/// Transport, credentials and any retry policy belong to the implementation.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Record a finalized result.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the result cannot be recorded.
    async fn submit(&self, submission: &ResultSubmission) -> Result<SubmissionReceipt, SinkError>;
}

/// Sink that records results in a `ResultRepository`.
#[derive(Clone)]
pub struct RepositorySink {
    results: Arc<dyn ResultRepository>,
}

impl RepositorySink {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl ResultSink for RepositorySink {
    async fn submit(&self, submission: &ResultSubmission) -> Result<SubmissionReceipt, SinkError> {
        let record = NewResultRecord {
            attempt_id: submission.attempt_id,
            learner_id: submission.auth.learner_id().clone(),
            submitted_at: submission.submitted_at,
            result: submission.result.clone(),
        };

        match self.results.append_result(&record).await {
            Ok(result_id) => Ok(SubmissionReceipt::Stored { result_id }),
            Err(StorageError::Conflict) => Err(SinkError::Duplicate(submission.attempt_id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{LearnerId, LessonId, Response, VocabularyId};
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn submission() -> ResultSubmission {
        let response = Response {
            question_index: 0,
            item_id: VocabularyId::parse("l1w01").unwrap(),
            selected_answer: "God".into(),
            is_correct: true,
            elapsed_seconds: 4,
        };
        ResultSubmission {
            attempt_id: AttemptId::new_v4(),
            auth: AuthContext::local(LearnerId::parse("amina").unwrap()),
            submitted_at: fixed_now(),
            result: SessionResult::from_responses(LessonId::for_number(1), 1, vec![response])
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn stores_result_under_learner() {
        let repo = InMemoryRepository::new();
        let sink = RepositorySink::new(Arc::new(repo.clone()));
        let sub = submission();

        let receipt = sink.submit(&sub).await.unwrap();
        let SubmissionReceipt::Stored { result_id } = receipt else {
            panic!("expected a stored receipt");
        };
        let stored = repo.get_result(result_id).await.unwrap();
        assert_eq!(stored.learner_id.as_str(), "amina");
        assert_eq!(stored.result, sub.result);
    }

    #[tokio::test]
    async fn second_submission_of_an_attempt_is_a_duplicate() {
        let sink = RepositorySink::new(Arc::new(InMemoryRepository::new()));
        let sub = submission();
        sink.submit(&sub).await.unwrap();
        let err = sink.submit(&sub).await.unwrap_err();
        assert!(matches!(err, SinkError::Duplicate(id) if id == sub.attempt_id));
    }
}
