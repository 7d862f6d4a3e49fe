use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AttemptId, LearnerId, LessonId};
use storage::repository::{ResultRecord, ResultRepository};

use crate::error::SessionError;

/// Upper bound on results read when aggregating lesson stats.
const STATS_WINDOW: u32 = 500;

/// Presentation-agnostic list item for a recorded quiz result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultListItem {
    pub id: i64,
    pub attempt_id: AttemptId,
    pub lesson_id: LessonId,
    pub submitted_at: DateTime<Utc>,
    pub correct: usize,
    pub total: usize,
    pub score_percentage: f64,
    pub total_elapsed_seconds: u64,
}

impl ResultListItem {
    #[must_use]
    pub fn from_record(record: &ResultRecord) -> Self {
        let result = &record.result;
        Self {
            id: record.id,
            attempt_id: record.attempt_id,
            lesson_id: result.lesson_id().clone(),
            submitted_at: record.submitted_at,
            correct: result.correct_count(),
            total: result.total_questions(),
            score_percentage: result.score_percentage(),
            total_elapsed_seconds: result.total_elapsed_seconds(),
        }
    }
}

/// Aggregate over a learner's attempts at one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonStats {
    pub attempts: usize,
    pub best_score: f64,
    pub average_score: f64,
    pub last_submitted_at: Option<DateTime<Utc>>,
}

impl LessonStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_items(items: &[ResultListItem]) -> Self {
        if items.is_empty() {
            return Self {
                attempts: 0,
                best_score: 0.0,
                average_score: 0.0,
                last_submitted_at: None,
            };
        }
        let best_score = items
            .iter()
            .map(|i| i.score_percentage)
            .fold(0.0_f64, f64::max);
        let sum: f64 = items.iter().map(|i| i.score_percentage).sum();
        Self {
            attempts: items.len(),
            best_score,
            average_score: sum / items.len() as f64,
            last_submitted_at: items.iter().map(|i| i.submitted_at).max(),
        }
    }
}

/// Read-side facade over recorded results.
#[derive(Clone)]
pub struct ResultHistoryService {
    results: Arc<dyn ResultRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Recent results for a learner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        learner_id: &LearnerId,
        lesson_id: Option<&LessonId>,
        limit: u32,
    ) -> Result<Vec<ResultListItem>, SessionError> {
        let records = self.results.list_results(learner_id, lesson_id, limit).await?;
        Ok(records.iter().map(ResultListItem::from_record).collect())
    }

    /// Attempts, best and average score for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn lesson_stats(
        &self,
        learner_id: &LearnerId,
        lesson_id: &LessonId,
    ) -> Result<LessonStats, SessionError> {
        let items = self
            .list_recent(learner_id, Some(lesson_id), STATS_WINDOW)
            .await?;
        Ok(LessonStats::from_items(&items))
    }
}
