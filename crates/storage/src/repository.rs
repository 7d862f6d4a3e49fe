use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AttemptId, LearnerId, Lesson, LessonId, LessonOverview, SessionResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A finalized quiz result about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResultRecord {
    pub attempt_id: AttemptId,
    pub learner_id: LearnerId,
    pub submitted_at: DateTime<Utc>,
    pub result: SessionResult,
}

/// A recorded quiz result with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub id: i64,
    pub attempt_id: AttemptId,
    pub learner_id: LearnerId,
    pub submitted_at: DateTime<Utc>,
    pub result: SessionResult,
}

impl ResultRecord {
    #[must_use]
    pub fn from_new(id: i64, record: &NewResultRecord) -> Self {
        Self {
            id,
            attempt_id: record.attempt_id,
            learner_id: record.learner_id.clone(),
            submitted_at: record.submitted_at,
            result: record.result.clone(),
        }
    }
}

/// Source of lesson vocabulary.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson together with its vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson with its vocabulary in lesson order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError>;

    /// List all lessons ordered by lesson number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_lessons(&self) -> Result<Vec<LessonOverview>, StorageError>;
}

/// Append-only record of submitted quiz results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Record a result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt id was already recorded.
    async fn append_result(&self, record: &NewResultRecord) -> Result<i64, StorageError>;

    /// Fetch a recorded result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError>;

    /// Most recent results for a learner, newest first, optionally limited to one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_results(
        &self,
        learner_id: &LearnerId,
        lesson_id: Option<&LessonId>,
        limit: u32,
    ) -> Result<Vec<ResultRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    results: Arc<Mutex<Vec<ResultRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(lesson.id().clone(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_lessons(&self) -> Result<Vec<LessonOverview>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        let mut out: Vec<LessonOverview> = guard.values().map(Lesson::overview).collect();
        out.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, record: &NewResultRecord) -> Result<i64, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        if guard.iter().any(|r| r.attempt_id == record.attempt_id) {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
        guard.push(ResultRecord::from_new(id, record));
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        learner_id: &LearnerId,
        lesson_id: Option<&LessonId>,
        limit: u32,
    ) -> Result<Vec<ResultRecord>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut out: Vec<ResultRecord> = guard
            .iter()
            .filter(|r| &r.learner_id == learner_id)
            .filter(|r| lesson_id.is_none_or(|lesson| r.result.lesson_id() == lesson))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }
}

/// Aggregates lesson and result repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Self { lessons, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Response, VocabularyId, VocabularyItem};
    use quiz_core::time::fixed_now;

    fn lesson(number: u32) -> Lesson {
        let items = (1..=3)
            .map(|i| {
                VocabularyItem::new(
                    VocabularyId::parse(format!("l{number}w{i}")).unwrap(),
                    "",
                    "",
                    format!("meaning {i}"),
                )
                .unwrap()
            })
            .collect();
        Lesson::new(LessonId::for_number(number), number, format!("Lesson {number}"), "", items)
            .unwrap()
    }

    fn record(lesson: &Lesson, learner: &str, minutes: i64) -> NewResultRecord {
        let responses = lesson
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| Response {
                question_index: i,
                item_id: item.id().clone(),
                selected_answer: item.meaning().to_owned(),
                is_correct: true,
                elapsed_seconds: 2,
            })
            .collect();
        NewResultRecord {
            attempt_id: AttemptId::new_v4(),
            learner_id: LearnerId::parse(learner).unwrap(),
            submitted_at: fixed_now() + Duration::minutes(minutes),
            result: SessionResult::from_responses(
                lesson.id().clone(),
                lesson.items().len(),
                responses,
            )
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn lessons_are_listed_by_number() {
        let repo = InMemoryRepository::new();
        repo.upsert_lesson(&lesson(2)).await.unwrap();
        repo.upsert_lesson(&lesson(1)).await.unwrap();

        let listed = repo.list_lessons().await.unwrap();
        let numbers: Vec<_> = listed.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(listed[0].word_count, 3);

        let missing = repo.get_lesson(&LessonId::for_number(9)).await;
        assert!(matches!(missing, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn repeated_attempt_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let rec = record(&lesson(1), "amina", 0);
        let id = repo.append_result(&rec).await.unwrap();
        assert!(matches!(
            repo.append_result(&rec).await,
            Err(StorageError::Conflict)
        ));
        assert_eq!(repo.get_result(id).await.unwrap().attempt_id, rec.attempt_id);
    }

    #[tokio::test]
    async fn results_filter_by_learner_and_lesson_newest_first() {
        let repo = InMemoryRepository::new();
        let one = lesson(1);
        let two = lesson(2);
        repo.append_result(&record(&one, "amina", 1)).await.unwrap();
        repo.append_result(&record(&two, "amina", 2)).await.unwrap();
        repo.append_result(&record(&one, "amina", 3)).await.unwrap();
        repo.append_result(&record(&one, "yusuf", 4)).await.unwrap();

        let amina = LearnerId::parse("amina").unwrap();
        let all = repo.list_results(&amina, None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].submitted_at > all[1].submitted_at);

        let lesson_one = repo
            .list_results(&amina, Some(one.id()), 1)
            .await
            .unwrap();
        assert_eq!(lesson_one.len(), 1);
        assert_eq!(lesson_one[0].submitted_at, fixed_now() + Duration::minutes(3));
    }
}
