use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptId, LearnerId, LessonId, Response, SessionResult, VocabularyId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_usize, ser, u32_from_i64, usize_to_i64};
use crate::repository::{NewResultRecord, ResultRecord, ResultRepository, StorageError};

const RESPONSE_BATCH: usize = 500;

const RESULT_COLUMNS: &str =
    "id, attempt_id, learner_id, lesson_id, submitted_at, total_questions";

fn map_response_row(row: &sqlx::sqlite::SqliteRow) -> Result<Response, StorageError> {
    Ok(Response {
        question_index: i64_to_usize(
            "question_index",
            row.try_get::<i64, _>("question_index").map_err(ser)?,
        )?,
        item_id: VocabularyId::parse(row.try_get::<String, _>("item_id").map_err(ser)?)
            .map_err(ser)?,
        selected_answer: row.try_get("selected_answer").map_err(ser)?,
        is_correct: row.try_get::<bool, _>("is_correct").map_err(ser)?,
        elapsed_seconds: u32_from_i64(
            "elapsed_seconds",
            row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
        )?,
    })
}

/// Columns of a `quiz_results` row; the score is rebuilt from the responses.
struct ResultHeader {
    id: i64,
    attempt_id: AttemptId,
    learner_id: LearnerId,
    lesson_id: LessonId,
    submitted_at: DateTime<Utc>,
    total_questions: usize,
}

fn map_header_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResultHeader, StorageError> {
    Ok(ResultHeader {
        id: row.try_get("id").map_err(ser)?,
        attempt_id: row
            .try_get::<String, _>("attempt_id")
            .map_err(ser)?
            .parse()
            .map_err(ser)?,
        learner_id: LearnerId::parse(row.try_get::<String, _>("learner_id").map_err(ser)?)
            .map_err(ser)?,
        lesson_id: LessonId::parse(row.try_get::<String, _>("lesson_id").map_err(ser)?)
            .map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
        total_questions: i64_to_usize(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
    })
}

fn assemble(header: ResultHeader, responses: Vec<Response>) -> Result<ResultRecord, StorageError> {
    // Score and totals are recomputed from the responses rather than trusted.
    let result = SessionResult::from_responses(header.lesson_id, header.total_questions, responses)
        .map_err(ser)?;
    Ok(ResultRecord {
        id: header.id,
        attempt_id: header.attempt_id,
        learner_id: header.learner_id,
        submitted_at: header.submitted_at,
        result,
    })
}

impl SqliteRepository {
    /// Responses for every given result, grouped by result id. Ids are fetched in
    /// batches of `RESPONSE_BATCH` to stay under SQLite's bound-parameter limit.
    async fn responses_for(
        &self,
        result_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Response>>, StorageError> {
        let mut grouped: HashMap<i64, Vec<Response>> = HashMap::new();

        for batch in result_ids.chunks(RESPONSE_BATCH) {
            let placeholders = (1..=batch.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT result_id, question_index, item_id, selected_answer, is_correct, elapsed_seconds
                 FROM quiz_responses
                 WHERE result_id IN ({placeholders})
                 ORDER BY result_id ASC, question_index ASC"
            );
            let mut query = sqlx::query(&sql);
            for id in batch {
                query = query.bind(*id);
            }
            let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

            for row in &rows {
                let result_id: i64 = row.try_get("result_id").map_err(ser)?;
                grouped
                    .entry(result_id)
                    .or_default()
                    .push(map_response_row(row)?);
            }
        }
        Ok(grouped)
    }

    async fn load_records(
        &self,
        rows: &[sqlx::sqlite::SqliteRow],
    ) -> Result<Vec<ResultRecord>, StorageError> {
        let headers = rows
            .iter()
            .map(map_header_row)
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<i64> = headers.iter().map(|h| h.id).collect();
        let mut responses = self.responses_for(&ids).await?;

        headers
            .into_iter()
            .map(|header| {
                let own = responses.remove(&header.id).unwrap_or_default();
                assemble(header, own)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, record: &NewResultRecord) -> Result<i64, StorageError> {
        let result = &record.result;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let inserted = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    attempt_id, learner_id, lesson_id, submitted_at, total_questions,
                    correct_count, total_elapsed_seconds, score_percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.attempt_id.to_string())
        .bind(record.learner_id.as_str())
        .bind(result.lesson_id().as_str())
        .bind(record.submitted_at)
        .bind(usize_to_i64("total_questions", result.total_questions())?)
        .bind(usize_to_i64("correct_count", result.correct_count())?)
        .bind(
            i64::try_from(result.total_elapsed_seconds())
                .map_err(|_| StorageError::Serialization("total_elapsed_seconds overflow".into()))?,
        )
        .bind(result.score_percentage())
        .execute(&mut *tx)
        .await;

        let id = match inserted {
            Ok(res) => res.last_insert_rowid(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StorageError::Conflict);
            }
            Err(e) => return Err(conn(e)),
        };

        for response in result.responses() {
            sqlx::query(
                r"
                    INSERT INTO quiz_responses (
                        result_id, question_index, item_id, selected_answer,
                        is_correct, elapsed_seconds
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(id)
            .bind(usize_to_i64("question_index", response.question_index)?)
            .bind(response.item_id.as_str())
            .bind(response.selected_answer.as_str())
            .bind(response.is_correct)
            .bind(i64::from(response.elapsed_seconds))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM quiz_results WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let mut records = self.load_records(std::slice::from_ref(&row)).await?;
        records.pop().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        learner_id: &LearnerId,
        lesson_id: Option<&LessonId>,
        limit: u32,
    ) -> Result<Vec<ResultRecord>, StorageError> {
        let mut sql = format!("SELECT {RESULT_COLUMNS} FROM quiz_results WHERE learner_id = ?1");
        let mut bind_index = 2;
        if lesson_id.is_some() {
            sql.push_str(" AND lesson_id = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY submitted_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(learner_id.as_str());
        if let Some(lesson) = lesson_id {
            query = query.bind(lesson.as_str());
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        self.load_records(&rows).await
    }
}
