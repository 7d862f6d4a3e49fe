use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates lessons, their vocabulary, recorded quiz results and per-question responses.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS lessons (
                id TEXT PRIMARY KEY,
                number INTEGER NOT NULL CHECK (number >= 0),
                title TEXT NOT NULL,
                description TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS vocabulary_items (
                lesson_id TEXT NOT NULL,
                id TEXT NOT NULL,
                position INTEGER NOT NULL CHECK (position >= 0),
                primary_text TEXT NOT NULL,
                transliteration TEXT NOT NULL,
                meaning TEXT NOT NULL CHECK (length(trim(meaning)) > 0),
                example_verse TEXT,
                PRIMARY KEY (lesson_id, id),
                FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY,
                attempt_id TEXT NOT NULL UNIQUE,
                learner_id TEXT NOT NULL,
                lesson_id TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                total_questions INTEGER NOT NULL CHECK (total_questions > 0),
                correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
                total_elapsed_seconds INTEGER NOT NULL CHECK (total_elapsed_seconds >= 0),
                score_percentage REAL NOT NULL CHECK (score_percentage BETWEEN 0 AND 100)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quiz_responses (
                result_id INTEGER NOT NULL,
                question_index INTEGER NOT NULL CHECK (question_index >= 0),
                item_id TEXT NOT NULL,
                selected_answer TEXT NOT NULL,
                is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                elapsed_seconds INTEGER NOT NULL CHECK (elapsed_seconds >= 0),
                PRIMARY KEY (result_id, question_index),
                FOREIGN KEY (result_id) REFERENCES quiz_results(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_vocabulary_items_lesson_position
                ON vocabulary_items (lesson_id, position);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_quiz_results_learner_submitted
                ON quiz_results (learner_id, submitted_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("applied schema migration 1");

    Ok(())
}
