use quiz_core::model::{Lesson, LessonId, LessonOverview, VocabularyId, VocabularyItem};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_usize, ser, u32_from_i64, usize_to_i64};
use crate::repository::{LessonRepository, StorageError};

fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<VocabularyItem, StorageError> {
    let id = VocabularyId::parse(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?;
    let item = VocabularyItem::new(
        id,
        row.try_get::<String, _>("primary_text").map_err(ser)?,
        row.try_get::<String, _>("transliteration").map_err(ser)?,
        row.try_get::<String, _>("meaning").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(match row.try_get::<Option<String>, _>("example_verse").map_err(ser)? {
        Some(verse) => item.with_example_verse(verse),
        None => item,
    })
}

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO lessons (id, number, title, description)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    number = excluded.number,
                    title = excluded.title,
                    description = excluded.description
            ",
        )
        .bind(lesson.id().as_str())
        .bind(i64::from(lesson.number()))
        .bind(lesson.title())
        .bind(lesson.description())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM vocabulary_items WHERE lesson_id = ?1")
            .bind(lesson.id().as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, item) in lesson.items().iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO vocabulary_items (
                        lesson_id, id, position, primary_text,
                        transliteration, meaning, example_verse
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(lesson.id().as_str())
            .bind(item.id().as_str())
            .bind(usize_to_i64("position", position)?)
            .bind(item.primary_text())
            .bind(item.transliteration())
            .bind(item.meaning())
            .bind(item.example_verse())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let row = sqlx::query("SELECT number, title, description FROM lessons WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        let number = u32_from_i64("number", row.try_get::<i64, _>("number").map_err(ser)?)?;
        let title: String = row.try_get("title").map_err(ser)?;
        let description: String = row.try_get("description").map_err(ser)?;

        let item_rows = sqlx::query(
            r"
                SELECT id, primary_text, transliteration, meaning, example_verse
                FROM vocabulary_items
                WHERE lesson_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let items = item_rows
            .iter()
            .map(map_item_row)
            .collect::<Result<Vec<_>, _>>()?;

        Lesson::new(id.clone(), number, title, description, items).map_err(ser)
    }

    async fn list_lessons(&self) -> Result<Vec<LessonOverview>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT l.id, l.number, l.title, l.description, COUNT(v.id) AS word_count
                FROM lessons l
                LEFT JOIN vocabulary_items v ON v.lesson_id = l.id
                GROUP BY l.id, l.number, l.title, l.description
                ORDER BY l.number ASC, l.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(LessonOverview {
                id: LessonId::parse(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?,
                number: u32_from_i64("number", row.try_get::<i64, _>("number").map_err(ser)?)?,
                title: row.try_get("title").map_err(ser)?,
                description: row.try_get("description").map_err(ser)?,
                word_count: i64_to_usize(
                    "word_count",
                    row.try_get::<i64, _>("word_count").map_err(ser)?,
                )?,
            });
        }
        Ok(out)
    }
}
