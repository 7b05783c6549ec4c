use lms_core::model::{QuizAttempt, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_quiz_attempt_row};
use crate::repository::{QuizAttemptRepository, StorageError};

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, course_id, lesson_id, score, submitted_at
            FROM quiz_attempts
            WHERE user_id = ?1
            ORDER BY submitted_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_quiz_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn record_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_attempts (id, user_id, course_id, lesson_id, score, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("quiz_attempt_id", attempt.id.value())?)
        .bind(id_to_i64("user_id", attempt.user_id.value())?)
        .bind(id_to_i64("course_id", attempt.course_id.value())?)
        .bind(id_to_i64("lesson_id", attempt.lesson_id.value())?)
        .bind(attempt.score)
        .bind(attempt.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        Ok(())
    }
}
