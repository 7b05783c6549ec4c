use lms_core::model::{Course, CourseId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, id_to_i64, ser, to_json};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT body FROM courses WHERE id = ?1")
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body").map_err(ser)?;
                from_json(&body).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query("SELECT body FROM courses ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            let body: String = row.try_get("body").map_err(ser)?;
            courses.push(from_json(&body)?);
        }
        Ok(courses)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, body)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body
            ",
        )
        .bind(id_to_i64("course_id", course.id.value())?)
        .bind(course.title.as_str())
        .bind(to_json(course)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
