use lms_core::completion::{ProgressPatch, migrate_legacy_progress};
use lms_core::model::{CourseId, Enrollment, EnrollmentId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_enrollment_row, to_json};
use crate::repository::{CourseRepository, EnrollmentRepository, StorageError};

const SELECT_ENROLLMENT: &str = r"
    SELECT id, user_id, course_id, progress, module_progress, current_lesson_id,
           current_module_id, enrolled_at, last_accessed_at
    FROM enrollments
";

fn opt_id(field: &'static str, v: Option<u64>) -> Result<Option<i64>, StorageError> {
    v.map(|id| id_to_i64(field, id)).transpose()
}

impl SqliteRepository {
    async fn enrollment_by_id(&self, id: EnrollmentId) -> Result<Enrollment, StorageError> {
        let row = sqlx::query(&format!("{SELECT_ENROLLMENT} WHERE id = ?1"))
            .bind(id_to_i64("enrollment_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_enrollment_row(&row)
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn my_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_ENROLLMENT} WHERE user_id = ?1 ORDER BY id ASC"))
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_enrollment_row(&row)?);
        }
        Ok(out)
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let module_progress = enrollment
            .module_progress
            .as_ref()
            .map(to_json)
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO enrollments (
                id, user_id, course_id, progress, module_progress,
                current_lesson_id, current_module_id, enrolled_at, last_accessed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                progress = excluded.progress,
                module_progress = excluded.module_progress,
                current_lesson_id = excluded.current_lesson_id,
                current_module_id = excluded.current_module_id,
                last_accessed_at = excluded.last_accessed_at
            ",
        )
        .bind(id_to_i64("enrollment_id", enrollment.id.value())?)
        .bind(id_to_i64("user_id", enrollment.user_id.value())?)
        .bind(id_to_i64("course_id", enrollment.course_id.value())?)
        .bind(enrollment.progress)
        .bind(module_progress)
        .bind(opt_id(
            "current_lesson_id",
            enrollment.current_lesson_id.map(|id| id.value()),
        )?)
        .bind(opt_id(
            "current_module_id",
            enrollment.current_module_id.map(|id| id.value()),
        )?)
        .bind(enrollment.enrolled_at)
        .bind(enrollment.last_accessed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        Ok(())
    }

    async fn update_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
        patch: &ProgressPatch,
    ) -> Result<Enrollment, StorageError> {
        let user = id_to_i64("user_id", user_id.value())?;
        let course = id_to_i64("course_id", course_id.value())?;

        let res = sqlx::query(
            r"
            UPDATE enrollments SET
                module_progress = ?1,
                progress = ?2,
                current_lesson_id = COALESCE(?3, current_lesson_id),
                current_module_id = COALESCE(?4, current_module_id),
                last_accessed_at = ?5
            WHERE user_id = ?6 AND course_id = ?7
            ",
        )
        .bind(to_json(&patch.module_progress)?)
        .bind(patch.progress.clamp(0.0, 100.0))
        .bind(opt_id(
            "current_lesson_id",
            patch.current_lesson_id.map(|id| id.value()),
        )?)
        .bind(opt_id(
            "current_module_id",
            patch.current_module_id.map(|id| id.value()),
        )?)
        .bind(patch.last_accessed_at)
        .bind(user)
        .bind(course)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let row = sqlx::query(&format!(
            "{SELECT_ENROLLMENT} WHERE user_id = ?1 AND course_id = ?2"
        ))
        .bind(user)
        .bind(course)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        map_enrollment_row(&row)
    }

    async fn migrate_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, StorageError> {
        let mut enrollment = self.enrollment_by_id(enrollment_id).await?;
        if !enrollment.is_legacy() {
            return Ok(enrollment);
        }

        let course = self
            .get_course(enrollment.course_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let modules = migrate_legacy_progress(&course, &enrollment, self.clock.now());

        sqlx::query("UPDATE enrollments SET module_progress = ?1 WHERE id = ?2 AND module_progress IS NULL")
            .bind(to_json(&modules)?)
            .bind(id_to_i64("enrollment_id", enrollment_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        tracing::debug!(enrollment_id = %enrollment_id, "migrated legacy enrollment progress");
        enrollment.module_progress = Some(modules);
        Ok(enrollment)
    }
}
