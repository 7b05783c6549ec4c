use chrono::{DateTime, Utc};
use lms_core::model::{
    CourseId, Enrollment, EnrollmentId, FinalTest, FinalTestId, LessonId, ModuleId,
    ModuleProgress, ProgramId, QuizAttempt, QuizAttemptId, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn get_id(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_opt_id(row: &SqliteRow, field: &'static str) -> Result<Option<u64>, StorageError> {
    row.try_get::<Option<i64>, _>(field)
        .map_err(ser)?
        .map(|v| i64_to_u64(field, v))
        .transpose()
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let module_progress = row
        .try_get::<Option<String>, _>("module_progress")
        .map_err(ser)?
        .map(|raw| from_json::<Vec<ModuleProgress>>(&raw))
        .transpose()?;
    let enrolled_at: DateTime<Utc> = row.try_get("enrolled_at").map_err(ser)?;

    Ok(Enrollment {
        id: EnrollmentId::new(get_id(row, "id")?),
        user_id: UserId::new(get_id(row, "user_id")?),
        course_id: CourseId::new(get_id(row, "course_id")?),
        progress: row.try_get("progress").map_err(ser)?,
        module_progress,
        current_lesson_id: get_opt_id(row, "current_lesson_id")?.map(LessonId::new),
        current_module_id: get_opt_id(row, "current_module_id")?.map(ModuleId::new),
        enrolled_at,
        last_accessed_at: row.try_get("last_accessed_at").map_err(ser)?,
    })
}

pub(crate) fn map_final_test_row(row: &SqliteRow) -> Result<FinalTest, StorageError> {
    Ok(FinalTest {
        id: FinalTestId::new(get_id(row, "id")?),
        program_id: ProgramId::new(get_id(row, "program_id")?),
        title: row.try_get("title").map_err(ser)?,
        published: row.try_get::<i64, _>("published").map_err(ser)? != 0,
    })
}

pub(crate) fn map_quiz_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    Ok(QuizAttempt {
        id: QuizAttemptId::new(get_id(row, "id")?),
        user_id: UserId::new(get_id(row, "user_id")?),
        course_id: CourseId::new(get_id(row, "course_id")?),
        lesson_id: LessonId::new(get_id(row, "lesson_id")?),
        score: row.try_get("score").map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}
