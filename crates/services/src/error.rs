//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::completion::CompletionError;
use lms_core::model::{CourseId, LessonId, ProgramId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseProgressError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("lesson {lesson_id} is not part of course {course_id}")]
    LessonNotFound {
        course_id: CourseId,
        lesson_id: LessonId,
    },
    /// The learner has no enrollment for the course.
    #[error("not enrolled in course {0}")]
    NotEnrolled(CourseId),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgramService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgramServiceError {
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
