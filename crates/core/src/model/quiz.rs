use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId, QuizAttemptId, UserId};

/// A learner's recorded attempt at a quiz lesson. `score` is a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: QuizAttemptId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lesson_id: LessonId,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Highest-scoring attempt for the given quiz lesson, if any.
///
/// Lesson ids are only unique within a course, so attempts are matched on
/// both ids.
#[must_use]
pub fn best_attempt(
    attempts: &[QuizAttempt],
    course_id: CourseId,
    lesson_id: LessonId,
) -> Option<&QuizAttempt> {
    attempts
        .iter()
        .filter(|a| a.course_id == course_id && a.lesson_id == lesson_id)
        .max_by(|a, b| a.score.total_cmp(&b.score))
}
