use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, EnrollmentId, LessonId, ModuleId, UserId};

/// Completion record for a single lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub lesson_id: LessonId,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_secs: u32,
}

impl LessonProgress {
    #[must_use]
    pub fn completed(lesson_id: LessonId, at: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            completed: true,
            completed_at: Some(at),
            time_spent_secs: 0,
        }
    }
}

/// Completion record for a module.
///
/// `completed` is true iff every lesson of the module has a completed
/// `LessonProgress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub module_id: ModuleId,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lessons: Vec<LessonProgress>,
}

impl ModuleProgress {
    #[must_use]
    pub fn empty(module_id: ModuleId) -> Self {
        Self {
            module_id,
            completed: false,
            completed_at: None,
            lessons: Vec::new(),
        }
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: LessonId) -> Option<&LessonProgress> {
        self.lessons.iter().find(|l| l.lesson_id == lesson_id)
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.lesson(lesson_id).is_some_and(|l| l.completed)
    }
}

/// A learner's registration and progress record for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Server-supplied aggregate (0–100). Used only as a fallback when
    /// `module_progress` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// `None` marks a legacy enrollment that predates structured progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_progress: Option<Vec<ModuleProgress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_lesson_id: Option<LessonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_module_id: Option<ModuleId>,
    pub enrolled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Fresh enrollment with empty structured progress.
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            course_id,
            progress: Some(0.0),
            module_progress: Some(Vec::new()),
            current_lesson_id: None,
            current_module_id: None,
            enrolled_at,
            last_accessed_at: None,
        }
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.module_progress.is_none()
    }

    #[must_use]
    pub fn module_entry(&self, module_id: ModuleId) -> Option<&ModuleProgress> {
        self.module_progress
            .as_deref()
            .and_then(|modules| modules.iter().find(|m| m.module_id == module_id))
    }

    /// True when the lesson's module entry records it as completed.
    #[must_use]
    pub fn is_lesson_completed(&self, module_id: ModuleId, lesson_id: LessonId) -> bool {
        self.module_entry(module_id)
            .is_some_and(|m| m.is_lesson_completed(lesson_id))
    }

    /// True once any lesson anywhere in `module_progress` is completed.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.module_progress
            .as_deref()
            .is_some_and(|modules| {
                modules
                    .iter()
                    .any(|m| m.lessons.iter().any(|l| l.completed))
            })
    }

    /// Aggregate progress as stored, treating a missing value as 0.
    #[must_use]
    pub fn stored_progress(&self) -> f64 {
        self.progress.unwrap_or(0.0)
    }
}
