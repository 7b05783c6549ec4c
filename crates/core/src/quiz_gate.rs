//! Linear prerequisite gating for quiz lessons.
//!
//! A quiz at position `(k, j)` opens only when modules `0..k` are each
//! recorded as completed and lessons `0..j` of module `k` are each completed.
//! Lessons at or after `j` never influence access. Modules without lessons
//! count as completed.

use std::fmt;

use crate::model::{Course, Enrollment, LessonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// No structured progress, or nothing completed yet.
    NotStarted,
    LessonNotFound,
    PreviousModuleIncomplete { module_index: usize },
    /// The quiz's own module has no progress entry.
    ModuleNotStarted,
    PreviousLessonIncomplete { lesson_index: usize },
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockReason::NotStarted => write!(f, "start the course before taking quizzes"),
            LockReason::LessonNotFound => write!(f, "quiz is no longer part of this course"),
            LockReason::PreviousModuleIncomplete { module_index } => {
                write!(f, "complete module {} first", module_index + 1)
            }
            LockReason::ModuleNotStarted => write!(f, "start this module first"),
            LockReason::PreviousLessonIncomplete { lesson_index } => {
                write!(f, "complete lesson {} of this module first", lesson_index + 1)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAccess {
    Open,
    Locked(LockReason),
}

impl QuizAccess {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, QuizAccess::Open)
    }
}

/// Decide whether the learner may open the quiz lesson, and why not if locked.
#[must_use]
pub fn quiz_access(course: &Course, enrollment: &Enrollment, quiz_lesson_id: LessonId) -> QuizAccess {
    if !enrollment.has_started() {
        return QuizAccess::Locked(LockReason::NotStarted);
    }
    let Some(pos) = course.locate(quiz_lesson_id) else {
        return QuizAccess::Locked(LockReason::LessonNotFound);
    };

    for (module_index, module) in course.modules.iter().enumerate().take(pos.module_index) {
        // A module without lessons is vacuously complete.
        if module.is_empty() {
            continue;
        }
        let done = enrollment.module_entry(module.id).is_some_and(|m| m.completed);
        if !done {
            return QuizAccess::Locked(LockReason::PreviousModuleIncomplete { module_index });
        }
    }

    let module = &course.modules[pos.module_index];
    let Some(entry) = enrollment.module_entry(module.id) else {
        return QuizAccess::Locked(LockReason::ModuleNotStarted);
    };

    for (lesson_index, lesson) in module.lessons.iter().enumerate().take(pos.lesson_index) {
        if !entry.is_lesson_completed(lesson.id) {
            return QuizAccess::Locked(LockReason::PreviousLessonIncomplete { lesson_index });
        }
    }

    QuizAccess::Open
}

#[must_use]
pub fn can_access_quiz(course: &Course, enrollment: &Enrollment, quiz_lesson_id: LessonId) -> bool {
    quiz_access(course, enrollment, quiz_lesson_id).is_open()
}
