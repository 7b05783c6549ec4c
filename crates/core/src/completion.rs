//! Marking lessons complete and the quiz requirements that guard 100%.
//!
//! Everything here is pure: the services layer decides when to persist the
//! resulting [`ProgressPatch`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Course, CourseId, Enrollment, LessonId, LessonProgress, ModuleId, ModuleProgress,
    QuizAttempt, best_attempt,
};
use crate::progress::{completed_lesson_count, raw_progress};

/// Highest aggregate progress allowed while quiz requirements are unmet.
pub const UNMET_QUIZ_PROGRESS_CAP: f64 = 99.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("lesson {0} is not part of this course")]
    LessonNotFound(LessonId),

    #[error("enrollment is for course {enrollment}, not course {course}")]
    CourseMismatch {
        course: CourseId,
        enrollment: CourseId,
    },
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Full progress record sent to the enrollment-update collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    pub module_progress: Vec<ModuleProgress>,
    /// Unrounded aggregate percentage.
    pub progress: f64,
    pub current_lesson_id: Option<LessonId>,
    pub current_module_id: Option<ModuleId>,
    pub last_accessed_at: DateTime<Utc>,
}

impl ProgressPatch {
    #[must_use]
    pub fn reaches_completion(&self) -> bool {
        self.progress >= 100.0
    }

    /// Hold progress below 100 until every graded quiz is passed.
    pub fn clamp_for_unmet_quizzes(&mut self) {
        if self.progress > UNMET_QUIZ_PROGRESS_CAP {
            self.progress = UNMET_QUIZ_PROGRESS_CAP;
        }
    }

    /// Write the patch into an enrollment record, as a persistence backend would.
    pub fn apply_to(&self, enrollment: &mut Enrollment) {
        enrollment.module_progress = Some(self.module_progress.clone());
        enrollment.progress = Some(self.progress);
        if self.current_lesson_id.is_some() {
            enrollment.current_lesson_id = self.current_lesson_id;
        }
        if self.current_module_id.is_some() {
            enrollment.current_module_id = self.current_module_id;
        }
        enrollment.last_accessed_at = Some(self.last_accessed_at);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The lesson was already recorded as completed; nothing to persist.
    AlreadyCompleted,
    Marked(ProgressPatch),
}

//
// ─── MARKING ───────────────────────────────────────────────────────────────────
//

/// Record `lesson_id` as completed and recompute module and course completion.
///
/// # Errors
///
/// Returns `CompletionError::LessonNotFound` if the lesson is not in the course,
/// or `CompletionError::CourseMismatch` if the enrollment is for another course.
pub fn mark_lesson_complete(
    course: &Course,
    enrollment: &Enrollment,
    lesson_id: LessonId,
    now: DateTime<Utc>,
) -> Result<Completion, CompletionError> {
    if enrollment.course_id != course.id {
        return Err(CompletionError::CourseMismatch {
            course: course.id,
            enrollment: enrollment.course_id,
        });
    }
    let (module, _) = course
        .find_lesson(lesson_id)
        .ok_or(CompletionError::LessonNotFound(lesson_id))?;

    if enrollment.is_lesson_completed(module.id, lesson_id) {
        return Ok(Completion::AlreadyCompleted);
    }

    let mut modules = enrollment.module_progress.clone().unwrap_or_default();
    let entry_index = match modules.iter().position(|m| m.module_id == module.id) {
        Some(index) => index,
        None => {
            modules.push(ModuleProgress::empty(module.id));
            modules.len() - 1
        }
    };
    let entry = &mut modules[entry_index];

    match entry.lessons.iter_mut().find(|l| l.lesson_id == lesson_id) {
        Some(record) => {
            record.completed = true;
            record.completed_at = Some(now);
        }
        None => entry.lessons.push(LessonProgress::completed(lesson_id, now)),
    }

    refresh_module_flags(course, &mut modules, now);

    let mut updated = enrollment.clone();
    updated.module_progress = Some(modules);
    let progress = raw_progress(
        completed_lesson_count(course, &updated),
        course.lesson_count(),
    );

    Ok(Completion::Marked(ProgressPatch {
        module_progress: updated.module_progress.unwrap_or_default(),
        progress,
        current_lesson_id: Some(lesson_id),
        current_module_id: Some(module.id),
        last_accessed_at: now,
    }))
}

/// Re-derive every module flag against the live course, so a module that
/// gained a lesson after it was finished is open again.
///
/// Entries for modules no longer in the course are left untouched.
fn refresh_module_flags(course: &Course, modules: &mut [ModuleProgress], now: DateTime<Utc>) {
    for entry in modules.iter_mut() {
        let Some(module) = course.modules.iter().find(|m| m.id == entry.module_id) else {
            continue;
        };
        let done = !module.lessons.is_empty()
            && module
                .lessons
                .iter()
                .all(|lesson| entry.is_lesson_completed(lesson.id));
        match (done, entry.completed) {
            (true, false) => {
                entry.completed = true;
                entry.completed_at = Some(now);
            }
            (false, true) => {
                entry.completed = false;
                entry.completed_at = None;
            }
            _ => {}
        }
    }
}

//
// ─── QUIZ REQUIREMENTS ─────────────────────────────────────────────────────────
//

/// A graded quiz the learner has not yet passed.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizShortfall {
    pub lesson_id: LessonId,
    pub title: String,
    pub required: u32,
    pub best: Option<f64>,
}

impl fmt::Display for QuizShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best {
            Some(best) => write!(
                f,
                "quiz \"{}\" requires {}% (best score: {best:.0}%)",
                self.title, self.required
            ),
            None => write!(
                f,
                "quiz \"{}\" requires {}% (no attempts yet)",
                self.title, self.required
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizRequirements {
    Met,
    Unmet(Vec<QuizShortfall>),
}

impl QuizRequirements {
    #[must_use]
    pub fn is_met(&self) -> bool {
        matches!(self, QuizRequirements::Met)
    }
}

/// Every quiz that declares a passing score must have a best attempt at or above it.
///
/// Quizzes without a passing score are exempt.
#[must_use]
pub fn check_quiz_requirements(course: &Course, attempts: &[QuizAttempt]) -> QuizRequirements {
    let shortfalls: Vec<_> = course
        .quiz_lessons()
        .filter_map(|lesson| {
            let required = lesson.quiz()?.passing_score?;
            let best = best_attempt(attempts, course.id, lesson.id).map(|a| a.score);
            let passed = best.is_some_and(|score| score >= f64::from(required));
            (!passed).then(|| QuizShortfall {
                lesson_id: lesson.id,
                title: lesson.title.clone(),
                required,
                best,
            })
        })
        .collect();

    if shortfalls.is_empty() {
        QuizRequirements::Met
    } else {
        QuizRequirements::Unmet(shortfalls)
    }
}

//
// ─── LEGACY MIGRATION ──────────────────────────────────────────────────────────
//

/// Build structured progress for an enrollment that only has an aggregate percentage.
///
/// The first `floor(progress * total / 100)` lessons in course order are marked
/// completed, which keeps the recomputed percentage at or just below the
/// legacy value.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn migrate_legacy_progress(
    course: &Course,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
) -> Vec<ModuleProgress> {
    let total = course.lesson_count();
    let legacy = enrollment.stored_progress();
    let legacy = if legacy.is_finite() {
        legacy.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let target = ((legacy * total as f64) / 100.0).floor() as usize;

    let mut remaining = target;
    course
        .modules
        .iter()
        .map(|module| {
            let mut entry = ModuleProgress::empty(module.id);
            for lesson in &module.lessons {
                if remaining == 0 {
                    break;
                }
                entry.lessons.push(LessonProgress::completed(lesson.id, now));
                remaining -= 1;
            }
            if !module.lessons.is_empty() && entry.lessons.len() == module.lessons.len() {
                entry.completed = true;
                entry.completed_at = Some(now);
            }
            entry
        })
        .collect()
}
