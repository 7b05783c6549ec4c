use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, ModuleId};
use crate::model::lesson::{Lesson, LessonError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lesson {0} appears more than once in the course")]
    DuplicateLesson(LessonId),

    #[error("lesson {lesson_id} is invalid: {source}")]
    InvalidLesson {
        lesson_id: LessonId,
        #[source]
        source: LessonError,
    },
}

//
// ─── POSITION ──────────────────────────────────────────────────────────────────
//

/// Location of a lesson inside a course.
///
/// Ordering follows the course: modules in order, then lessons in order. Every
/// prerequisite walk (quiz gating, next action, legacy migration) is expressed
/// in terms of this total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoursePosition {
    pub module_index: usize,
    pub lesson_index: usize,
}

impl CoursePosition {
    #[must_use]
    pub fn new(module_index: usize, lesson_index: usize) -> Self {
        Self {
            module_index,
            lesson_index,
        }
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// Ordered group of lessons. Module order defines prerequisite sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn new(id: ModuleId, title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            id,
            title: title.into(),
            lessons,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Course definition as served by the catalog. Read-only from the learner's side.
///
/// `total_lessons` is a denormalized counter and is never used for progress;
/// progress always counts the live module/lesson tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub enrolled_students: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub total_lessons: u32,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>, modules: Vec<Module>) -> Self {
        let total = modules.iter().map(|m| m.lessons.len()).sum::<usize>();
        Self {
            id,
            title: title.into(),
            description: String::new(),
            category: String::new(),
            modules,
            enrolled_students: 0,
            duration: None,
            total_lessons: u32::try_from(total).unwrap_or(u32::MAX),
        }
    }

    /// Number of lessons across all modules of the live definition.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// All lesson positions in course order.
    pub fn positions(&self) -> impl Iterator<Item = (CoursePosition, &Module, &Lesson)> + '_ {
        self.modules
            .iter()
            .enumerate()
            .flat_map(|(module_index, module)| {
                module
                    .lessons
                    .iter()
                    .enumerate()
                    .map(move |(lesson_index, lesson)| {
                        (CoursePosition::new(module_index, lesson_index), module, lesson)
                    })
            })
    }

    /// Find a lesson's position, scanning modules in order then lessons in order.
    #[must_use]
    pub fn locate(&self, lesson_id: LessonId) -> Option<CoursePosition> {
        self.positions()
            .find(|(_, _, lesson)| lesson.id == lesson_id)
            .map(|(pos, _, _)| pos)
    }

    #[must_use]
    pub fn lesson_at(&self, pos: CoursePosition) -> Option<&Lesson> {
        self.modules
            .get(pos.module_index)
            .and_then(|m| m.lessons.get(pos.lesson_index))
    }

    #[must_use]
    pub fn module_at(&self, module_index: usize) -> Option<&Module> {
        self.modules.get(module_index)
    }

    /// Resolve a lesson together with its owning module.
    #[must_use]
    pub fn find_lesson(&self, lesson_id: LessonId) -> Option<(&Module, &Lesson)> {
        self.positions()
            .find(|(_, _, lesson)| lesson.id == lesson_id)
            .map(|(_, module, lesson)| (module, lesson))
    }

    #[must_use]
    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.positions().next().map(|(_, _, lesson)| lesson)
    }

    pub fn quiz_lessons(&self) -> impl Iterator<Item = &Lesson> + '_ {
        self.positions()
            .map(|(_, _, lesson)| lesson)
            .filter(|lesson| lesson.is_quiz())
    }

    /// # Errors
    ///
    /// Returns `CourseError` for an empty title, a repeated lesson id, or an
    /// invalid lesson payload.
    pub fn validate(&self) -> Result<(), CourseError> {
        if self.title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let mut seen = HashSet::new();
        for (_, _, lesson) in self.positions() {
            if !seen.insert(lesson.id) {
                return Err(CourseError::DuplicateLesson(lesson.id));
            }
            lesson.validate().map_err(|source| CourseError::InvalidLesson {
                lesson_id: lesson.id,
                source,
            })?;
        }
        Ok(())
    }
}
