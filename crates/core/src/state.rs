//! Canonical course-detail state and its update function.
//!
//! Only the course, the enrollment and the selected lesson are stored.
//! Progress, next action and quiz access are recomputed from them on every
//! read, so there is a single source of truth for each value.

use crate::model::{Course, Enrollment, Lesson, LessonId, Module};
use crate::navigation::{NextAction, compute_next_action};
use crate::progress::compute_progress;
use crate::quiz_gate::{LockReason, QuizAccess, quiz_access};

#[derive(Debug, Clone, PartialEq)]
pub enum CourseViewEvent {
    SelectLesson(LessonId),
    /// Canonical enrollment returned by the persistence collaborator.
    EnrollmentUpdated(Enrollment),
    CourseReloaded(Course),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseViewState {
    course: Course,
    enrollment: Option<Enrollment>,
    selected: Option<LessonId>,
}

impl CourseViewState {
    /// Build the initial state, selecting the learner's current lesson when it
    /// still exists, otherwise the first lesson of the course.
    #[must_use]
    pub fn new(course: Course, enrollment: Option<Enrollment>) -> Self {
        let mut state = Self {
            course,
            enrollment,
            selected: None,
        };
        state.selected = state.fallback_selection();
        state
    }

    /// Apply an event and return the next state.
    #[must_use]
    pub fn reduce(mut self, event: CourseViewEvent) -> Self {
        match event {
            CourseViewEvent::SelectLesson(lesson_id) => {
                if self.course.locate(lesson_id).is_some() {
                    self.selected = Some(lesson_id);
                }
            }
            CourseViewEvent::EnrollmentUpdated(enrollment) => {
                if enrollment.course_id == self.course.id {
                    self.enrollment = Some(enrollment);
                }
            }
            CourseViewEvent::CourseReloaded(course) => {
                self.course = course;
                let still_valid = self
                    .selected
                    .is_some_and(|id| self.course.locate(id).is_some());
                if !still_valid {
                    self.selected = self.fallback_selection();
                }
            }
        }
        self
    }

    fn fallback_selection(&self) -> Option<LessonId> {
        self.enrollment
            .as_ref()
            .and_then(|e| e.current_lesson_id)
            .filter(|id| self.course.locate(*id).is_some())
            .or_else(|| self.course.first_lesson().map(|l| l.id))
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.enrollment.is_some()
    }

    #[must_use]
    pub fn selected_lesson_id(&self) -> Option<LessonId> {
        self.selected
    }

    #[must_use]
    pub fn selected_lesson(&self) -> Option<(&Module, &Lesson)> {
        self.selected.and_then(|id| self.course.find_lesson(id))
    }

    /// Completion percentage; 0 when not enrolled.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.enrollment
            .as_ref()
            .map_or(0, |e| compute_progress(&self.course, e))
    }

    #[must_use]
    pub fn next_action(&self) -> Option<NextAction> {
        let enrollment = self.enrollment.as_ref()?;
        compute_next_action(&self.course, enrollment, self.selected?)
    }

    /// Next step after `selected`, or after the current selection when none is
    /// given. `None` when `selected` is not part of the course.
    #[must_use]
    pub fn next_action_after(&self, selected: Option<LessonId>) -> Option<NextAction> {
        let lesson_id = match selected {
            Some(id) => {
                self.course.locate(id)?;
                id
            }
            None => self.selected?,
        };
        compute_next_action(&self.course, self.enrollment.as_ref()?, lesson_id)
    }

    #[must_use]
    pub fn quiz_access(&self, lesson_id: LessonId) -> QuizAccess {
        match &self.enrollment {
            Some(e) => quiz_access(&self.course, e, lesson_id),
            None => QuizAccess::Locked(LockReason::NotStarted),
        }
    }

    /// Lesson ids the learner has completed, in course order.
    #[must_use]
    pub fn completed_lessons(&self) -> Vec<LessonId> {
        let Some(enrollment) = &self.enrollment else {
            return Vec::new();
        };
        self.course
            .positions()
            .filter(|(_, m, l)| enrollment.is_lesson_completed(m.id, l.id))
            .map(|(_, _, l)| l.id)
            .collect()
    }
}
