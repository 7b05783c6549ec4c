//! What the learner should do after the currently selected lesson.

use crate::model::{Course, CoursePosition, Enrollment, LessonId};
use crate::progress::completed_lesson_count;

/// Recommendation derived from the selected lesson and the enrollment. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Continue with the next lesson of the same module.
    Lesson {
        lesson_id: LessonId,
        position: CoursePosition,
    },
    /// Move on to the first lesson of the next non-empty module.
    Module {
        lesson_id: LessonId,
        position: CoursePosition,
    },
    /// The selected lesson is the last one in the course.
    Complete {
        can_complete: bool,
        remaining_lessons: usize,
    },
}

impl NextAction {
    /// Lesson the learner would navigate to, if any.
    #[must_use]
    pub fn target(&self) -> Option<LessonId> {
        match self {
            NextAction::Lesson { lesson_id, .. } | NextAction::Module { lesson_id, .. } => {
                Some(*lesson_id)
            }
            NextAction::Complete { .. } => None,
        }
    }
}

/// Resolve the next action for `selected`.
///
/// Returns `None` when the lesson no longer exists in the course. Modules
/// without lessons are skipped, so a lesson followed only by empty modules is
/// treated as the final lesson.
#[must_use]
pub fn compute_next_action(
    course: &Course,
    enrollment: &Enrollment,
    selected: LessonId,
) -> Option<NextAction> {
    let mut positions = course.positions();
    let (current, module, _) = positions.by_ref().find(|(_, _, l)| l.id == selected)?;
    let current_completed = enrollment.is_lesson_completed(module.id, selected);

    match positions.next() {
        Some((next, _, lesson)) if next.module_index == current.module_index => {
            Some(NextAction::Lesson {
                lesson_id: lesson.id,
                position: next,
            })
        }
        Some((next, _, lesson)) => Some(NextAction::Module {
            lesson_id: lesson.id,
            position: next,
        }),
        None => {
            let total = course.lesson_count();
            let completed = completed_lesson_count(course, enrollment);
            let would_be_completed = completed + usize::from(!current_completed);
            Some(NextAction::Complete {
                can_complete: would_be_completed >= total,
                remaining_lessons: total.saturating_sub(would_be_completed),
            })
        }
    }
}

/// Lesson immediately before `selected` in course order, skipping empty modules.
#[must_use]
pub fn previous_lesson(course: &Course, selected: LessonId) -> Option<(CoursePosition, LessonId)> {
    let mut previous = None;
    for (pos, _, lesson) in course.positions() {
        if lesson.id == selected {
            return previous;
        }
        previous = Some((pos, lesson.id));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CourseId, EnrollmentId, Lesson, LessonContent, LessonProgress, Module, ModuleId,
        ModuleProgress, UserId,
    };
    use crate::time::fixed_now;

    fn lesson(id: u64) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            format!("Lesson {id}"),
            LessonContent::Video {
                video_url: format!("https://video/{id}"),
            },
        )
    }

    /// Two modules of two lessons: module 10 -> [1, 2], module 20 -> [3, 4].
    fn two_by_two() -> Course {
        Course::new(
            CourseId::new(1),
            "Course",
            vec![
                Module::new(ModuleId::new(10), "First", vec![lesson(1), lesson(2)]),
                Module::new(ModuleId::new(20), "Second", vec![lesson(3), lesson(4)]),
            ],
        )
    }

    fn enrollment(course: &Course, completed: &[u64]) -> Enrollment {
        let mut enrollment =
            Enrollment::new(EnrollmentId::new(1), UserId::new(1), course.id, fixed_now());
        enrollment.module_progress = Some(
            course
                .modules
                .iter()
                .map(|m| {
                    let mut entry = ModuleProgress::empty(m.id);
                    entry.lessons = m
                        .lessons
                        .iter()
                        .filter(|l| completed.contains(&l.id.value()))
                        .map(|l| LessonProgress::completed(l.id, fixed_now()))
                        .collect();
                    entry
                })
                .collect(),
        );
        enrollment
    }

    #[test]
    fn next_lesson_within_module() {
        let course = two_by_two();
        let action = compute_next_action(&course, &enrollment(&course, &[]), LessonId::new(1));
        assert_eq!(
            action,
            Some(NextAction::Lesson {
                lesson_id: LessonId::new(2),
                position: CoursePosition::new(0, 1),
            })
        );
    }

    #[test]
    fn end_of_module_moves_to_next_module() {
        let course = two_by_two();
        let action = compute_next_action(&course, &enrollment(&course, &[1]), LessonId::new(2));
        assert_eq!(
            action,
            Some(NextAction::Module {
                lesson_id: LessonId::new(3),
                position: CoursePosition::new(1, 0),
            })
        );
    }

    #[test]
    fn last_lesson_with_everything_else_done_can_complete() {
        let course = two_by_two();
        let action =
            compute_next_action(&course, &enrollment(&course, &[1, 2, 3]), LessonId::new(4));
        assert_eq!(
            action,
            Some(NextAction::Complete {
                can_complete: true,
                remaining_lessons: 0,
            })
        );
    }

    #[test]
    fn last_lesson_with_two_gaps_reports_remaining() {
        let course = two_by_two();
        let action = compute_next_action(&course, &enrollment(&course, &[1]), LessonId::new(4));
        assert_eq!(
            action,
            Some(NextAction::Complete {
                can_complete: false,
                remaining_lessons: 2,
            })
        );
    }

    #[test]
    fn already_completed_last_lesson_is_not_double_counted() {
        let course = two_by_two();
        let action =
            compute_next_action(&course, &enrollment(&course, &[2, 3, 4]), LessonId::new(4));
        assert_eq!(
            action,
            Some(NextAction::Complete {
                can_complete: false,
                remaining_lessons: 1,
            })
        );
    }

    #[test]
    fn empty_modules_are_skipped() {
        let course = Course::new(
            CourseId::new(1),
            "Course",
            vec![
                Module::new(ModuleId::new(10), "First", vec![lesson(1)]),
                Module::new(ModuleId::new(20), "Empty", vec![]),
                Module::new(ModuleId::new(30), "Third", vec![lesson(2)]),
                Module::new(ModuleId::new(40), "Trailing", vec![]),
            ],
        );
        let enrollment = enrollment(&course, &[]);
        assert_eq!(
            compute_next_action(&course, &enrollment, LessonId::new(1)),
            Some(NextAction::Module {
                lesson_id: LessonId::new(2),
                position: CoursePosition::new(2, 0),
            })
        );
        assert!(matches!(
            compute_next_action(&course, &enrollment, LessonId::new(2)),
            Some(NextAction::Complete { .. })
        ));
    }

    #[test]
    fn unknown_lesson_has_no_next_action() {
        let course = two_by_two();
        assert_eq!(
            compute_next_action(&course, &enrollment(&course, &[]), LessonId::new(99)),
            None
        );
    }

    #[test]
    fn previous_lesson_crosses_module_boundary() {
        let course = two_by_two();
        assert_eq!(
            previous_lesson(&course, LessonId::new(3)),
            Some((CoursePosition::new(0, 1), LessonId::new(2)))
        );
        assert_eq!(previous_lesson(&course, LessonId::new(1)), None);
    }
}
