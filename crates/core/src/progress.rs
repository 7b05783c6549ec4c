//! Completion percentage derived from an enrollment's lesson records.

use crate::model::{Course, Enrollment};

/// Number of lessons in the live course that the enrollment records as completed.
///
/// Lessons are matched through their owning module's `ModuleProgress`, so
/// records for lessons removed from the course are ignored.
#[must_use]
pub fn completed_lesson_count(course: &Course, enrollment: &Enrollment) -> usize {
    course
        .positions()
        .filter(|(_, module, lesson)| enrollment.is_lesson_completed(module.id, lesson.id))
        .count()
}

/// Unrounded percentage; zero when the course has no lessons.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn raw_progress(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * completed as f64 / total as f64
}

/// Course completion percentage in `0..=100`.
///
/// - Structured progress with at least one lesson: `round(100 * completed / total)`.
/// - Otherwise the server aggregate, rounded.
/// - Otherwise 0.
#[must_use]
pub fn compute_progress(course: &Course, enrollment: &Enrollment) -> u8 {
    let total = course.lesson_count();
    if enrollment.module_progress.is_some() && total > 0 {
        let completed = completed_lesson_count(course, enrollment);
        return to_percent(raw_progress(completed, total));
    }
    match enrollment.progress {
        Some(progress) => to_percent(progress),
        None => 0,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    // f64::round rounds half away from zero, which is half-up for the clamped range.
    value.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CourseId, EnrollmentId, Lesson, LessonContent, LessonId, LessonProgress, Module,
        ModuleId, ModuleProgress, UserId,
    };
    use crate::time::fixed_now;

    fn course(lessons_per_module: &[u64]) -> Course {
        let mut next = 1;
        let modules = lessons_per_module
            .iter()
            .enumerate()
            .map(|(m, count)| {
                let lessons = (0..*count)
                    .map(|_| {
                        let id = next;
                        next += 1;
                        Lesson::new(
                            LessonId::new(id),
                            format!("L{id}"),
                            LessonContent::Text {
                                content: String::new(),
                            },
                        )
                    })
                    .collect();
                Module::new(ModuleId::new(m as u64 + 100), format!("M{m}"), lessons)
            })
            .collect();
        Course::new(CourseId::new(1), "Course", modules)
    }

    fn enrollment_with(course: &Course, completed: &[u64]) -> Enrollment {
        let mut enrollment = Enrollment::new(
            EnrollmentId::new(1),
            UserId::new(1),
            course.id,
            fixed_now(),
        );
        let modules = course
            .modules
            .iter()
            .map(|m| ModuleProgress {
                module_id: m.id,
                completed: false,
                completed_at: None,
                lessons: m
                    .lessons
                    .iter()
                    .filter(|l| completed.contains(&l.id.value()))
                    .map(|l| LessonProgress::completed(l.id, fixed_now()))
                    .collect(),
            })
            .collect();
        enrollment.module_progress = Some(modules);
        enrollment
    }

    #[test]
    fn rounds_completed_share_of_live_lessons() {
        let course = course(&[2, 1]);
        assert_eq!(compute_progress(&course, &enrollment_with(&course, &[1])), 33);
        assert_eq!(
            compute_progress(&course, &enrollment_with(&course, &[1, 2])),
            67
        );
        assert_eq!(
            compute_progress(&course, &enrollment_with(&course, &[1, 2, 3])),
            100
        );
    }

    #[test]
    fn rounds_half_up() {
        let course = course(&[8]);
        // 1/8 = 12.5%
        assert_eq!(compute_progress(&course, &enrollment_with(&course, &[1])), 13);
    }

    #[test]
    fn recomputes_against_current_course_shape() {
        let small = course(&[2]);
        let enrollment = enrollment_with(&small, &[1, 2]);
        assert_eq!(compute_progress(&small, &enrollment), 100);

        let grown = course(&[4]);
        assert_eq!(compute_progress(&grown, &enrollment), 50);
    }

    #[test]
    fn falls_back_to_server_aggregate() {
        let course = course(&[2]);
        let mut enrollment = enrollment_with(&course, &[]);
        enrollment.module_progress = None;
        enrollment.progress = Some(41.6);
        assert_eq!(compute_progress(&course, &enrollment), 42);

        enrollment.progress = None;
        assert_eq!(compute_progress(&course, &enrollment), 0);
    }

    #[test]
    fn empty_course_uses_fallback() {
        let course = course(&[]);
        let mut enrollment = enrollment_with(&course, &[]);
        enrollment.progress = None;
        assert_eq!(compute_progress(&course, &enrollment), 0);
        assert!(raw_progress(0, 0).abs() < f64::EPSILON);
    }
}
