//! Program-level completion across the learner's enrollments.

use crate::model::{Enrollment, Program};

/// Completion status of a program for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramCompletion {
    pub completed: bool,
    /// Only ever true when `completed` is true.
    pub final_exam_available: bool,
}

/// True when every course in the program has an enrollment at 100% or more.
///
/// A program with no courses is never complete.
#[must_use]
pub fn program_completed(program: &Program, enrollments: &[Enrollment]) -> bool {
    !program.course_ids.is_empty()
        && program.course_ids.iter().all(|course_id| {
            enrollments
                .iter()
                .any(|e| e.course_id == *course_id && e.stored_progress() >= 100.0)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, EnrollmentId, ProgramId, UserId};
    use crate::time::fixed_now;

    fn enrollment(course: u64, progress: f64) -> Enrollment {
        let mut e = Enrollment::new(
            EnrollmentId::new(course),
            UserId::new(1),
            CourseId::new(course),
            fixed_now(),
        );
        e.progress = Some(progress);
        e
    }

    fn program() -> Program {
        Program::new(
            ProgramId::new(1),
            "Backend Track",
            vec![CourseId::new(1), CourseId::new(2)],
        )
    }

    #[test]
    fn incomplete_course_blocks_program() {
        let mut enrollments = vec![enrollment(1, 100.0), enrollment(2, 80.0)];
        assert!(!program_completed(&program(), &enrollments));

        enrollments[1].progress = Some(100.0);
        assert!(program_completed(&program(), &enrollments));
    }

    #[test]
    fn missing_enrollment_blocks_program() {
        assert!(!program_completed(&program(), &[enrollment(1, 100.0)]));
    }

    #[test]
    fn empty_program_is_not_complete() {
        let empty = Program::new(ProgramId::new(2), "Empty", vec![]);
        assert!(!program_completed(&empty, &[]));
    }
}
