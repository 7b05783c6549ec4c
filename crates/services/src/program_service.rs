use std::sync::Arc;

use lms_core::{
    model::{CourseId, Enrollment, FinalTestQuery, Program, ProgramId, UserId},
    program::{ProgramCompletion, program_completed},
};
use storage::repository::{EnrollmentRepository, FinalTestRepository, ProgramRepository};

use crate::error::ProgramServiceError;

/// A program together with the learner's completion status for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStatus {
    pub program: Program,
    pub completion: ProgramCompletion,
}

/// Aggregates course completion across programs and checks final-exam eligibility.
#[derive(Clone)]
pub struct ProgramService {
    programs: Arc<dyn ProgramRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    final_tests: Arc<dyn FinalTestRepository>,
}

impl ProgramService {
    #[must_use]
    pub fn new(
        programs: Arc<dyn ProgramRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        final_tests: Arc<dyn FinalTestRepository>,
    ) -> Self {
        Self {
            programs,
            enrollments,
            final_tests,
        }
    }

    /// Completion status of one program for the learner.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::ProgramNotFound` if the program does not exist.
    /// Returns `ProgramServiceError::Storage` if programs or enrollments cannot be read.
    pub async fn check_program_completion(
        &self,
        user_id: UserId,
        program_id: ProgramId,
    ) -> Result<ProgramCompletion, ProgramServiceError> {
        let program = self
            .programs
            .list_programs()
            .await?
            .into_iter()
            .find(|p| p.id == program_id)
            .ok_or(ProgramServiceError::ProgramNotFound(program_id))?;
        let enrollments = self.enrollments.my_enrollments(user_id).await?;
        Ok(self.completion_for(&program, &enrollments).await)
    }

    /// Every program that includes `course_id`, with the learner's status.
    ///
    /// Called after a course is finished to find programs that may have
    /// become complete.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Storage` if programs or enrollments cannot be read.
    pub async fn programs_containing(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<ProgramStatus>, ProgramServiceError> {
        let programs: Vec<Program> = self
            .programs
            .list_programs()
            .await?
            .into_iter()
            .filter(|p| p.contains(course_id))
            .collect();
        if programs.is_empty() {
            return Ok(Vec::new());
        }

        let enrollments = self.enrollments.my_enrollments(user_id).await?;
        let mut statuses = Vec::with_capacity(programs.len());
        for program in programs {
            let completion = self.completion_for(&program, &enrollments).await;
            statuses.push(ProgramStatus {
                program,
                completion,
            });
        }
        Ok(statuses)
    }

    async fn completion_for(
        &self,
        program: &Program,
        enrollments: &[Enrollment],
    ) -> ProgramCompletion {
        if !program_completed(program, enrollments) {
            return ProgramCompletion::default();
        }

        let query = FinalTestQuery::published_for(program.id);
        let final_exam_available = match self.final_tests.list_final_tests(&query).await {
            Ok(tests) => !tests.is_empty(),
            Err(err) => {
                tracing::warn!(
                    program_id = %program.id,
                    error = %err,
                    "final test lookup failed; treating final exam as unavailable"
                );
                false
            }
        };

        ProgramCompletion {
            completed: true,
            final_exam_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lms_core::model::{EnrollmentId, FinalTest, FinalTestId};
    use lms_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn enrollment(id: u64, course: u64, progress: f64) -> Enrollment {
        let mut e = Enrollment::new(
            EnrollmentId::new(id),
            UserId::new(1),
            CourseId::new(course),
            fixed_now(),
        );
        e.progress = Some(progress);
        e
    }

    fn service_with(repo: &InMemoryRepository) -> ProgramService {
        let shared = Arc::new(repo.clone());
        ProgramService::new(shared.clone(), shared.clone(), shared)
    }

    async fn seed(repo: &InMemoryRepository, progress_b: f64) {
        repo.upsert_program(&Program::new(
            ProgramId::new(1),
            "Track",
            vec![CourseId::new(1), CourseId::new(2)],
        ))
        .await
        .unwrap();
        repo.upsert_program(&Program::new(ProgramId::new(2), "Other", vec![CourseId::new(3)]))
            .await
            .unwrap();
        repo.upsert_enrollment(&enrollment(1, 1, 100.0)).await.unwrap();
        repo.upsert_enrollment(&enrollment(2, 2, progress_b)).await.unwrap();
    }

    #[tokio::test]
    async fn incomplete_course_keeps_program_open() {
        let repo = InMemoryRepository::new();
        seed(&repo, 80.0).await;
        let service = service_with(&repo);

        let status = service
            .check_program_completion(UserId::new(1), ProgramId::new(1))
            .await
            .unwrap();
        assert_eq!(status, ProgramCompletion::default());
    }

    #[tokio::test]
    async fn final_exam_requires_a_published_test() {
        let repo = InMemoryRepository::new();
        seed(&repo, 100.0).await;
        let service = service_with(&repo);

        let status = service
            .check_program_completion(UserId::new(1), ProgramId::new(1))
            .await
            .unwrap();
        assert!(status.completed);
        assert!(!status.final_exam_available);

        repo.upsert_final_test(&FinalTest {
            id: FinalTestId::new(1),
            program_id: ProgramId::new(1),
            title: "Final".into(),
            published: true,
        })
        .await
        .unwrap();
        let status = service
            .check_program_completion(UserId::new(1), ProgramId::new(1))
            .await
            .unwrap();
        assert!(status.final_exam_available);
    }

    #[tokio::test]
    async fn programs_containing_filters_by_course() {
        let repo = InMemoryRepository::new();
        seed(&repo, 100.0).await;
        let service = service_with(&repo);

        let statuses = service
            .programs_containing(UserId::new(1), CourseId::new(2))
            .await
            .unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].program.id, ProgramId::new(1));
        assert!(statuses[0].completion.completed);

        let none = service
            .programs_containing(UserId::new(1), CourseId::new(9))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn unknown_program_is_an_error() {
        let repo = InMemoryRepository::new();
        let service = service_with(&repo);
        let err = service
            .check_program_completion(UserId::new(1), ProgramId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgramServiceError::ProgramNotFound(_)));
    }
}
