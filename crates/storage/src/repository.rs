use async_trait::async_trait;
use lms_core::completion::{ProgressPatch, migrate_legacy_progress};
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, FinalTest, FinalTestQuery, Program, ProgramId,
    QuizAttempt, UserId,
};
use lms_core::time::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The remote service answered but reported failure.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Persist or replace a course definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;
}

/// Enrollment records and their progress.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// All enrollments belonging to the learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn my_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError>;

    /// Create or replace an enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another enrollment already exists for
    /// the same learner and course.
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// Write a progress patch and return the canonical updated enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner is not enrolled in the course.
    async fn update_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
        patch: &ProgressPatch,
    ) -> Result<Enrollment, StorageError>;

    /// Convert a legacy enrollment (no `module_progress`) into structured form.
    ///
    /// Enrollments that are already structured are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment or its course is missing.
    async fn migrate_progress(&self, enrollment_id: EnrollmentId)
    -> Result<Enrollment, StorageError>;
}

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list_programs(&self) -> Result<Vec<Program>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the program cannot be stored.
    async fn upsert_program(&self, program: &Program) -> Result<(), StorageError>;
}

/// Catalog of program final tests.
#[async_trait]
pub trait FinalTestRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn list_final_tests(&self, query: &FinalTestQuery)
    -> Result<Vec<FinalTest>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn upsert_final_test(&self, test: &FinalTest) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Every recorded attempt by the learner, across all courses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<EnrollmentId, Enrollment>>>,
    programs: Arc<Mutex<HashMap<ProgramId, Program>>>,
    final_tests: Arc<Mutex<Vec<FinalTest>>>,
    attempts: Arc<Mutex<Vec<QuizAttempt>>>,
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given clock for migration timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id, course.clone());
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn my_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        let mut found: Vec<Enrollment> = guard
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        Ok(found)
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let duplicate = guard.values().any(|e| {
            e.id != enrollment.id
                && e.user_id == enrollment.user_id
                && e.course_id == enrollment.course_id
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        guard.insert(enrollment.id, enrollment.clone());
        Ok(())
    }

    async fn update_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
        patch: &ProgressPatch,
    ) -> Result<Enrollment, StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let enrollment = guard
            .values_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .ok_or(StorageError::NotFound)?;
        patch.apply_to(enrollment);
        Ok(enrollment.clone())
    }

    async fn migrate_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, StorageError> {
        let existing = {
            let guard = self.enrollments.lock().map_err(poisoned)?;
            guard.get(&enrollment_id).cloned().ok_or(StorageError::NotFound)?
        };
        if !existing.is_legacy() {
            return Ok(existing);
        }
        let course = self
            .get_course(existing.course_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let mut migrated = existing;
        migrated.module_progress =
            Some(migrate_legacy_progress(&course, &migrated, self.clock.now()));

        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        guard.insert(enrollment_id, migrated.clone());
        Ok(migrated)
    }
}

#[async_trait]
impl ProgramRepository for InMemoryRepository {
    async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
        let guard = self.programs.lock().map_err(poisoned)?;
        let mut programs: Vec<Program> = guard.values().cloned().collect();
        programs.sort_by_key(|p| p.id);
        Ok(programs)
    }

    async fn upsert_program(&self, program: &Program) -> Result<(), StorageError> {
        let mut guard = self.programs.lock().map_err(poisoned)?;
        guard.insert(program.id, program.clone());
        Ok(())
    }
}

#[async_trait]
impl FinalTestRepository for InMemoryRepository {
    async fn list_final_tests(
        &self,
        query: &FinalTestQuery,
    ) -> Result<Vec<FinalTest>, StorageError> {
        let guard = self.final_tests.lock().map_err(poisoned)?;
        Ok(guard.iter().filter(|t| query.matches(t)).cloned().collect())
    }

    async fn upsert_final_test(&self, test: &FinalTest) -> Result<(), StorageError> {
        let mut guard = self.final_tests.lock().map_err(poisoned)?;
        guard.retain(|t| t.id != test.id);
        guard.push(test.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }

    async fn record_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.push(attempt.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub programs: Arc<dyn ProgramRepository>,
    pub final_tests: Arc<dyn FinalTestRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Use one repository value for every concern.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository
            + EnrollmentRepository
            + ProgramRepository
            + FinalTestRepository
            + QuizAttemptRepository
            + Clone
            + 'static,
    {
        Self {
            courses: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            programs: Arc::new(repo.clone()),
            final_tests: Arc::new(repo.clone()),
            quiz_attempts: Arc::new(repo),
        }
    }
}
