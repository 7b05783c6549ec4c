use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::course_progress_service::CourseProgressService;
use crate::error::AppServicesError;
use crate::program_service::ProgramService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    course_progress: Arc<CourseProgressService>,
    programs: Arc<ProgramService>,
}

impl AppServices {
    /// Wire services onto an already-built storage.
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock) -> Self {
        let course_progress = Arc::new(CourseProgressService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.quiz_attempts),
        ));
        let programs = Arc::new(ProgramService::new(
            Arc::clone(&storage.programs),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.final_tests),
        ));

        Self {
            course_progress,
            programs,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the database cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock))
    }

    /// Build services backed by the remote LMS API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the base URL is invalid.
    pub fn new_http(
        base_url: &str,
        token: Option<String>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::http(base_url, token)?;
        Ok(Self::new(&storage, clock))
    }

    #[must_use]
    pub fn course_progress(&self) -> Arc<CourseProgressService> {
        Arc::clone(&self.course_progress)
    }

    #[must_use]
    pub fn programs(&self) -> Arc<ProgramService> {
        Arc::clone(&self.programs)
    }
}
