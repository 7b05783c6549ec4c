#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_progress_service;
pub mod error;
pub mod program_service;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use course_progress_service::{CompleteLessonOutcome, CourseProgressService};
pub use error::{AppServicesError, CourseProgressError, ProgramServiceError};
pub use program_service::{ProgramService, ProgramStatus};
