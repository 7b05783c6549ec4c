use std::sync::Arc;

use lms_core::{
    completion::{
        Completion, QuizRequirements, QuizShortfall, check_quiz_requirements,
        mark_lesson_complete,
    },
    model::{Course, CourseId, Enrollment, LessonId, UserId},
    navigation::NextAction,
    quiz_gate::QuizAccess,
    state::{CourseViewEvent, CourseViewState},
    time::Clock,
};
use storage::repository::{CourseRepository, EnrollmentRepository, QuizAttemptRepository};

use crate::error::CourseProgressError;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Result of asking to complete a lesson.
///
/// Every variant carries the canonical state after the operation, with the
/// completed lesson selected.
#[derive(Debug, Clone, PartialEq)]
pub enum CompleteLessonOutcome {
    /// The lesson was already completed. Nothing was written.
    AlreadyCompleted { state: CourseViewState },
    Completed { state: CourseViewState },
    /// Every lesson is done but some graded quiz is not passed, so progress
    /// was held at 99.
    QuizRequirementsNotMet {
        state: CourseViewState,
        shortfalls: Vec<QuizShortfall>,
    },
}

impl CompleteLessonOutcome {
    #[must_use]
    pub fn state(&self) -> &CourseViewState {
        match self {
            CompleteLessonOutcome::AlreadyCompleted { state }
            | CompleteLessonOutcome::Completed { state }
            | CompleteLessonOutcome::QuizRequirementsNotMet { state, .. } => state,
        }
    }

    #[must_use]
    pub fn into_state(self) -> CourseViewState {
        match self {
            CompleteLessonOutcome::AlreadyCompleted { state }
            | CompleteLessonOutcome::Completed { state }
            | CompleteLessonOutcome::QuizRequirementsNotMet { state, .. } => state,
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates the course-detail flows: loading, completing lessons,
/// navigation and quiz gating.
#[derive(Clone)]
pub struct CourseProgressService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    quiz_attempts: Arc<dyn QuizAttemptRepository>,
}

impl CourseProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        quiz_attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
            quiz_attempts,
        }
    }

    /// Load the course and the learner's enrollment into a view state.
    ///
    /// A legacy enrollment is migrated to structured progress first, and the
    /// enrollments are re-read afterwards so the state reflects what was stored.
    /// Learners who are not enrolled get a state without an enrollment.
    ///
    /// # Errors
    ///
    /// Returns `CourseProgressError::CourseNotFound` if the course does not exist.
    /// Returns `CourseProgressError::Storage` if any repository call fails.
    pub async fn load_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseViewState, CourseProgressError> {
        let course = self.fetch_course(course_id).await?;
        let enrollment = self.fetch_enrollment(user_id, &course).await?;
        Ok(CourseViewState::new(course, enrollment))
    }

    /// Mark a lesson complete and persist the result with a single update.
    ///
    /// When the update would bring the course to 100%, graded quizzes are
    /// checked first. If any is not passed, progress is stored as 99 and the
    /// shortfalls are reported. If the attempts lookup fails the check is
    /// treated as passed.
    ///
    /// # Errors
    ///
    /// Returns `CourseProgressError::CourseNotFound` or
    /// `CourseProgressError::LessonNotFound` for unknown ids.
    /// Returns `CourseProgressError::NotEnrolled` if the learner has no enrollment.
    /// Returns `CourseProgressError::Storage` if loading or persisting fails;
    /// nothing is written in that case beyond what the backend accepted.
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<CompleteLessonOutcome, CourseProgressError> {
        let course = self.fetch_course(course_id).await?;
        if course.locate(lesson_id).is_none() {
            return Err(CourseProgressError::LessonNotFound {
                course_id,
                lesson_id,
            });
        }
        let enrollment = self
            .fetch_enrollment(user_id, &course)
            .await?
            .ok_or(CourseProgressError::NotEnrolled(course_id))?;

        let now = self.clock.now();
        let mut patch = match mark_lesson_complete(&course, &enrollment, lesson_id, now)? {
            Completion::AlreadyCompleted => {
                tracing::debug!(%user_id, %course_id, %lesson_id, "lesson already completed");
                let state = CourseViewState::new(course, Some(enrollment))
                    .reduce(CourseViewEvent::SelectLesson(lesson_id));
                return Ok(CompleteLessonOutcome::AlreadyCompleted { state });
            }
            Completion::Marked(patch) => patch,
        };

        let mut shortfalls = Vec::new();
        if patch.reaches_completion() {
            if let QuizRequirements::Unmet(unmet) = self.quiz_requirements(user_id, &course).await {
                patch.clamp_for_unmet_quizzes();
                shortfalls = unmet;
            }
        }

        let updated = self
            .enrollments
            .update_progress(user_id, course_id, &patch)
            .await?;

        tracing::info!(
            %user_id,
            %course_id,
            %lesson_id,
            progress = patch.progress,
            "lesson completed"
        );

        let state = CourseViewState::new(course, Some(updated))
            .reduce(CourseViewEvent::SelectLesson(lesson_id));

        if shortfalls.is_empty() {
            Ok(CompleteLessonOutcome::Completed { state })
        } else {
            for shortfall in &shortfalls {
                tracing::info!(%user_id, %course_id, "{shortfall}");
            }
            Ok(CompleteLessonOutcome::QuizRequirementsNotMet { state, shortfalls })
        }
    }

    /// Next step after `selected`, or after the learner's current lesson when
    /// no selection is given.
    ///
    /// Returns `Ok(None)` when the learner is not enrolled or the lesson is no
    /// longer part of the course.
    ///
    /// # Errors
    ///
    /// Returns `CourseProgressError` if the course cannot be loaded.
    pub async fn next_action(
        &self,
        user_id: UserId,
        course_id: CourseId,
        selected: Option<LessonId>,
    ) -> Result<Option<NextAction>, CourseProgressError> {
        let state = self.load_course(user_id, course_id).await?;
        Ok(state.next_action_after(selected))
    }

    /// Whether the learner may open the given quiz lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseProgressError` if the course cannot be loaded.
    pub async fn quiz_access(
        &self,
        user_id: UserId,
        course_id: CourseId,
        quiz_lesson_id: LessonId,
    ) -> Result<QuizAccess, CourseProgressError> {
        let state = self.load_course(user_id, course_id).await?;
        Ok(state.quiz_access(quiz_lesson_id))
    }

    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, CourseProgressError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(CourseProgressError::CourseNotFound(course_id))
    }

    async fn fetch_enrollment(
        &self,
        user_id: UserId,
        course: &Course,
    ) -> Result<Option<Enrollment>, CourseProgressError> {
        let Some(enrollment) = self.find_enrollment(user_id, course.id).await? else {
            return Ok(None);
        };
        if !enrollment.is_legacy() {
            return Ok(Some(enrollment));
        }

        tracing::debug!(
            %user_id,
            course_id = %course.id,
            enrollment_id = %enrollment.id,
            "migrating legacy enrollment"
        );
        self.enrollments.migrate_progress(enrollment.id).await?;
        self.find_enrollment(user_id, course.id).await
    }

    async fn find_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, CourseProgressError> {
        let enrollments = self.enrollments.my_enrollments(user_id).await?;
        Ok(enrollments.into_iter().find(|e| e.course_id == course_id))
    }

    async fn quiz_requirements(&self, user_id: UserId, course: &Course) -> QuizRequirements {
        match self.quiz_attempts.attempts_for_user(user_id).await {
            Ok(attempts) => check_quiz_requirements(course, &attempts),
            Err(err) => {
                tracing::warn!(
                    %user_id,
                    course_id = %course.id,
                    error = %err,
                    "quiz attempts unavailable; skipping quiz requirement check"
                );
                QuizRequirements::Met
            }
        }
    }
}
