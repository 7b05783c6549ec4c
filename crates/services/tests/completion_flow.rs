use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lms_core::completion::ProgressPatch;
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, Lesson, LessonContent, LessonId, Module,
    ModuleId, QuizAttempt, QuizDefinition, QuizQuestion, UserId,
};
use lms_core::time::{fixed_clock, fixed_now};
use services::{CompleteLessonOutcome, CourseProgressError, CourseProgressService};
use storage::repository::{
    CourseRepository, EnrollmentRepository, InMemoryRepository, QuizAttemptRepository,
    StorageError,
};

const USER: UserId = UserId::new(5);
const COURSE: CourseId = CourseId::new(1);

fn graded_course() -> Course {
    let quiz = QuizDefinition {
        questions: vec![QuizQuestion {
            prompt: "Pick one".into(),
            options: vec!["a".into(), "b".into()],
            correct_option: 0,
        }],
        passing_score: Some(70),
        time_limit_minutes: None,
    };
    Course::new(
        COURSE,
        "Graded",
        vec![
            Module::new(
                ModuleId::new(1),
                "Read",
                vec![Lesson::new(
                    LessonId::new(1),
                    "Intro",
                    LessonContent::Text {
                        content: "hi".into(),
                    },
                )],
            ),
            Module::new(
                ModuleId::new(2),
                "Check",
                vec![Lesson::new(LessonId::new(2), "Gate", LessonContent::Quiz { quiz })],
            ),
        ],
    )
}

async fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new().with_clock(fixed_clock());
    repo.upsert_course(&graded_course()).await.unwrap();
    repo.upsert_enrollment(&Enrollment::new(EnrollmentId::new(1), USER, COURSE, fixed_now()))
        .await
        .unwrap();
    repo
}

/// Attempts backend that is always down.
struct UnreachableAttempts;

#[async_trait]
impl QuizAttemptRepository for UnreachableAttempts {
    async fn attempts_for_user(&self, _user_id: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        Err(StorageError::Connection("attempts service unreachable".into()))
    }

    async fn record_attempt(&self, _attempt: &QuizAttempt) -> Result<(), StorageError> {
        Err(StorageError::Connection("attempts service unreachable".into()))
    }
}

/// Counts progress writes and can be told to reject them.
struct RecordingEnrollments {
    inner: InMemoryRepository,
    writes: AtomicUsize,
    reject: bool,
}

#[async_trait]
impl EnrollmentRepository for RecordingEnrollments {
    async fn my_enrollments(&self, user_id: UserId) -> Result<Vec<Enrollment>, StorageError> {
        self.inner.my_enrollments(user_id).await
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.inner.upsert_enrollment(enrollment).await
    }

    async fn update_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
        patch: &ProgressPatch,
    ) -> Result<Enrollment, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(StorageError::Rejected("Enrollment is locked".into()));
        }
        self.inner.update_progress(user_id, course_id, patch).await
    }

    async fn migrate_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, StorageError> {
        self.inner.migrate_progress(enrollment_id).await
    }
}

fn recording(repo: &InMemoryRepository, reject: bool) -> Arc<RecordingEnrollments> {
    Arc::new(RecordingEnrollments {
        inner: repo.clone(),
        writes: AtomicUsize::new(0),
        reject,
    })
}

#[tokio::test]
async fn unreachable_attempts_do_not_block_completion() {
    let repo = seeded_repo().await;
    let service = CourseProgressService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(UnreachableAttempts),
    );

    for lesson in [1, 2] {
        let outcome = service
            .complete_lesson(USER, COURSE, LessonId::new(lesson))
            .await
            .unwrap();
        assert!(matches!(outcome, CompleteLessonOutcome::Completed { .. }));
    }

    let stored = repo.my_enrollments(USER).await.unwrap();
    assert_eq!(stored[0].progress, Some(100.0));
}

#[tokio::test]
async fn unmet_quiz_is_written_once_at_99() {
    let repo = seeded_repo().await;
    let enrollments = recording(&repo, false);
    let service = CourseProgressService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        enrollments.clone(),
        Arc::new(repo.clone()),
    );

    service
        .complete_lesson(USER, COURSE, LessonId::new(1))
        .await
        .unwrap();
    let outcome = service
        .complete_lesson(USER, COURSE, LessonId::new(2))
        .await
        .unwrap();

    let CompleteLessonOutcome::QuizRequirementsNotMet { state, shortfalls } = outcome else {
        panic!("quiz without attempts must block completion");
    };
    assert_eq!(shortfalls[0].best, None);
    assert_eq!(state.enrollment().and_then(|e| e.progress), Some(99.0));
    assert_eq!(enrollments.writes.load(Ordering::SeqCst), 2);

    let stored = repo.my_enrollments(USER).await.unwrap();
    assert_eq!(stored[0].progress, Some(99.0));
    assert!(stored[0].is_lesson_completed(ModuleId::new(2), LessonId::new(2)));
}

#[tokio::test]
async fn rejected_write_leaves_enrollment_untouched() {
    let repo = seeded_repo().await;
    let before = repo.my_enrollments(USER).await.unwrap();
    let service = CourseProgressService::new(
        fixed_clock(),
        Arc::new(repo.clone()),
        recording(&repo, true),
        Arc::new(repo.clone()),
    );

    let err = service
        .complete_lesson(USER, COURSE, LessonId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CourseProgressError::Storage(StorageError::Rejected(_))
    ));
    assert_eq!(repo.my_enrollments(USER).await.unwrap(), before);
}
