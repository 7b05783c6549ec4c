use chrono::Duration;
use lms_core::completion::{Completion, ProgressPatch, mark_lesson_complete};
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, FinalTest, FinalTestId, FinalTestQuery, Lesson,
    LessonContent, LessonId, Module, ModuleId, Program, ProgramId, QuizAttempt, QuizAttemptId,
    QuizDefinition, QuizQuestion, UserId,
};
use lms_core::time::{fixed_clock, fixed_now};
use storage::repository::{
    CourseRepository, EnrollmentRepository, FinalTestRepository, ProgramRepository,
    QuizAttemptRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

fn build_course() -> Course {
    let quiz = QuizDefinition {
        questions: vec![QuizQuestion {
            prompt: "2 + 2?".into(),
            options: vec!["3".into(), "4".into()],
            correct_option: 1,
        }],
        passing_score: Some(70),
        time_limit_minutes: Some(10),
    };
    Course::new(
        CourseId::new(1),
        "Rust Basics",
        vec![
            Module::new(
                ModuleId::new(10),
                "Intro",
                vec![
                    Lesson::new(
                        LessonId::new(1),
                        "Welcome",
                        LessonContent::Video {
                            video_url: "https://video.example.com/welcome".into(),
                        },
                    )
                    .with_duration(5),
                    Lesson::new(
                        LessonId::new(2),
                        "Ownership",
                        LessonContent::Text {
                            content: "Every value has an owner.".into(),
                        },
                    ),
                ],
            ),
            Module::new(
                ModuleId::new(20),
                "Check",
                vec![Lesson::new(
                    LessonId::new(3),
                    "Quiz",
                    LessonContent::Quiz { quiz },
                )],
            ),
        ],
    )
}

fn build_enrollment() -> Enrollment {
    Enrollment::new(EnrollmentId::new(7), UserId::new(3), CourseId::new(1), fixed_now())
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url)
        .await
        .expect("connect")
        .with_clock(fixed_clock());
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_course_definition() {
    let repo = connect("memdb_course_roundtrip").await;
    let course = build_course();
    repo.upsert_course(&course).await.unwrap();

    let fetched = repo.get_course(course.id).await.unwrap();
    assert_eq!(fetched, Some(course.clone()));
    assert_eq!(repo.get_course(CourseId::new(99)).await.unwrap(), None);

    let mut renamed = course;
    renamed.title = "Rust Fundamentals".into();
    repo.upsert_course(&renamed).await.unwrap();
    let all = repo.list_courses().await.unwrap();
    assert_eq!(all, vec![renamed]);
}

#[tokio::test]
async fn sqlite_persists_progress_patch() {
    let repo = connect("memdb_progress_patch").await;
    let course = build_course();
    repo.upsert_course(&course).await.unwrap();
    let enrollment = build_enrollment();
    repo.upsert_enrollment(&enrollment).await.unwrap();

    let later = fixed_now() + Duration::minutes(30);
    let Completion::Marked(patch) =
        mark_lesson_complete(&course, &enrollment, LessonId::new(1), later).unwrap()
    else {
        panic!("expected a patch");
    };
    let updated = repo
        .update_progress(enrollment.user_id, course.id, &patch)
        .await
        .unwrap();

    assert_eq!(updated.current_lesson_id, Some(LessonId::new(1)));
    assert_eq!(updated.current_module_id, Some(ModuleId::new(10)));
    assert_eq!(updated.last_accessed_at, Some(later));
    assert!(updated.is_lesson_completed(ModuleId::new(10), LessonId::new(1)));
    let stored = updated.progress.unwrap();
    assert!((stored - 100.0 / 3.0).abs() < 1e-9);

    let mine = repo.my_enrollments(enrollment.user_id).await.unwrap();
    assert_eq!(mine, vec![updated]);
    assert!(repo.my_enrollments(UserId::new(4)).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_update_without_enrollment_is_not_found() {
    let repo = connect("memdb_progress_missing").await;
    let patch = ProgressPatch {
        module_progress: Vec::new(),
        progress: 50.0,
        current_lesson_id: None,
        current_module_id: None,
        last_accessed_at: fixed_now(),
    };
    let err = repo
        .update_progress(UserId::new(1), CourseId::new(1), &patch)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_rejects_second_enrollment_for_same_course() {
    let repo = connect("memdb_enrollment_conflict").await;
    repo.upsert_course(&build_course()).await.unwrap();
    repo.upsert_enrollment(&build_enrollment()).await.unwrap();

    let mut twin = build_enrollment();
    twin.id = EnrollmentId::new(8);
    let err = repo.upsert_enrollment(&twin).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_migrates_legacy_enrollment_once() {
    let repo = connect("memdb_legacy_migration").await;
    repo.upsert_course(&build_course()).await.unwrap();

    let mut legacy = build_enrollment();
    legacy.module_progress = None;
    legacy.progress = Some(70.0);
    repo.upsert_enrollment(&legacy).await.unwrap();

    let migrated = repo.migrate_progress(legacy.id).await.unwrap();
    let modules = migrated.module_progress.clone().expect("structured");
    assert_eq!(modules.len(), 2);
    assert!(modules[0].completed);
    assert_eq!(modules[0].completed_at, Some(fixed_now()));
    assert!(modules[1].lessons.is_empty());

    let reread = repo.my_enrollments(legacy.user_id).await.unwrap();
    assert_eq!(reread, vec![migrated.clone()]);
    assert_eq!(repo.migrate_progress(legacy.id).await.unwrap(), migrated);

    let missing = repo.migrate_progress(EnrollmentId::new(404)).await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn sqlite_filters_final_tests_and_lists_programs() {
    let repo = connect("memdb_programs").await;
    let program = Program::new(
        ProgramId::new(1),
        "Systems Track",
        vec![CourseId::new(1), CourseId::new(2)],
    );
    repo.upsert_program(&program).await.unwrap();
    assert_eq!(repo.list_programs().await.unwrap(), vec![program.clone()]);

    for (id, published) in [(1, false), (2, true)] {
        repo.upsert_final_test(&FinalTest {
            id: FinalTestId::new(id),
            program_id: program.id,
            title: format!("Final {id}"),
            published,
        })
        .await
        .unwrap();
    }

    let published = repo
        .list_final_tests(&FinalTestQuery::published_for(program.id))
        .await
        .unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, FinalTestId::new(2));

    let all = repo
        .list_final_tests(&FinalTestQuery {
            program_id: program.id,
            published_only: false,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn sqlite_records_quiz_attempts_per_user() {
    let repo = connect("memdb_quiz_attempts").await;
    let attempt = |id: u64, user: u64, score: f64| QuizAttempt {
        id: QuizAttemptId::new(id),
        user_id: UserId::new(user),
        course_id: CourseId::new(1),
        lesson_id: LessonId::new(3),
        score,
        submitted_at: fixed_now(),
    };
    repo.record_attempt(&attempt(1, 3, 40.0)).await.unwrap();
    repo.record_attempt(&attempt(2, 3, 85.0)).await.unwrap();
    repo.record_attempt(&attempt(3, 9, 100.0)).await.unwrap();

    let mine = repo.attempts_for_user(UserId::new(3)).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|a| a.user_id == UserId::new(3)));
    assert_eq!(mine[1].score, 85.0);
}
