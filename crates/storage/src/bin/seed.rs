use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use lms_core::model::{
    Course, CourseId, Enrollment, EnrollmentId, FinalTest, FinalTestId, Lesson, LessonContent,
    LessonId, Module, ModuleId, Program, ProgramId, QuizAttempt, QuizAttemptId, QuizDefinition,
    QuizQuestion, UserId,
};
use storage::repository::Storage;

/// Seed a SQLite database with a demo course, program and enrollment.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// SQLite URL
    #[arg(long = "db", env = "LMS_DB_URL", default_value = "sqlite:lms.sqlite3", value_parser = parse_db_url)]
    db_url: String,

    /// Learner to enroll
    #[arg(long = "user", env = "LMS_USER_ID", default_value = "1")]
    user_id: UserId,

    /// Seed the enrollment in legacy percentage-only form
    #[arg(long, value_name = "PCT", value_parser = parse_percent)]
    legacy_progress: Option<f64>,

    /// Record a quiz attempt with this score
    #[arg(long, value_name = "PCT", value_parser = parse_percent)]
    quiz_score: Option<f64>,

    /// Fixed current time (RFC 3339) for deterministic seeding
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
}

fn parse_db_url(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        return Err("database URL must not be empty".into());
    }
    Ok(raw.to_owned())
}

fn parse_percent(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(format!("expected a percentage between 0 and 100, got {raw}")),
    }
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

fn text(id: u64, title: &str, body: &str) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        title,
        LessonContent::Text {
            content: body.into(),
        },
    )
}

fn demo_course() -> Course {
    let quiz = QuizDefinition {
        questions: vec![
            QuizQuestion {
                prompt: "Which keyword moves ownership into a closure?".into(),
                options: vec!["ref".into(), "move".into(), "mut".into()],
                correct_option: 1,
            },
            QuizQuestion {
                prompt: "How many mutable borrows may coexist?".into(),
                options: vec!["One".into(), "Two".into(), "Unlimited".into()],
                correct_option: 0,
            },
        ],
        passing_score: Some(70),
        time_limit_minutes: Some(15),
    };

    let mut course = Course::new(
        CourseId::new(1),
        "Rust from Scratch",
        vec![
            Module::new(
                ModuleId::new(1),
                "Getting Started",
                vec![
                    Lesson::new(
                        LessonId::new(1),
                        "Welcome",
                        LessonContent::Video {
                            video_url: "https://videos.example.com/rust/welcome.mp4".into(),
                        },
                    )
                    .with_duration(6),
                    text(2, "Installing the toolchain", "Use rustup to install stable."),
                    Lesson::new(
                        LessonId::new(3),
                        "Cheat sheet",
                        LessonContent::Pdf {
                            url: "https://files.example.com/rust/cheatsheet.pdf".into(),
                        },
                    ),
                ],
            ),
            Module::new(
                ModuleId::new(2),
                "Ownership",
                vec![
                    text(4, "Moves and copies", "Assignment moves non-Copy values."),
                    text(5, "Borrowing", "References borrow without taking ownership."),
                ],
            ),
            Module::new(
                ModuleId::new(3),
                "Checkpoint",
                vec![Lesson::new(
                    LessonId::new(6),
                    "Ownership quiz",
                    LessonContent::Quiz { quiz },
                )],
            ),
        ],
    );
    course.description = "A guided tour of the language fundamentals.".into();
    course.category = "Programming".into();
    course.duration = Some("3h".into());
    course
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let course = demo_course();
    course.validate()?;
    storage.courses.upsert_course(&course).await?;

    let program = Program::new(ProgramId::new(1), "Systems Programming Track", vec![course.id]);
    storage.programs.upsert_program(&program).await?;
    storage
        .final_tests
        .upsert_final_test(&FinalTest {
            id: FinalTestId::new(1),
            program_id: program.id,
            title: "Systems Track Final".into(),
            published: true,
        })
        .await?;

    let existing = storage.enrollments.my_enrollments(args.user_id).await?;
    let enrollment_id = existing
        .iter()
        .find(|e| e.course_id == course.id)
        .map_or_else(|| EnrollmentId::new(args.user_id.value()), |e| e.id);
    let mut enrollment =
        Enrollment::new(enrollment_id, args.user_id, course.id, now - Duration::days(3));
    if let Some(progress) = args.legacy_progress {
        enrollment.module_progress = None;
        enrollment.progress = Some(progress);
    }
    storage.enrollments.upsert_enrollment(&enrollment).await?;

    if let Some(score) = args.quiz_score {
        let prior = storage.quiz_attempts.attempts_for_user(args.user_id).await?;
        let next_id = prior.iter().map(|a| a.id.value()).max().unwrap_or(0) + 1;
        storage
            .quiz_attempts
            .record_attempt(&QuizAttempt {
                id: QuizAttemptId::new(next_id),
                user_id: args.user_id,
                course_id: course.id,
                lesson_id: LessonId::new(6),
                score,
                submitted_at: now,
            })
            .await?;
    }

    println!(
        "Seeded course {} ({} lessons) and program {} for user {} into {}",
        course.id,
        course.lesson_count(),
        program.id,
        args.user_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
