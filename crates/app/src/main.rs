use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use lms_core::model::{CourseId, LessonId, ProgramId, UserId};
use services::{AppServices, Clock, CompleteLessonOutcome};
use tracing_subscriber::EnvFilter;

mod db;
mod render;

/// Course progress for LMS learners: progress, navigation, quiz gating and
/// program completion.
#[derive(Parser)]
#[command(name = "lms")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database URL
    #[arg(long, global = true, env = "LMS_DB_URL", default_value = "sqlite:lms.sqlite3")]
    db: String,

    /// Use the remote LMS API instead of SQLite
    #[arg(long, global = true, env = "LMS_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the remote API
    #[arg(long, global = true, env = "LMS_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Learner id
    #[arg(long, global = true, env = "LMS_USER_ID", default_value = "1")]
    user: UserId,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show course progress and per-lesson completion
    Progress {
        #[arg(long)]
        course: CourseId,
    },
    /// Show what to do after a lesson (defaults to the current lesson)
    Next {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        lesson: Option<LessonId>,
    },
    /// Mark a lesson as completed
    Complete {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        lesson: LessonId,
    },
    /// Preview a lesson's content
    Lesson {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        lesson: LessonId,
    },
    /// Check whether a quiz lesson is unlocked
    QuizAccess {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        lesson: LessonId,
    },
    /// Show program completion and final exam availability
    Program {
        #[arg(long)]
        program: ProgramId,
    },
}

async fn build_services(cli: &Cli) -> Result<AppServices> {
    let clock = Clock::system();
    match &cli.api_url {
        Some(api_url) => {
            tracing::debug!(%api_url, "using remote API");
            Ok(AppServices::new_http(api_url, cli.api_token.clone(), clock)?)
        }
        None => {
            let db_url = db::normalize_sqlite_url(&cli.db);
            db::prepare_sqlite_file(&db_url)?;
            Ok(AppServices::new_sqlite(&db_url, clock).await?)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let services = build_services(&cli).await?;
    let course_progress = services.course_progress();
    let user = cli.user;

    let output = match cli.command {
        Commands::Progress { course } => {
            let state = course_progress.load_course(user, course).await?;
            render::progress(&state)
        }
        Commands::Next { course, lesson } => {
            let mut state = course_progress.load_course(user, course).await?;
            if let Some(lesson) = lesson {
                state = state.reduce(lms_core::state::CourseViewEvent::SelectLesson(lesson));
            }
            let action = state.next_action_after(lesson);
            render::next(&state, action)
        }
        Commands::Complete { course, lesson } => {
            let outcome = course_progress.complete_lesson(user, course, lesson).await?;
            let mut out = render::completion(&outcome, lesson);
            let finished = matches!(outcome, CompleteLessonOutcome::Completed { .. })
                && outcome
                    .state()
                    .enrollment()
                    .is_some_and(|e| e.stored_progress() >= 100.0);
            if finished {
                let statuses = services.programs().programs_containing(user, course).await?;
                out.push_str(&render::programs(&statuses));
            }
            out
        }
        Commands::Lesson { course, lesson } => {
            let state = course_progress.load_course(user, course).await?;
            render::lesson(&state, lesson)
                .ok_or_else(|| anyhow!("lesson {lesson} is not part of course {course}"))?
        }
        Commands::QuizAccess { course, lesson } => {
            let state = course_progress.load_course(user, course).await?;
            let access = state.quiz_access(lesson);
            render::quiz_access(&state, lesson, access)
        }
        Commands::Program { program } => {
            let completion = services
                .programs()
                .check_program_completion(user, program)
                .await?;
            render::program(&format!("program {program}"), completion)
        }
    };

    print!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
