//! Plain-text output for the CLI.

use std::fmt::Write as _;

use lms_core::model::{Course, LessonId, LessonPreview};
use lms_core::navigation::{NextAction, previous_lesson};
use lms_core::program::ProgramCompletion;
use lms_core::quiz_gate::QuizAccess;
use lms_core::state::CourseViewState;
use services::{CompleteLessonOutcome, ProgramStatus};

fn lesson_title(course: &Course, lesson_id: LessonId) -> String {
    course
        .find_lesson(lesson_id)
        .map_or_else(|| format!("lesson {lesson_id}"), |(_, l)| l.title.clone())
}

pub fn progress(state: &CourseViewState) -> String {
    let course = state.course();
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}%)", course.title, state.progress());
    if !state.is_enrolled() {
        let _ = writeln!(out, "not enrolled");
        return out;
    }

    let completed = state.completed_lessons();
    let _ = writeln!(
        out,
        "{} of {} lessons completed",
        completed.len(),
        course.lesson_count()
    );
    for module in &course.modules {
        let _ = writeln!(out, "  {}", module.title);
        for lesson in &module.lessons {
            let mark = if completed.contains(&lesson.id) { "x" } else { " " };
            let current = if state.selected_lesson_id() == Some(lesson.id) {
                "  <"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "    [{mark}] {} ({}){current}",
                lesson.title,
                lesson.kind()
            );
        }
    }
    out
}

pub fn next(state: &CourseViewState, action: Option<NextAction>) -> String {
    let course = state.course();
    let mut out = String::new();
    if let Some(selected) = state.selected_lesson_id() {
        if let Some((_, previous)) = previous_lesson(course, selected) {
            let _ = writeln!(out, "previous: {}", lesson_title(course, previous));
        }
    }
    match action {
        None => {
            let _ = writeln!(out, "no next step");
        }
        Some(NextAction::Lesson { lesson_id, .. }) => {
            let _ = writeln!(out, "next lesson: {}", lesson_title(course, lesson_id));
        }
        Some(NextAction::Module { lesson_id, position }) => {
            let module = course
                .module_at(position.module_index)
                .map_or("", |m| m.title.as_str());
            let _ = writeln!(
                out,
                "next module: {module}, starting with {}",
                lesson_title(course, lesson_id)
            );
        }
        Some(NextAction::Complete {
            can_complete: true,
            ..
        }) => {
            let _ = writeln!(out, "finish the course");
        }
        Some(NextAction::Complete {
            can_complete: false,
            remaining_lessons,
        }) => {
            let _ = writeln!(
                out,
                "finish the course after {remaining_lessons} remaining lesson(s)"
            );
        }
    }
    out
}

pub fn completion(outcome: &CompleteLessonOutcome, lesson_id: LessonId) -> String {
    let state = outcome.state();
    let title = lesson_title(state.course(), lesson_id);
    let mut out = String::new();
    match outcome {
        CompleteLessonOutcome::AlreadyCompleted { .. } => {
            let _ = writeln!(out, "{title} was already completed");
        }
        CompleteLessonOutcome::Completed { .. } => {
            let _ = writeln!(out, "completed {title}; course progress {}%", state.progress());
        }
        CompleteLessonOutcome::QuizRequirementsNotMet { shortfalls, .. } => {
            let _ = writeln!(
                out,
                "completed {title}; course held below 100% until quizzes are passed:"
            );
            for shortfall in shortfalls {
                let _ = writeln!(out, "  {shortfall}");
            }
        }
    }
    out.push_str(&next(state, state.next_action()));
    out
}

/// Title, type and content preview of one lesson.
pub fn lesson(state: &CourseViewState, lesson_id: LessonId) -> Option<String> {
    let (module, lesson) = state.course().find_lesson(lesson_id)?;
    let mut out = String::new();
    let _ = writeln!(out, "{} / {} ({})", module.title, lesson.title, lesson.kind());
    if let Some(minutes) = lesson.duration_minutes {
        let _ = writeln!(out, "duration: {minutes} min");
    }
    match lesson.preview() {
        LessonPreview::Video { url } => {
            let _ = writeln!(out, "video: {url}");
        }
        LessonPreview::Text { body } => {
            let _ = writeln!(out, "{body}");
        }
        LessonPreview::Document { url } => {
            let _ = writeln!(out, "document: {url}");
        }
        LessonPreview::Embed { kind, html } => {
            let _ = writeln!(out, "{kind} embed: {html}");
        }
        LessonPreview::Quiz {
            question_count,
            passing_score,
            time_limit_minutes,
        } => {
            let _ = write!(out, "quiz: {question_count} question(s)");
            if let Some(score) = passing_score {
                let _ = write!(out, ", pass at {score}%");
            }
            if let Some(minutes) = time_limit_minutes {
                let _ = write!(out, ", {minutes} min limit");
            }
            out.push('\n');
        }
    }
    Some(out)
}

pub fn quiz_access(state: &CourseViewState, lesson_id: LessonId, access: QuizAccess) -> String {
    let title = lesson_title(state.course(), lesson_id);
    match access {
        QuizAccess::Open => format!("{title}: open\n"),
        QuizAccess::Locked(reason) => format!("{title}: locked ({reason})\n"),
    }
}

pub fn program(title: &str, completion: ProgramCompletion) -> String {
    let status = match (completion.completed, completion.final_exam_available) {
        (false, _) => "in progress",
        (true, false) => "completed; no final exam published yet",
        (true, true) => "completed; final exam available",
    };
    format!("{title}: {status}\n")
}

pub fn programs(statuses: &[ProgramStatus]) -> String {
    statuses
        .iter()
        .map(|s| program(&s.program.title, s.completion))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{
        CourseId, Enrollment, EnrollmentId, Lesson, LessonContent, Module, ModuleId, Program,
        ProgramId, UserId,
    };
    use lms_core::quiz_gate::LockReason;
    use lms_core::time::fixed_now;

    fn state(enrolled: bool) -> CourseViewState {
        let lessons = vec![
            Lesson::new(
                LessonId::new(1),
                "Intro",
                LessonContent::Text {
                    content: String::new(),
                },
            ),
            Lesson::new(
                LessonId::new(2),
                "Deep dive",
                LessonContent::Pdf {
                    url: "https://files.example.com/a.pdf".into(),
                },
            ),
        ];
        let course = Course::new(
            CourseId::new(1),
            "Course",
            vec![Module::new(ModuleId::new(1), "Basics", lessons)],
        );
        let enrollment = enrolled.then(|| {
            Enrollment::new(EnrollmentId::new(1), UserId::new(1), CourseId::new(1), fixed_now())
        });
        CourseViewState::new(course, enrollment)
    }

    #[test]
    fn progress_lists_lessons_with_marks() {
        let text = progress(&state(true));
        assert!(text.starts_with("Course (0%)\n"));
        assert!(text.contains("0 of 2 lessons completed"));
        assert!(text.contains("    [ ] Intro (text)  <"));
        assert!(text.contains("    [ ] Deep dive (pdf)"));

        assert!(progress(&state(false)).contains("not enrolled"));
    }

    #[test]
    fn next_names_the_target_lesson() {
        let s = state(true);
        let text = next(&s, s.next_action());
        assert_eq!(text, "next lesson: Deep dive\n");

        let remaining = next(
            &s,
            Some(NextAction::Complete {
                can_complete: false,
                remaining_lessons: 2,
            }),
        );
        assert!(remaining.contains("after 2 remaining lesson(s)"));
    }

    #[test]
    fn lesson_preview_shows_content_location() {
        let s = state(true);
        assert_eq!(
            lesson(&s, LessonId::new(2)).as_deref(),
            Some("Basics / Deep dive (pdf)\ndocument: https://files.example.com/a.pdf\n")
        );
        assert_eq!(lesson(&s, LessonId::new(9)), None);
    }

    #[test]
    fn quiz_access_shows_lock_reason() {
        let s = state(true);
        assert_eq!(
            quiz_access(&s, LessonId::new(2), QuizAccess::Locked(LockReason::NotStarted)),
            "Deep dive: locked (start the course before taking quizzes)\n"
        );
    }

    #[test]
    fn program_statuses_render_one_line_each() {
        let statuses = vec![
            ProgramStatus {
                program: Program::new(ProgramId::new(1), "Track A", vec![]),
                completion: ProgramCompletion {
                    completed: true,
                    final_exam_available: true,
                },
            },
            ProgramStatus {
                program: Program::new(ProgramId::new(2), "Track B", vec![]),
                completion: ProgramCompletion::default(),
            },
        ];
        assert_eq!(
            programs(&statuses),
            "Track A: completed; final exam available\nTrack B: in progress\n"
        );
    }
}
