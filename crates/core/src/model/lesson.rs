use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::LessonId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("quiz has no questions")]
    QuizWithoutQuestions,

    #[error("quiz passing score must be within 0..=100, got {score}")]
    InvalidPassingScore { score: u32 },

    #[error("quiz question {index} has no options")]
    QuestionWithoutOptions { index: usize },

    #[error("quiz question {index} marks a correct option that does not exist")]
    CorrectOptionOutOfRange { index: usize },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Payload-free tag of a lesson's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Text,
    Pdf,
    GoogleDrive,
    Presentation,
    Quiz,
}

impl LessonKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Video => "video",
            LessonKind::Text => "text",
            LessonKind::Pdf => "pdf",
            LessonKind::GoogleDrive => "google_drive",
            LessonKind::Presentation => "presentation",
            LessonKind::Quiz => "quiz",
        }
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUIZ DEFINITION ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_option: usize,
}

/// Questions and pass criteria for a quiz lesson.
///
/// A quiz without `passing_score` is exempt from the course completion check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
}

impl QuizDefinition {
    /// Check that the quiz can actually be taken and graded.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` describing the first gap found.
    pub fn validate(&self) -> Result<(), LessonError> {
        if self.questions.is_empty() {
            return Err(LessonError::QuizWithoutQuestions);
        }
        match self.passing_score {
            Some(score) if score > 100 => {
                return Err(LessonError::InvalidPassingScore { score });
            }
            _ => {}
        }
        for (index, question) in self.questions.iter().enumerate() {
            if question.options.is_empty() {
                return Err(LessonError::QuestionWithoutOptions { index });
            }
            if question.correct_option >= question.options.len() {
                return Err(LessonError::CorrectOptionOutOfRange { index });
            }
        }
        Ok(())
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Type-specific lesson payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LessonContent {
    Video {
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
    Text {
        content: String,
    },
    Pdf {
        url: String,
    },
    GoogleDrive {
        #[serde(rename = "embedCode")]
        embed_code: String,
    },
    #[serde(alias = "canva")]
    Presentation {
        #[serde(rename = "embedCode")]
        embed_code: String,
    },
    Quiz {
        quiz: QuizDefinition,
    },
}

impl LessonContent {
    #[must_use]
    pub fn kind(&self) -> LessonKind {
        match self {
            LessonContent::Video { .. } => LessonKind::Video,
            LessonContent::Text { .. } => LessonKind::Text,
            LessonContent::Pdf { .. } => LessonKind::Pdf,
            LessonContent::GoogleDrive { .. } => LessonKind::GoogleDrive,
            LessonContent::Presentation { .. } => LessonKind::Presentation,
            LessonContent::Quiz { .. } => LessonKind::Quiz,
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(flatten)]
    pub content: LessonContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, content: LessonContent) -> Self {
        Self {
            id,
            title: title.into(),
            content,
            duration_minutes: None,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn kind(&self) -> LessonKind {
        self.content.kind()
    }

    #[must_use]
    pub fn is_quiz(&self) -> bool {
        matches!(self.content, LessonContent::Quiz { .. })
    }

    /// Quiz definition, if this is a quiz lesson.
    #[must_use]
    pub fn quiz(&self) -> Option<&QuizDefinition> {
        match &self.content {
            LessonContent::Quiz { quiz } => Some(quiz),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError` if the title is blank or the quiz payload is incomplete.
    pub fn validate(&self) -> Result<(), LessonError> {
        if self.title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if let Some(quiz) = self.quiz() {
            quiz.validate()?;
        }
        Ok(())
    }

    /// Describe what the content preview should embed for this lesson.
    #[must_use]
    pub fn preview(&self) -> LessonPreview<'_> {
        match &self.content {
            LessonContent::Video { video_url } => LessonPreview::Video { url: video_url },
            LessonContent::Text { content } => LessonPreview::Text { body: content },
            LessonContent::Pdf { url } => LessonPreview::Document { url },
            LessonContent::GoogleDrive { embed_code }
            | LessonContent::Presentation { embed_code } => LessonPreview::Embed {
                kind: self.kind(),
                html: embed_code,
            },
            LessonContent::Quiz { quiz } => LessonPreview::Quiz {
                question_count: quiz.questions.len(),
                passing_score: quiz.passing_score,
                time_limit_minutes: quiz.time_limit_minutes,
            },
        }
    }
}

/// Render-ready description of a lesson's content, borrowed from the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonPreview<'a> {
    Video {
        url: &'a str,
    },
    Text {
        body: &'a str,
    },
    Document {
        url: &'a str,
    },
    Embed {
        kind: LessonKind,
        html: &'a str,
    },
    Quiz {
        question_count: usize,
        passing_score: Option<u32>,
        time_limit_minutes: Option<u32>,
    },
}
