mod course;
mod enrollment;
mod ids;
mod lesson;
mod program;
mod quiz;

pub use ids::{
    CourseId, EnrollmentId, FinalTestId, LessonId, ModuleId, ParseIdError, ProgramId,
    QuizAttemptId, UserId,
};

pub use course::{Course, CourseError, CoursePosition, Module};
pub use enrollment::{Enrollment, LessonProgress, ModuleProgress};
pub use lesson::{
    Lesson, LessonContent, LessonError, LessonKind, LessonPreview, QuizDefinition, QuizQuestion,
};
pub use program::{FinalTest, FinalTestQuery, Program};
pub use quiz::{QuizAttempt, best_attempt};
