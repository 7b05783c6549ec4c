use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, FinalTestId, ProgramId};

/// Ordered bundle of courses with a final exam gated on full completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
}

impl Program {
    #[must_use]
    pub fn new(id: ProgramId, title: impl Into<String>, course_ids: Vec<CourseId>) -> Self {
        Self {
            id,
            title: title.into(),
            course_ids,
        }
    }

    #[must_use]
    pub fn contains(&self, course_id: CourseId) -> bool {
        self.course_ids.contains(&course_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalTest {
    pub id: FinalTestId,
    pub program_id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub published: bool,
}

/// Filter for the final-test catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTestQuery {
    pub program_id: ProgramId,
    pub published_only: bool,
}

impl FinalTestQuery {
    #[must_use]
    pub fn published_for(program_id: ProgramId) -> Self {
        Self {
            program_id,
            published_only: true,
        }
    }

    #[must_use]
    pub fn matches(&self, test: &FinalTest) -> bool {
        test.program_id == self.program_id && (!self.published_only || test.published)
    }
}
