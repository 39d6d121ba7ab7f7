use serde::{Deserialize, Serialize};

use super::{Milestone, Story, Task};

// ── Split story ─────────────────────────────────────────────────

/// Body of `POST /v1/stories/:id/split`.
///
/// Values may be JSON numbers or numeric strings; the board client posts
/// form-style parameters, so both spellings are accepted and validated in
/// one place by the workflow.
#[derive(Debug, Default, Deserialize)]
pub struct SplitStoryBody {
    #[serde(rename = "sprintId")]
    pub sprint_id: Option<serde_json::Value>,
    #[serde(rename = "projectId")]
    pub project_id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SplitStoryResponse {
    /// Hex operation id, also present in the worker logs for this split.
    pub split_id: String,
    pub original_story: Story,
    pub new_story: Story,
    pub migrated_tasks: Vec<Task>,
    pub migrated_count: usize,
}

// ── View data ───────────────────────────────────────────────────

/// Data backing the "add story" dialog: target ids plus the project's
/// milestones, deadline-ordered.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StoryAddView {
    pub project_id: i64,
    pub sprint_id: i64,
    pub milestones: Vec<Milestone>,
}

/// Data backing the "edit story" dialog.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StoryEditView {
    pub story: Story,
    pub milestones: Vec<Milestone>,
}
