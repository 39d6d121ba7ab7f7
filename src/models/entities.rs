use serde::{Deserialize, Serialize};

// ── Story ───────────────────────────────────────────────────────

/// A story is a unit of work scheduled into one sprint of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: i64,
    pub project_id: i64,
    /// Sprint assignment; mutable. Splitting re-homes the clone to another sprint.
    pub sprint_id: i64,
    pub title: String,
    pub description: String,
    /// Story points, -1 when not yet estimated.
    pub estimate: i32,
    pub priority: i32,
    pub is_done: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Story {
    /// Copy this story's fields into an insertable draft pointed at `sprint_id`.
    ///
    /// The draft type carries no identity or timestamp fields, so the new
    /// record always gets a fresh id and store-assigned timestamps.
    pub fn clone_into_sprint(&self, sprint_id: i64) -> StoryDraft {
        StoryDraft {
            project_id: self.project_id,
            sprint_id,
            title: self.title.clone(),
            description: self.description.clone(),
            estimate: self.estimate,
            priority: self.priority,
            is_done: self.is_done,
        }
    }
}

/// The insertable subset of [`Story`]: everything except id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryDraft {
    pub project_id: i64,
    pub sprint_id: i64,
    pub title: String,
    pub description: String,
    pub estimate: i32,
    pub priority: i32,
    pub is_done: bool,
}

// ── Task ────────────────────────────────────────────────────────

/// A task is a sub-unit of work belonging to exactly one story and one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    /// Owning story; re-pointing this is the split workflow's core mutation.
    pub story_id: i64,
    pub phase_id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub is_done: bool,
    pub created_at: String,
    pub updated_at: String,
}

// ── Phase ───────────────────────────────────────────────────────

/// A workflow column on the board. Open phases (`!is_done`) mark which tasks
/// are still in flight and therefore eligible to follow a split story.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub sort_order: i32,
    pub is_done: bool,
}

// ── Milestone ───────────────────────────────────────────────────

/// Project milestone, read-only here; listed in story add/edit view data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub deadline: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
