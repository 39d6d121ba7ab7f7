//! Record-store boundary.
//!
//! The split workflow and the HTTP handlers are written against this trait
//! instead of a concrete database so the whole workflow can be exercised on
//! the host with an in-memory store. Production uses [`crate::db::D1Store`].

use crate::models::{Milestone, Phase, Story, StoryDraft, Task};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Typed access to board records.
///
/// List operations return deterministic orderings: stories and tasks by id,
/// phases by board order, milestones by deadline.
// The Workers runtime is single-threaded, so these futures need not be Send.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn find_story(&self, id: i64) -> Result<Option<Story>, StoreError>;

    /// Insert a new story; the store assigns id and timestamps.
    async fn create_story(&self, draft: &StoryDraft) -> Result<Story, StoreError>;

    /// Flag a story done and return its post-update state.
    async fn mark_story_done(&self, id: i64) -> Result<Story, StoreError>;

    async fn stories_for_sprint(&self, sprint_id: i64) -> Result<Vec<Story>, StoreError>;

    /// Phases of a project that are still open (`!is_done`).
    async fn open_phases(&self, project_id: i64) -> Result<Vec<Phase>, StoreError>;

    async fn tasks_for_story(&self, story_id: i64) -> Result<Vec<Task>, StoreError>;

    /// Tasks owned by `story_id` whose phase is in `phase_ids`.
    async fn tasks_for_story_in_phases(
        &self,
        story_id: i64,
        phase_ids: &[i64],
    ) -> Result<Vec<Task>, StoreError>;

    /// Re-point a task to another story and return its post-update state.
    async fn reassign_task(&self, task_id: i64, story_id: i64) -> Result<Task, StoreError>;

    /// Milestones of a project, deadline ascending.
    async fn milestones_for_project(&self, project_id: i64) -> Result<Vec<Milestone>, StoreError>;
}
