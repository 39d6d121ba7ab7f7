//! Story split workflow.
//!
//! Splitting a story clones it into a target sprint, re-homes every task of
//! the original story that still sits in an open phase onto the clone, and
//! finally flags the original story done. Stages run strictly in that order;
//! the task re-pointing inside the migration stage fans out concurrently and
//! joins before finalization starts.
//!
//! There is no rollback: a failure part-way leaves earlier writes in place
//! and surfaces the error to the caller. Splitting the same story twice
//! produces two clones. Both are long-standing board behaviors, kept as-is.

use std::fmt;

use futures_util::future::try_join_all;

use crate::models::{Story, Task};
use crate::store::{RecordStore, StoreError};

// ── Request & result ────────────────────────────────────────────

/// Validated split parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRequest {
    pub story_id: i64,
    pub sprint_id: i64,
    pub project_id: i64,
}

impl SplitRequest {
    /// Validate raw request parameters. All three must be present and parse
    /// as integers; rejection happens before any store access.
    pub fn parse(
        story_id: Option<&str>,
        sprint_id: Option<&str>,
        project_id: Option<&str>,
    ) -> Result<Self, SplitError> {
        Ok(Self {
            story_id: parse_id(story_id, "storyId")?,
            sprint_id: parse_id(sprint_id, "sprintId")?,
            project_id: parse_id(project_id, "projectId")?,
        })
    }
}

fn parse_id(value: Option<&str>, name: &'static str) -> Result<i64, SplitError> {
    value
        .and_then(|v| v.trim().parse().ok())
        .ok_or(SplitError::InvalidInput(name))
}

/// Everything a successful split produced, owned by one request.
#[derive(Debug)]
pub struct SplitOutcome {
    /// The source story after finalization (`is_done` set).
    pub original_story: Story,
    pub new_story: Story,
    /// Re-pointed tasks, ordered by task id.
    pub migrated_tasks: Vec<Task>,
    pub migrated_count: usize,
}

// ── Errors ──────────────────────────────────────────────────────

/// Workflow stage, attached to persistence failures so callers can tell how
/// far a split got before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStage {
    Validating,
    Cloning,
    MigratingTasks,
    Finalizing,
}

impl fmt::Display for SplitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "loading the story",
            Self::Cloning => "cloning the story",
            Self::MigratingTasks => "migrating tasks",
            Self::Finalizing => "finalizing the split",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("required input data missing or not an integer: {0}")]
    InvalidInput(&'static str),

    #[error("story {0} not found")]
    StoryNotFound(i64),

    #[error("split failed while {stage}: {source}")]
    Persistence {
        stage: SplitStage,
        #[source]
        source: StoreError,
    },
}

impl SplitError {
    fn at(stage: SplitStage) -> impl FnOnce(StoreError) -> SplitError {
        move |source| SplitError::Persistence { stage, source }
    }
}

// ── Orchestrator ────────────────────────────────────────────────

/// Run the split workflow against `store`.
///
/// Writes already issued when a later stage fails are not undone: a created
/// clone survives a migration failure, and migrated tasks survive a
/// finalization failure.
pub async fn split_story<S: RecordStore>(
    store: &S,
    request: &SplitRequest,
) -> Result<SplitOutcome, SplitError> {
    let story = store
        .find_story(request.story_id)
        .await
        .map_err(SplitError::at(SplitStage::Validating))?
        .ok_or(SplitError::StoryNotFound(request.story_id))?;

    let draft = story.clone_into_sprint(request.sprint_id);
    let new_story = store
        .create_story(&draft)
        .await
        .map_err(SplitError::at(SplitStage::Cloning))?;

    let phases = store
        .open_phases(request.project_id)
        .await
        .map_err(SplitError::at(SplitStage::MigratingTasks))?;

    let migrated_tasks = if phases.is_empty() {
        // Nothing is eligible to move; go straight to finalization.
        Vec::new()
    } else {
        let phase_ids: Vec<i64> = phases.iter().map(|phase| phase.id).collect();
        migrate_tasks(store, story.id, new_story.id, &phase_ids).await?
    };

    let original_story = store
        .mark_story_done(story.id)
        .await
        .map_err(SplitError::at(SplitStage::Finalizing))?;

    Ok(SplitOutcome {
        original_story,
        new_story,
        migrated_count: migrated_tasks.len(),
        migrated_tasks,
    })
}

/// Re-point every task of `from_story` sitting in one of `phase_ids` to
/// `to_story`.
///
/// One update per task, fanned out concurrently and joined: finalization can
/// only start once every update has completed. The first failed update
/// surfaces immediately; updates that already completed stay applied and
/// updates not yet started are dropped.
async fn migrate_tasks<S: RecordStore>(
    store: &S,
    from_story: i64,
    to_story: i64,
    phase_ids: &[i64],
) -> Result<Vec<Task>, SplitError> {
    let tasks = store
        .tasks_for_story_in_phases(from_story, phase_ids)
        .await
        .map_err(SplitError::at(SplitStage::MigratingTasks))?;
    let expected = tasks.len();

    let migrated = try_join_all(
        tasks
            .iter()
            .map(|task| store.reassign_task(task.id, to_story)),
    )
    .await
    .map_err(SplitError::at(SplitStage::MigratingTasks))?;

    debug_assert_eq!(migrated.len(), expected);
    Ok(migrated)
}
