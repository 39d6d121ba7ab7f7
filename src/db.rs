//! D1-backed [`RecordStore`].
//!
//! All queries are prepared statements with positional binds. D1 speaks JS
//! values, so integer ids are bound as `f64` and booleans are stored as
//! `INTEGER` 0/1 columns; row structs own the translation back into the
//! domain types.

use wasm_bindgen::JsValue;
use worker::{D1Database, D1Result};

use crate::models::{Milestone, Phase, Story, StoryDraft, Task};
use crate::store::{RecordStore, StoreError};

impl From<worker::Error> for StoreError {
    fn from(err: worker::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().as_string().unwrap()
}

fn id_value(id: i64) -> JsValue {
    JsValue::from(id as f64)
}

/// Positional placeholder list `?first, ?first+1, ...` for `IN (...)` filters.
fn in_list(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct D1Store {
    db: D1Database,
}

impl D1Store {
    pub fn new(db: D1Database) -> Self {
        Self { db }
    }

    async fn story_by_id(&self, id: i64) -> Result<Option<Story>, StoreError> {
        let row: Option<StoryRow> = self
            .db
            .prepare("SELECT * FROM stories WHERE id = ?1")
            .bind(&[id_value(id)])?
            .first(None)
            .await?;
        Ok(row.map(StoryRow::into_story))
    }
}

impl RecordStore for D1Store {
    async fn find_story(&self, id: i64) -> Result<Option<Story>, StoreError> {
        self.story_by_id(id).await
    }

    async fn create_story(&self, draft: &StoryDraft) -> Result<Story, StoreError> {
        let now = now_iso();
        let result = self
            .db
            .prepare(
                "INSERT INTO stories (project_id, sprint_id, title, description, estimate, priority, is_done, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&[
                id_value(draft.project_id),
                id_value(draft.sprint_id),
                JsValue::from_str(&draft.title),
                JsValue::from_str(&draft.description),
                JsValue::from(draft.estimate),
                JsValue::from(draft.priority),
                JsValue::from(i32::from(draft.is_done)),
                JsValue::from_str(&now),
                JsValue::from_str(&now),
            ])?
            .run()
            .await?;

        let id = result
            .meta()?
            .and_then(|m| m.last_row_id)
            .ok_or_else(|| StoreError::Backend("story insert returned no row id".into()))?
            as i64;
        self.story_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("story", id))
    }

    async fn mark_story_done(&self, id: i64) -> Result<Story, StoreError> {
        let result: D1Result = self
            .db
            .prepare("UPDATE stories SET is_done = 1, updated_at = ?1 WHERE id = ?2")
            .bind(&[JsValue::from_str(&now_iso()), id_value(id)])?
            .run()
            .await?;

        let changed = result
            .meta()?
            .map(|m| m.changes.unwrap_or(0) > 0)
            .unwrap_or(false);
        if !changed {
            return Err(StoreError::not_found("story", id));
        }
        self.story_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("story", id))
    }

    async fn stories_for_sprint(&self, sprint_id: i64) -> Result<Vec<Story>, StoreError> {
        let result: D1Result = self
            .db
            .prepare("SELECT * FROM stories WHERE sprint_id = ?1 ORDER BY id")
            .bind(&[id_value(sprint_id)])?
            .all()
            .await?;
        let rows: Vec<StoryRow> = result.results()?;
        Ok(rows.into_iter().map(StoryRow::into_story).collect())
    }

    async fn open_phases(&self, project_id: i64) -> Result<Vec<Phase>, StoreError> {
        let result: D1Result = self
            .db
            .prepare(
                "SELECT * FROM phases WHERE project_id = ?1 AND is_done = 0 ORDER BY sort_order",
            )
            .bind(&[id_value(project_id)])?
            .all()
            .await?;
        let rows: Vec<PhaseRow> = result.results()?;
        Ok(rows.into_iter().map(PhaseRow::into_phase).collect())
    }

    async fn tasks_for_story(&self, story_id: i64) -> Result<Vec<Task>, StoreError> {
        let result: D1Result = self
            .db
            .prepare("SELECT * FROM tasks WHERE story_id = ?1 ORDER BY id")
            .bind(&[id_value(story_id)])?
            .all()
            .await?;
        let rows: Vec<TaskRow> = result.results()?;
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    async fn tasks_for_story_in_phases(
        &self,
        story_id: i64,
        phase_ids: &[i64],
    ) -> Result<Vec<Task>, StoreError> {
        // `IN ()` is not valid SQL.
        if phase_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT * FROM tasks WHERE story_id = ?1 AND phase_id IN ({}) ORDER BY id",
            in_list(2, phase_ids.len())
        );
        let mut bindings = vec![id_value(story_id)];
        bindings.extend(phase_ids.iter().map(|id| id_value(*id)));

        let result: D1Result = self.db.prepare(&query).bind(&bindings)?.all().await?;
        let rows: Vec<TaskRow> = result.results()?;
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    async fn reassign_task(&self, task_id: i64, story_id: i64) -> Result<Task, StoreError> {
        let result: D1Result = self
            .db
            .prepare("UPDATE tasks SET story_id = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&[
                id_value(story_id),
                JsValue::from_str(&now_iso()),
                id_value(task_id),
            ])?
            .run()
            .await?;

        let changed = result
            .meta()?
            .map(|m| m.changes.unwrap_or(0) > 0)
            .unwrap_or(false);
        if !changed {
            return Err(StoreError::not_found("task", task_id));
        }

        let row: Option<TaskRow> = self
            .db
            .prepare("SELECT * FROM tasks WHERE id = ?1")
            .bind(&[id_value(task_id)])?
            .first(None)
            .await?;
        row.map(TaskRow::into_task)
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    async fn milestones_for_project(&self, project_id: i64) -> Result<Vec<Milestone>, StoreError> {
        let result: D1Result = self
            .db
            .prepare("SELECT * FROM milestones WHERE project_id = ?1 ORDER BY deadline ASC")
            .bind(&[id_value(project_id)])?
            .all()
            .await?;
        let rows: Vec<MilestoneRow> = result.results()?;
        Ok(rows.into_iter().map(MilestoneRow::into_milestone).collect())
    }
}

// ── Row types ───────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct StoryRow {
    id: i64,
    project_id: i64,
    sprint_id: i64,
    title: String,
    description: String,
    estimate: i32,
    priority: i32,
    is_done: i32,
    created_at: String,
    updated_at: String,
}

impl StoryRow {
    fn into_story(self) -> Story {
        Story {
            id: self.id,
            project_id: self.project_id,
            sprint_id: self.sprint_id,
            title: self.title,
            description: self.description,
            estimate: self.estimate,
            priority: self.priority,
            is_done: self.is_done != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TaskRow {
    id: i64,
    story_id: i64,
    phase_id: i64,
    user_id: Option<i64>,
    title: String,
    description: String,
    is_done: i32,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn into_task(self) -> Task {
        Task {
            id: self.id,
            story_id: self.story_id,
            phase_id: self.phase_id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            is_done: self.is_done != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct PhaseRow {
    id: i64,
    project_id: i64,
    title: String,
    sort_order: i32,
    is_done: i32,
}

impl PhaseRow {
    fn into_phase(self) -> Phase {
        Phase {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            sort_order: self.sort_order,
            is_done: self.is_done != 0,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct MilestoneRow {
    id: i64,
    project_id: i64,
    title: String,
    deadline: Option<String>,
    created_at: String,
    updated_at: String,
}

impl MilestoneRow {
    fn into_milestone(self) -> Milestone {
        Milestone {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            deadline: self.deadline,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
