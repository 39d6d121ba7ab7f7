//! Test support: an in-memory [`RecordStore`] with failure injection.
//!
//! The fake mirrors the production store's observable contract (fresh ids,
//! store-assigned timestamps, deterministic list orderings) and adds knobs to
//! fail individual operations so workflow tests can exercise partial-failure
//! states. Interior mutability uses `RefCell`/`Cell`; like the Workers
//! runtime, tests drive the store from a single thread.

use std::cell::{Cell, RefCell};

use crate::models::{Milestone, Phase, Story, StoryDraft, Task};
use crate::store::{RecordStore, StoreError};

#[derive(Default)]
struct Tables {
    stories: Vec<Story>,
    tasks: Vec<Task>,
    phases: Vec<Phase>,
    milestones: Vec<Milestone>,
}

pub struct MemoryStore {
    tables: RefCell<Tables>,
    next_id: Cell<i64>,
    clock: Cell<u32>,
    fail_create_story: Cell<bool>,
    fail_mark_done: Cell<bool>,
    /// 1-based index of the reassign call that should fail.
    fail_on_reassign: Cell<Option<usize>>,
    reassigns_seen: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(Tables::default()),
            next_id: Cell::new(1),
            clock: Cell::new(0),
            fail_create_story: Cell::new(false),
            fail_mark_done: Cell::new(false),
            fail_on_reassign: Cell::new(None),
            reassigns_seen: Cell::new(0),
        }
    }

    fn fresh_id(&self) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Logical clock; every tick yields a distinct timestamp string.
    fn tick(&self) -> String {
        let t = self.clock.get() + 1;
        self.clock.set(t);
        format!("2026-05-04T09:00:00.{t:03}Z")
    }

    // ── Failure injection ───────────────────────────────────────

    pub fn fail_create_story(&self) {
        self.fail_create_story.set(true);
    }

    pub fn fail_mark_done(&self) {
        self.fail_mark_done.set(true);
    }

    /// Make the `n`-th reassign call (1-based) fail.
    pub fn fail_nth_reassign(&self, n: usize) {
        self.fail_on_reassign.set(Some(n));
    }

    // ── Fixtures & direct inspection ────────────────────────────

    pub fn seed_story(&self, draft: &StoryDraft) -> Story {
        let now = self.tick();
        let story = Story {
            id: self.fresh_id(),
            project_id: draft.project_id,
            sprint_id: draft.sprint_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            estimate: draft.estimate,
            priority: draft.priority,
            is_done: draft.is_done,
            created_at: now.clone(),
            updated_at: now,
        };
        self.tables.borrow_mut().stories.push(story.clone());
        story
    }

    pub fn seed_phase(&self, project_id: i64, is_done: bool) -> Phase {
        let phase = Phase {
            id: self.fresh_id(),
            project_id,
            title: if is_done { "done" } else { "in progress" }.into(),
            sort_order: self.tables.borrow().phases.len() as i32,
            is_done,
        };
        self.tables.borrow_mut().phases.push(phase.clone());
        phase
    }

    pub fn seed_task(&self, story_id: i64, phase_id: i64) -> Task {
        let now = self.tick();
        let task = Task {
            id: self.fresh_id(),
            story_id,
            phase_id,
            user_id: None,
            title: "subtask".into(),
            description: String::new(),
            is_done: false,
            created_at: now.clone(),
            updated_at: now,
        };
        self.tables.borrow_mut().tasks.push(task.clone());
        task
    }

    pub fn seed_milestone(&self, project_id: i64, deadline: Option<&str>) -> Milestone {
        let now = self.tick();
        let milestone = Milestone {
            id: self.fresh_id(),
            project_id,
            title: "release".into(),
            deadline: deadline.map(str::to_owned),
            created_at: now.clone(),
            updated_at: now,
        };
        self.tables.borrow_mut().milestones.push(milestone.clone());
        milestone
    }

    pub fn story(&self, id: i64) -> Story {
        self.tables
            .borrow()
            .stories
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no story {id} in MemoryStore"))
    }

    pub fn task(&self, id: i64) -> Task {
        self.tables
            .borrow()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no task {id} in MemoryStore"))
    }

    pub fn story_count(&self) -> usize {
        self.tables.borrow().stories.len()
    }

    pub fn newest_story_id(&self) -> i64 {
        self.tables
            .borrow()
            .stories
            .iter()
            .map(|s| s.id)
            .max()
            .expect("MemoryStore holds no stories")
    }
}

impl RecordStore for MemoryStore {
    async fn find_story(&self, id: i64) -> Result<Option<Story>, StoreError> {
        Ok(self
            .tables
            .borrow()
            .stories
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn create_story(&self, draft: &StoryDraft) -> Result<Story, StoreError> {
        if self.fail_create_story.get() {
            return Err(StoreError::Backend("injected create failure".into()));
        }
        Ok(self.seed_story(draft))
    }

    async fn mark_story_done(&self, id: i64) -> Result<Story, StoreError> {
        if self.fail_mark_done.get() {
            return Err(StoreError::Backend("injected finalize failure".into()));
        }
        let now = self.tick();
        let mut tables = self.tables.borrow_mut();
        let story = tables
            .stories
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found("story", id))?;
        story.is_done = true;
        story.updated_at = now;
        Ok(story.clone())
    }

    async fn stories_for_sprint(&self, sprint_id: i64) -> Result<Vec<Story>, StoreError> {
        let mut stories: Vec<Story> = self
            .tables
            .borrow()
            .stories
            .iter()
            .filter(|s| s.sprint_id == sprint_id)
            .cloned()
            .collect();
        stories.sort_by_key(|s| s.id);
        Ok(stories)
    }

    async fn open_phases(&self, project_id: i64) -> Result<Vec<Phase>, StoreError> {
        let mut phases: Vec<Phase> = self
            .tables
            .borrow()
            .phases
            .iter()
            .filter(|p| p.project_id == project_id && !p.is_done)
            .cloned()
            .collect();
        phases.sort_by_key(|p| p.sort_order);
        Ok(phases)
    }

    async fn tasks_for_story(&self, story_id: i64) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tables
            .borrow()
            .tasks
            .iter()
            .filter(|t| t.story_id == story_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn tasks_for_story_in_phases(
        &self,
        story_id: i64,
        phase_ids: &[i64],
    ) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tables
            .borrow()
            .tasks
            .iter()
            .filter(|t| t.story_id == story_id && phase_ids.contains(&t.phase_id))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn reassign_task(&self, task_id: i64, story_id: i64) -> Result<Task, StoreError> {
        let seen = self.reassigns_seen.get() + 1;
        self.reassigns_seen.set(seen);
        if self.fail_on_reassign.get() == Some(seen) {
            return Err(StoreError::Backend("injected reassign failure".into()));
        }
        let now = self.tick();
        let mut tables = self.tables.borrow_mut();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| StoreError::not_found("task", task_id))?;
        task.story_id = story_id;
        task.updated_at = now;
        Ok(task.clone())
    }

    async fn milestones_for_project(&self, project_id: i64) -> Result<Vec<Milestone>, StoreError> {
        let mut milestones: Vec<Milestone> = self
            .tables
            .borrow()
            .milestones
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        milestones.sort_by(|a, b| a.deadline.cmp(&b.deadline));
        Ok(milestones)
    }
}

// Contract checks for the fake itself, so workflow tests can rely on its
// orderings matching the production store.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoryDraft;
    use futures_executor::block_on;

    fn draft(project_id: i64, sprint_id: i64) -> StoryDraft {
        StoryDraft {
            project_id,
            sprint_id,
            title: "story".into(),
            description: String::new(),
            estimate: -1,
            priority: 0,
            is_done: false,
        }
    }

    #[test]
    fn milestones_come_back_deadline_ordered() {
        let store = MemoryStore::new();
        let late = store.seed_milestone(1, Some("2026-09-01"));
        let early = store.seed_milestone(1, Some("2026-06-01"));
        store.seed_milestone(2, Some("2026-01-01"));

        let milestones = block_on(store.milestones_for_project(1)).unwrap();
        let ids: Vec<i64> = milestones.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn sprint_and_story_listings_filter_and_sort_by_id() {
        let store = MemoryStore::new();
        let a = store.seed_story(&draft(1, 10));
        let b = store.seed_story(&draft(1, 10));
        store.seed_story(&draft(1, 11));
        let phase = store.seed_phase(1, false);
        let t1 = store.seed_task(a.id, phase.id);
        let t2 = store.seed_task(a.id, phase.id);
        store.seed_task(b.id, phase.id);

        let stories = block_on(store.stories_for_sprint(10)).unwrap();
        assert_eq!(
            stories.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );

        let tasks = block_on(store.tasks_for_story(a.id)).unwrap();
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![t1.id, t2.id]
        );
    }
}
