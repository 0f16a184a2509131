//! Local mirror of the remote task collection.
//!
//! Every mutation waits for the server to confirm and only then patches the
//! local list in place. Nothing is flipped ahead of confirmation, and nothing
//! refetches implicitly; `fetch_all` and `retry` are the only full reloads.
//!
//! Failures are returned to the caller and also recorded in the shared
//! `error` slot, where the most recent failure wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AppError;
use crate::ids::IdGenerator;
use crate::model::{Progress, Task, TaskFilter};
use crate::remote::TaskStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListState {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub adding: usize,
}

impl Default for TaskListState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            loading: true,
            error: None,
            adding: 0,
        }
    }
}

struct Inner {
    store: Arc<dyn TaskStore>,
    ids: IdGenerator,
    state: Mutex<TaskListState>,
    fetch_seq: AtomicU64,
}

/// Cheap to clone; clones share the same list.
#[derive(Clone)]
pub struct TaskList {
    inner: Arc<Inner>,
}

impl TaskList {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                ids: IdGenerator::new(),
                state: Mutex::new(TaskListState::default()),
                fetch_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Builds the list and runs the initial load. A failed load is recorded
    /// in the error slot rather than returned.
    pub async fn mount(store: Arc<dyn TaskStore>) -> Self {
        let list = Self::new(store);
        let _ = list.fetch_all().await;
        list
    }

    fn state(&self) -> MutexGuard<'_, TaskListState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn fetch_all(&self) -> Result<Vec<Task>, AppError> {
        let ticket = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.store.list().await;

        let mut state = self.state();
        if ticket != self.inner.fetch_seq.load(Ordering::SeqCst) {
            tracing::debug!(ticket, "discarding superseded task list");
            return result;
        }

        state.loading = false;
        match &result {
            Ok(tasks) => {
                let mut fresh = Vec::with_capacity(tasks.len());
                for task in tasks {
                    upsert(&mut fresh, task.clone());
                }
                tracing::info!(count = fresh.len(), "loaded tasks");
                state.tasks = fresh;
                state.error = None;
            }
            Err(err) => record_failure(&mut state, "failed to load tasks", err),
        }

        result
    }

    pub async fn retry(&self) -> Result<Vec<Task>, AppError> {
        self.clear_error();
        self.fetch_all().await
    }

    /// Returns `Ok(None)` without touching the network when the title is blank.
    pub async fn add(&self, title: &str) -> Result<Option<Task>, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let task = Task::new(self.inner.ids.next_id(), title);
        let result = {
            let _adding = AddingGuard::new(self);
            self.inner.store.create(&task).await
        };

        let mut state = self.state();
        match result {
            Ok(()) => {
                tracing::info!(id = task.id, "task added");
                upsert(&mut state.tasks, task.clone());
                Ok(Some(task))
            }
            Err(err) => {
                record_failure(&mut state, "failed to add task", &err);
                Err(err)
            }
        }
    }

    /// Blank titles are dropped and the rest trimmed; the server's created
    /// tasks are appended as returned.
    pub async fn add_bulk<S: AsRef<str>>(&self, titles: &[S]) -> Result<Vec<Task>, AppError> {
        let cleaned: Vec<String> = titles
            .iter()
            .map(|title| title.as_ref().trim())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .collect();
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let result = {
            let _adding = AddingGuard::new(self);
            self.inner.store.create_bulk(&cleaned).await
        };

        let mut state = self.state();
        match result {
            Ok(created) => {
                tracing::info!(count = created.len(), "tasks added in bulk");
                for task in &created {
                    upsert(&mut state.tasks, task.clone());
                }
                Ok(created)
            }
            Err(err) => {
                record_failure(&mut state, "failed to add tasks", &err);
                Err(err)
            }
        }
    }

    pub async fn toggle(&self, task: &Task) -> Result<Task, AppError> {
        let updated = task.toggled();
        let result = self.inner.store.update(&updated).await;

        let mut state = self.state();
        match result {
            Ok(()) => {
                if let Some(entry) = state.tasks.iter_mut().find(|entry| entry.id == updated.id) {
                    *entry = updated.clone();
                }
                tracing::info!(id = updated.id, completed = updated.completed, "task toggled");
                Ok(updated)
            }
            Err(err) => {
                record_failure(&mut state, "failed to update task", &err);
                Err(err)
            }
        }
    }

    pub async fn remove(&self, id: i64) -> Result<(), AppError> {
        let result = self.inner.store.delete(id).await;

        let mut state = self.state();
        match result {
            Ok(()) => {
                state.tasks.retain(|task| task.id != id);
                tracing::info!(id, "task deleted");
                Ok(())
            }
            Err(err) => {
                record_failure(&mut state, "failed to delete task", &err);
                Err(err)
            }
        }
    }

    pub fn clear_error(&self) {
        self.state().error = None;
    }

    pub fn snapshot(&self) -> TaskListState {
        self.state().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn find(&self, id: i64) -> Option<Task> {
        self.state().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.state()
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.state().tasks)
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_adding(&self) -> bool {
        self.state().adding > 0
    }
}

struct AddingGuard<'a> {
    list: &'a TaskList,
}

impl<'a> AddingGuard<'a> {
    fn new(list: &'a TaskList) -> Self {
        list.state().adding += 1;
        Self { list }
    }
}

impl Drop for AddingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.list.state();
        state.adding = state.adding.saturating_sub(1);
    }
}

fn upsert(tasks: &mut Vec<Task>, task: Task) {
    match tasks.iter_mut().find(|entry| entry.id == task.id) {
        Some(entry) => *entry = task,
        None => tasks.push(task),
    }
}

fn record_failure(state: &mut TaskListState, context: &str, err: &AppError) {
    let message = format!("{context}: {}", err.message());
    tracing::warn!(code = err.code(), error = %message, "task list operation failed");
    state.error = Some(message);
}
