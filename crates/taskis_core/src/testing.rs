use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::AppError;
use crate::model::Task;
use crate::remote::{ChatEndpoint, TaskStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(Task),
    CreateBulk(Vec<String>),
    Update(Task),
    Delete(i64),
    Converse(String),
}

/// In-memory stand-in for the remote task store and chat endpoint.
#[derive(Default)]
pub struct MockBackend {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<Call>>,
    failing: AtomicBool,
    list_delays: Mutex<VecDeque<Duration>>,
    create_gate: Mutex<Option<std::sync::Arc<Notify>>>,
    next_bulk_id: Mutex<i64>,
}

impl MockBackend {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            next_bulk_id: Mutex::new(9_000),
            ..Self::default()
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn set_server_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap() = tasks;
    }

    /// Each subsequent `list` call sleeps for the next queued delay.
    pub fn delay_lists(&self, delays: &[Duration]) {
        self.list_delays.lock().unwrap().extend(delays.iter().copied());
    }

    /// `create` waits on the returned notify before answering.
    pub fn gate_creates(&self) -> std::sync::Arc<Notify> {
        let gate = std::sync::Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn record(&self, call: Call) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::transport("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl TaskStore for MockBackend {
    async fn list(&self) -> Result<Vec<Task>, AppError> {
        let failing = self.failing.load(Ordering::SeqCst);
        let snapshot = self.server_tasks();
        self.calls.lock().unwrap().push(Call::List);
        let delay = self.list_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(AppError::transport("connection refused"));
        }
        Ok(snapshot)
    }

    async fn create(&self, task: &Task) -> Result<(), AppError> {
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(Call::Create(task.clone()))?;
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn create_bulk(&self, titles: &[String]) -> Result<Vec<Task>, AppError> {
        self.record(Call::CreateBulk(titles.to_vec()))?;
        let mut next_id = self.next_bulk_id.lock().unwrap();
        let created: Vec<Task> = titles
            .iter()
            .map(|title| {
                *next_id += 1;
                Task::new(*next_id, title.clone())
            })
            .collect();
        self.tasks.lock().unwrap().extend(created.iter().cloned());
        Ok(created)
    }

    async fn update(&self, task: &Task) -> Result<(), AppError> {
        self.record(Call::Update(task.clone()))?;
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(entry) = tasks.iter_mut().find(|entry| entry.id == task.id) {
            *entry = task.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.record(Call::Delete(id))?;
        self.tasks.lock().unwrap().retain(|task| task.id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatEndpoint for MockBackend {
    async fn converse(&self, message: &str) -> Result<String, AppError> {
        self.record(Call::Converse(message.to_string()))?;
        Ok(format!("echo: {message}"))
    }
}
