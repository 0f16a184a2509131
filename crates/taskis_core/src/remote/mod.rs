//! Seams to the remote collaborators.
//!
//! The task list and the chat relay only ever talk to these traits, so tests
//! can swap the HTTP backend for an in-memory one.

mod http;

pub use http::HttpBackend;

use crate::error::AppError;
use crate::model::Task;

/// The remote store that owns the canonical task collection.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, AppError>;

    /// The response body is not used; the caller keeps the task it sent.
    async fn create(&self, task: &Task) -> Result<(), AppError>;

    /// Returns the tasks the server created, in server order.
    async fn create_bulk(&self, titles: &[String]) -> Result<Vec<Task>, AppError>;

    async fn update(&self, task: &Task) -> Result<(), AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

/// Free-form conversation endpoint.
#[async_trait::async_trait]
pub trait ChatEndpoint: Send + Sync {
    async fn converse(&self, message: &str) -> Result<String, AppError>;
}
