use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatEndpoint, TaskStore};
use crate::config::Config;
use crate::error::AppError;
use crate::model::Task;

const TASKS_PATH: &str = "/api/tasks";
const BULK_PATH: &str = "/api/tasks/bulk";
const CHAT_PATH: &str = "/api/chat";

#[derive(Serialize)]
struct BulkRequest<'a> {
    tasks: &'a [String],
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// reqwest-backed client for both the task store and the chat endpoint.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AppError::transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.resolved_base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "sending request");
        self.http.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = request.send().await.map_err(|err| {
            tracing::warn!(error = %err, "request failed");
            AppError::transport(err.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "server rejected request");
            return Err(AppError::status(status.as_u16(), body));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl TaskStore for HttpBackend {
    async fn list(&self) -> Result<Vec<Task>, AppError> {
        let response = self.send(self.request(Method::GET, TASKS_PATH)).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, task: &Task) -> Result<(), AppError> {
        self.send(self.request(Method::POST, TASKS_PATH).json(task))
            .await?;
        Ok(())
    }

    async fn create_bulk(&self, titles: &[String]) -> Result<Vec<Task>, AppError> {
        let body = BulkRequest { tasks: titles };
        let response = self
            .send(self.request(Method::POST, BULK_PATH).json(&body))
            .await?;
        Ok(response.json().await?)
    }

    async fn update(&self, task: &Task) -> Result<(), AppError> {
        let path = format!("{TASKS_PATH}/{}", task.id);
        self.send(self.request(Method::PUT, &path).json(task)).await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let path = format!("{TASKS_PATH}/{id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatEndpoint for HttpBackend {
    async fn converse(&self, message: &str) -> Result<String, AppError> {
        let body = ChatRequest { message };
        let response = self
            .send(self.request(Method::POST, CHAT_PATH).json(&body))
            .await?;
        let reply: ChatReply = response.json().await?;
        Ok(reply.response)
    }
}
