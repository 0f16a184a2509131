//! Chat transcript that relays user turns either to the task list or to the
//! remote chat endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::AppError;
use crate::model::{ChatMessage, Role};
use crate::remote::ChatEndpoint;
use crate::task_list::TaskList;

pub const GREETING: &str = "Hi! I'm the Taskis assistant. 👋";
pub const TASK_PROMPT: &str = "Which task would you like to create?";
pub const FOLLOW_UP_PROMPT: &str = "Would you like to create another task?";
pub const APOLOGY: &str = "Sorry, something went wrong. Could you try again?";

const DEFAULT_FOLLOW_UP_DELAY: Duration = Duration::from_millis(500);

/// What the next user turn is treated as. Only `set_mode` changes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelayMode {
    #[default]
    TaskTitle,
    Conversation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub pending: bool,
    pub mode: RelayMode,
    pub draft: String,
}

impl ChatState {
    fn greeting() -> Self {
        Self {
            messages: greeting_messages(),
            pending: false,
            mode: RelayMode::TaskTitle,
            draft: String::new(),
        }
    }

    pub fn awaiting_task_title(&self) -> bool {
        self.mode == RelayMode::TaskTitle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input or a turn already in flight; nothing was appended.
    Ignored,
    Replied,
    Failed(AppError),
}

enum Turn {
    TaskCreated,
    Answered,
}

#[derive(Clone)]
pub struct ChatRelay {
    tasks: TaskList,
    endpoint: Arc<dyn ChatEndpoint>,
    state: Arc<Mutex<ChatState>>,
    follow_up_delay: Duration,
}

impl ChatRelay {
    pub fn new(tasks: TaskList, endpoint: Arc<dyn ChatEndpoint>) -> Self {
        Self {
            tasks,
            endpoint,
            state: Arc::new(Mutex::new(ChatState::greeting())),
            follow_up_delay: DEFAULT_FOLLOW_UP_DELAY,
        }
    }

    pub fn with_follow_up_delay(mut self, delay: Duration) -> Self {
        self.follow_up_delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn submit(&self, text: &str) -> Submission {
        let mode = {
            let mut state = self.state();
            if text.trim().is_empty() || state.pending {
                return Submission::Ignored;
            }
            state.messages.push(message(Role::User, text));
            state.pending = true;
            state.mode
        };

        let outcome = {
            let _pending = PendingGuard { state: &self.state };
            let outcome = match mode {
                RelayMode::TaskTitle => self.relay_task_title(text).await,
                RelayMode::Conversation => self.relay_conversation(text).await,
            };
            if let Err(err) = &outcome {
                tracing::warn!(code = err.code(), error = %err, "chat turn failed");
                self.push(Role::Assistant, APOLOGY);
            }
            outcome
        };

        match outcome {
            Ok(Turn::TaskCreated) => {
                if !self.follow_up_delay.is_zero() {
                    tokio::time::sleep(self.follow_up_delay).await;
                }
                self.push(Role::Assistant, FOLLOW_UP_PROMPT);
                Submission::Replied
            }
            Ok(Turn::Answered) => Submission::Replied,
            Err(err) => Submission::Failed(err),
        }
    }

    async fn relay_task_title(&self, text: &str) -> Result<Turn, AppError> {
        let created = self.tasks.add(text).await?;
        let title = created
            .map(|task| task.title)
            .unwrap_or_else(|| text.trim().to_string());
        self.push(
            Role::Assistant,
            &format!("✨ Task \"{title}\" added successfully!"),
        );
        Ok(Turn::TaskCreated)
    }

    async fn relay_conversation(&self, text: &str) -> Result<Turn, AppError> {
        let reply = self.endpoint.converse(text).await?;
        self.push(Role::Assistant, &reply);
        Ok(Turn::Answered)
    }

    fn push(&self, role: Role, content: &str) {
        self.state().messages.push(message(role, content));
    }

    pub fn set_mode(&self, mode: RelayMode) {
        tracing::debug!(?mode, "chat mode changed");
        self.state().mode = mode;
    }

    pub fn set_draft(&self, text: &str) {
        self.state().draft = text.to_string();
    }

    /// Restores the greeting; the current mode is kept.
    pub fn reset(&self) {
        self.state().messages = greeting_messages();
    }

    pub fn snapshot(&self) -> ChatState {
        self.state().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state().pending
    }
}

struct PendingGuard<'a> {
    state: &'a Mutex<ChatState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = false;
        state.draft.clear();
    }
}

fn greeting_messages() -> Vec<ChatMessage> {
    vec![
        message(Role::Assistant, GREETING),
        message(Role::Assistant, TASK_PROMPT),
    ]
}

fn message(role: Role, content: &str) -> ChatMessage {
    ChatMessage {
        role,
        content: content.to_string(),
        timestamp: now_rfc3339(),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
