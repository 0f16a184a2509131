mod chat;
mod task;

pub use chat::{ChatMessage, Role};
pub use task::{Progress, Task, TaskFilter};
