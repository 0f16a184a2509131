pub mod chat;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod remote;
pub mod task_list;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatRelay, RelayMode, Submission};
pub use error::AppError;
pub use task_list::{TaskList, TaskListState};

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{ChatMessage, Role, Task};

    #[test]
    fn task_serializes_with_wire_field_names() {
        let task = Task::new(1_700_000_000_000, "demo");
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "id": 1_700_000_000_000_i64, "title": "demo", "completed": false })
        );
    }

    #[test]
    fn task_without_completed_defaults_to_pending() {
        let task: Task = serde_json::from_str(r#"{ "id": 3, "title": "Deploy" }"#).unwrap();
        assert!(!task.completed);
    }

    #[test]
    fn chat_roles_are_lowercase() {
        let message = ChatMessage {
            role: Role::Assistant,
            content: "hi".to_string(),
            timestamp: "2025-12-20T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing title");
    }

    #[test]
    fn status_error_message_includes_body() {
        let err = AppError::status(500, "boom\n");
        assert_eq!(err.code(), "status_error");
        assert_eq!(err.message(), "server responded with status 500: boom");
        assert_eq!(
            AppError::status(404, "").message(),
            "server responded with status 404"
        );
    }
}
