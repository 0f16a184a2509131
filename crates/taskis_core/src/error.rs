#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
    #[error("transport_error - {0}")]
    Transport(String),
    #[error("status_error - server responded with {status}: {body}")]
    Status { status: u16, body: String },
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport(message.into())
    }

    pub fn status<B: Into<String>>(status: u16, body: B) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Transport(_) => "transport_error",
            Self::Status { .. } => "status_error",
        }
    }

    /// Human-readable text without the code prefix.
    ///
    /// This is what the task list stores in its shared error slot, so
    /// transport failures and bad statuses read the same way there.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::Io(message)
            | Self::Transport(message) => message.clone(),
            Self::Status { status, body } if body.trim().is_empty() => {
                format!("server responded with status {status}")
            }
            Self::Status { status, body } => {
                format!("server responded with status {status}: {}", body.trim())
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidData(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}
