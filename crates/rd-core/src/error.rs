use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event not found: {id}")]
    NotFound { id: String },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl EventError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Database could not be opened, or stayed locked past the busy timeout.
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },
    #[error("query failed: {message}")]
    Query { message: String },
    #[error("corrupt row: {message}")]
    Decode { message: String },
}

#[derive(Debug, Error)]
pub enum RedirectorError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RedirectorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Event(EventError::NotFound { .. }))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Event(EventError::InvalidArgument { .. }))
    }
}
