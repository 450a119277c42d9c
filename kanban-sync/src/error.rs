//! Error types for the sync engine

use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to a board store or validating input
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or connection failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The store accepted a request but its answer could not be used
    #[error("unexpected store response: {message}")]
    UnexpectedResponse { message: String },

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Column not found
    #[error("column not found: {id}")]
    ColumnNotFound { id: String },

    /// Missing required field
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// Invalid field value
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// A task was asked to depend on itself
    #[error("task {id} cannot depend on itself")]
    SelfDependency { id: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// A spawned persistence task panicked or was aborted
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an error for a response that did not have the expected shape
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// True for failures where local optimistic state is kept and the store
    /// becomes authoritative again only on the next full reload.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::UnexpectedResponse { .. } | Self::Join(_)
        )
    }

    /// True for input rejected before any store call was attempted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::InvalidValue { .. } | Self::SelfDependency { .. }
        )
    }
}

impl From<figment::Error> for SyncError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
