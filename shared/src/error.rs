use thiserror::Error;

#[derive(Debug, Error)]
pub enum BakeryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    /// Deliberately carries no detail about which credential was wrong.
    #[error("Invalid credentials")]
    AuthFailure,
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type BakeryResult<T> = Result<T, BakeryError>;

impl BakeryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition(message.into())
    }

    /// True for failures caused by the caller's request rather than the backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Storage(_))
    }
}
