use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write (PostgREST answers 409 / SQLSTATE 23505).
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }
}
