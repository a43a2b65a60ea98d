//! Error types for Nudge.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Answer error: {0}")]
    Answer(#[from] AnswerError),

    #[error("Reminder error: {0}")]
    Reminder(#[from] ReminderError),

    #[error("Check-in error: {0}")]
    CheckIn(#[from] CheckInError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Answer store errors.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Invalid answer: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Reminder lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("Reminder {id} not found")]
    NotFound { id: Uuid },

    #[error("No answers recorded yet")]
    NoAnswers,

    #[error("Malformed generator output: {reason}")]
    MalformedResponse { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Check-in errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("Check-in {id} not found or already closed")]
    NotFound { id: Uuid },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Request authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
