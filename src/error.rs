//! Error types for Prep Assist.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("User not found: {identity}")]
    NotFound { identity: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Outbound messaging errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message to {identity}: {reason}")]
    SendFailed { identity: String, reason: String },

    #[error("Invalid inbound payload: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Text-generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message catalog errors. These indicate a broken catalog, not bad user
/// input; they are checked once at startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown message category: {0}")]
    UnknownCategory(String),

    #[error("Unknown message key: {category}.{key}")]
    UnknownKey { category: String, key: String },

    #[error("Failed to parse message catalog: {0}")]
    Parse(String),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
