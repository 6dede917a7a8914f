//! Error types for Form Flow.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the user, registration, event and session stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Problems found while assembling the question catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate question id: {0}")]
    DuplicateId(String),

    #[error("Duplicate order {order} on questions {first} and {second}")]
    DuplicateOrder {
        order: u32,
        first: String,
        second: String,
    },

    #[error("Catalog must start with '{expected}', found '{found}'")]
    WrongFirstQuestion { expected: String, found: String },

    #[error("Hook references unknown question: {0}")]
    UnknownHookTarget(String),

    #[error("Catalog is empty")]
    Empty,

    #[error("Store error while loading catalog data: {0}")]
    Store(#[from] StoreError),
}

/// Flow controller failures that indicate a programming or data error
/// rather than a bad answer.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("No active form session for user {0}")]
    NoActiveSession(String),

    #[error("Question {question} not found in catalog (user {user_id})")]
    UnknownQuestion { user_id: String, question: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
