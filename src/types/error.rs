//! Error types for the relay and the registration tools

/// Main error type for oob-relay operations
#[derive(Debug, thiserror::Error)]
pub enum OobError {
    /// Local identity material is missing or malformed
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Credential envelope could not be parsed
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// STI-PA login did not yield an access token
    #[error("Unable to login to STI-PA, received \"{0}\"")]
    Authentication(String),

    /// STI-PA did not issue an SPC token
    #[error("Unable to request SPC token from STI-PA, received \"{0}\"")]
    TokenRequest(String),

    /// CPS rejected the registration
    #[error("Unable to register, received \"{0}\"")]
    Registration(String),

    /// Credentials could not be written after a successful registration
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OobError {
    /// Whether the error came back from the registry rather than from local state
    pub fn is_registry_rejection(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::TokenRequest(_) | Self::Registration(_)
        )
    }
}

impl From<std::io::Error> for OobError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for OobError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for OobError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<redis::RedisError> for OobError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<nkeys::error::Error> for OobError {
    fn from(err: nkeys::error::Error) -> Self {
        Self::InvalidSeed(err.to_string())
    }
}

/// Result type alias for oob-relay operations
pub type Result<T> = std::result::Result<T, OobError>;
