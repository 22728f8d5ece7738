use thiserror::Error;

/// Errors from the shared outbound HTTP layer.
#[derive(Debug, Error)]
pub enum SynrouteError {
    #[error("Network capabilities capped: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SynrouteError>;
