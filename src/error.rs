//! Unified error hierarchy for bjjlog
//!
//! Library code returns [`InsightError`]; collaborator implementations
//! report failures through [`SourceError`], which the engine downgrades to
//! "signal absent" instead of propagating. "Not enough data yet" is never an
//! error here, it is a normal result value.

use thiserror::Error;

/// Top-level error type for all insight operations
#[derive(Debug, Error)]
pub enum InsightError {
    /// Out-of-range slider values, malformed dates, inconsistent tallies
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A data collaborator could not be reached or failed to answer
    #[error("Upstream unavailable: {source_name}: {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Journal or config (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a journal collaborator
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Backing store is unreachable
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// Store answered with a record the engine cannot use
    #[error("{source_name} returned malformed data: {reason}")]
    Malformed { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            SourceError::Unavailable { source_name, .. }
            | SourceError::Malformed { source_name, .. } => source_name,
        }
    }
}

impl From<SourceError> for InsightError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable {
                source_name,
                reason,
            }
            | SourceError::Malformed {
                source_name,
                reason,
            } => InsightError::UpstreamUnavailable {
                source_name,
                reason,
            },
        }
    }
}

/// Result type alias for insight operations
pub type Result<T> = std::result::Result<T, InsightError>;

impl InsightError {
    /// Shorthand used by the validators
    pub fn invalid(message: impl Into<String>) -> Self {
        InsightError::InvalidInput(message.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InsightError::UpstreamUnavailable { .. } | InsightError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            InsightError::InvalidInput(_) => ErrorSeverity::Warning,
            InsightError::UpstreamUnavailable { .. } => ErrorSeverity::Warning,
            InsightError::Configuration(_) => ErrorSeverity::Error,
            InsightError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            InsightError::InvalidInput(reason) => {
                format!("That entry doesn't look right: {}", reason)
            }
            InsightError::UpstreamUnavailable { source_name, .. } => {
                format!(
                    "Couldn't load your {} right now. Showing what we have.",
                    source_name
                )
            }
            InsightError::Configuration(reason) => {
                format!("Configuration problem: {}. Check your config.toml.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
