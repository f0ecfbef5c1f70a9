//! Error taxonomy for uigrab
//!
//! Capabilities return [`ExtractError`]. The variants above the divider are
//! domain-typed and pass through stage boundaries unchanged; the ones below
//! are adapter-level errors that the pipeline classifies before surfacing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for uigrab operations
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Malformed or incomplete job specification
    #[error("Validation error: {0}")]
    Validation(String),

    /// Navigation failed (bad protocol, unparsable URL, timeout)
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Locate or extract miss
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The interactive picker was dismissed without a selection
    #[error("Element selection cancelled")]
    PickerCancelled,

    /// The LLM did not answer in time
    #[error("LLM request timed out: {0}")]
    LlmTimeout(String),

    /// The LLM backend could not be reached
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    /// Any other LLM failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Writing the component failed
    #[error("Output error: {0}")]
    Output(String),

    /// Agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // ---- untyped adapter errors ----
    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for uigrab operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Stable, serialisable classification of an [`ExtractError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Navigation,
    ElementNotFound,
    Cancelled,
    Timeout,
    Unavailable,
    Llm,
    Output,
    Unclassified,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Navigation => "navigation",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Llm => "llm",
            ErrorKind::Output => "output",
            ErrorKind::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

impl ExtractError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a navigation error
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an element-not-found error
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::ElementNotFound(target.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create an output error
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether this error already belongs to the domain taxonomy
    pub fn is_typed(&self) -> bool {
        !matches!(
            self,
            Self::Browser(_)
                | Self::Json(_)
                | Self::Http(_)
                | Self::Io(_)
                | Self::WithContext { .. }
                | Self::Other(_)
        )
    }

    /// Map onto the stable taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::Navigation { .. } => ErrorKind::Navigation,
            Self::ElementNotFound(_) => ErrorKind::ElementNotFound,
            Self::PickerCancelled => ErrorKind::Cancelled,
            Self::LlmTimeout(_) => ErrorKind::Timeout,
            Self::LlmUnavailable(_) | Self::ModelNotFound(_) | Self::AgentBrowserNotFound => {
                ErrorKind::Unavailable
            }
            Self::Llm(_) => ErrorKind::Llm,
            Self::Output(_) => ErrorKind::Output,
            _ => ErrorKind::Unclassified,
        }
    }
}

/// Classify an error surfacing from the locate or transform stage.
///
/// Typed errors are returned untouched. Untyped ones are sorted by message
/// into timeout, unavailable, or generic LLM errors.
pub fn classify_llm_error(error: ExtractError) -> ExtractError {
    if error.is_typed() {
        return error;
    }

    let message = error.to_string();
    let lower = message.to_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") {
        ExtractError::LlmTimeout(message)
    } else if [
        "connection refused",
        "econnrefused",
        "unavailable",
        "cannot connect",
        "could not connect",
        "connect error",
        "503",
        "rate limit",
        "429",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        ExtractError::LlmUnavailable(message)
    } else {
        ExtractError::Llm(message)
    }
}
