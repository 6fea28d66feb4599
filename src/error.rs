use crate::provider::ProviderKind;
use thiserror::Error;

/// HTTP status codes the retry policy treats as transient.
pub const RETRYABLE_STATUS: [u16; 3] = [429, 503, 504];

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Operation that produced the error (e.g. "get_work_item").
    pub operation: Option<String>,
    /// Target identifier (work item id, wiki name, ...).
    pub target: Option<String>,
    /// Source of the error (e.g. "circuit_breaker", "http_provider").
    pub source: Option<String>,
    /// Additional context (expected shape, offending value, ...).
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Unified error type for the worklink client.
///
/// Classification is carried in the variant, never in message text: the retry
/// policy branches on [`Error::is_retryable`], the fallback protocol on
/// [`Error::is_unsupported`], and the circuit breaker on
/// [`Error::counts_against_breaker`].
#[derive(Debug, Error)]
pub enum Error {
    /// Precondition failed before any network interaction.
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// The active transport does not implement this operation. Triggers the
    /// per-operation fallback protocol when a resolver is wired in.
    #[error("Operation `{operation}` is not supported by the {provider} transport")]
    Unsupported {
        operation: String,
        provider: ProviderKind,
    },

    /// Provider used before (or after a failed) `initialize`. Fatal, never
    /// retried, never falls back.
    #[error("Provider not initialized")]
    NotInitialized,

    /// Synthetic error raised by the circuit breaker without attempting the
    /// call.
    #[error("Circuit breaker is open (retry in {open_remaining_ms}ms)")]
    CircuitOpen { open_remaining_ms: u64 },

    /// Upstream failure with a retryable status code (429/503/504).
    #[error("Transient upstream error: HTTP {status}: {message}")]
    Transient { status: u16, message: String },

    /// Upstream failure with a non-retryable status code.
    #[error("Upstream error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Cooperative cancellation was observed at a suspension point.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref op) = ctx.operation {
        parts.push(format!("operation: {}", op));
    }
    if let Some(ref target) = ctx.target {
        parts.push(format!("target: {}", target));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a validation error without extra context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error with structured context.
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a runtime error without extra context.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::Runtime {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a runtime error with structured context.
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create the capability-gap signal for an operation the given transport
    /// does not implement.
    pub fn unsupported(operation: impl Into<String>, provider: ProviderKind) -> Self {
        Error::Unsupported {
            operation: operation.into(),
            provider,
        }
    }

    /// Classify an upstream HTTP status into `Transient` or `Remote`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if RETRYABLE_STATUS.contains(&status) {
            Error::Transient {
                status,
                message: message.into(),
            }
        } else {
            Error::Remote {
                status,
                message: message.into(),
            }
        }
    }

    /// Whether the retry policy may re-attempt after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { status, .. } if RETRYABLE_STATUS.contains(status))
    }

    /// Whether this error is the capability-gap signal that triggers the
    /// per-operation fallback protocol.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    /// Whether the circuit breaker should count this error as a provider
    /// failure. Deterministic signals (preconditions, capability gaps,
    /// cancellation, uninitialized providers) are not health evidence.
    pub fn counts_against_breaker(&self) -> bool {
        !matches!(
            self,
            Error::Validation { .. }
                | Error::Unsupported { .. }
                | Error::CircuitOpen { .. }
                | Error::Cancelled
                | Error::NotInitialized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_splits_transient_from_remote() {
        for status in RETRYABLE_STATUS {
            assert!(Error::from_status(status, "busy").is_retryable());
        }
        assert!(!Error::from_status(404, "missing").is_retryable());
        assert!(!Error::from_status(500, "boom").is_retryable());
        assert!(matches!(
            Error::from_status(500, "boom"),
            Error::Remote { status: 500, .. }
        ));
    }

    #[test]
    fn deterministic_signals_do_not_count_against_breaker() {
        assert!(!Error::validation("bad payload").counts_against_breaker());
        assert!(!Error::unsupported("list_wikis", ProviderKind::Sdk).counts_against_breaker());
        assert!(!Error::Cancelled.counts_against_breaker());
        assert!(!Error::NotInitialized.counts_against_breaker());
        assert!(Error::from_status(503, "busy").counts_against_breaker());
        assert!(Error::from_status(404, "missing").counts_against_breaker());
    }

    #[test]
    fn context_renders_in_display() {
        let err = Error::validation_with_context(
            "title required",
            ErrorContext::new()
                .with_operation("create_work_item")
                .with_target("Bug"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("operation: create_work_item"));
        assert!(rendered.contains("target: Bug"));
    }
}
