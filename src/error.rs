//! Error types for walkthrough operations.

use thiserror::Error;

/// Errors raised inside the walkthrough core.
///
/// None of these are fatal: the engine logs them and degrades to a no-op, so
/// a broken tutorial stalls instead of taking the host down.
#[derive(Error, Debug)]
pub enum WalkthroughError {
    /// A gate's selector resolved to nothing. No listener is attached and
    /// the sequence stalls at that step.
    #[error("target not found: {selector}")]
    TargetNotFound {
        /// The selector that failed to resolve
        selector: String,
    },

    /// The definitions source was unreachable or malformed.
    #[error("failed to load definitions from {origin}: {reason}")]
    DefinitionLoad {
        /// Human-readable description of where the definitions came from
        origin: String,
        /// What went wrong
        reason: String,
    },

    /// An `expected` pattern did not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for walkthrough results.
pub type Result<T> = std::result::Result<T, WalkthroughError>;
