use thiserror::Error;

/// Result type for scope finder operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Fatal errors that short-circuit before any scanning happens.
///
/// Structural and syntactic findings are never errors; they are reported as
/// [`crate::IssueKind`] values on an otherwise usable result.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// No source lines were provided
    #[error("Empty input: no source lines provided")]
    EmptyInput,

    /// Invalid scan or resolver configuration
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// IO error while loading source lines
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A catalog pattern failed to compile
    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),
}

impl ScopeError {
    /// Create an invalid options error
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}
