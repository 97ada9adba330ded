//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unknown priority: {0} (expected high, normal or low)")]
    UnknownPriority(String),

    #[error("Invalid tool definition: {0}")]
    InvalidToolDefinition(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(DomainError::Cancelled.to_string(), "Operation cancelled");
        assert_eq!(
            DomainError::UnknownPriority("urgent".into()).to_string(),
            "Unknown priority: urgent (expected high, normal or low)"
        );
    }

    #[test]
    fn cancellation_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::UnknownPriority("x".into()).is_cancelled());
    }
}
