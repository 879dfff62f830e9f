// Error taxonomy for draft operations.
//
// Domain errors stay typed so callers can tell a retryable conflict from a
// terminal condition; infrastructure failures (store IO, network) travel as
// anyhow errors with context instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArenaError {
    /// Malformed or out-of-range input, rejected before touching state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The proposal lost a race against fresh state: turn cursor mismatch,
    /// item gone, or slot taken. Always safe to retry with fresh state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No active draft for the requested id. Terminal for the current
    /// call; the caller must re-initialize.
    #[error("not found: {0}")]
    NotFound(String),

    /// No eligible item remains in the pool for the roster. Should not
    /// occur with a correctly sized catalog, but is reported rather than
    /// fabricating a pick.
    #[error("exhausted: {0}")]
    Exhausted(String),
}

impl ArenaError {
    /// Stable machine-readable code for wire replies.
    pub fn code(&self) -> &'static str {
        match self {
            ArenaError::Validation(_) => "validation",
            ArenaError::Conflict(_) => "conflict",
            ArenaError::NotFound(_) => "not_found",
            ArenaError::Exhausted(_) => "exhausted",
        }
    }

    /// Whether retrying the same operation against fresh state can
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArenaError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ArenaError::Validation("x".into()).code(), "validation");
        assert_eq!(ArenaError::Conflict("x".into()).code(), "conflict");
        assert_eq!(ArenaError::NotFound("x".into()).code(), "not_found");
        assert_eq!(ArenaError::Exhausted("x".into()).code(), "exhausted");
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(ArenaError::Conflict("cursor moved".into()).is_retryable());
        assert!(!ArenaError::Validation("bad seat".into()).is_retryable());
        assert!(!ArenaError::NotFound("no draft".into()).is_retryable());
        assert!(!ArenaError::Exhausted("no items".into()).is_retryable());
    }

    #[test]
    fn display_includes_detail() {
        let err = ArenaError::Conflict("pick 7 already made".into());
        assert_eq!(err.to_string(), "conflict: pick 7 already made");
    }
}
