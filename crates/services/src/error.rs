//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuizError;
use storage::repository::StorageError;

/// Why a session ended up `Errored`.
///
/// Every variant is fatal to the session; a new session must be started to retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz not found")]
    NotFound,
    #[error("invalid quiz: {0}")]
    InvalidQuiz(#[from] QuizError),
    #[error("malformed quiz payload: {0}")]
    Malformed(String),
    #[error("quiz service unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            StorageError::InvalidQuiz(e) => Self::InvalidQuiz(e),
            StorageError::Serialization(msg) => Self::Malformed(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Errors emitted while persisting a finished attempt.
///
/// These never affect the locally computed score.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submission failed: {0}")]
    Storage(#[from] StorageError),
    #[error("submission task ended before settling")]
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_reads_as_quiz_not_found() {
        let err = SessionError::from(StorageError::NotFound);
        assert_eq!(err, SessionError::NotFound);
        assert_eq!(err.to_string(), "quiz not found");
    }

    #[test]
    fn transport_failures_are_unavailable() {
        let err = SessionError::from(StorageError::Http { status: 500 });
        assert!(matches!(err, SessionError::Unavailable(_)));
    }
}
