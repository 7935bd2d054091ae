#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{SessionError, SubmissionError};

pub use sessions::{
    FeedbackMode, QuizAttempt, QuizSession, QuizSessionService, RetryPolicy, SessionOutcome,
    SessionState, SessionStateTag, SubmissionOutcome,
};
