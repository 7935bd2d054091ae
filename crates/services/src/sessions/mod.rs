mod attempt;
mod progress;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SessionError, SubmissionError};
pub use attempt::QuizAttempt;
pub use progress::SessionProgress;
pub use service::{
    FeedbackMode, QuizSession, Refusal, SessionOutcome, SessionState, SessionStateTag, Submission,
};
pub use timer::CountdownTimer;
pub use view::{FeedbackView, OptionView, QuestionView, ResourceView, ResultView, ReviewItem};
pub use workflow::{
    QuizSessionService, RetryPolicy, SettledHook, SubmissionHandle, SubmissionOutcome,
};
