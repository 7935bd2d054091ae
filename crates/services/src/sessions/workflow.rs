use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::QuizSource;
use storage::http::BackendConfig;
use storage::repository::{AuthToken, QuizRepository, SubmissionAck, SubmissionService};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::service::{FeedbackMode, QuizSession, Submission};
use crate::Clock;
use crate::error::{SessionError, SubmissionError};

/// Bounded retry with linear backoff for submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            max_retries: config.submit_retries,
            delay: config.submit_retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default())
    }
}

/// How a background submission ended.
#[derive(Debug)]
pub enum SubmissionOutcome {
    Accepted { ack: SubmissionAck, attempts: u32 },
    Failed { error: SubmissionError, attempts: u32 },
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Callback the surrounding front-end supplies to react once a submission settles.
pub type SettledHook = Arc<dyn Fn(&SubmissionOutcome) + Send + Sync>;

/// Handle to an in-flight submission. Dropping it detaches the task.
#[derive(Debug)]
pub struct SubmissionHandle {
    task: JoinHandle<SubmissionOutcome>,
}

impl SubmissionHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the submission to settle.
    pub async fn settled(self) -> SubmissionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(_) => SubmissionOutcome::Failed {
                error: SubmissionError::Aborted,
                attempts: 0,
            },
        }
    }
}

/// Orchestrates session loading and fire-and-forget submission.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    mode: FeedbackMode,
    quizzes: Arc<dyn QuizRepository>,
    submissions: Arc<dyn SubmissionService>,
    auth_token: Option<AuthToken>,
    retry: RetryPolicy,
    tick_period: Duration,
    on_settled: Option<SettledHook>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        submissions: Arc<dyn SubmissionService>,
    ) -> Self {
        Self {
            clock,
            mode: FeedbackMode::default(),
            quizzes,
            submissions,
            auth_token: None,
            retry: RetryPolicy::default(),
            tick_period: Duration::from_secs(1),
            on_settled: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FeedbackMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: Option<AuthToken>) -> Self {
        self.auth_token = token;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn with_on_settled(mut self, hook: SettledHook) -> Self {
        self.on_settled = Some(hook);
        self
    }

    #[must_use]
    pub fn mode(&self) -> FeedbackMode {
        self.mode
    }

    #[must_use]
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// A new `Loading` session using this service's mode and clock.
    #[must_use]
    pub fn new_session(&self, source: QuizSource) -> QuizSession {
        QuizSession::new(source, self.mode, self.clock)
    }

    /// Fetch the quiz and move `session` out of `Loading`.
    ///
    /// Fetch failures land the session in `Errored`; nothing is returned
    /// because the session itself carries the outcome.
    pub async fn load(&self, session: &mut QuizSession) {
        let source = session.source();
        debug!(%source, "loading quiz");
        let outcome = match self.quizzes.fetch(&source).await {
            Ok(quiz) => {
                info!(%source, title = quiz.title(), questions = quiz.len(), "quiz loaded");
                session.begin(quiz)
            }
            Err(err) => {
                let err = SessionError::from(err);
                warn!(%source, error = %err, "quiz could not be loaded");
                session.fail(err)
            }
        };
        debug!(?outcome, state = ?session.tag(), "load settled");
    }

    /// Create and load a session for `source`.
    pub async fn start_session(&self, source: QuizSource) -> QuizSession {
        let mut session = self.new_session(source);
        self.load(&mut session).await;
        session
    }

    /// Persist a completed attempt in the background.
    ///
    /// The task owns copies of everything it needs and never touches the
    /// session, so the caller may drop the handle at any time.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn dispatch_submission(&self, submission: Submission) -> SubmissionHandle {
        let submissions = Arc::clone(&self.submissions);
        let token = self.auth_token.clone();
        let retry = self.retry;
        let hook = self.on_settled.clone();

        let task = tokio::spawn(async move {
            let outcome =
                submit_with_retry(submissions.as_ref(), &submission, token.as_ref(), retry).await;
            if let Some(hook) = hook {
                hook(&outcome);
            }
            outcome
        });
        SubmissionHandle { task }
    }
}

impl fmt::Debug for QuizSessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSessionService")
            .field("mode", &self.mode)
            .field("authenticated", &self.auth_token.is_some())
            .field("retry", &self.retry)
            .field("tick_period", &self.tick_period)
            .finish_non_exhaustive()
    }
}

async fn submit_with_retry(
    submissions: &dyn SubmissionService,
    submission: &Submission,
    token: Option<&AuthToken>,
    retry: RetryPolicy,
) -> SubmissionOutcome {
    let source = submission.source;
    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match submissions
            .submit(&source, &submission.answers, token)
            .await
        {
            Ok(ack) => {
                info!(
                    %source,
                    local_score = submission.score,
                    server_score = ack.score,
                    attempts,
                    "submission accepted"
                );
                return SubmissionOutcome::Accepted { ack, attempts };
            }
            Err(err) if err.is_transient() && attempts <= retry.max_retries => {
                warn!(%source, attempt = attempts, error = %err, "submission failed, retrying");
                tokio::time::sleep(retry.delay * attempts).await;
            }
            Err(err) => {
                warn!(%source, attempts, error = %err, "submission failed; keeping local score");
                return SubmissionOutcome::Failed {
                    error: SubmissionError::from(err),
                    attempts,
                };
            }
        }
    }
}
