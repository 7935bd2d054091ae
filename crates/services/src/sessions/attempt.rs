use quiz_core::model::QuizSource;
use tracing::{debug, info};

use super::service::{QuizSession, SessionOutcome};
use super::timer::CountdownTimer;
use super::view::{QuestionView, ResultView};
use super::workflow::{QuizSessionService, SubmissionHandle};

/// Drives one session for a single front-end actor.
///
/// Owns the session, its countdown and the in-flight submission. All calls
/// take `&mut self`, so operations never interleave. Once `cancel` is called
/// the attempt is abandoned: every later operation is `Ignored`.
#[derive(Debug)]
pub struct QuizAttempt {
    service: QuizSessionService,
    session: QuizSession,
    timer: Option<CountdownTimer>,
    submission: Option<SubmissionHandle>,
    abandoned: bool,
}

impl QuizAttempt {
    /// Load the quiz and, if it became active, start the countdown.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub async fn start(service: &QuizSessionService, source: QuizSource) -> Self {
        let session = service.start_session(source).await;
        Self::from_session(service.clone(), session)
    }

    fn from_session(service: QuizSessionService, session: QuizSession) -> Self {
        let timer = session
            .current_index()
            .is_some()
            .then(|| CountdownTimer::start(service.tick_period()));
        Self {
            service,
            session,
            timer,
            submission: None,
            abandoned: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn question_view(&self) -> Option<QuestionView> {
        QuestionView::from_session(&self.session)
    }

    #[must_use]
    pub fn result_view(&self) -> Option<ResultView> {
        ResultView::from_session(&self.session)
    }

    /// Whether the countdown is still running.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn select_answer(&mut self, option: impl Into<String>) -> SessionOutcome {
        self.apply(|session| session.select_answer(option))
    }

    pub fn reveal_feedback(&mut self) -> SessionOutcome {
        self.apply(QuizSession::reveal_feedback)
    }

    pub fn advance(&mut self) -> SessionOutcome {
        self.apply(QuizSession::advance)
    }

    /// Finish early, scoring whatever has been answered.
    pub fn complete(&mut self) -> SessionOutcome {
        self.apply(QuizSession::complete)
    }

    pub fn tick(&mut self) -> SessionOutcome {
        self.apply(QuizSession::tick)
    }

    /// Wait for the countdown and apply every whole second that has passed
    /// since the last call.
    ///
    /// Returns `None` when no countdown is running, so a caller selecting on
    /// this alongside user input should stop polling it.
    pub async fn next_tick(&mut self) -> Option<SessionOutcome> {
        let timer = self.timer.as_mut()?;
        let secs = timer.next_tick().await?;
        Some(self.apply(|session| session.elapse(secs)))
    }

    /// Take the in-flight submission, e.g. to await it before exiting.
    pub fn take_submission(&mut self) -> Option<SubmissionHandle> {
        self.submission.take()
    }

    /// Start over with the same quiz. Only valid once completed; returns
    /// `false` and leaves everything untouched otherwise.
    pub async fn retake(&mut self) -> bool {
        if self.abandoned {
            return false;
        }
        let Some(mut fresh) = self.session.retake() else {
            return false;
        };
        self.stop_timer();
        self.submission = None;
        self.service.load(&mut fresh).await;
        info!(source = %fresh.source(), "retaking quiz");
        *self = Self::from_session(self.service.clone(), fresh);
        true
    }

    /// Abandon the attempt: stop the countdown, detach any submission and
    /// ignore everything that follows.
    pub fn cancel(&mut self) {
        self.abandoned = true;
        self.stop_timer();
        if self.submission.take().is_some() {
            debug!("detached in-flight submission");
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
    }

    fn apply(&mut self, op: impl FnOnce(&mut QuizSession) -> SessionOutcome) -> SessionOutcome {
        if self.abandoned {
            return SessionOutcome::Ignored;
        }
        let outcome = op(&mut self.session);
        self.settle(outcome)
    }

    fn settle(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        if self.session.is_terminal() {
            self.stop_timer();
        }
        if let SessionOutcome::Completed(submission) = &outcome {
            info!(
                source = %submission.source,
                score = submission.score,
                answered = submission.answers.len(),
                "quiz completed"
            );
            self.submission = Some(self.service.dispatch_submission(submission.clone()));
        }
        outcome
    }
}
