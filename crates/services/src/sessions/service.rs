use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::Clock;
use quiz_core::model::{AnswerSet, Question, Quiz, QuizResult, QuizSource};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// When per-question feedback is disclosed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FeedbackMode {
    /// Answer, reveal the verdict, then advance.
    #[default]
    Checked,
    /// Answer and advance; all feedback waits for the review screen.
    Immediate,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Active { index: usize, remaining_secs: u32 },
    Completed(QuizResult),
    Errored(SessionError),
}

/// State discriminant without payload, for UI switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStateTag {
    Loading,
    Active,
    Completed,
    Errored,
}

impl SessionState {
    #[must_use]
    pub fn tag(&self) -> SessionStateTag {
        match self {
            Self::Loading => SessionStateTag::Loading,
            Self::Active { .. } => SessionStateTag::Active,
            Self::Completed(_) => SessionStateTag::Completed,
            Self::Errored(_) => SessionStateTag::Errored,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Errored(_))
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Answers frozen at completion, to be persisted by the submission service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub source: QuizSource,
    pub answers: AnswerSet,
    /// Locally computed score; shown regardless of how submission ends.
    pub score: u8,
}

/// Why an operation was refused while the session was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The current question has no recorded answer.
    NoAnswer,
    /// Checked mode: feedback must be revealed before advancing.
    FeedbackPending,
    /// Checked mode: the answer is locked once feedback is visible.
    FeedbackShown,
    /// The operation does not exist in the session's feedback mode.
    WrongMode,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoAnswer => "select an answer first",
            Self::FeedbackPending => "check the answer before moving on",
            Self::FeedbackShown => "the answer is locked once checked",
            Self::WrongMode => "not available in this feedback mode",
        };
        f.write_str(msg)
    }
}

/// Result of a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SessionOutcome {
    /// State changed.
    Applied,
    /// Valid call that left state as it was.
    Unchanged,
    /// Precondition not met; state unchanged.
    Refused(Refusal),
    /// The session just completed; the submission should be dispatched.
    Completed(Submission),
    /// Call arrived in a state where it does not apply (including terminal states).
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz attempt, from loading through scored completion.
///
/// The session is a plain state machine: it owns no timer and performs no
/// I/O. Once `Completed` or `Errored` it never changes again.
pub struct QuizSession {
    source: QuizSource,
    mode: FeedbackMode,
    clock: Clock,
    quiz: Option<Quiz>,
    answers: AnswerSet,
    feedback_visible: bool,
    started_at: Option<DateTime<Utc>>,
    state: SessionState,
}

impl QuizSession {
    /// Create a session in `Loading` for `source`.
    #[must_use]
    pub fn new(source: QuizSource, mode: FeedbackMode, clock: Clock) -> Self {
        Self {
            source,
            mode,
            clock,
            quiz: None,
            answers: AnswerSet::new(),
            feedback_visible: false,
            started_at: None,
            state: SessionState::Loading,
        }
    }

    #[must_use]
    pub fn source(&self) -> QuizSource {
        self.source
    }

    #[must_use]
    pub fn mode(&self) -> FeedbackMode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn tag(&self) -> SessionStateTag {
        self.state.tag()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        match &self.state {
            SessionState::Completed(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        match &self.state {
            SessionState::Errored(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::Active { index, .. } => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        match self.state {
            SessionState::Active { remaining_secs, .. } => Some(remaining_secs),
            _ => None,
        }
    }

    /// Question on screen; `None` outside `Active`.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let index = self.current_index()?;
        self.quiz.as_ref()?.question(index)
    }

    /// Answer recorded for the current question.
    #[must_use]
    pub fn current_answer(&self) -> Option<&str> {
        let question = self.current_question()?;
        self.answers.get(question.id())
    }

    /// Checked mode only: whether the verdict for the current question is shown.
    #[must_use]
    pub fn feedback_visible(&self) -> bool {
        self.mode == FeedbackMode::Checked && self.feedback_visible
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.quiz.as_ref().map_or(0, Quiz::len);
        let position = match self.state {
            SessionState::Active { index, .. } => index,
            SessionState::Completed(_) => total,
            _ => 0,
        };
        SessionProgress {
            total,
            position,
            answered: self.answers.len(),
            is_complete: matches!(self.state, SessionState::Completed(_)),
        }
    }

    /// `Loading → Active` with the fetched quiz.
    pub fn begin(&mut self, quiz: Quiz) -> SessionOutcome {
        if !matches!(self.state, SessionState::Loading) {
            return SessionOutcome::Ignored;
        }
        self.started_at = Some(self.clock.now());
        self.state = SessionState::Active {
            index: 0,
            remaining_secs: quiz.time_limit_secs(),
        };
        self.quiz = Some(quiz);
        SessionOutcome::Applied
    }

    /// `Loading | Active → Errored`.
    pub fn fail(&mut self, err: SessionError) -> SessionOutcome {
        if self.is_terminal() {
            return SessionOutcome::Ignored;
        }
        self.state = SessionState::Errored(err);
        SessionOutcome::Applied
    }

    /// Record `option` for the current question. Any string is accepted; only
    /// exact matches of the correct option score.
    pub fn select_answer(&mut self, option: impl Into<String>) -> SessionOutcome {
        let Some(question_id) = self.current_question().map(Question::id) else {
            return SessionOutcome::Ignored;
        };
        if self.feedback_visible() {
            return SessionOutcome::Refused(Refusal::FeedbackShown);
        }
        if self.answers.record(question_id, option) {
            SessionOutcome::Applied
        } else {
            SessionOutcome::Unchanged
        }
    }

    /// Checked mode: show the verdict for the current answer.
    pub fn reveal_feedback(&mut self) -> SessionOutcome {
        if self.current_question().is_none() {
            return SessionOutcome::Ignored;
        }
        if self.mode != FeedbackMode::Checked {
            return SessionOutcome::Refused(Refusal::WrongMode);
        }
        if self.current_answer().is_none() {
            return SessionOutcome::Refused(Refusal::NoAnswer);
        }
        if self.feedback_visible {
            return SessionOutcome::Unchanged;
        }
        self.feedback_visible = true;
        SessionOutcome::Applied
    }

    /// Move to the next question, or complete after the last one.
    pub fn advance(&mut self) -> SessionOutcome {
        let SessionState::Active {
            index,
            remaining_secs,
        } = self.state
        else {
            return SessionOutcome::Ignored;
        };
        if self.current_answer().is_none() {
            return SessionOutcome::Refused(Refusal::NoAnswer);
        }
        if self.mode == FeedbackMode::Checked && !self.feedback_visible {
            return SessionOutcome::Refused(Refusal::FeedbackPending);
        }

        let last = self.quiz.as_ref().map_or(0, Quiz::len).saturating_sub(1);
        if index >= last {
            return self.complete();
        }

        self.state = SessionState::Active {
            index: index + 1,
            remaining_secs,
        };
        self.feedback_visible = false;
        SessionOutcome::Applied
    }

    /// One second of the countdown.
    pub fn tick(&mut self) -> SessionOutcome {
        self.elapse(1)
    }

    /// `secs` seconds of the countdown at once, as measured by the caller's
    /// clock. Expiry forces completion; in checked mode the pending verdict
    /// is revealed first.
    pub fn elapse(&mut self, secs: u32) -> SessionOutcome {
        let SessionState::Active {
            index,
            remaining_secs,
        } = self.state
        else {
            return SessionOutcome::Ignored;
        };
        if secs == 0 {
            return SessionOutcome::Unchanged;
        }

        let remaining_secs = remaining_secs.saturating_sub(secs);
        self.state = SessionState::Active {
            index,
            remaining_secs,
        };
        if remaining_secs > 0 {
            return SessionOutcome::Applied;
        }

        if self.mode == FeedbackMode::Checked && self.current_answer().is_some() {
            self.feedback_visible = true;
        }
        self.complete()
    }

    /// Score the attempt and move to `Completed`.
    pub fn complete(&mut self) -> SessionOutcome {
        if !matches!(self.state, SessionState::Active { .. }) {
            return SessionOutcome::Ignored;
        }
        let Some(quiz) = self.quiz.as_ref() else {
            return SessionOutcome::Ignored;
        };

        let started_at = self.started_at.unwrap_or_else(|| self.clock.now());
        let completed_at = self.clock.now().max(started_at);
        match QuizResult::score(quiz, &self.answers, started_at, completed_at) {
            Ok(result) => {
                let submission = Submission {
                    source: self.source,
                    answers: self.answers.clone(),
                    score: result.score_percent(),
                };
                self.state = SessionState::Completed(result);
                SessionOutcome::Completed(submission)
            }
            Err(err) => {
                self.state = SessionState::Errored(SessionError::Malformed(err.to_string()));
                SessionOutcome::Applied
            }
        }
    }

    /// A fresh `Loading` session for the same quiz; only offered once completed.
    #[must_use]
    pub fn retake(&self) -> Option<Self> {
        matches!(self.state, SessionState::Completed(_))
            .then(|| Self::new(self.source, self.mode, self.clock))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("state", &self.state.tag())
            .field("current", &self.current_index())
            .field("remaining_secs", &self.remaining_secs())
            .field("answered", &self.answers.len())
            .field("feedback_visible", &self.feedback_visible)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{LevelId, QuestionId, SubjectId};
    use quiz_core::time::fixed_clock;

    fn build_quiz(n: u64, time_limit: u32) -> Quiz {
        let questions = (1..=n)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Question {id}"),
                    vec!["right".into(), "wrong".into(), "other".into()],
                    "right",
                    "explained",
                    Vec::new(),
                )
                .unwrap()
            })
            .collect();
        Quiz::new(source(), "Quiz", "", questions, time_limit).unwrap()
    }

    fn source() -> QuizSource {
        QuizSource::level(SubjectId::new(1), LevelId::new(1))
    }

    fn active(mode: FeedbackMode, n: u64) -> QuizSession {
        let mut session = QuizSession::new(source(), mode, fixed_clock());
        assert_eq!(session.begin(build_quiz(n, 300)), SessionOutcome::Applied);
        session
    }

    fn answer_and_advance(session: &mut QuizSession, option: &str) -> SessionOutcome {
        let _ = session.select_answer(option);
        if session.mode() == FeedbackMode::Checked {
            let _ = session.reveal_feedback();
        }
        session.advance()
    }

    #[test]
    fn begin_enters_first_question_with_quiz_time_limit() {
        let mut session = QuizSession::new(source(), FeedbackMode::Checked, fixed_clock());
        assert_eq!(session.tag(), SessionStateTag::Loading);
        let _ = session.begin(build_quiz(2, 120));
        assert_eq!(
            session.state(),
            &SessionState::Active {
                index: 0,
                remaining_secs: 120
            }
        );
    }

    #[test]
    fn advance_without_answer_is_refused_in_both_modes() {
        for mode in [FeedbackMode::Checked, FeedbackMode::Immediate] {
            let mut session = active(mode, 3);
            let before = session.state().clone();
            assert_eq!(session.advance(), SessionOutcome::Refused(Refusal::NoAnswer));
            assert_eq!(session.state(), &before);
        }
    }

    #[test]
    fn checked_mode_requires_reveal_before_advance() {
        let mut session = active(FeedbackMode::Checked, 2);
        let _ = session.select_answer("wrong");
        assert_eq!(
            session.advance(),
            SessionOutcome::Refused(Refusal::FeedbackPending)
        );
        assert_eq!(session.reveal_feedback(), SessionOutcome::Applied);
        assert!(session.feedback_visible());
        assert_eq!(session.advance(), SessionOutcome::Applied);
        assert_eq!(session.current_index(), Some(1));
        assert!(!session.feedback_visible());
    }

    #[test]
    fn answer_is_locked_once_feedback_is_shown() {
        let mut session = active(FeedbackMode::Checked, 2);
        let _ = session.select_answer("wrong");
        let _ = session.reveal_feedback();
        assert_eq!(
            session.select_answer("right"),
            SessionOutcome::Refused(Refusal::FeedbackShown)
        );
        assert_eq!(session.current_answer(), Some("wrong"));
    }

    #[test]
    fn immediate_mode_has_no_reveal_step() {
        let mut session = active(FeedbackMode::Immediate, 2);
        let _ = session.select_answer("right");
        assert_eq!(
            session.reveal_feedback(),
            SessionOutcome::Refused(Refusal::WrongMode)
        );
        assert_eq!(session.advance(), SessionOutcome::Applied);
    }

    #[test]
    fn reselecting_same_option_is_unchanged() {
        let mut session = active(FeedbackMode::Immediate, 1);
        assert_eq!(session.select_answer("wrong"), SessionOutcome::Applied);
        assert_eq!(session.select_answer("wrong"), SessionOutcome::Unchanged);
        assert_eq!(session.select_answer("right"), SessionOutcome::Applied);
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn completing_with_all_correct_scores_100() {
        for mode in [FeedbackMode::Checked, FeedbackMode::Immediate] {
            let mut session = active(mode, 4);
            let mut last = SessionOutcome::Ignored;
            while !session.is_terminal() {
                last = answer_and_advance(&mut session, "right");
            }
            let SessionOutcome::Completed(submission) = last else {
                panic!("expected completion, got {last:?}");
            };
            assert_eq!(submission.score, 100);
            assert_eq!(submission.answers.len(), 4);
            let result = session.result().unwrap();
            assert_eq!(result.score_percent(), 100);
            assert_eq!(result.correct(), 4);
        }
    }

    #[test]
    fn expiry_with_no_answers_completes_with_zero() {
        let mut session = QuizSession::new(source(), FeedbackMode::Immediate, fixed_clock());
        let _ = session.begin(build_quiz(3, 3));
        assert_eq!(session.tick(), SessionOutcome::Applied);
        assert_eq!(session.tick(), SessionOutcome::Applied);
        assert!(matches!(session.tick(), SessionOutcome::Completed(_)));

        let result = session.result().unwrap();
        assert_eq!(result.score_percent(), 0);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn expiry_in_checked_mode_reveals_then_completes() {
        let mut session = QuizSession::new(source(), FeedbackMode::Checked, fixed_clock());
        let _ = session.begin(build_quiz(2, 1));
        let _ = session.select_answer("right");
        assert!(matches!(session.tick(), SessionOutcome::Completed(_)));
        assert_eq!(session.result().unwrap().correct(), 1);
    }

    #[test]
    fn three_of_five_scores_sixty_on_expiry() {
        let mut session = QuizSession::new(source(), FeedbackMode::Checked, fixed_clock());
        let _ = session.begin(build_quiz(5, 30));
        for _ in 0..3 {
            assert_eq!(answer_and_advance(&mut session, "right"), SessionOutcome::Applied);
        }
        assert_eq!(answer_and_advance(&mut session, "wrong"), SessionOutcome::Applied);
        assert_eq!(session.current_index(), Some(4));

        let mut outcome = SessionOutcome::Ignored;
        while !session.is_terminal() {
            outcome = session.tick();
        }
        assert!(matches!(outcome, SessionOutcome::Completed(ref s) if s.score == 60));
        let result = session.result().unwrap();
        assert_eq!(result.score_percent(), 60);
        assert_eq!(result.correct(), 3);
    }

    #[test]
    fn terminal_states_are_immutable() {
        let mut completed = active(FeedbackMode::Immediate, 1);
        let _ = answer_and_advance(&mut completed, "right");
        let mut errored = QuizSession::new(source(), FeedbackMode::Checked, fixed_clock());
        let _ = errored.fail(SessionError::NotFound);

        for session in [&mut completed, &mut errored] {
            let before = session.state().clone();
            let answers_before = session.answers().clone();
            assert_eq!(session.select_answer("right"), SessionOutcome::Ignored);
            assert_eq!(session.reveal_feedback(), SessionOutcome::Ignored);
            assert_eq!(session.advance(), SessionOutcome::Ignored);
            assert_eq!(session.tick(), SessionOutcome::Ignored);
            assert_eq!(session.elapse(30), SessionOutcome::Ignored);
            assert_eq!(session.complete(), SessionOutcome::Ignored);
            assert_eq!(session.fail(SessionError::NotFound), SessionOutcome::Ignored);
            assert_eq!(session.begin(build_quiz(1, 10)), SessionOutcome::Ignored);
            assert_eq!(session.state(), &before);
            assert_eq!(session.answers(), &answers_before);
        }
    }

    #[test]
    fn active_session_can_fail_and_then_stays_put() {
        let mut session = active(FeedbackMode::Immediate, 2);
        let _ = session.select_answer("right");
        assert_eq!(
            session.fail(SessionError::Unavailable("connection reset".into())),
            SessionOutcome::Applied
        );
        assert_eq!(session.tag(), SessionStateTag::Errored);
        assert!(session.current_question().is_none());
        assert!(session.result().is_none());

        assert_eq!(session.tick(), SessionOutcome::Ignored);
        assert_eq!(session.advance(), SessionOutcome::Ignored);
        assert_eq!(session.complete(), SessionOutcome::Ignored);
        assert_eq!(session.tag(), SessionStateTag::Errored);
        assert!(matches!(session.error(), Some(SessionError::Unavailable(_))));
    }

    #[test]
    fn elapse_covers_several_seconds_at_once() {
        let mut session = active(FeedbackMode::Immediate, 2);
        assert_eq!(session.elapse(0), SessionOutcome::Unchanged);
        assert_eq!(session.elapse(20), SessionOutcome::Applied);
        assert_eq!(session.remaining_secs(), Some(280));

        let _ = session.select_answer("right");
        assert!(matches!(session.elapse(1_000), SessionOutcome::Completed(_)));
        assert_eq!(session.result().unwrap().correct(), 1);
    }

    #[test]
    fn loading_session_ignores_play_operations() {
        let mut session = QuizSession::new(source(), FeedbackMode::Checked, fixed_clock());
        assert_eq!(session.select_answer("right"), SessionOutcome::Ignored);
        assert_eq!(session.tick(), SessionOutcome::Ignored);
        assert_eq!(session.tag(), SessionStateTag::Loading);
    }

    #[test]
    fn retake_only_after_completion() {
        let mut session = active(FeedbackMode::Immediate, 1);
        assert!(session.retake().is_none());
        let _ = answer_and_advance(&mut session, "wrong");

        let fresh = session.retake().unwrap();
        assert_eq!(fresh.tag(), SessionStateTag::Loading);
        assert_eq!(fresh.source(), session.source());
        assert!(fresh.answers().is_empty());
    }

    #[test]
    fn progress_tracks_position() {
        let mut session = active(FeedbackMode::Immediate, 3);
        let _ = answer_and_advance(&mut session, "right");
        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.position, 1);
        assert_eq!(progress.answered, 1);
        assert!(!progress.is_complete);
    }
}
