use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::answers::AnswerSet;
use crate::model::ids::QuestionId;
use crate::model::quiz::{Question, Quiz};

/// Score at or above which an attempt counts as passed.
pub const PASS_THRESHOLD: u8 = 70;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,
}

/// How a single question ended up after scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionOutcome {
    Correct,
    Incorrect,
    Unanswered,
}

impl QuestionOutcome {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Per-question line of the review list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub answer: Option<String>,
    pub outcome: QuestionOutcome,
}

/// Scored outcome of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    score: u8,
    correct: u32,
    total: u32,
    reviews: Vec<QuestionReview>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// Score `answers` against every question of `quiz`.
    ///
    /// Unanswered questions count as incorrect. The percentage is rounded
    /// half up.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn score(
        quiz: &Quiz,
        answers: &AnswerSet,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizResultError> {
        if completed_at < started_at {
            return Err(QuizResultError::InvalidTimeRange);
        }

        let reviews: Vec<QuestionReview> = quiz
            .questions()
            .iter()
            .map(|question| review_question(question, answers))
            .collect();

        let correct = reviews
            .iter()
            .filter(|review| review.outcome.is_correct())
            .fold(0_u32, |acc, _| acc.saturating_add(1));
        let total = u32::try_from(reviews.len()).unwrap_or(u32::MAX);

        Ok(Self {
            score: percentage(correct, total),
            correct,
            total,
            reviews,
            started_at,
            completed_at,
        })
    }

    /// Percentage in `0..=100`.
    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Review entries in question order.
    #[must_use]
    pub fn reviews(&self) -> &[QuestionReview] {
        &self.reviews
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.score >= PASS_THRESHOLD
    }

    /// Whole seconds between start and completion.
    #[must_use]
    pub fn time_taken_secs(&self) -> u32 {
        let secs = (self.completed_at - self.started_at).num_seconds();
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

fn review_question(question: &Question, answers: &AnswerSet) -> QuestionReview {
    let answer = answers.get(question.id());
    let outcome = match answer {
        None => QuestionOutcome::Unanswered,
        Some(answer) if question.is_correct(answer) => QuestionOutcome::Correct,
        Some(_) => QuestionOutcome::Incorrect,
    };
    QuestionReview {
        question_id: question.id(),
        answer: answer.map(str::to_owned),
        outcome,
    }
}

fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    // round(100 * c / t) with halves rounded up, in integer arithmetic
    let pct = (200 * correct + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::{LevelId, SubjectId};
    use crate::model::quiz::QuizSource;
    use crate::time::fixed_now;

    fn quiz(n: u64) -> Quiz {
        let questions = (1..=n)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["right".into(), "wrong".into()],
                    "right",
                    "because",
                    Vec::new(),
                )
                .unwrap()
            })
            .collect();
        Quiz::new(
            QuizSource::level(SubjectId::new(1), LevelId::new(1)),
            "Quiz",
            "",
            questions,
            300,
        )
        .unwrap()
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let quiz = quiz(4);
        let answers: AnswerSet = quiz
            .questions()
            .iter()
            .map(|q| (q.id(), q.correct().to_owned()))
            .collect();

        let result = QuizResult::score(&quiz, &answers, fixed_now(), fixed_now()).unwrap();
        assert_eq!(result.score_percent(), 100);
        assert_eq!(result.correct(), 4);
        assert!(result.passed());
    }

    #[test]
    fn empty_answer_set_scores_zero_and_marks_unanswered() {
        let quiz = quiz(3);
        let result = QuizResult::score(&quiz, &AnswerSet::new(), fixed_now(), fixed_now()).unwrap();
        assert_eq!(result.score_percent(), 0);
        assert_eq!(result.correct(), 0);
        assert!(
            result
                .reviews()
                .iter()
                .all(|r| r.outcome == QuestionOutcome::Unanswered && r.answer.is_none())
        );
    }

    #[test]
    fn wrong_and_missing_answers_are_distinguished() {
        let quiz = quiz(2);
        let mut answers = AnswerSet::new();
        answers.record(QuestionId::new(1), "wrong");

        let result = QuizResult::score(&quiz, &answers, fixed_now(), fixed_now()).unwrap();
        assert_eq!(result.reviews()[0].outcome, QuestionOutcome::Incorrect);
        assert_eq!(result.reviews()[0].answer.as_deref(), Some("wrong"));
        assert_eq!(result.reviews()[1].outcome, QuestionOutcome::Unanswered);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(3, 5), 60);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn scoring_is_repeatable() {
        let quiz = quiz(5);
        let mut answers = AnswerSet::new();
        answers.record(QuestionId::new(2), "right");
        answers.record(QuestionId::new(3), "wrong");

        let first = QuizResult::score(&quiz, &answers, fixed_now(), fixed_now()).unwrap();
        let second = QuizResult::score(&quiz, &answers, fixed_now(), fixed_now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn time_taken_truncates_to_whole_seconds() {
        let quiz = quiz(1);
        let done = fixed_now() + chrono::Duration::milliseconds(95_600);
        let result = QuizResult::score(&quiz, &AnswerSet::new(), fixed_now(), done).unwrap();
        assert_eq!(result.time_taken_secs(), 95);
    }

    #[test]
    fn rejects_inverted_time_range() {
        let quiz = quiz(1);
        let later = fixed_now() + chrono::Duration::seconds(5);
        let err = QuizResult::score(&quiz, &AnswerSet::new(), later, fixed_now()).unwrap_err();
        assert_eq!(err, QuizResultError::InvalidTimeRange);
    }
}
