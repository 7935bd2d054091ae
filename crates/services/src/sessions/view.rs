use quiz_core::format_countdown;
use quiz_core::model::{Question, QuestionOutcome, Resource};

use super::service::{QuizSession, SessionStateTag};

/// Presentation-agnostic snapshot of the question on screen.
///
/// Only the countdown is pre-formatted (`M:SS`); everything else is raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// One-based position.
    pub number: usize,
    pub total: usize,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub answered: bool,
    pub is_last: bool,
    pub remaining: String,
    /// Present only when feedback is visible (checked mode).
    pub feedback: Option<FeedbackView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackView {
    pub correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    /// Remedial links; empty when the answer was correct.
    pub resources: Vec<ResourceView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceView {
    pub title: String,
    pub url: String,
}

impl From<&Resource> for ResourceView {
    fn from(resource: &Resource) -> Self {
        Self {
            title: resource.title().to_owned(),
            url: resource.url().to_string(),
        }
    }
}

/// Final score plus the per-question review list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub title: String,
    pub score: u8,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    /// `M:SS` from start to completion.
    pub time_taken: String,
    pub items: Vec<ReviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub number: usize,
    pub prompt: String,
    /// `None` renders as "No answer", distinct from a wrong answer.
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub outcome: QuestionOutcome,
    pub resources: Vec<ResourceView>,
}

fn remedial(question: &Question, correct: bool) -> Vec<ResourceView> {
    if correct {
        Vec::new()
    } else {
        question.resources().iter().map(ResourceView::from).collect()
    }
}

impl QuestionView {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Option<Self> {
        let question = session.current_question()?;
        let total = session.quiz()?.len();
        let number = session.current_index()? + 1;
        let selected = session.current_answer();

        let feedback = match selected {
            Some(answer) if session.feedback_visible() => {
                let correct = question.is_correct(answer);
                Some(FeedbackView {
                    correct,
                    correct_answer: question.correct().to_owned(),
                    explanation: question.explanation().to_owned(),
                    resources: remedial(question, correct),
                })
            }
            _ => None,
        };

        Some(Self {
            number,
            total,
            prompt: question.prompt().to_owned(),
            options: question
                .options()
                .iter()
                .map(|text| OptionView {
                    text: text.clone(),
                    selected: selected == Some(text.as_str()),
                })
                .collect(),
            answered: selected.is_some(),
            is_last: number == total,
            remaining: format_countdown(session.remaining_secs().unwrap_or(0)),
            feedback,
        })
    }
}

impl ResultView {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Option<Self> {
        if session.tag() != SessionStateTag::Completed {
            return None;
        }
        let result = session.result()?;
        let quiz = session.quiz()?;

        let items = quiz
            .questions()
            .iter()
            .zip(result.reviews())
            .enumerate()
            .map(|(i, (question, review))| ReviewItem {
                number: i + 1,
                prompt: question.prompt().to_owned(),
                your_answer: review.answer.clone(),
                correct_answer: question.correct().to_owned(),
                explanation: question.explanation().to_owned(),
                outcome: review.outcome,
                resources: remedial(question, review.outcome.is_correct()),
            })
            .collect();

        Some(Self {
            title: quiz.title().to_owned(),
            score: result.score_percent(),
            correct: result.correct(),
            total: result.total(),
            passed: result.passed(),
            time_taken: format_countdown(result.time_taken_secs()),
            items,
        })
    }
}
