use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{LevelId, QuestionId, QuizId, SubjectId};

/// Time limit applied when a quiz payload does not declare one.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 300;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("time limit must be > 0")]
    InvalidTimeLimit,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {id}: correct answer {correct:?} is not one of the options")]
    CorrectNotInOptions { id: QuestionId, correct: String },

    #[error("resource {title:?} has an invalid url")]
    InvalidResourceUrl { title: String },
}

//
// ─── SOURCE ────────────────────────────────────────────────────────────────────
//

/// How a quiz is addressed on the backend.
///
/// Submissions reuse the same addressing as the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizSource {
    Level { subject: SubjectId, level: LevelId },
    Standalone { quiz: QuizId },
}

impl QuizSource {
    #[must_use]
    pub fn level(subject: SubjectId, level: LevelId) -> Self {
        Self::Level { subject, level }
    }

    #[must_use]
    pub fn standalone(quiz: QuizId) -> Self {
        Self::Standalone { quiz }
    }
}

impl fmt::Display for QuizSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level { subject, level } => write!(f, "subject {subject} level {level}"),
            Self::Standalone { quiz } => write!(f, "quiz {quiz}"),
        }
    }
}

//
// ─── RESOURCE ──────────────────────────────────────────────────────────────────
//

/// Remedial link attached to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    title: String,
    url: Url,
}

impl Resource {
    /// # Errors
    ///
    /// Returns `QuizError::InvalidResourceUrl` if `url` does not parse.
    pub fn new(title: impl Into<String>, url: impl AsRef<str>) -> Result<Self, QuizError> {
        let title = title.into();
        let url = Url::parse(url.as_ref().trim())
            .map_err(|_| QuizError::InvalidResourceUrl { title: title.clone() })?;
        Ok(Self { title, url })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct: String,
    explanation: String,
    resources: Vec<Resource>,
}

impl Question {
    /// Build a validated question.
    ///
    /// The correct answer must appear verbatim among the options; comparison
    /// is exact, so case and whitespace matter.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoOptions` or `QuizError::CorrectNotInOptions`.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: impl Into<String>,
        explanation: impl Into<String>,
        resources: Vec<Resource>,
    ) -> Result<Self, QuizError> {
        let correct = correct.into();
        if options.is_empty() {
            return Err(QuizError::NoOptions(id));
        }
        if !options.iter().any(|option| *option == correct) {
            return Err(QuizError::CorrectNotInOptions { id, correct });
        }

        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
            correct,
            explanation: explanation.into(),
            resources,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> &str {
        &self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct == answer
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// An ordered, immutable set of questions with a global time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    source: QuizSource,
    title: String,
    description: String,
    questions: Vec<Question>,
    time_limit_secs: u32,
}

impl Quiz {
    /// Build a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if there are no questions, question ids repeat,
    /// or the time limit is zero. Blank titles and prompts are accepted as
    /// served.
    pub fn new(
        source: QuizSource,
        title: impl Into<String>,
        description: impl Into<String>,
        questions: Vec<Question>,
        time_limit_secs: u32,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if time_limit_secs == 0 {
            return Err(QuizError::InvalidTimeLimit);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            source,
            title: title.into(),
            description: description.into(),
            questions,
            time_limit_secs,
        })
    }

    #[must_use]
    pub fn source(&self) -> QuizSource {
        self.source
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Number of questions; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }
}
