use async_trait::async_trait;
use quiz_core::model::{AnswerSet, LevelId, Quiz, QuizError, QuizId, QuizSource, SubjectId};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid quiz: {0}")]
    InvalidQuiz(#[from] QuizError),
}

impl StorageError {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Http { status } => *status >= 500 || *status == 429,
            Self::NotFound | Self::Serialization(_) | Self::InvalidQuiz(_) => false,
        }
    }
}

/// Bearer token attached to submissions when the user is signed in.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Returns `None` for blank tokens so callers fall back to anonymous submission.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Backend acknowledgement of a submission, as scored server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SubmissionAck {
    pub score: u32,
    pub correct: u32,
    pub total: u32,
}

/// Read side: where quiz content comes from.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch the quiz for a subject level.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no quiz exists for the pair.
    async fn fetch_by_level(&self, subject: SubjectId, level: LevelId)
    -> Result<Quiz, StorageError>;

    /// Fetch a standalone quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id is unknown.
    async fn fetch_by_id(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// Fetch using whichever addressing `source` carries.
    ///
    /// # Errors
    ///
    /// Propagates errors from `fetch_by_level` or `fetch_by_id`.
    async fn fetch(&self, source: &QuizSource) -> Result<Quiz, StorageError> {
        match *source {
            QuizSource::Level { subject, level } => self.fetch_by_level(subject, level).await,
            QuizSource::Standalone { quiz } => self.fetch_by_id(quiz).await,
        }
    }
}

/// Write side: persisting a finished attempt.
#[async_trait]
pub trait SubmissionService: Send + Sync {
    /// Persist the answers for a quiz. Anonymous submission is allowed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on network or server failure.
    async fn submit(
        &self,
        source: &QuizSource,
        answers: &AnswerSet,
        token: Option<&AuthToken>,
    ) -> Result<SubmissionAck, StorageError>;
}

/// Submission captured by `InMemoryRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub source: QuizSource,
    pub answers: AnswerSet,
    pub authenticated: bool,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizSource, Quiz>>>,
    submissions: Arc<Mutex<Vec<RecordedSubmission>>>,
    failing_submissions: Arc<Mutex<u32>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a quiz under its own source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_quiz(&self, quiz: Quiz) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz.source(), quiz);
        Ok(())
    }

    /// Make the next `count` submissions fail with a connection error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn fail_next_submissions(&self, count: u32) -> Result<(), StorageError> {
        let mut guard = self
            .failing_submissions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = count;
        Ok(())
    }

    /// Submissions received so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn submissions(&self) -> Result<Vec<RecordedSubmission>, StorageError> {
        let guard = self
            .submissions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    fn get(&self, source: &QuizSource) -> Result<Quiz, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(source).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn fetch_by_level(
        &self,
        subject: SubjectId,
        level: LevelId,
    ) -> Result<Quiz, StorageError> {
        self.get(&QuizSource::level(subject, level))
    }

    async fn fetch_by_id(&self, id: QuizId) -> Result<Quiz, StorageError> {
        self.get(&QuizSource::standalone(id))
    }
}

#[async_trait]
impl SubmissionService for InMemoryRepository {
    async fn submit(
        &self,
        source: &QuizSource,
        answers: &AnswerSet,
        token: Option<&AuthToken>,
    ) -> Result<SubmissionAck, StorageError> {
        {
            let mut failing = self
                .failing_submissions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if *failing > 0 {
                *failing -= 1;
                return Err(StorageError::Connection("simulated outage".into()));
            }
        }

        let quiz = self.get(source)?;
        let total = u32::try_from(quiz.len()).unwrap_or(u32::MAX);
        let correct = quiz
            .questions()
            .iter()
            .filter(|q| answers.get(q.id()).is_some_and(|a| q.is_correct(a)))
            .fold(0_u32, |acc, _| acc.saturating_add(1));

        let mut guard = self
            .submissions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(RecordedSubmission {
            source: *source,
            answers: answers.clone(),
            authenticated: token.is_some(),
        });

        Ok(SubmissionAck {
            // the backend truncates rather than rounds
            score: correct.saturating_mul(100) / total.max(1),
            correct,
            total,
        })
    }
}

/// Aggregates the quiz collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub submissions: Arc<dyn SubmissionService>,
}

impl Storage {
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionService> = Arc::new(repo);
        Self {
            quizzes,
            submissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId};

    fn build_quiz(source: QuizSource) -> Quiz {
        let questions = (1..=3)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["a".into(), "b".into()],
                    "a",
                    "",
                    Vec::new(),
                )
                .unwrap()
            })
            .collect();
        Quiz::new(source, "Quiz", "", questions, 300).unwrap()
    }

    #[tokio::test]
    async fn fetch_dispatches_on_source() {
        let repo = InMemoryRepository::new();
        let by_level = QuizSource::level(SubjectId::new(1), LevelId::new(2));
        let standalone = QuizSource::standalone(QuizId::new(7));
        repo.insert_quiz(build_quiz(by_level)).unwrap();
        repo.insert_quiz(build_quiz(standalone)).unwrap();

        assert_eq!(repo.fetch(&by_level).await.unwrap().source(), by_level);
        assert_eq!(repo.fetch(&standalone).await.unwrap().source(), standalone);
    }

    #[tokio::test]
    async fn unknown_level_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .fetch_by_level(SubjectId::new(99), LevelId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn submit_records_and_scores_like_the_backend() {
        let repo = InMemoryRepository::new();
        let source = QuizSource::level(SubjectId::new(1), LevelId::new(1));
        repo.insert_quiz(build_quiz(source)).unwrap();

        let mut answers = AnswerSet::new();
        answers.record(QuestionId::new(1), "a");
        answers.record(QuestionId::new(2), "a");

        let ack = repo.submit(&source, &answers, None).await.unwrap();
        assert_eq!(ack, SubmissionAck { score: 66, correct: 2, total: 3 });

        let recorded = repo.submissions().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].authenticated);
    }

    #[tokio::test]
    async fn simulated_failures_are_consumed() {
        let repo = InMemoryRepository::new();
        let source = QuizSource::standalone(QuizId::new(1));
        repo.insert_quiz(build_quiz(source)).unwrap();
        repo.fail_next_submissions(1).unwrap();

        let first = repo.submit(&source, &AnswerSet::new(), None).await;
        assert!(matches!(first, Err(StorageError::Connection(_))));
        assert!(repo.submit(&source, &AnswerSet::new(), None).await.is_ok());
    }

    #[test]
    fn blank_token_means_anonymous() {
        assert!(AuthToken::new("  ").is_none());
        let token = AuthToken::new("secret").unwrap();
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
    }

    #[test]
    fn transient_errors() {
        assert!(StorageError::Http { status: 503 }.is_transient());
        assert!(!StorageError::Http { status: 422 }.is_transient());
        assert!(!StorageError::NotFound.is_transient());
    }
}
