//! Seed an `InMemoryRepository` from a JSON fixture file.
//!
//! ```json
//! { "quizzes": [ { "subject": 1, "level": 1, "title": "...", "questions": [...] },
//!                { "quiz_id": 7, "title": "...", "questions": [...] } ] }
//! ```
//!
//! Quiz bodies use the same shape the backend serves.

use std::path::Path;

use quiz_core::model::{LevelId, QuizId, QuizSource, SubjectId};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::http::QuizPayload;
use crate::repository::{InMemoryRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FixtureError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("fixture #{index}: needs either subject+level or quiz_id")]
    MissingSource { index: usize },
    #[error("fixture #{index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    quizzes: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    #[serde(default)]
    subject: Option<u64>,
    #[serde(default)]
    level: Option<u64>,
    #[serde(default)]
    quiz_id: Option<u64>,
    #[serde(flatten)]
    quiz: QuizPayload,
}

impl FixtureEntry {
    fn source(&self) -> Option<QuizSource> {
        match (self.subject, self.level, self.quiz_id) {
            (_, _, Some(id)) => Some(QuizSource::standalone(QuizId::new(id))),
            (Some(subject), Some(level), None) => Some(QuizSource::level(
                SubjectId::new(subject),
                LevelId::new(level),
            )),
            _ => None,
        }
    }
}

impl InMemoryRepository {
    /// Build a repository from fixture JSON.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError` if the JSON does not parse or any quiz is invalid.
    pub fn from_fixture_json(json: &str) -> Result<Self, FixtureError> {
        let file: FixtureFile = serde_json::from_str(json)?;
        let repo = Self::new();
        for (index, entry) in file.quizzes.into_iter().enumerate() {
            let source = entry.source().ok_or(FixtureError::MissingSource { index })?;
            let quiz = entry
                .quiz
                .into_quiz(source)
                .map_err(|source| FixtureError::Invalid { index, source })?;
            debug!(%source, title = quiz.title(), "loaded fixture quiz");
            repo.insert_quiz(quiz)
                .map_err(|source| FixtureError::Invalid { index, source })?;
        }
        Ok(repo)
    }

    /// Read and load a fixture file from disk.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError` on I/O, parse, or validation failure.
    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_fixture_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::QuizRepository;

    const FIXTURE: &str = r#"{
        "quizzes": [
            {
                "subject": 2, "level": 1,
                "title": "Machine Learning Fundamentals",
                "description": "Basic ML concepts",
                "questions": [
                    {"id": 1, "question": "What is the main goal of supervised learning?",
                     "options": ["Find hidden patterns", "Learn from labeled data"],
                     "correct": "Learn from labeled data",
                     "explanation": "Supervised learning uses labeled data."}
                ]
            },
            {
                "quiz_id": 7, "timeLimit": 120,
                "title": "Standalone",
                "questions": [{"id": 1, "question": "Q", "options": ["a"], "correct": "a"}]
            }
        ]
    }"#;

    #[tokio::test]
    async fn loads_both_kinds_of_source() {
        let repo = InMemoryRepository::from_fixture_json(FIXTURE).unwrap();

        let ml = repo
            .fetch_by_level(SubjectId::new(2), LevelId::new(1))
            .await
            .unwrap();
        assert_eq!(ml.title(), "Machine Learning Fundamentals");

        let standalone = repo.fetch_by_id(QuizId::new(7)).await.unwrap();
        assert_eq!(standalone.time_limit_secs(), 120);
    }

    #[tokio::test]
    async fn shipped_sample_fixtures_load() {
        let json = include_str!("../../../fixtures/sample_quizzes.json");
        let repo = InMemoryRepository::from_fixture_json(json).unwrap();

        let python = repo
            .fetch_by_level(SubjectId::new(1), LevelId::new(1))
            .await
            .unwrap();
        assert_eq!(python.len(), 5);
        assert_eq!(python.time_limit_secs(), 300);
        assert!(repo.fetch_by_id(QuizId::new(8)).await.is_ok());
    }

    #[test]
    fn entry_without_source_is_rejected() {
        let json = r#"{"quizzes": [{"subject": 1, "title": "T",
            "questions": [{"id": 1, "question": "Q", "options": ["a"], "correct": "a"}]}]}"#;
        let err = InMemoryRepository::from_fixture_json(json).err().unwrap();
        assert!(matches!(err, FixtureError::MissingSource { index: 0 }));
    }

    #[test]
    fn invalid_quiz_names_its_index() {
        let json = r#"{"quizzes": [{"quiz_id": 1, "title": "T",
            "questions": [{"id": 1, "question": "Q", "options": ["a"], "correct": "b"}]}]}"#;
        let err = InMemoryRepository::from_fixture_json(json).err().unwrap();
        assert!(matches!(err, FixtureError::Invalid { index: 0, .. }));
    }
}
