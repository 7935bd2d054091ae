use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::{AnswerSet, LevelId, Quiz, QuizId, QuizSource, SubjectId};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::repository::{
    AuthToken, QuizRepository, Storage, StorageError, SubmissionAck, SubmissionService,
};

mod config;
mod mapping;

pub use config::{BackendConfig, DEFAULT_API_URL};
pub use mapping::{QuestionPayload, QuizPayload, ResourcePayload};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpInitError {
    #[error("invalid backend url: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// REST adapter for both quiz collaborators.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the URL is not http(s) or the client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, HttpInitError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpInitError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn quiz_path(&self, source: &QuizSource) -> String {
        match source {
            QuizSource::Level { subject, level } => {
                format!("{}/quiz/{subject}/{level}", self.base_url)
            }
            QuizSource::Standalone { quiz } => format!("{}/quizzes/{quiz}", self.base_url),
        }
    }

    async fn get_quiz(&self, source: QuizSource) -> Result<Quiz, StorageError> {
        let url = self.quiz_path(&source);
        debug!(%url, "fetching quiz");
        let response = self.client.get(&url).send().await.map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound),
            status if !status.is_success() => {
                return Err(StorageError::Http {
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let payload: QuizPayload = response
            .json()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        payload.into_quiz(source)
    }
}

fn transport(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for HttpBackend {
    #[instrument(skip(self), fields(subject = %subject, level = %level))]
    async fn fetch_by_level(
        &self,
        subject: SubjectId,
        level: LevelId,
    ) -> Result<Quiz, StorageError> {
        self.get_quiz(QuizSource::level(subject, level)).await
    }

    #[instrument(skip(self), fields(quiz = %id))]
    async fn fetch_by_id(&self, id: QuizId) -> Result<Quiz, StorageError> {
        self.get_quiz(QuizSource::standalone(id)).await
    }
}

#[async_trait]
impl SubmissionService for HttpBackend {
    #[instrument(skip(self, answers, token), fields(source = %source, answered = answers.len()))]
    async fn submit(
        &self,
        source: &QuizSource,
        answers: &AnswerSet,
        token: Option<&AuthToken>,
    ) -> Result<SubmissionAck, StorageError> {
        let url = format!("{}/submit", self.quiz_path(source));
        let mut request = self.client.post(&url).json(&mapping::answers_body(answers));
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            return Err(StorageError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json::<SubmissionAck>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

impl Storage {
    /// Build a `Storage` backed by the REST backend.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the client cannot be configured.
    pub fn http(config: &BackendConfig) -> Result<Self, HttpInitError> {
        let backend = HttpBackend::new(config)?;
        let quizzes: Arc<dyn QuizRepository> = Arc::new(backend.clone());
        let submissions: Arc<dyn SubmissionService> = Arc::new(backend);
        Ok(Self {
            quizzes,
            submissions,
        })
    }
}
