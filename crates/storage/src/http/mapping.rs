use quiz_core::model::{
    AnswerSet, DEFAULT_TIME_LIMIT_SECS, Question, QuestionId, Quiz, QuizSource, Resource,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::repository::StorageError;

/// Quiz body as the backend serves it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuizPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
    #[serde(default, rename = "timeLimit", alias = "time_limit")]
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuestionPayload {
    pub id: u64,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub resources: Option<Vec<ResourcePayload>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourcePayload {
    pub title: String,
    pub url: String,
}

impl QuizPayload {
    /// Validate the payload into a domain `Quiz` addressed by `source`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuiz` if any question or the quiz itself
    /// violates the model.
    pub fn into_quiz(self, source: QuizSource) -> Result<Quiz, StorageError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionPayload::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Quiz::new(
            source,
            self.title,
            self.description,
            questions,
            self.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS),
        )?)
    }
}

impl QuestionPayload {
    // A link that does not parse is dropped; the question stays playable.
    fn into_question(self) -> Result<Question, StorageError> {
        let id = self.id;
        let resources = self
            .resources
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| match Resource::new(r.title, &r.url) {
                Ok(resource) => Some(resource),
                Err(err) => {
                    warn!(question = id, url = %r.url, error = %err, "dropping resource link");
                    None
                }
            })
            .collect();

        Ok(Question::new(
            QuestionId::new(self.id),
            self.question,
            self.options,
            self.correct,
            self.explanation,
            resources,
        )?)
    }
}

/// Submission body: `{"<question id>": "<answer>"}`, keys in id order.
pub(crate) fn answers_body(answers: &AnswerSet) -> BTreeMap<u64, &str> {
    answers.iter().map(|(id, answer)| (id.value(), answer)).collect()
}
