use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// The options a user picked during one attempt, keyed by question.
///
/// A question missing from the set is unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(HashMap<QuestionId, String>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the answer for `question`.
    ///
    /// Returns `true` when the stored answer changed.
    pub fn record(&mut self, question: QuestionId, answer: impl Into<String>) -> bool {
        let answer = answer.into();
        match self.0.entry(question) {
            Entry::Occupied(mut slot) => {
                if *slot.get() == answer {
                    return false;
                }
                slot.insert(answer);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(answer);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<&str> {
        self.0.get(&question).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, question: QuestionId) -> bool {
        self.0.contains_key(&question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.0.iter().map(|(id, answer)| (*id, answer.as_str()))
    }
}

impl FromIterator<(QuestionId, String)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (QuestionId, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
