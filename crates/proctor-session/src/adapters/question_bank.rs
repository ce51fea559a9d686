//! JSON question bank adapter
//!
//! Implements `QuestionSource` over a bank file keyed by category:
//!
//! ```json
//! {
//!   "rust": [
//!     { "id": "r1", "prompt_text": "...", "options": ["a", "b"], "answer": "b" }
//!   ]
//! }
//! ```
//!
//! The optional `answer` field is stripped before questions reach a session;
//! it only feeds the local answer-key grader.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::domain::{Question, QuestionId};
use crate::error::{SessionError, SessionResult};
use crate::ports::QuestionSource;

/// One bank entry: a question plus its optional key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankQuestion {
    #[serde(flatten)]
    pub question: Question,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Questions grouped by category
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBank {
    categories: HashMap<String, Vec<BankQuestion>>,
}

impl QuestionBank {
    pub fn from_json(json: &str) -> SessionResult<Self> {
        serde_json::from_str(json).map_err(|e| SessionError::QuestionSourceUnavailable {
            reason: format!("malformed question bank: {e}"),
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SessionError::QuestionSourceUnavailable {
                reason: format!("{}: {e}", path.display()),
            })?;
        let bank = Self::from_json(&json)?;
        debug!(path = %path.display(), categories = bank.categories.len(), "Question bank loaded");
        Ok(bank)
    }

    pub fn insert(&mut self, category: impl Into<String>, questions: Vec<BankQuestion>) {
        self.categories.insert(category.into(), questions);
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Questions for a category, without answers.
    pub fn questions(&self, category: &str) -> Vec<Question> {
        self.categories
            .get(category)
            .map(|entries| entries.iter().map(|e| e.question.clone()).collect())
            .unwrap_or_default()
    }

    /// Answer key for a category; questions without an answer are omitted.
    pub fn answer_key(&self, category: &str) -> HashMap<QuestionId, String> {
        self.categories
            .get(category)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.answer.clone().map(|a| (e.question.id.clone(), a)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuestionSource for QuestionBank {
    async fn fetch_questions(&self, category: &str) -> SessionResult<Vec<Question>> {
        Ok(self.questions(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"{
        "rust": [
            { "id": "r1", "prompt_text": "Borrow checker?", "options": ["yes", "no"], "answer": "yes" },
            { "id": "r2", "prompt_text": "Unsafe?", "options": ["a", "b"] }
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_strips_answers() {
        let bank = QuestionBank::from_json(BANK).unwrap();
        let questions = bank.fetch_questions("rust").await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id.as_str(), "r1");
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let bank = QuestionBank::from_json(BANK).unwrap();
        assert!(bank.fetch_questions("go").await.unwrap().is_empty());
    }

    #[test]
    fn test_answer_key() {
        let bank = QuestionBank::from_json(BANK).unwrap();
        let key = bank.answer_key("rust");
        assert_eq!(key.len(), 1);
        assert_eq!(key.get(&QuestionId::from("r1")).map(String::as_str), Some("yes"));
    }

    #[test]
    fn test_malformed_bank() {
        let err = QuestionBank::from_json("{ not json").unwrap_err();
        assert!(err.is_startup_error());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = QuestionBank::load("/nonexistent/bank.json").await.unwrap_err();
        assert!(matches!(err, SessionError::QuestionSourceUnavailable { .. }));
    }
}
