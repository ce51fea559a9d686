//! Questions as delivered by the question source
//!
//! The correct answer never reaches the controller; only the grading
//! collaborator knows it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{SessionError, SessionResult};

/// Question identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single multiple-choice question. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt_text: String,
    /// Options in display order
    pub options: Vec<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, prompt_text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            id: QuestionId::new(id),
            prompt_text: prompt_text.into(),
            options,
        }
    }

    /// Check whether `option` is one of this question's options.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Ordered, validated question set for one attempt
#[derive(Clone, Debug)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Validate and wrap a question list.
    ///
    /// Rejects an empty list, duplicate ids, questions without options and
    /// duplicate option text within one question.
    pub fn new(questions: Vec<Question>) -> SessionResult<Self> {
        if questions.is_empty() {
            return Err(SessionError::InvalidQuestionSet {
                reason: "question set is empty".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(&question.id) {
                return Err(SessionError::InvalidQuestionSet {
                    reason: format!("duplicate question id '{}'", question.id),
                });
            }
            if question.options.is_empty() {
                return Err(SessionError::InvalidQuestionSet {
                    reason: format!("question '{}' has no options", question.id),
                });
            }
            let distinct: HashSet<&String> = question.options.iter().collect();
            if distinct.len() != question.options.len() {
                return Err(SessionError::InvalidQuestionSet {
                    reason: format!("question '{}' repeats an option", question.id),
                });
            }
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn find(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.questions.iter().map(|q| &q.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, options: &[&str]) -> Question {
        Question::new(id, "prompt", options.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_valid_set() {
        let set = QuestionSet::new(vec![q("q1", &["a", "b"]), q("q2", &["c"])]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).unwrap().id, QuestionId::from("q2"));
        assert!(set.find(&"q1".into()).unwrap().has_option("b"));
    }

    #[test]
    fn test_empty_set_rejected() {
        let err = QuestionSet::new(vec![]).unwrap_err();
        assert!(err.is_startup_error());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = QuestionSet::new(vec![q("q1", &["a"]), q("q1", &["b"])]).unwrap_err();
        assert!(err.to_string().contains("duplicate question id"));
    }

    #[test]
    fn test_optionless_question_rejected() {
        assert!(QuestionSet::new(vec![q("q1", &[])]).is_err());
    }

    #[test]
    fn test_repeated_option_rejected() {
        assert!(QuestionSet::new(vec![q("q1", &["a", "a"])]).is_err());
    }

    #[test]
    fn test_question_json_shape() {
        let question: Question = serde_json::from_str(
            r#"{ "id": "q7", "prompt_text": "2 + 2?", "options": ["3", "4"] }"#,
        )
        .unwrap();
        assert_eq!(question.id.as_str(), "q7");
        assert!(question.has_option("4"));
    }
}
