//! Quiz content model
//!
//! The registry stores this content verbatim and never grades or validates it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_QUIZ_JSON: &str = include_str!("../data/example_quiz.json");

/// A single answer option for a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub option_id: u32,
    pub option_text: String,
    pub is_correct: bool,
}

/// A question with its ordered answer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: u32,
    pub question_text: String,
    pub options: Vec<AnswerOption>,
}

/// Quiz content as submitted by a teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_name: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Parse quiz content from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse quiz content from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidQuiz(e.to_string()))
    }

    /// The quiz served when a create request carries no content
    pub fn default_quiz() -> Result<Self> {
        Self::from_json(DEFAULT_QUIZ_JSON)
    }
}
