use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Quiz not found: {0}")]
    QuizNotFound(String),

    #[error("Invalid quiz: {0}")]
    InvalidQuiz(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
