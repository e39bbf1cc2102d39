pub mod error;
pub mod quiz;

pub use error::{Error, Result};
pub use quiz::{AnswerOption, Question, Quiz};
