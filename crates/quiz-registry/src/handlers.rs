//! API request handlers for the quiz registry

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use harkata_common::{Error, Quiz};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::{
    models::{ActiveQuiz, QuizKeys, QuizSummary},
    registry::QuizRegistry,
};

/// Shared application state
pub struct AppState {
    pub registry: Arc<QuizRegistry>,

    /// Served when a create request has an empty body
    pub default_quiz: Quiz,
}

impl AppState {
    pub fn new(registry: Arc<QuizRegistry>, default_quiz: Quiz) -> Self {
        Self {
            registry,
            default_quiz,
        }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::QuizNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidQuiz(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Active quiz listing
#[derive(Debug, Serialize)]
pub struct QuizListResponse {
    pub active_quizzes: Vec<QuizSummary>,
}

/// Answer option as shown to participants, without the correct flag
#[derive(Debug, Serialize)]
pub struct ParticipantOption {
    pub option_id: u32,
    pub option_text: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantQuestion {
    pub question_id: u32,
    pub question_text: String,
    pub options: Vec<ParticipantOption>,
}

/// Quiz as seen through its public key
#[derive(Debug, Serialize)]
pub struct ParticipantQuizResponse {
    pub quiz_public_key: String,
    pub quiz_name: String,
    pub time_to_live: i64,
    pub questions: Vec<ParticipantQuestion>,
}

impl ParticipantQuizResponse {
    fn new(quiz: &ActiveQuiz, now: DateTime<Utc>, max_age: chrono::Duration) -> Self {
        let questions = quiz
            .content()
            .questions
            .iter()
            .map(|q| ParticipantQuestion {
                question_id: q.question_id,
                question_text: q.question_text.clone(),
                options: q
                    .options
                    .iter()
                    .map(|o| ParticipantOption {
                        option_id: o.option_id,
                        option_text: o.option_text.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            quiz_public_key: quiz.public_key().to_string(),
            quiz_name: quiz.name().to_string(),
            time_to_live: quiz.remaining_ttl(now, max_age).num_seconds(),
            questions,
        }
    }
}

/// Quiz as seen through its private key
#[derive(Debug, Serialize)]
pub struct TeacherQuizResponse {
    pub quiz_public_key: String,
    pub created_at: DateTime<Utc>,
    pub time_to_live: i64,
    pub quiz: Quiz,
}

/// Response from ending a quiz
#[derive(Debug, Serialize)]
pub struct EndQuizResponse {
    pub success: bool,
    pub message: String,
}

/// Root greeting
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "Hello": "World" }))
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "quiz-registry"
    }))
}

/// Create a quiz from the request body, or the default quiz if the body is empty
pub async fn create_quiz_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QuizKeys>, ApiError> {
    let quiz = if body.iter().all(u8::is_ascii_whitespace) {
        state.default_quiz.clone()
    } else {
        Quiz::from_slice(&body)?
    };

    info!("Creating quiz: {}", quiz.quiz_name);

    Ok(Json(state.registry.create(quiz)))
}

/// List all live quizzes
pub async fn list_quizzes_handler(State(state): State<Arc<AppState>>) -> Json<QuizListResponse> {
    let active_quizzes = state.registry.list_all(Utc::now());

    Json(QuizListResponse { active_quizzes })
}

/// Get a quiz by its public key
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(public_key): Path<String>,
) -> Result<Json<ParticipantQuizResponse>, ApiError> {
    let quiz = state
        .registry
        .get_by_public_key(&public_key)
        .ok_or_else(|| Error::QuizNotFound(public_key))?;

    Ok(Json(ParticipantQuizResponse::new(
        &quiz,
        Utc::now(),
        state.registry.max_age(),
    )))
}

/// Get a quiz by the teacher's private key
pub async fn get_teacher_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(private_key): Path<String>,
) -> Result<Json<TeacherQuizResponse>, ApiError> {
    let quiz = state
        .registry
        .get_by_private_key(&private_key)
        .ok_or_else(|| Error::QuizNotFound("no quiz for this private key".to_string()))?;

    Ok(Json(TeacherQuizResponse {
        quiz_public_key: quiz.public_key().to_string(),
        created_at: quiz.created_at(),
        time_to_live: quiz
            .remaining_ttl(Utc::now(), state.registry.max_age())
            .num_seconds(),
        quiz: quiz.content().clone(),
    }))
}

/// End a quiz using the teacher's private key
pub async fn end_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(private_key): Path<String>,
) -> Result<Json<EndQuizResponse>, ApiError> {
    if state.registry.revoke(&private_key) {
        Ok(Json(EndQuizResponse {
            success: true,
            message: "Quiz ended".to_string(),
        }))
    } else {
        Err(Error::QuizNotFound("no quiz for this private key".to_string()).into())
    }
}
