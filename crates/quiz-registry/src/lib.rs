//! Quiz Registry Service
//!
//! Holds ephemeral quiz sessions in memory. Each quiz gets a public key for
//! participants and a private key for the teacher who created it; quizzes
//! expire after a fixed lifetime and are reaped by a background sweeper.
//!
//! ## Endpoints
//!
//! - `POST /quizzes` - Create a quiz (empty body uses the built-in quiz)
//! - `GET /quizzes` - List live quizzes with their remaining TTL
//! - `GET /quizzes/{public_key}` - Participant view of a quiz
//! - `GET /teacher/quizzes/{private_key}` - Owner view of a quiz
//! - `DELETE /teacher/quizzes/{private_key}` - End a quiz
//! - `GET /health` - Health check

pub mod config;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod sweeper;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use models::{ActiveQuiz, QuizKeys, QuizSummary, DEFAULT_MAX_AGE_SECS};
pub use registry::{KeySource, QuizRegistry, UuidKeySource};
pub use sweeper::Sweeper;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route(
            "/quizzes",
            post(handlers::create_quiz_handler).get(handlers::list_quizzes_handler),
        )
        .route("/quizzes/{public_key}", get(handlers::get_quiz_handler))
        .route(
            "/teacher/quizzes/{private_key}",
            get(handlers::get_teacher_quiz_handler).delete(handlers::end_quiz_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
