//! Quiz Registry Service
//!
//! REST API for ephemeral quizzes + background sweeper that reaps expired ones

use anyhow::{Context, Result};
use harkata_common::Quiz;
use quiz_registry::{create_router, AppState, Config, QuizRegistry, Sweeper};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiz_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quiz Registry Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Quiz lifetime: {}s", config.quiz_max_age_secs);
    info!("Sweep interval: {}s", config.sweep_interval_secs);

    let default_quiz = Quiz::default_quiz().context("Failed to load default quiz")?;

    let registry = Arc::new(QuizRegistry::new(config.max_age()));
    let sweeper = Sweeper::spawn(Arc::clone(&registry), config.sweep_interval());

    // Create router
    let app = create_router(AppState::new(registry, default_quiz));

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Quiz Registry Service running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping quiz sweeper");
    sweeper.shutdown().await;

    info!("Quiz Registry Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
