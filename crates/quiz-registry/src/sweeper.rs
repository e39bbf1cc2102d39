//! Background sweep that reaps expired quizzes
//!
//! One sweeper runs per process. It wakes every `interval`, reaps against
//! the wall clock, and exits between sweeps once its [`CancellationToken`]
//! fires. A sweep never yields while holding the registry lock, so
//! cancellation cannot leave a quiz half removed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::registry::QuizRegistry;

/// Default time between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to the running sweep task
pub struct Sweeper {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime context.
    pub fn spawn(registry: Arc<QuizRegistry>, interval: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; consume it so the first
            // sweep happens one full interval after startup.
            ticker.tick().await;

            info!("Quiz sweeper started (every {:?})", interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Quiz sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = registry.reap_expired(Utc::now(), registry.max_age());
                        if removed > 0 {
                            debug!("Sweep removed {} expired quizzes", removed);
                        }
                    }
                }
            }
        });

        Self {
            cancel_token,
            handle: Some(handle),
        }
    }

    /// Token that stops the sweep loop when cancelled
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Stop the sweep loop and wait for it to exit
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!("Quiz sweeper panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
