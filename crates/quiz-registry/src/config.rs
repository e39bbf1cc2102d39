//! Configuration management for the quiz registry
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Longest accepted quiz lifetime (100 years)
pub const MAX_QUIZ_MAX_AGE_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// How long a quiz stays live, in seconds
    pub quiz_max_age_secs: i64,

    /// Time between expiry sweeps, in seconds
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            quiz_max_age_secs: env::var("QUIZ_MAX_AGE_SECS")
                .unwrap_or_else(|_| "14400".to_string())
                .parse()
                .context("Invalid QUIZ_MAX_AGE_SECS")?,

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid SWEEP_INTERVAL_SECS")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.quiz_max_age_secs <= 0 {
            anyhow::bail!("QUIZ_MAX_AGE_SECS must be greater than 0");
        }

        if self.quiz_max_age_secs > MAX_QUIZ_MAX_AGE_SECS {
            anyhow::bail!(
                "QUIZ_MAX_AGE_SECS must be at most {}",
                MAX_QUIZ_MAX_AGE_SECS
            );
        }

        if self.sweep_interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Quiz lifetime, saturating for values `validate` would reject
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.quiz_max_age_secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
