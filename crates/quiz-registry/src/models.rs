//! Data models for the quiz registry

use chrono::{DateTime, Duration, Utc};
use harkata_common::Quiz;
use serde::{Deserialize, Serialize};

/// Default lifetime of a quiz session (4 hours)
pub const DEFAULT_MAX_AGE_SECS: i64 = 14_400;

/// Default lifetime of a quiz session as a [`Duration`]
pub fn default_max_age() -> Duration {
    Duration::seconds(DEFAULT_MAX_AGE_SECS)
}

/// A quiz session held in memory by the registry.
///
/// Identity fields are fixed at creation. Records are handed out as
/// `Arc<ActiveQuiz>`; per-session state added later (rosters, answers) must
/// sit behind interior mutability so the keys and timestamp stay immutable.
#[derive(Debug)]
pub struct ActiveQuiz {
    content: Quiz,
    public_key: String,
    private_key: String,
    created_at: DateTime<Utc>,
}

impl ActiveQuiz {
    /// Only the registry mints records.
    pub(crate) fn new(
        content: Quiz,
        public_key: String,
        private_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content,
            public_key,
            private_key,
            created_at,
        }
    }

    pub fn content(&self) -> &Quiz {
        &self.content
    }

    /// Display name of the quiz
    pub fn name(&self) -> &str {
        &self.content.quiz_name
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True once the quiz is strictly older than `max_age` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.created_at > max_age
    }

    /// Time left before the quiz becomes eligible for reaping.
    ///
    /// Negative when the quiz has expired but has not been reaped yet.
    /// Saturates at [`Duration::MAX`] when the expiry instant is not
    /// representable.
    pub fn remaining_ttl(&self, now: DateTime<Utc>, max_age: Duration) -> Duration {
        match self.created_at.checked_add_signed(max_age) {
            Some(expires_at) => expires_at - now,
            None => Duration::MAX,
        }
    }
}

/// The capability pair returned when a quiz is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizKeys {
    /// Shared with participants
    #[serde(rename = "quiz_public_key")]
    pub public_key: String,

    /// Kept by the teacher who owns the quiz
    #[serde(rename = "quiz_private_key")]
    pub private_key: String,
}

/// One entry of the active quiz listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    #[serde(rename = "quiz_public_key")]
    pub public_key: String,

    pub quiz_name: String,

    /// Seconds until reaping; may be negative
    #[serde(rename = "time_to_live")]
    pub ttl_seconds: i64,
}
