//! In-memory quiz registry
//!
//! Records are indexed twice: by public key (the authoritative store) and by
//! private key (pointing back at the public key). Both maps sit behind a
//! single [`RwLock`] so every insert or removal updates the pair in one
//! critical section, and readers never observe one map without the other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use harkata_common::Quiz;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{default_max_age, ActiveQuiz, QuizKeys, QuizSummary};

/// Source of fresh capability keys
pub trait KeySource: Send + Sync {
    fn next_key(&self) -> String;
}

/// Random UUID v4 keys (122 random bits each)
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeySource;

impl KeySource for UuidKeySource {
    fn next_key(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A freshly drawn key clashed with a live one. Never surfaced to callers;
/// `create` draws again.
#[derive(Debug, Error, PartialEq, Eq)]
enum KeyCollision {
    #[error("public and private key are identical")]
    SameKey,

    #[error("public key already in use")]
    PublicKey,

    #[error("private key already in use")]
    PrivateKey,
}

#[derive(Debug, Default)]
struct Indexes {
    /// public key -> record
    by_public: HashMap<String, Arc<ActiveQuiz>>,

    /// private key -> public key
    by_private: HashMap<String, String>,
}

impl Indexes {
    fn check_collision(&self, public_key: &str, private_key: &str) -> Result<(), KeyCollision> {
        if public_key == private_key {
            return Err(KeyCollision::SameKey);
        }
        if self.by_public.contains_key(public_key) || self.by_private.contains_key(public_key) {
            return Err(KeyCollision::PublicKey);
        }
        if self.by_private.contains_key(private_key) || self.by_public.contains_key(private_key) {
            return Err(KeyCollision::PrivateKey);
        }
        Ok(())
    }

    fn insert(&mut self, quiz: Arc<ActiveQuiz>) {
        self.by_private
            .insert(quiz.private_key().to_string(), quiz.public_key().to_string());
        self.by_public.insert(quiz.public_key().to_string(), quiz);
    }

    /// Removes both entries of a record, or nothing.
    fn remove(&mut self, public_key: &str, private_key: &str) -> Option<Arc<ActiveQuiz>> {
        match self.by_public.get(public_key) {
            Some(quiz) if quiz.private_key() == private_key => {}
            _ => return None,
        }
        self.by_private.remove(private_key);
        self.by_public.remove(public_key)
    }
}

/// Registry of live quiz sessions
pub struct QuizRegistry {
    indexes: RwLock<Indexes>,
    keys: Box<dyn KeySource>,
    max_age: Duration,
}

impl Default for QuizRegistry {
    fn default() -> Self {
        Self::new(default_max_age())
    }
}

impl std::fmt::Debug for QuizRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizRegistry")
            .field("live", &self.len())
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl QuizRegistry {
    /// Create an empty registry whose quizzes live for `max_age`
    pub fn new(max_age: Duration) -> Self {
        Self::with_key_source(max_age, Box::new(UuidKeySource))
    }

    /// Create an empty registry drawing keys from `keys`
    pub fn with_key_source(max_age: Duration, keys: Box<dyn KeySource>) -> Self {
        Self {
            indexes: RwLock::new(Indexes::default()),
            keys,
            max_age,
        }
    }

    /// Lifetime applied by [`list_all`](Self::list_all) and the sweeper
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Register a new quiz and return its keys
    pub fn create(&self, content: Quiz) -> QuizKeys {
        self.create_at(content, Utc::now())
    }

    /// Register a new quiz created at `now`.
    ///
    /// Keys are drawn outside the lock and re-checked inside it; on any
    /// collision a new pair is drawn and nothing is overwritten.
    pub fn create_at(&self, content: Quiz, now: DateTime<Utc>) -> QuizKeys {
        loop {
            let public_key = self.keys.next_key();
            let private_key = self.keys.next_key();

            let mut indexes = self.indexes.write();
            if let Err(collision) = indexes.check_collision(&public_key, &private_key) {
                drop(indexes);
                warn!("Key collision while creating quiz ({}), regenerating", collision);
                continue;
            }

            let quiz = ActiveQuiz::new(content, public_key.clone(), private_key.clone(), now);
            indexes.insert(Arc::new(quiz));
            drop(indexes);

            debug!("Created quiz: {}", public_key);
            return QuizKeys {
                public_key,
                private_key,
            };
        }
    }

    /// Look up a quiz by its public key.
    ///
    /// Expired quizzes are returned until the sweeper reaps them; callers
    /// that care must check [`ActiveQuiz::is_expired`].
    pub fn get_by_public_key(&self, public_key: &str) -> Option<Arc<ActiveQuiz>> {
        self.indexes.read().by_public.get(public_key).cloned()
    }

    /// Look up a quiz by the owner's private key
    pub fn get_by_private_key(&self, private_key: &str) -> Option<Arc<ActiveQuiz>> {
        let indexes = self.indexes.read();
        let public_key = indexes.by_private.get(private_key)?;

        match indexes.by_public.get(public_key) {
            Some(quiz) => Some(Arc::clone(quiz)),
            None => {
                error!(
                    "Index mismatch: private key resolves to missing quiz {}",
                    public_key
                );
                None
            }
        }
    }

    /// Remove a quiz by its private key.
    ///
    /// Returns `false` if no live quiz has this key.
    pub fn revoke(&self, private_key: &str) -> bool {
        let removed = {
            let mut indexes = self.indexes.write();
            let public_key = indexes.by_private.get(private_key).cloned();
            public_key.and_then(|public_key| indexes.remove(&public_key, private_key))
        };

        match removed {
            Some(quiz) => {
                info!("Ended quiz: {}", quiz.public_key());
                true
            }
            None => false,
        }
    }

    /// Summaries of every live quiz with TTL computed against `now`.
    ///
    /// Order is unspecified.
    pub fn list_all(&self, now: DateTime<Utc>) -> Vec<QuizSummary> {
        let indexes = self.indexes.read();
        indexes
            .by_public
            .values()
            .map(|quiz| QuizSummary {
                public_key: quiz.public_key().to_string(),
                quiz_name: quiz.name().to_string(),
                ttl_seconds: quiz.remaining_ttl(now, self.max_age).num_seconds(),
            })
            .collect()
    }

    /// Remove every quiz older than `max_age` at `now`; returns how many
    /// were removed.
    ///
    /// Candidates are collected from a snapshot under the read lock, then
    /// each is removed under its own write lock after confirming the live
    /// record is still the one seen in the snapshot.
    pub fn reap_expired(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let expired: Vec<(String, String)> = {
            let indexes = self.indexes.read();
            indexes
                .by_public
                .values()
                .filter(|quiz| quiz.is_expired(now, max_age))
                .map(|quiz| (quiz.public_key().to_string(), quiz.private_key().to_string()))
                .collect()
        };

        let mut removed = 0;
        for (public_key, private_key) in expired {
            let reaped = {
                let mut indexes = self.indexes.write();
                let still_expired = indexes
                    .by_public
                    .get(&public_key)
                    .is_some_and(|quiz| quiz.is_expired(now, max_age));

                if still_expired {
                    indexes.remove(&public_key, &private_key)
                } else {
                    None
                }
            };

            if reaped.is_some() {
                info!("Removed expired quiz: {}", public_key);
                removed += 1;
            }
        }

        removed
    }

    /// Number of live quizzes
    pub fn len(&self) -> usize {
        self.indexes.read().by_public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics unless both indexes describe exactly the same set of records.
    #[cfg(test)]
    fn assert_consistent(&self) {
        let indexes = self.indexes.read();
        assert_eq!(indexes.by_public.len(), indexes.by_private.len());

        for (private_key, public_key) in &indexes.by_private {
            let quiz = indexes
                .by_public
                .get(public_key)
                .expect("private key points at missing quiz");
            assert_eq!(quiz.private_key(), private_key);
        }
        for (public_key, quiz) in &indexes.by_public {
            assert_eq!(quiz.public_key(), public_key);
            assert_eq!(
                indexes.by_private.get(quiz.private_key()),
                Some(public_key)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harkata_common::{AnswerOption, Question};
    use parking_lot::Mutex;
    use std::collections::{HashSet, VecDeque};

    fn sample_quiz() -> Quiz {
        Quiz {
            quiz_name: "Test Quiz".to_string(),
            questions: vec![Question {
                question_id: 1,
                question_text: "What is 2+2?".to_string(),
                options: vec![
                    AnswerOption {
                        option_id: 1,
                        option_text: "3".to_string(),
                        is_correct: false,
                    },
                    AnswerOption {
                        option_id: 2,
                        option_text: "4".to_string(),
                        is_correct: true,
                    },
                    AnswerOption {
                        option_id: 3,
                        option_text: "5".to_string(),
                        is_correct: false,
                    },
                ],
            }],
        }
    }

    fn named_quiz(name: &str) -> Quiz {
        Quiz {
            quiz_name: name.to_string(),
            questions: vec![],
        }
    }

    /// Hands out a fixed sequence of keys, then falls back to UUIDs
    struct ScriptedKeys {
        keys: Mutex<VecDeque<String>>,
    }

    impl ScriptedKeys {
        fn new(keys: &[&str]) -> Self {
            Self {
                keys: Mutex::new(keys.iter().map(|k| k.to_string()).collect()),
            }
        }
    }

    impl KeySource for ScriptedKeys {
        fn next_key(&self) -> String {
            self.keys
                .lock()
                .pop_front()
                .unwrap_or_else(|| UuidKeySource.next_key())
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = QuizRegistry::default();

        assert!(registry.is_empty());
        assert_eq!(registry.max_age(), default_max_age());
        assert!(registry.list_all(Utc::now()).is_empty());
        registry.assert_consistent();
    }

    #[test]
    fn test_create_quiz() {
        let registry = QuizRegistry::default();
        let keys = registry.create(sample_quiz());

        assert_eq!(registry.len(), 1);
        assert_ne!(keys.public_key, keys.private_key);

        let quiz = registry.get_by_public_key(&keys.public_key).unwrap();
        assert_eq!(quiz.content(), &sample_quiz());
        assert_eq!(quiz.private_key(), keys.private_key);
        assert!(quiz.created_at() <= Utc::now());
        registry.assert_consistent();
    }

    #[test]
    fn test_keys_are_unique() {
        let registry = QuizRegistry::default();
        let created: Vec<QuizKeys> = (0..200).map(|_| registry.create(sample_quiz())).collect();

        let public: HashSet<_> = created.iter().map(|k| k.public_key.clone()).collect();
        let private: HashSet<_> = created.iter().map(|k| k.private_key.clone()).collect();

        assert_eq!(public.len(), 200);
        assert_eq!(private.len(), 200);
        assert!(public.is_disjoint(&private));
        registry.assert_consistent();
    }

    #[test]
    fn test_get_quiz_by_public_key() {
        let registry = QuizRegistry::default();
        let keys = registry.create(sample_quiz());

        let quiz = registry.get_by_public_key(&keys.public_key).unwrap();
        assert_eq!(quiz.name(), "Test Quiz");

        assert!(registry.get_by_public_key(&Uuid::new_v4().to_string()).is_none());
        // The private key is not a public capability
        assert!(registry.get_by_public_key(&keys.private_key).is_none());
    }

    #[test]
    fn test_get_quiz_by_private_key() {
        let registry = QuizRegistry::default();
        let keys = registry.create(sample_quiz());

        let quiz = registry.get_by_private_key(&keys.private_key).unwrap();
        assert_eq!(quiz.public_key(), keys.public_key);
        assert_eq!(quiz.content(), &sample_quiz());

        assert!(registry.get_by_private_key(&Uuid::new_v4().to_string()).is_none());
        assert!(registry.get_by_private_key(&keys.public_key).is_none());
    }

    #[test]
    fn test_revoke() {
        let registry = QuizRegistry::default();
        let keys = registry.create(sample_quiz());

        assert!(registry.revoke(&keys.private_key));
        assert!(registry.is_empty());
        assert!(registry.get_by_private_key(&keys.private_key).is_none());
        assert!(registry.get_by_public_key(&keys.public_key).is_none());
        registry.assert_consistent();

        // Second revoke is a no-op
        assert!(!registry.revoke(&keys.private_key));
    }

    #[test]
    fn test_revoke_unknown_key() {
        let registry = QuizRegistry::default();
        let keys = registry.create(sample_quiz());

        assert!(!registry.revoke(&Uuid::new_v4().to_string()));
        // Public key cannot revoke
        assert!(!registry.revoke(&keys.public_key));
        assert_eq!(registry.len(), 1);
        registry.assert_consistent();
    }

    #[test]
    fn test_list_all() {
        let registry = QuizRegistry::default();
        let now = Utc::now();
        assert!(registry.list_all(now).is_empty());

        registry.create_at(named_quiz("Quiz 1"), now);
        registry.create_at(named_quiz("Quiz 2"), now - Duration::seconds(400));

        let mut listed = registry.list_all(now);
        listed.sort_by(|a, b| a.quiz_name.cmp(&b.quiz_name));

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].quiz_name, "Quiz 1");
        assert_eq!(listed[0].ttl_seconds, 14_400);
        assert_eq!(listed[1].quiz_name, "Quiz 2");
        assert_eq!(listed[1].ttl_seconds, 14_000);
    }

    #[test]
    fn test_list_all_reports_negative_ttl_before_reaping() {
        let registry = QuizRegistry::default();
        let now = Utc::now();
        registry.create_at(named_quiz("Stale"), now - Duration::seconds(18_000));

        let listed = registry.list_all(now);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ttl_seconds, -3_600);
    }

    #[test]
    fn test_list_all_uses_registry_max_age() {
        let registry = QuizRegistry::new(Duration::seconds(60));
        let now = Utc::now();
        registry.create_at(named_quiz("Short"), now);

        assert_eq!(registry.list_all(now)[0].ttl_seconds, 60);
    }

    #[test]
    fn test_list_all_with_unrepresentable_expiry() {
        let registry = QuizRegistry::new(Duration::seconds(10_000_000_000_000));
        let now = Utc::now();
        let keys = registry.create_at(named_quiz("Forever"), now);

        let listed = registry.list_all(now);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ttl_seconds, Duration::MAX.num_seconds());
        assert_eq!(registry.reap_expired(now, registry.max_age()), 0);
        assert!(registry.get_by_private_key(&keys.private_key).is_some());
    }

    #[test]
    fn test_reap_expired() {
        let registry = QuizRegistry::default();
        let now = Utc::now();

        let old = registry.create_at(named_quiz("Old"), now - Duration::seconds(18_000));
        let fresh = registry.create_at(named_quiz("Fresh"), now - Duration::seconds(1_000));

        assert_eq!(registry.reap_expired(now, default_max_age()), 1);
        assert!(registry.get_by_public_key(&old.public_key).is_none());
        assert!(registry.get_by_private_key(&old.private_key).is_none());
        assert!(registry.get_by_public_key(&fresh.public_key).is_some());
        registry.assert_consistent();

        assert_eq!(registry.reap_expired(now, default_max_age()), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reap_with_custom_max_age() {
        let registry = QuizRegistry::default();
        let now = Utc::now();
        registry.create_at(named_quiz("Old"), now - Duration::seconds(18_000));

        assert_eq!(registry.reap_expired(now, Duration::seconds(21_600)), 0);
        assert_eq!(registry.reap_expired(now, Duration::seconds(10)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reap_skips_quizzes_newer_than_now() {
        let registry = QuizRegistry::default();
        let now = Utc::now();
        // Created "after" the sweep's reference time
        registry.create_at(named_quiz("Future"), now + Duration::seconds(30));

        assert_eq!(registry.reap_expired(now, Duration::zero()), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_revoked_quiz_is_not_reaped() {
        let registry = QuizRegistry::default();
        let now = Utc::now();
        let keys = registry.create_at(named_quiz("Old"), now - Duration::seconds(18_000));

        assert!(registry.revoke(&keys.private_key));
        assert_eq!(registry.reap_expired(now, default_max_age()), 0);
    }

    #[test]
    fn test_public_key_collision_regenerates() {
        let keys = ScriptedKeys::new(&["a", "b", "a", "c", "d", "e"]);
        let registry = QuizRegistry::with_key_source(default_max_age(), Box::new(keys));

        let first = registry.create(named_quiz("First"));
        assert_eq!(first.public_key, "a");
        assert_eq!(first.private_key, "b");

        // ("a", "c") clashes on the public key, so ("d", "e") is used
        let second = registry.create(named_quiz("Second"));
        assert_eq!(second.public_key, "d");
        assert_eq!(second.private_key, "e");

        assert_eq!(registry.get_by_public_key("a").unwrap().name(), "First");
        assert_eq!(registry.len(), 2);
        registry.assert_consistent();
    }

    #[test]
    fn test_cross_index_collision_regenerates() {
        // Second pair reuses the first private key as its public key,
        // third pair has identical halves
        let keys = ScriptedKeys::new(&["a", "b", "b", "c", "x", "x", "y", "z"]);
        let registry = QuizRegistry::with_key_source(default_max_age(), Box::new(keys));

        registry.create(named_quiz("First"));
        let second = registry.create(named_quiz("Second"));

        assert_eq!(second.public_key, "y");
        assert_eq!(second.private_key, "z");
        assert_eq!(registry.get_by_private_key("b").unwrap().name(), "First");
        registry.assert_consistent();
    }

    #[test]
    fn test_key_collision_check() {
        let registry = QuizRegistry::with_key_source(
            default_max_age(),
            Box::new(ScriptedKeys::new(&["a", "b"])),
        );
        registry.create(named_quiz("First"));
        let indexes = registry.indexes.read();

        assert_eq!(indexes.check_collision("x", "x"), Err(KeyCollision::SameKey));
        assert_eq!(indexes.check_collision("a", "x"), Err(KeyCollision::PublicKey));
        assert_eq!(indexes.check_collision("b", "x"), Err(KeyCollision::PublicKey));
        assert_eq!(indexes.check_collision("x", "b"), Err(KeyCollision::PrivateKey));
        assert_eq!(indexes.check_collision("x", "a"), Err(KeyCollision::PrivateKey));
        assert_eq!(indexes.check_collision("x", "y"), Ok(()));
    }

    #[test]
    fn test_end_to_end_lifecycle() {
        let registry = QuizRegistry::default();

        let a = registry.create(named_quiz("Quiz A"));
        let listed = registry.list_all(Utc::now());
        assert_eq!(listed.len(), 1);
        assert!((14_399..=14_400).contains(&listed[0].ttl_seconds));

        let b = registry.create(named_quiz("Quiz B"));
        assert_eq!(registry.list_all(Utc::now()).len(), 2);

        assert!(registry.revoke(&a.private_key));
        let listed = registry.list_all(Utc::now());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].public_key, b.public_key);
        assert_eq!(listed[0].quiz_name, "Quiz B");

        assert!(registry.get_by_public_key(&a.public_key).is_none());
        registry.assert_consistent();
    }

    #[test]
    fn test_concurrent_create_revoke_reap() {
        let registry = Arc::new(QuizRegistry::default());
        let now = Utc::now();

        std::thread::scope(|s| {
            for t in 0..4 {
                let registry = Arc::clone(&registry);
                s.spawn(move || {
                    for i in 0..250 {
                        let age = if i % 2 == 0 { 18_000 } else { 10 };
                        let keys = registry
                            .create_at(named_quiz(&format!("{t}-{i}")), now - Duration::seconds(age));
                        if i % 3 == 0 {
                            registry.revoke(&keys.private_key);
                        }
                    }
                });
            }

            let reaper = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..50 {
                    reaper.reap_expired(now, default_max_age());
                }
            });

            let reader = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..50 {
                    for summary in reader.list_all(now) {
                        // A listed quiz may vanish before the lookup, but a hit
                        // must always be the same quiz.
                        if let Some(quiz) = reader.get_by_public_key(&summary.public_key) {
                            assert_eq!(quiz.public_key(), summary.public_key);

                            // The private index must resolve back to the same quiz
                            // or, if removed meanwhile, to nothing at all.
                            if let Some(owned) = reader.get_by_private_key(quiz.private_key()) {
                                assert_eq!(owned.public_key(), quiz.public_key());
                                assert_eq!(owned.private_key(), quiz.private_key());
                            }
                        }
                    }
                }
            });
        });

        registry.assert_consistent();

        // Finish the sweep; only the young quizzes that were not revoked remain
        registry.reap_expired(now, default_max_age());
        registry.assert_consistent();
        assert!(registry
            .list_all(now)
            .iter()
            .all(|summary| summary.ttl_seconds > 0));
    }
}
