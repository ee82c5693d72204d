// src/placement/session.rs

//! In-process store for issued quiz batches.
//!
//! Batches live in a map keyed by batch id, with a second ordered index on
//! `(expires_at, batch_id)`. Every access first pops expired entries off the
//! front of that index, so a sweep costs O(expired) and the store never
//! grows past the batches issued within one TTL.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{
    question::{Difficulty, QuestionItem},
    quiz::QuizBatch,
};

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Unknown, expired, already graded, or issued to another user.
    NotFound(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(batch_id) => {
                write!(f, "Quiz batch '{}' not found or expired", batch_id)
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Default)]
struct Arena {
    batches: HashMap<String, QuizBatch>,
    expiry: BTreeSet<(DateTime<Utc>, String)>,
}

impl Arena {
    /// Drops every batch whose deadline is at or before `now`.
    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut swept = 0;
        while let Some((expires_at, _)) = self.expiry.first() {
            if *expires_at > now {
                break;
            }
            if let Some((_, batch_id)) = self.expiry.pop_first() {
                self.batches.remove(&batch_id);
                swept += 1;
            }
        }
        swept
    }
}

#[derive(Debug)]
pub struct QuizSessionStore {
    ttl: Duration,
    arena: Mutex<Arena>,
}

impl QuizSessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::minutes(30)),
            arena: Mutex::new(Arena::default()),
        }
    }

    fn arena(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `items` to `user_id` as a new batch with a fresh id.
    pub fn issue(
        &self,
        user_id: i64,
        language: &str,
        difficulty: Difficulty,
        items: Vec<QuestionItem>,
    ) -> QuizBatch {
        self.issue_at(user_id, language, difficulty, items, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        language: &str,
        difficulty: Difficulty,
        items: Vec<QuestionItem>,
        now: DateTime<Utc>,
    ) -> QuizBatch {
        let batch_id = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;

        let batch = QuizBatch {
            batch_id: batch_id.clone(),
            user_id,
            issued_at: now,
            expires_at: Some(expires_at),
            question_ids: items.iter().map(|i| i.id.clone()).collect(),
            language: language.to_string(),
            difficulty,
            items,
        };

        let mut arena = self.arena();
        let swept = arena.sweep(now);
        if swept > 0 {
            tracing::debug!("Swept {} expired quiz batches", swept);
        }
        arena.expiry.insert((expires_at, batch_id.clone()));
        arena.batches.insert(batch_id, batch.clone());

        batch
    }

    /// Takes the batch out of the store for grading. A batch can be bound
    /// once; later attempts see `NotFound`. A batch issued to another user
    /// is reported as not found and left in place.
    pub fn bind_for_grading(&self, batch_id: &str, user_id: i64) -> Result<QuizBatch, SessionError> {
        self.bind_for_grading_at(batch_id, user_id, Utc::now())
    }

    pub fn bind_for_grading_at(
        &self,
        batch_id: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<QuizBatch, SessionError> {
        let not_found = || SessionError::NotFound(batch_id.to_string());

        let mut arena = self.arena();
        arena.sweep(now);

        let owner = arena.batches.get(batch_id).map(|b| b.user_id).ok_or_else(not_found)?;
        if owner != user_id {
            tracing::warn!("User {} tried to grade batch {} owned by {}", user_id, batch_id, owner);
            return Err(not_found());
        }

        let batch = arena.batches.remove(batch_id).ok_or_else(not_found)?;
        if let Some(expires_at) = batch.expires_at {
            arena.expiry.remove(&(expires_at, batch.batch_id.clone()));
        }

        Ok(batch)
    }

    /// Number of live batches (after sweeping).
    pub fn len(&self) -> usize {
        let mut arena = self.arena();
        arena.sweep(Utc::now());
        arena.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn item(id: &str) -> QuestionItem {
        QuestionItem {
            id: id.to_string(),
            prompt: "p".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "a".to_string(),
            topic: "loops".to_string(),
            difficulty: Difficulty::Beginner,
            language: "python".to_string(),
        }
    }

    fn store() -> QuizSessionStore {
        QuizSessionStore::new(std::time::Duration::from_secs(30 * 60))
    }

    #[test]
    fn issued_batch_can_be_bound_once() {
        let store = store();
        let batch = store.issue(1, "python", Difficulty::Beginner, vec![item("q1"), item("q2")]);
        assert_eq!(batch.question_ids, vec!["q1", "q2"]);

        let bound = store.bind_for_grading(&batch.batch_id, 1).unwrap();
        assert_eq!(bound.items.len(), 2);

        assert_eq!(
            store.bind_for_grading(&batch.batch_id, 1).unwrap_err(),
            SessionError::NotFound(batch.batch_id.clone())
        );
    }

    #[test]
    fn unknown_batch_is_not_found() {
        let err = store().bind_for_grading("nonexistent", 1).unwrap_err();
        assert_eq!(err, SessionError::NotFound("nonexistent".to_string()));
    }

    #[test]
    fn foreign_user_cannot_bind_and_owner_still_can() {
        let store = store();
        let batch = store.issue(1, "python", Difficulty::Beginner, vec![item("q1")]);

        assert!(store.bind_for_grading(&batch.batch_id, 2).is_err());
        assert!(store.bind_for_grading(&batch.batch_id, 1).is_ok());
    }

    #[test]
    fn expired_batch_is_swept_and_rejected() {
        let store = store();
        let issued_at = Utc::now() - Duration::minutes(31);
        let batch = store.issue_at(1, "python", Difficulty::Beginner, vec![item("q1")], issued_at);

        let err = store.bind_for_grading(&batch.batch_id, 1).unwrap_err();
        assert_eq!(err, SessionError::NotFound(batch.batch_id));
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_only_touches_expired_entries() {
        let store = store();
        let now = Utc::now();
        store.issue_at(1, "python", Difficulty::Beginner, vec![item("old")], now - Duration::hours(1));
        let fresh = store.issue_at(1, "python", Difficulty::Beginner, vec![item("new")], now);

        assert_eq!(store.len(), 1);
        assert!(store.bind_for_grading(&fresh.batch_id, 1).is_ok());
    }

    #[test]
    fn concurrent_issuance_keeps_every_batch() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|user| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| store.issue(user, "go", Difficulty::Beginner, vec![item("q")]).batch_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.len(), 200);
    }
}
