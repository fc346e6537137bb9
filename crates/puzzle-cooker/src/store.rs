//! Deduplication and puzzle storage contract

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

use crate::error::CookError;
use crate::puzzle::PuzzleRecord;

/// Where puzzles go, and what has already been cooked.
///
/// Position keys are full FENs. Marking a key twice is a no-op.
pub trait PuzzleStore {
    fn is_seen_game(&self, game_id: &str) -> impl Future<Output = Result<bool, CookError>> + Send;

    fn is_seen_position(&self, key: &str)
        -> impl Future<Output = Result<bool, CookError>> + Send;

    fn mark_seen_position(&self, key: &str)
        -> impl Future<Output = Result<(), CookError>> + Send;

    fn store_puzzle(&self, record: &PuzzleRecord)
        -> impl Future<Output = Result<(), CookError>> + Send;
}

#[derive(Debug, Default)]
struct MemoryInner {
    seen: HashSet<String>,
    games: HashSet<String>,
    puzzles: Vec<PuzzleRecord>,
    marks: usize,
}

/// In-process store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puzzles(&self) -> Vec<PuzzleRecord> {
        self.lock().puzzles.clone()
    }

    /// Number of `mark_seen_position` calls, repeats included.
    pub fn marks(&self) -> usize {
        self.lock().marks
    }

    /// Number of `store_puzzle` calls.
    pub fn stored(&self) -> usize {
        self.lock().puzzles.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PuzzleStore for MemoryStore {
    async fn is_seen_game(&self, game_id: &str) -> Result<bool, CookError> {
        Ok(self.lock().games.contains(game_id))
    }

    async fn is_seen_position(&self, key: &str) -> Result<bool, CookError> {
        Ok(self.lock().seen.contains(key))
    }

    async fn mark_seen_position(&self, key: &str) -> Result<(), CookError> {
        let mut inner = self.lock();
        inner.marks += 1;
        if !inner.seen.contains(key) {
            inner.seen.insert(key.to_string());
        }
        Ok(())
    }

    async fn store_puzzle(&self, record: &PuzzleRecord) -> Result<(), CookError> {
        let mut inner = self.lock();
        inner.games.insert(record.game_id.clone());
        inner.puzzles.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(game_id: &str) -> PuzzleRecord {
        PuzzleRecord {
            game_id: game_id.to_string(),
            fen: "7k/8/R7/1R6/8/8/8/4K3 w - - 0 1".to_string(),
            ply: 0,
            moves: vec!["b5b7".into(), "h8g8".into(), "a6a8".into()],
            cp: 999_999_999,
            generator_version: 0,
        }
    }

    #[tokio::test]
    async fn test_marks_are_idempotent_but_counted() {
        let store = MemoryStore::new();
        assert!(!store.is_seen_position("a").await.unwrap());
        store.mark_seen_position("a").await.unwrap();
        store.mark_seen_position("a").await.unwrap();
        assert!(store.is_seen_position("a").await.unwrap());
        assert!(!store.is_seen_position("b").await.unwrap());
        assert_eq!(store.marks(), 2);
    }

    #[tokio::test]
    async fn test_game_is_seen_once_it_has_a_puzzle() {
        let store = MemoryStore::new();
        assert!(!store.is_seen_game("g1").await.unwrap());
        store.store_puzzle(&record("g1")).await.unwrap();
        assert!(store.is_seen_game("g1").await.unwrap());
        assert!(!store.is_seen_game("g2").await.unwrap());
        assert_eq!(store.stored(), 1);
        assert_eq!(store.puzzles()[0].moves.len(), 3);
    }

    #[tokio::test]
    async fn test_many_keys_stay_distinct() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store.mark_seen_position(&format!("k{i}")).await.unwrap();
        }
        store.store_puzzle(&record("g1")).await.unwrap();
        store.store_puzzle(&record("g1")).await.unwrap();
        assert!(store.is_seen_position("k999").await.unwrap());
        assert!(!store.is_seen_position("k1000").await.unwrap());
        assert!(store.is_seen_game("g1").await.unwrap());
        assert_eq!(store.marks(), 1000);
        assert_eq!(store.stored(), 2);
    }
}
