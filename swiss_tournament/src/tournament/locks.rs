//! Per-tournament mutual exclusion.

use super::models::TournamentId;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry handing out one mutex per tournament
///
/// Cloning shares the registry. Every manager that mutates tournament state
/// holds the guard for its whole read-validate-write sequence.
#[derive(Debug, Clone, Default)]
pub struct TournamentLocks {
    locks: Arc<RwLock<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a tournament
    pub async fn acquire(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&tournament_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(tournament_id)
                .or_default()
                .clone(),
        };
        lock.lock_owned().await
    }

    /// Acquire several tournaments in ascending id order
    pub async fn acquire_many(
        &self,
        tournament_ids: impl IntoIterator<Item = TournamentId>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<TournamentId> = tournament_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    /// Drop the entry of a deleted tournament
    pub async fn forget(&self, tournament_id: TournamentId) {
        self.locks.write().await.remove(&tournament_id);
    }

    /// Number of tournaments with a registered lock
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_tournament_is_exclusive() {
        let locks = TournamentLocks::new();
        let guard = locks.acquire(1).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire(1).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_tournaments_do_not_block() {
        let locks = TournamentLocks::new();
        let _first = locks.acquire(1).await;
        let _second = locks.acquire(2).await;
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn test_acquire_many_dedups_and_forget() {
        let locks = TournamentLocks::new();
        let guards = locks.acquire_many([3, 1, 3]).await;
        assert_eq!(guards.len(), 2);
        drop(guards);

        locks.forget(3).await;
        assert_eq!(locks.len().await, 1);
        assert!(!locks.is_empty().await);
    }
}
