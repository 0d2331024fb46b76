//! Per-conversation turn locks.
//!
//! Every exchange holds its conversation's permit from the moment it reads
//! history until its reply is persisted, whichever path it arrived on.
//! Waiters are served in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Default)]
pub struct TurnLocks {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `conversation_id`. The permit releases on
    /// drop. `None` only if the semaphore was closed, which never happens.
    pub async fn acquire(&self, conversation_id: &str) -> Option<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            // Entries nobody holds or waits on only have the map's reference.
            locks.retain(|_, sem| Arc::strong_count(sem) > 1);
            locks
                .entry(conversation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned().await.ok()
    }

    /// Conversations with a turn running or queued.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|sem| Arc::strong_count(sem) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_conversation_waits_for_release() {
        let locks = Arc::new(TurnLocks::new());
        let held = locks.acquire("c1").await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire("c1").await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn different_conversations_run_concurrently() {
        let locks = TurnLocks::new();
        let a = locks.acquire("c1").await;
        let b = locks.acquire("c2").await;
        assert!(a.is_some() && b.is_some());
        assert_eq!(locks.active(), 2);

        drop(a);
        drop(b);
        let _c = locks.acquire("c3").await;
        assert_eq!(locks.active(), 1);
    }
}
