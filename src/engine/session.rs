//! Per-identity mutual exclusion.
//!
//! Two messages from the same sender must not interleave load/save of the
//! same user record, and the idle sweeper's resets must not race an
//! in-flight reply. Each identity gets one `Arc<Mutex<()>>`; holding its
//! owned guard serializes all work for that identity while leaving other
//! identities fully parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-identity locks.
#[derive(Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one identity, creating it on first use.
    /// The registry lock is dropped before awaiting the identity lock.
    pub async fn acquire(&self, identity: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(
                map.entry(identity.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn same_identity_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_section = Arc::clone(&in_section);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("+15551234567").await;
                let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_identities_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("+1111").await;
        // Would deadlock if identities shared a lock.
        let _b = locks.acquire("+2222").await;
    }
}
