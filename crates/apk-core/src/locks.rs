//! Per-key async mutual exclusion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async mutex per key. Entries are held weakly and pruned
/// once no guard or waiter references them.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, key: &Path) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, weak| weak.strong_count() > 0);
            if let Some(existing) = map.get(key).and_then(Weak::upgrade) {
                existing
            } else {
                let fresh = Arc::new(AsyncMutex::new(()));
                map.insert(key.to_path_buf(), Arc::downgrade(&fresh));
                fresh
            }
        };
        mutex.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::default();
        let key = Path::new("/cache/repo/x86_64/a.apk");

        let guard = locks.lock(key).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(key)).await;
        assert!(second.is_err(), "second lock should wait for the first");

        drop(guard);
        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock(key)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block_and_are_pruned() {
        let locks = KeyedLocks::default();
        let a = locks.lock(Path::new("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(Path::new("b")))
            .await
            .expect("different keys must not contend");
        assert_eq!(locks.len(), 2);

        drop(a);
        drop(b);
        assert_eq!(locks.len(), 0);
    }
}
