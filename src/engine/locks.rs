use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

/// Serializes mutations per key.
///
/// Work on different keys runs in parallel. Entries are dropped again once
/// nobody holds or waits for them.
#[derive(Default)]
pub struct AssetLocks {
    entries: DashMap<String, Arc<Mutex<()>>>,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.handle(key);
        let result = {
            // A panic in another holder leaves nothing half-written to recover.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        self.entries
            .remove_if(key, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_key_is_serialized() {
        let locks = Arc::new(AssetLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with("asset-1", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_nested_different_keys() {
        let locks = AssetLocks::new();
        let value = locks.with("rating", || locks.with("product", || 42));
        assert_eq!(value, 42);
        assert_eq!(locks.len(), 0);
    }
}
