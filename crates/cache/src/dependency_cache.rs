//! Memoizes in-flight bundler fetches by `(name, version)` so concurrent
//! requesters for the same module share one network operation, per the
//! dependency engine's fetch step.

use crate::resolved::ResolvedDependency;
use snack_asyncutils::CacheSlot;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

type FetchFuture = Pin<Box<dyn Future<Output = ResolvedDependency> + Send>>;

/// A per-session cache of module resolutions. Never shared across sessions.
#[derive(Default)]
pub struct DependencyCache {
    slots: Mutex<HashMap<String, CacheSlot<FetchFuture>>>,
}

impl DependencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `key`, running `fetch` only if no fetch for this key is
    /// already pending or resolved. Concurrent callers for the same key
    /// await the same underlying future.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> ResolvedDependency
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolvedDependency> + Send + 'static,
    {
        let wait = {
            let mut slots = self.slots.lock().expect("lock poisoned");
            match slots.get(key) {
                Some(slot) => slot.wait(),
                None => {
                    let slot = CacheSlot::pending(Box::pin(fetch()) as FetchFuture);
                    let wait = slot.wait();
                    slots.insert(key.to_string(), slot);
                    wait
                }
            }
        };
        wait.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_fetches_for_the_same_key_run_once() {
        let cache = DependencyCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ResolvedDependency::resolved("left-pad", "1.3.0", HashMap::new())
            }
        };

        let (a, b) = tokio::join!(cache.get_or_fetch("left-pad-1.3.0", fetch), cache.get_or_fetch("left-pad-1.3.0", fetch));
        assert_eq!(a, ResolvedDependency::resolved("left-pad", "1.3.0", HashMap::new()));
        assert_eq!(b, a);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let cache = DependencyCache::new();
        let a = cache.get_or_fetch("left-pad-1.3.0", || async { ResolvedDependency::resolved("left-pad", "1.3.0", HashMap::new()) }).await;
        let b = cache.get_or_fetch("left-pad-1.4.0", || async { ResolvedDependency::resolved("left-pad", "1.4.0", HashMap::new()) }).await;
        assert_ne!(a, b);
    }
}
