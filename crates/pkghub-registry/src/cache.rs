//! Memoized, coalescing holder for the package index.
//!
//! At most one fetch is in flight per cache. Callers arriving while a
//! fetch is running wait for it and observe the same outcome, success or
//! failure. Only successes are memoized; the next call after a failure
//! starts a fresh fetch.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::{
    error::{RegistryError, Result},
    index::PackagesIndex,
};

type Outcome = std::result::Result<Arc<PackagesIndex>, Arc<RegistryError>>;

#[derive(Default)]
struct CacheState {
    index: Option<Arc<PackagesIndex>>,
    pending: Option<watch::Receiver<Option<Outcome>>>,
    generation: u64,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct IndexCache {
    state: Arc<Mutex<CacheState>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized index, if a fetch has succeeded since the last
    /// invalidation.
    pub fn get(&self) -> Option<Arc<PackagesIndex>> {
        lock(&self.state).index.clone()
    }

    /// Stores `index`, superseding any fetch still in flight.
    pub fn set(&self, index: PackagesIndex) -> Arc<PackagesIndex> {
        let index = Arc::new(index);
        let mut state = lock(&self.state);
        state.generation += 1;
        state.pending = None;
        state.index = Some(Arc::clone(&index));
        index
    }

    /// Forgets the memoized index. A fetch that is in flight still
    /// completes for its waiters but its result is not stored.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.pending = None;
        state.index = None;
        debug!("package index cache invalidated");
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Returns the memoized index or runs `fetch`, joining a fetch that is
    /// already in flight instead of starting another one.
    ///
    /// The fetch runs on its own task so that it completes even if the
    /// caller that started it is dropped.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<PackagesIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PackagesIndex>> + Send + 'static,
    {
        let mut rx = {
            let mut state = lock(&self.state);
            if let Some(index) = &state.index {
                trace!("package index served from cache");
                return Ok(Arc::clone(index));
            }

            match &state.pending {
                Some(rx) => {
                    trace!("joining in-flight package index fetch");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.pending = Some(rx.clone());

                    let guard = PendingGuard {
                        state: Arc::clone(&self.state),
                        generation: state.generation,
                        settled: false,
                    };
                    let fut = fetch();
                    tokio::spawn(async move {
                        let mut guard = guard;
                        let outcome: Outcome = fut.await.map(Arc::new).map_err(Arc::new);
                        guard.settle(&outcome);
                        tx.send_replace(Some(outcome));
                    });
                    rx
                }
            }
        };

        let outcome = {
            let settled = rx.wait_for(Option::is_some).await.map_err(|_| {
                RegistryError::Custom("package index fetch was aborted".to_string())
            })?;
            settled.clone()
        };

        match outcome {
            Some(Ok(index)) => Ok(index),
            Some(Err(err)) => Err(RegistryError::Shared(err)),
            None => Err(RegistryError::Custom(
                "package index fetch finished without a result".to_string(),
            )),
        }
    }
}

/// Clears the pending slot of the fetch it belongs to, even if that fetch
/// panics, so later callers are not stuck waiting on a dead channel.
struct PendingGuard {
    state: Arc<Mutex<CacheState>>,
    generation: u64,
    settled: bool,
}

impl PendingGuard {
    fn settle(&mut self, outcome: &Outcome) {
        let mut state = lock(&self.state);
        if state.generation == self.generation {
            state.pending = None;
            if let Ok(index) = outcome {
                state.index = Some(Arc::clone(index));
            }
        } else {
            debug!("discarding package index fetched before invalidation");
        }
        self.settled = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock(&self.state);
        if state.generation == self.generation {
            state.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::package::tests::package;

    fn index(last_update: i64) -> PackagesIndex {
        PackagesIndex {
            last_update,
            packages: vec![package("lorem", "0.1.0")],
        }
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        result: Result<PackagesIndex>,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<PackagesIndex>> + Send>>
    {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                result
            })
        }
    }

    #[test]
    fn test_get_set_invalidate() {
        let cache = IndexCache::new();
        assert!(cache.get().is_none());

        cache.set(index(1));
        assert_eq!(cache.get().unwrap().last_update, 1);

        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_fetch() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch(counted(&calls, Ok(index(1)))),
            cache.get_or_fetch(counted(&calls, Ok(index(2)))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.last_update, 1);
    }

    #[tokio::test]
    async fn test_success_is_memoized() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch(counted(&calls, Ok(index(1)))).await.unwrap();
        let again = cache.get_or_fetch(counted(&calls, Ok(index(2)))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.last_update, 1);
        assert!(!cache.is_pending());
    }

    #[tokio::test]
    async fn test_failure_is_shared_but_not_cached() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch(counted(&calls, Err(RegistryError::EmptyPackageList))),
            cache.get_or_fetch(counted(&calls, Ok(index(2)))),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(a.unwrap_err(), RegistryError::Shared(_)));
        assert!(matches!(b.unwrap_err(), RegistryError::Shared(_)));
        assert!(cache.get().is_none());

        let retried = cache.get_or_fetch(counted(&calls, Ok(index(3)))).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(retried.last_update, 3);
    }

    #[tokio::test]
    async fn test_invalidate_discards_in_flight_result() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetching = cache.get_or_fetch(counted(&calls, Ok(index(1))));
        let invalidating = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.invalidate();
        };
        let (fetched, ()) = tokio::join!(fetching, invalidating);

        assert_eq!(fetched.unwrap().last_update, 1);
        assert!(cache.get().is_none());
        assert!(!cache.is_pending());
    }

    #[tokio::test]
    async fn test_fetch_after_invalidate() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch(counted(&calls, Ok(index(1)))).await.unwrap();
        cache.invalidate();
        let fresh = cache.get_or_fetch(counted(&calls, Ok(index(2)))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fresh.last_update, 2);
    }

    async fn crashing_fetch() -> Result<PackagesIndex> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        panic!("index source crashed");
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_not_left_pending() {
        let cache = IndexCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache.get_or_fetch(crashing_fetch).await.unwrap_err();
        assert!(matches!(err, RegistryError::Custom(ref msg) if msg.contains("aborted")));
        assert!(!cache.is_pending());
        assert!(cache.get().is_none());

        let fetched = cache.get_or_fetch(counted(&calls, Ok(index(7)))).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetched.last_update, 7);
    }
}
