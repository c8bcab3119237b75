use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Trailing-edge debounce: each call to [`schedule`](Self::schedule) cancels
/// whatever call is still waiting to fire and restarts the timer. Only the
/// last call within any `interval`-long window ever runs.
pub struct Debouncer {
    interval: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, pending: Mutex::new(None) }
    }

    /// Schedule `f` to run after the debounce interval. If a previously
    /// scheduled call has not fired yet, it is aborted and never runs.
    pub fn schedule<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.pending.lock().expect("debouncer mutex poisoned");
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            f().await;
        });
        *guard = Some(handle.abort_handle());
    }

    /// Cancel any call waiting to fire without scheduling a replacement.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().expect("debouncer mutex poisoned").take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn only_the_last_scheduled_call_within_the_window_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let calls = Arc::clone(&calls);
            debouncer.schedule(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_a_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));
        let tracked = Arc::clone(&calls);
        debouncer.schedule(move || async move {
            tracked.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
