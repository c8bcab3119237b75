use futures::future::{FutureExt, Shared};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    #[project = ReadOrWaitProj]
    enum ReadOrWait<Fut>
    where
        Fut: Future,
        Fut::Output: Clone,
    {
        Ready { value: Option<Fut::Output> },
        Waiting { #[pin] shared: Shared<Fut> },
    }
}

/// A memoization slot that is either an in-flight, clonable future or an
/// already-resolved value. Concurrent callers awaiting a [`Pending`](Self::Pending)
/// slot share the same underlying computation; the first one to complete it
/// promotes the slot to [`Ready`](Self::Ready) for everyone after.
pub enum CacheSlot<Fut>
where
    Fut: Future,
    Fut::Output: Clone,
{
    Pending(Shared<Fut>),
    Ready(Fut::Output),
}

impl<Fut> CacheSlot<Fut>
where
    Fut: Future,
    Fut::Output: Clone,
{
    pub fn pending(future: Fut) -> Self {
        Self::Pending(future.shared())
    }

    pub fn ready(value: Fut::Output) -> Self {
        Self::Ready(value)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Resolve the slot, driving the shared future to completion if it
    /// hasn't finished yet. Does not mutate `self`; callers that want the
    /// slot promoted to `Ready` should do so via [`CacheSlot::resolve`].
    pub fn wait(&self) -> impl Future<Output = Fut::Output> + use<Fut> {
        let inner = match self {
            Self::Ready(value) => ReadOrWait::Ready { value: Some(value.clone()) },
            Self::Pending(shared) => ReadOrWait::Waiting { shared: shared.clone() },
        };
        ResolveSlot { inner }
    }

    /// Resolve the slot and, if it was still pending, replace it with a
    /// `Ready` variant so future calls skip the shared-future machinery
    /// entirely.
    pub async fn resolve(&mut self) -> Fut::Output {
        let value = self.wait().await;
        if !self.is_ready() {
            *self = Self::Ready(value.clone());
        }
        value
    }
}

pin_project! {
    struct ResolveSlot<Fut>
    where
        Fut: Future,
        Fut::Output: Clone,
    {
        #[pin]
        inner: ReadOrWait<Fut>,
    }
}

impl<Fut> Future for ResolveSlot<Fut>
where
    Fut: Future,
    Fut::Output: Clone,
{
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().inner.project() {
            ReadOrWaitProj::Ready { value } => Poll::Ready(value.take().expect("polled after completion")),
            ReadOrWaitProj::Waiting { shared } => shared.poll(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_slot_resolves_without_polling_a_future() {
        let mut slot: CacheSlot<std::future::Ready<u32>> = CacheSlot::ready(7);
        assert_eq!(slot.resolve().await, 7);
        assert!(slot.is_ready());
    }

    #[tokio::test]
    async fn pending_slot_promotes_to_ready_after_first_resolve() {
        let mut slot = CacheSlot::pending(async { 42u32 });
        assert!(!slot.is_ready());
        assert_eq!(slot.resolve().await, 42);
        assert!(slot.is_ready());
        assert_eq!(slot.resolve().await, 42);
    }

    #[tokio::test]
    async fn concurrent_waiters_share_the_same_computation() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let polls = Arc::new(AtomicUsize::new(0));
        let tracked = Arc::clone(&polls);
        let slot = CacheSlot::pending(async move {
            tracked.fetch_add(1, Ordering::SeqCst);
            "value"
        });

        let (a, b) = tokio::join!(slot.wait(), slot.wait());
        assert_eq!(a, "value");
        assert_eq!(b, "value");
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }
}
