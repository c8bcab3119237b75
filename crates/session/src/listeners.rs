//! A small ordered listener registry shared by every `addXListener`
//! operation on the session façade (C9).
//!
//! Dispatch snapshots the listener list before invoking anything, so a
//! listener that removes itself or another listener mid-dispatch can't skip
//! a later listener at the same tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct ListenerRegistry<T> {
    next_id: AtomicU64,
    listeners: Arc<Mutex<Vec<(u64, Callback<T>)>>>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self { next_id: AtomicU64::new(0), listeners: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, returning a handle that unregisters it on
    /// [`ListenerHandle::remove`].
    pub fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().expect("lock poisoned").push((id, Arc::new(callback)));
        ListenerHandle { id, listeners: Arc::clone(&self.listeners) }
    }

    /// Invokes every registered listener, in registration order, with `event`.
    pub fn dispatch(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self.listeners.lock().expect("lock poisoned").iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

/// A handle returned by [`ListenerRegistry::register`]. Dropping it leaves
/// the listener registered — call [`remove`](Self::remove) explicitly.
pub struct ListenerHandle<T> {
    id: u64,
    listeners: Arc<Mutex<Vec<(u64, Callback<T>)>>>,
}

impl<T> ListenerHandle<T> {
    pub fn remove(self) {
        self.listeners.lock().expect("lock poisoned").retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn listeners_fire_in_registration_order() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let a = Arc::clone(&seen);
        registry.register(move |event: &u32| a.lock().unwrap().push(("a", *event)));
        let b = Arc::clone(&seen);
        registry.register(move |event: &u32| b.lock().unwrap().push(("b", *event)));

        registry.dispatch(&1);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn removing_a_listener_during_dispatch_does_not_skip_a_later_one() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        // `first` removes itself the instant it runs; `second` must still fire
        // this same dispatch because the snapshot was already taken.
        let handle_slot: Arc<StdMutex<Option<ListenerHandle<u32>>>> = Arc::new(StdMutex::new(None));
        let handle_slot_clone = Arc::clone(&handle_slot);
        let first_seen = Arc::clone(&seen);
        let first = registry.register(move |_: &u32| {
            first_seen.lock().unwrap().push("first");
            if let Some(handle) = handle_slot_clone.lock().unwrap().take() {
                handle.remove();
            }
        });
        *handle_slot.lock().unwrap() = Some(first);

        let second_seen = Arc::clone(&seen);
        registry.register(move |_: &u32| second_seen.lock().unwrap().push("second"));

        registry.dispatch(&0);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);

        seen.lock().unwrap().clear();
        registry.dispatch(&0);
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }
}
