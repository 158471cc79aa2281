//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive: a mutable cell that
//! records its readers and notifies them on write.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect/render),
//!    the signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, the runtime marks every subscriber
//!    dirty and schedules the eager ones.
//!
//! 3. A write never re-runs anything inline beyond what the subscribers'
//!    schedulers decide to do.
//!
//! # Locking
//!
//! The value sits behind a `parking_lot::RwLock`. Reads take a recursive
//! read lock so nested reads of the same signal (a getter reading state
//! while another getter already does) do not block. Writing from inside a
//! `with` closure on the same signal deadlocks and is a caller error.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::SourceId;

/// A reactive signal holding a value of type T.
///
/// Clones share the same value and identity.
///
/// # Example
///
/// ```rust
/// use tessel_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Send + Sync + 'static,
{
    id: SourceId,
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: SourceId::new(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Get a clone of the current value, tracking the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        ReactiveContext::track_dependency(self.id);
        self.with_untracked(f)
    }

    /// Borrow the current value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read_recursive();
        f(&guard)
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.notify();
    }

    /// Replace the value, returning the previous one, and notify subscribers.
    pub fn replace(&self, value: T) -> T {
        let previous = std::mem::replace(&mut *self.value.write(), value);
        self.notify();
        previous
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// The write lock is released before subscribers are notified.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.value.write();
            f(&mut guard)
        };
        self.notify();
        result
    }

    /// Notify subscribers without changing the value.
    pub fn notify(&self) {
        Runtime::notify_source_change(self.id);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with_untracked(|value| {
            f.debug_struct("Signal")
                .field("id", &self.id.raw())
                .field("value", value)
                .field("subscriber_count", &self.subscriber_count())
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::SubscriberId;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_modify_in_place() {
        let signal = Signal::new(vec![1, 2]);
        let len = signal.modify(|v| {
            v.push(3);
            v.len()
        });
        assert_eq!(len, 3);
        assert_eq!(signal.get_untracked(), vec![1, 2, 3]);
    }

    #[test]
    fn signal_replace_returns_previous() {
        let signal = Signal::new("a".to_string());
        assert_eq!(signal.replace("b".to_string()), "a");
        assert_eq!(signal.get(), "b");
    }

    #[test]
    fn signal_read_registers_subscriber() {
        let signal = Signal::new(1);
        let id = SubscriberId::new();

        {
            let _ctx = ReactiveContext::enter(id);
            signal.get();
        }
        assert_eq!(signal.subscriber_count(), 1);

        signal.get_untracked();
        Runtime::clear_dependencies(id);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
    }
}
