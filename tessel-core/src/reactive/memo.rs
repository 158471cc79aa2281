//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependency changed, the cache is returned.
//!
//! 3. When a dependency changes, the memo is marked dirty and forwards the
//!    invalidation to its own readers. It does not recompute yet.
//!
//! 4. On next access, a dirty memo recomputes, collecting a fresh set of
//!    dependencies.
//!
//! A memo nobody reads stays dirty and costs nothing.
//!
//! # Stopping
//!
//! A memo created inside an [`EffectScope`](super::EffectScope) is stopped
//! when the scope stops. A stopped memo drops its dependencies, ignores
//! invalidation, and evaluates its computation untracked on every read.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::scope::EffectScope;
use super::subscriber::{SourceId, SubscriberId};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed, or the memo never ran.
    Dirty,

    /// The memo was stopped and no longer caches.
    Stopped,
}

struct MemoInner<T> {
    source_id: SourceId,
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: Mutex<MemoState>,
    _handle: ReactiveHandle,
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(&self) -> T {
        // Marked clean before running so an invalidation that lands mid-run
        // leaves the memo dirty.
        *self.state.lock() = MemoState::Clean;
        Runtime::clear_dependencies(self.subscriber_id);

        let new_value = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.compute)()
        };

        *self.value.write() = Some(new_value.clone());
        new_value
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_dirty(&self) -> bool {
        let mut state = self.state.lock();
        if *state == MemoState::Clean {
            *state = MemoState::Dirty;
            true
        } else {
            false
        }
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }

    fn source_id(&self) -> Option<SourceId> {
        Some(self.source_id)
    }

    fn stop(&self) {
        *self.state.lock() = MemoState::Stopped;
        *self.value.write() = None;
        Runtime::clear_dependencies(self.subscriber_id);
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// Clones share the cache and identity.
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    /// If an effect scope is running, the memo joins it.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let subscriber_id = SubscriberId::new();
        let inner = Arc::new_cyclic(|weak: &Weak<MemoInner<T>>| {
            let weak: Weak<dyn Reactive> = weak.clone();
            MemoInner {
                source_id: SourceId::new(),
                subscriber_id,
                compute: Box::new(compute),
                value: RwLock::new(None),
                state: Mutex::new(MemoState::Dirty),
                _handle: Runtime::register(subscriber_id, weak),
            }
        });

        EffectScope::adopt(inner.clone());

        Self { inner }
    }

    /// Get the memo's source ID.
    pub fn id(&self) -> SourceId {
        self.inner.source_id
    }

    /// Get the subscriber ID used while computing.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        ReactiveContext::track_dependency(self.inner.source_id);

        let state = *self.inner.state.lock();
        match state {
            MemoState::Clean => {
                let cached = self.inner.value.read().clone();
                match cached {
                    Some(value) => value,
                    None => self.inner.recompute(),
                }
            }
            MemoState::Dirty => self.inner.recompute(),
            MemoState::Stopped => {
                let _ctx = ReactiveContext::untracked();
                (self.inner.compute)()
            }
        }
    }

    /// Force the memo to recompute on its next read.
    pub fn mark_dirty(&self) {
        self.inner.mark_dirty();
    }

    /// Stop the memo.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.lock()
    }

    /// Number of readers currently subscribed to this memo.
    pub fn dependent_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.source_id)
    }

    /// Number of sources this memo read on its last run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source_id.raw())
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
