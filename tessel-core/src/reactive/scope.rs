//! Effect Scope
//!
//! An effect scope owns every memo and effect created while it is running,
//! so a whole group of reactive computations can be torn down at once.
//!
//! ```rust
//! use tessel_core::reactive::{EffectScope, Memo, MemoState, Signal};
//!
//! let count = Signal::new(1);
//! let scope = EffectScope::new();
//! let source = count.clone();
//! let doubled = scope.run(|| Memo::new(move || source.get() * 2));
//!
//! assert_eq!(doubled.get(), 2);
//! scope.stop();
//! assert_eq!(doubled.state(), MemoState::Stopped);
//! ```
//!
//! A scope is an explicit handle: `stop` must be called (or the last clone
//! dropped) to release its members. Creating a computation inside a scope
//! that is already stopped stops the new computation immediately.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::runtime::Reactive;

thread_local! {
    static ACTIVE_SCOPES: RefCell<Vec<EffectScope>> = const { RefCell::new(Vec::new()) };
}

static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

struct ScopeInner {
    id: u64,
    active: AtomicBool,
    members: Mutex<Vec<Arc<dyn Reactive>>>,
}

impl ScopeInner {
    fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let members = std::mem::take(&mut *self.members.lock());
        debug!(scope = self.id, members = members.len(), "effect scope stopped");
        for member in members {
            member.stop();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An ownership group of memos and effects.
#[derive(Clone)]
pub struct EffectScope {
    inner: Arc<ScopeInner>,
}

/// Pops the active scope even if the scoped closure panics.
struct ActiveScopeGuard;

impl Drop for ActiveScopeGuard {
    fn drop(&mut self) {
        ACTIVE_SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

impl EffectScope {
    /// Create a new, active scope.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: SCOPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                active: AtomicBool::new(true),
                members: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Run `f` with this scope collecting every memo and effect it creates.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        ACTIVE_SCOPES.with(|scopes| scopes.borrow_mut().push(self.clone()));
        let _guard = ActiveScopeGuard;
        f()
    }

    /// Stop every member. Stopping twice is a no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Whether the scope has not been stopped yet.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.inner.members.lock().len()
    }

    /// Whether the scope owns no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand a freshly created computation to the innermost running scope.
    pub(crate) fn adopt(member: Arc<dyn Reactive>) {
        let current = ACTIVE_SCOPES.with(|scopes| scopes.borrow().last().cloned());
        let Some(scope) = current else {
            return;
        };

        if scope.is_active() {
            scope.inner.members.lock().push(member);
        } else {
            member.stop();
        }
    }
}

impl Default for EffectScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .field("members", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Memo, MemoState, Signal};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn scope_collects_created_members() {
        let scope = EffectScope::new();
        let (memo, effect) = scope.run(|| (Memo::new(|| 1), Effect::new(|| {})));

        assert_eq!(scope.len(), 2);

        scope.stop();
        assert!(!scope.is_active());
        assert!(scope.is_empty());
        assert_eq!(memo.state(), MemoState::Stopped);
        assert!(effect.is_stopped());
    }

    #[test]
    fn members_outside_run_are_not_collected() {
        let scope = EffectScope::new();
        let _outside = Memo::new(|| 1);
        assert!(scope.is_empty());
    }

    #[test]
    fn scope_keeps_effects_alive() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));
        let scope = EffectScope::new();

        {
            let (source, counter) = (signal.clone(), runs.clone());
            // The handle is dropped right away; the scope still owns the effect.
            scope.run(|| {
                Effect::new(move || {
                    source.get();
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });
        }

        signal.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scope.stop();
        signal.set(2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn creating_inside_stopped_scope_stops_immediately() {
        let scope = EffectScope::new();
        scope.stop();
        scope.stop();

        let effect = scope.run(|| Effect::new_lazy(|| {}));
        assert!(effect.is_stopped());
    }
}
