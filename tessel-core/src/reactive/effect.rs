//! Effect Implementation
//!
//! An Effect is a computation that reacts when the sources it read change.
//!
//! # How Effects Work
//!
//! 1. Running an effect clears its old dependencies and tracks new ones
//!    during execution.
//!
//! 2. When any dependency changes, the effect is marked dirty and
//!    *scheduled*. Without a custom scheduler, scheduling re-runs the body
//!    synchronously. With one, the scheduler decides what happens; the body
//!    is not touched.
//!
//! 3. A dirty effect is scheduled once. Further changes before the next run
//!    are absorbed.
//!
//! # Tracked effects
//!
//! [`Effect::tracked`] builds an effect with a scheduler and no stored body.
//! Work is run through it with [`Effect::run_with`], which accepts a borrowed
//! `FnOnce`. This is what render tracking uses: each render pass runs once,
//! and later invalidations only reach the scheduler.
//!
//! # Differences from Memo
//!
//! - Memos return a cached value; effects return whatever the run returns.
//! - Memos are lazy; effects are eager and get scheduled on invalidation.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::scope::EffectScope;
use super::subscriber::{SourceId, SubscriberId};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Callback invoked instead of re-running an effect.
pub type Scheduler = Arc<dyn Fn() + Send + Sync>;

type Body = Arc<dyn Fn() + Send + Sync>;

/// Options for [`Effect::with_options`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Do not run on creation.
    pub lazy: bool,
    /// Called on invalidation instead of re-running the body.
    pub scheduler: Option<Scheduler>,
}

impl std::fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

struct EffectInner {
    id: u64,
    subscriber_id: SubscriberId,
    body: Option<Body>,
    scheduler: Option<Scheduler>,
    dirty: AtomicBool,
    stopped: AtomicBool,
    run_count: AtomicUsize,
    _handle: ReactiveHandle,
}

impl EffectInner {
    fn run_tracked<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.stopped.load(Ordering::SeqCst) {
            return f();
        }

        self.dirty.store(false, Ordering::SeqCst);
        Runtime::clear_dependencies(self.subscriber_id);

        let result = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            f()
        };

        self.run_count.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn execute(&self) {
        if let Some(body) = &self.body {
            let body = Arc::clone(body);
            self.run_tracked(|| body());
        }
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_dirty(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && !self.dirty.swap(true, Ordering::SeqCst)
    }

    fn schedule(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        trace!(effect = self.id, "effect scheduled");
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => self.execute(),
        }
    }

    fn is_eager(&self) -> bool {
        true
    }

    fn source_id(&self) -> Option<SourceId> {
        None
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            trace!(effect = self.id, "effect stopped");
            Runtime::clear_dependencies(self.subscriber_id);
        }
    }
}

/// A computation that reacts when its dependencies change.
///
/// Clones share the same effect. Dropping the last clone unregisters it.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
/// use tessel_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Arc::new(AtomicI32::new(-1));
///
/// let (source, sink) = (count.clone(), seen.clone());
/// let _effect = Effect::new(move || sink.store(source.get(), Ordering::SeqCst));
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_options(run, EffectOptions::default())
    }

    /// Create a new effect without running it immediately.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_options(
            run,
            EffectOptions {
                lazy: true,
                scheduler: None,
            },
        )
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(run: F, options: EffectOptions) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::build(Some(Arc::new(run)), options.scheduler);
        if !options.lazy {
            effect.execute();
        }
        effect
    }

    /// Create a lazy effect with no stored body.
    ///
    /// Dependencies come from [`run_with`](Self::run_with); invalidation
    /// only ever calls `scheduler`.
    pub fn tracked<F>(scheduler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(None, Some(Arc::new(scheduler)))
    }

    fn build(body: Option<Body>, scheduler: Option<Scheduler>) -> Self {
        let subscriber_id = SubscriberId::new();
        let id = next_effect_id();
        let inner = Arc::new_cyclic(|weak: &Weak<EffectInner>| {
            let weak: Weak<dyn Reactive> = weak.clone();
            EffectInner {
                id,
                subscriber_id,
                body,
                scheduler,
                dirty: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
                _handle: Runtime::register(subscriber_id, weak),
            }
        });
        trace!(effect = id, "effect created");

        EffectScope::adopt(inner.clone());

        Self { inner }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Run the stored body, re-collecting dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Run `f` as this effect, re-collecting dependencies from its reads.
    ///
    /// On a stopped effect `f` still runs, but nothing is tracked for it.
    pub fn run_with<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.run_tracked(f)
    }

    /// Schedule the effect as if a dependency changed.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Stop the effect. Stopping twice is a no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Check if the effect has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Check if a dependency changed since the last run.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
