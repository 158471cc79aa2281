//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph and propagates invalidation when a
//! source changes.
//!
//! # How It Works
//!
//! 1. Memos and effects register themselves (weakly) with the runtime.
//!
//! 2. When a computation reads a source, the runtime records the edge in
//!    both directions (source -> subscribers, subscriber -> sources).
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all subscribers of the source
//!    b. Marks each one dirty; only the clean -> dirty transition continues
//!    c. Memos are lazy: they forward the invalidation to their own readers
//!    d. Effects are eager: they are scheduled once all marking is done
//!
//! Because a dirty node is not marked again, any number of changes before the
//! next run cost a single schedule call per effect.
//!
//! # Thread Safety
//!
//! The graph lives in process-wide concurrent maps keyed by unique ids. The
//! tracking context stack is thread-local, so each thread tracks its own
//! computations.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{SourceId, SubscriberId};

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as stale.
    ///
    /// Returns `true` only when the value was clean before this call.
    fn mark_dirty(&self) -> bool;

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;

    /// The source readers subscribe to, for derived values.
    fn source_id(&self) -> Option<SourceId>;

    /// Stop reacting: drop all dependencies and ignore future invalidation.
    fn stop(&self);
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
#[derive(Debug)]
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl ReactiveHandle {
    /// The subscriber this handle keeps registered.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

struct Graph {
    registry: DashMap<SubscriberId, Weak<dyn Reactive>>,
    subscribers: DashMap<SourceId, IndexSet<SubscriberId>>,
    dependencies: DashMap<SubscriberId, SmallVec<[SourceId; 8]>>,
}

static GRAPH: OnceLock<Graph> = OnceLock::new();

fn graph() -> &'static Graph {
    GRAPH.get_or_init(|| Graph {
        registry: DashMap::new(),
        subscribers: DashMap::new(),
        dependencies: DashMap::new(),
    })
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Only a weak reference is kept. Returns a handle that unregisters the
    /// value when dropped.
    pub fn register(subscriber_id: SubscriberId, reactive: Weak<dyn Reactive>) -> ReactiveHandle {
        graph().registry.insert(subscriber_id, reactive);
        ReactiveHandle { subscriber_id }
    }

    /// Unregister a reactive value and drop its edges.
    fn unregister(id: SubscriberId) {
        graph().registry.remove(&id);
        Self::clear_dependencies(id);
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    pub fn add_dependency(source_id: SourceId, subscriber_id: SubscriberId) {
        let graph = graph();
        graph
            .subscribers
            .entry(source_id)
            .or_default()
            .insert(subscriber_id);

        let mut sources = graph.dependencies.entry(subscriber_id).or_default();
        if !sources.contains(&source_id) {
            sources.push(source_id);
        }
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation so stale dependencies do not
    /// survive, and when a computation is stopped.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let graph = graph();
        let Some((_, sources)) = graph.dependencies.remove(&subscriber_id) else {
            return;
        };

        for source_id in sources {
            if let Some(mut subscribers) = graph.subscribers.get_mut(&source_id) {
                subscribers.shift_remove(&subscriber_id);
            }
            graph
                .subscribers
                .remove_if(&source_id, |_, subscribers| subscribers.is_empty());
        }
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism.
    pub fn notify_source_change(source_id: SourceId) {
        let graph = graph();
        let subscriber_ids: Vec<SubscriberId> = graph
            .subscribers
            .get(&source_id)
            .map(|subscribers| subscribers.iter().copied().collect())
            .unwrap_or_default();

        if subscriber_ids.is_empty() {
            return;
        }

        trace!(source = source_id.raw(), subscribers = subscriber_ids.len(), "source changed");

        let reactives: Vec<Arc<dyn Reactive>> = subscriber_ids
            .into_iter()
            .filter_map(|id| graph.registry.get(&id).and_then(|weak| weak.upgrade()))
            .collect();

        let mut effects_to_run = Vec::new();

        for reactive in reactives {
            if !reactive.mark_dirty() {
                continue;
            }
            if reactive.is_eager() {
                effects_to_run.push(reactive);
            } else if let Some(derived) = reactive.source_id() {
                Self::notify_source_change(derived);
            }
        }

        for effect in effects_to_run {
            effect.schedule();
        }
    }

    /// Number of subscribers currently reading a source.
    pub fn subscriber_count(source_id: SourceId) -> usize {
        graph()
            .subscribers
            .get(&source_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Number of sources a subscriber currently reads.
    pub fn dependency_count(subscriber_id: SubscriberId) -> usize {
        graph()
            .dependencies
            .get(&subscriber_id)
            .map(|sources| sources.len())
            .unwrap_or(0)
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    struct MockReactive {
        id: SubscriberId,
        source: Option<SourceId>,
        dirty: AtomicBool,
        scheduled: AtomicI32,
        eager: bool,
    }

    impl MockReactive {
        fn new(eager: bool) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                source: (!eager).then(SourceId::new),
                dirty: AtomicBool::new(false),
                scheduled: AtomicI32::new(0),
                eager,
            })
        }

        fn register(self: &Arc<Self>) -> ReactiveHandle {
            let weak: Weak<dyn Reactive> = Arc::downgrade(self) as Weak<dyn Reactive>;
            Runtime::register(self.id, weak)
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn mark_dirty(&self) -> bool {
            !self.dirty.swap(true, Ordering::SeqCst)
        }

        fn schedule(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }

        fn source_id(&self) -> Option<SourceId> {
            self.source
        }

        fn stop(&self) {
            Runtime::clear_dependencies(self.id);
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;

        let handle = reactive.register();
        assert!(graph().registry.contains_key(&id));

        drop(handle);
        assert!(!graph().registry.contains_key(&id));
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = memo.register();
        let _effect_handle = effect.register();

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(source, effect.id);

        Runtime::notify_source_change(source);

        assert!(memo.dirty.load(Ordering::SeqCst));
        assert!(effect.dirty.load(Ordering::SeqCst));

        // Only the eager one is scheduled
        assert_eq!(memo.scheduled.load(Ordering::SeqCst), 0);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_coalesces_until_clean() {
        let effect = MockReactive::new(true);
        let source = SourceId::new();
        let _handle = effect.register();
        Runtime::add_dependency(source, effect.id);

        Runtime::notify_source_change(source);
        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);

        effect.dirty.store(false, Ordering::SeqCst);
        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn runtime_propagates_through_derived_values() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();
        let _memo_handle = memo.register();
        let _effect_handle = effect.register();

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);

        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_clears_dependencies() {
        let reactive = MockReactive::new(false);
        let source = SourceId::new();
        let _handle = reactive.register();

        Runtime::add_dependency(source, reactive.id);
        assert_eq!(Runtime::subscriber_count(source), 1);
        assert_eq!(Runtime::dependency_count(reactive.id), 1);

        Runtime::clear_dependencies(reactive.id);

        assert_eq!(Runtime::subscriber_count(source), 0);
        assert_eq!(Runtime::dependency_count(reactive.id), 0);
    }
}
