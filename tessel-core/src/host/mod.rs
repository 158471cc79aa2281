//! Reference Host
//!
//! A minimal in-memory host that owns component instances and decides when
//! they render. It stands in for a real rendering engine in tests and demos:
//! it paints nothing and hands render output back to the caller.
//!
//! # Scheduling
//!
//! Each instance gets a force-update capability. Calling it only queues the
//! instance; nothing renders until [`RenderHost::flush`]. Queuing the same
//! instance several times before a flush results in one render. Instances
//! are rendered in mount order.
//!
//! # Lifecycle
//!
//! Mounting renders once. [`RenderHost::unmount`] runs the instance's
//! teardown exactly once; dropping the host unmounts whatever is left.

mod hooks;

pub use hooks::Hooks;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tracing::debug;

use crate::render::RequestRerender;

/// Unique identifier for a mounted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A class-style component: a value with render and teardown entry points.
pub trait Component: Send {
    /// What a render pass produces.
    type Output;

    /// Produce this instance's output.
    fn render(&mut self) -> Self::Output;

    /// Called once when the instance is removed.
    fn will_unmount(&mut self) {}
}

type FunctionBody<R> = Box<dyn FnMut(&mut Hooks) -> R + Send>;

enum Kind<R> {
    Function { hooks: Hooks, body: FunctionBody<R> },
    Class(Box<dyn Component<Output = R>>),
}

struct Instance<R> {
    kind: Kind<R>,
    output: Option<R>,
    renders: usize,
}

impl<R> Instance<R> {
    fn render(&mut self) {
        let output = match &mut self.kind {
            Kind::Function { hooks, body } => {
                hooks.begin_render();
                body(hooks)
            }
            Kind::Class(component) => component.render(),
        };
        self.output = Some(output);
        self.renders += 1;
    }

    fn unmount(mut self) {
        match &mut self.kind {
            Kind::Function { hooks, .. } => hooks.teardown(),
            Kind::Class(component) => component.will_unmount(),
        }
    }
}

/// Owns mounted instances and re-renders them on request.
pub struct RenderHost<R> {
    instances: IndexMap<InstanceId, Instance<R>>,
    queue: Arc<Mutex<IndexSet<InstanceId>>>,
}

impl<R> RenderHost<R> {
    /// Create an empty host.
    pub fn new() -> Self {
        Self {
            instances: IndexMap::new(),
            queue: Arc::new(Mutex::new(IndexSet::new())),
        }
    }

    fn force_update_for(&self, id: InstanceId) -> RequestRerender {
        let queue = Arc::clone(&self.queue);
        Arc::new(move || {
            queue.lock().insert(id);
        })
    }

    /// Mount a function component and render it once.
    pub fn mount_fn<F>(&mut self, body: F) -> InstanceId
    where
        F: FnMut(&mut Hooks) -> R + Send + 'static,
    {
        let id = InstanceId::new();
        let hooks = Hooks::new(self.force_update_for(id));
        self.insert(
            id,
            Kind::Function {
                hooks,
                body: Box::new(body),
            },
        )
    }

    /// Mount a class-style component built from its force-update capability
    /// and render it once.
    pub fn mount<C, F>(&mut self, factory: F) -> InstanceId
    where
        C: Component<Output = R> + 'static,
        F: FnOnce(RequestRerender) -> C,
    {
        let id = InstanceId::new();
        let component = factory(self.force_update_for(id));
        self.insert(id, Kind::Class(Box::new(component)))
    }

    fn insert(&mut self, id: InstanceId, kind: Kind<R>) -> InstanceId {
        let mut instance = Instance {
            kind,
            output: None,
            renders: 0,
        };
        instance.render();
        self.instances.insert(id, instance);
        debug!(instance = id.raw(), "mounted");
        id
    }

    /// Render every queued instance once. Returns how many rendered.
    ///
    /// Requests made while flushing stay queued for the next flush.
    pub fn flush(&mut self) -> usize {
        let queued: Vec<InstanceId> = {
            let mut queue = self.queue.lock();
            let mut ids: Vec<InstanceId> = queue.drain(..).collect();
            ids.sort();
            ids
        };

        let mut rendered = 0;
        for id in queued {
            if let Some(instance) = self.instances.get_mut(&id) {
                instance.render();
                rendered += 1;
            }
        }

        if rendered > 0 {
            debug!(rendered, "flushed render queue");
        }
        rendered
    }

    /// Render an instance now, regardless of the queue.
    pub fn render(&mut self, id: InstanceId) -> Option<&R> {
        let instance = self.instances.get_mut(&id)?;
        instance.render();
        instance.output.as_ref()
    }

    /// Remove an instance, running its teardown. `false` if it was not mounted.
    pub fn unmount(&mut self, id: InstanceId) -> bool {
        self.queue.lock().shift_remove(&id);
        match self.instances.shift_remove(&id) {
            Some(instance) => {
                instance.unmount();
                debug!(instance = id.raw(), "unmounted");
                true
            }
            None => false,
        }
    }

    /// Output of the latest render of an instance.
    pub fn output(&self, id: InstanceId) -> Option<&R> {
        self.instances.get(&id)?.output.as_ref()
    }

    /// How many times an instance has rendered.
    pub fn render_count(&self, id: InstanceId) -> usize {
        self.instances.get(&id).map(|instance| instance.renders).unwrap_or(0)
    }

    /// Whether an instance is waiting for the next flush.
    pub fn is_queued(&self, id: InstanceId) -> bool {
        self.queue.lock().contains(&id)
    }

    /// Number of instances waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether an instance is mounted.
    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }
}

impl<R> Default for RenderHost<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Drop for RenderHost<R> {
    fn drop(&mut self) {
        for (_, instance) in self.instances.drain(..).rev() {
            instance.unmount();
        }
    }
}
