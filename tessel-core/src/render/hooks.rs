//! Function-style component integration.
//!
//! These build on the host's [`Hooks`] slot storage. The central one is
//! [`use_render`]: call it at the end of a function component and return
//! its result.
//!
//! ```rust
//! use tessel_core::host::RenderHost;
//! use tessel_core::reactive::Signal;
//! use tessel_core::render::use_render;
//!
//! let count = Signal::new(0);
//! let mut host = RenderHost::new();
//!
//! let source = count.clone();
//! let id = host.mount_fn(move |hooks| {
//!     let source = source.clone();
//!     use_render(hooks, move || format!("count: {}", source.get())).unwrap()
//! });
//!
//! count.set(1);
//! host.flush();
//! assert_eq!(host.output(id).unwrap(), "count: 1");
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HookError;
use crate::host::Hooks;
use crate::reactive::{Memo, Signal};

use super::observe::{traverse, Traverse};
use super::track::{RequestRerender, TrackingContext};

/// The instance's force-update capability.
pub fn use_force_update(hooks: &Hooks) -> RequestRerender {
    hooks.use_force_update()
}

/// A per-instance value created once by `factory`.
pub fn use_mutable<T>(hooks: &mut Hooks, factory: impl FnOnce() -> T) -> Result<&mut T, HookError>
where
    T: Send + 'static,
{
    hooks.use_mutable(factory)
}

/// A shared per-instance bundle created once by `factory`.
///
/// The returned handle can be captured by the render closure and by event
/// callbacks alike.
pub fn use_data<T>(hooks: &mut Hooks, factory: impl FnOnce() -> T) -> Result<Arc<T>, HookError>
where
    T: Send + Sync + 'static,
{
    hooks.use_mutable(|| Arc::new(factory())).map(|data| Arc::clone(data))
}

/// A per-instance reactive cell initialised once by `factory`.
pub fn use_reactive<T>(hooks: &mut Hooks, factory: impl FnOnce() -> T) -> Result<Signal<T>, HookError>
where
    T: Send + Sync + 'static,
{
    hooks.use_mutable(|| Signal::new(factory())).map(|signal| signal.clone())
}

/// A per-instance memo over `compute`, created once.
pub fn use_computed<T, F>(hooks: &mut Hooks, compute: F) -> Result<Memo<T>, HookError>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    hooks.use_mutable(|| Memo::new(compute)).map(|memo| memo.clone())
}

/// Track `render` for this instance.
///
/// The first call creates the instance's tracking context and registers its
/// teardown; every call runs `render` under a fresh subscription set.
pub fn use_render<R>(hooks: &mut Hooks, render: impl FnOnce() -> R) -> Result<R, HookError> {
    let force_update = hooks.use_force_update();
    let context = hooks
        .use_mutable(|| Arc::new(Mutex::new(TrackingContext::new(force_update))))?
        .clone();

    let teardown = Arc::clone(&context);
    hooks.use_teardown(move || teardown.lock().untrack())?;

    let output = context.lock().track(render);
    Ok(output)
}

/// Like [`use_render`], but first deep-reads `value` so the render also
/// depends on every cell reachable from it.
pub fn use_render_observed<T, R>(
    hooks: &mut Hooks,
    value: &T,
    render: impl FnOnce() -> R,
) -> Result<R, HookError>
where
    T: Traverse + ?Sized,
{
    use_render(hooks, || {
        traverse(value);
        render()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RenderHost;

    #[test]
    fn rerenders_only_on_read_changes() {
        let shown = Signal::new(1);
        let hidden = Signal::new(2);
        let mut host = RenderHost::new();

        let source = shown.clone();
        let id = host.mount_fn(move |hooks| {
            let source = source.clone();
            use_render(hooks, move || source.get()).unwrap()
        });

        hidden.set(20);
        assert_eq!(host.pending(), 0);

        shown.set(10);
        assert!(host.is_queued(id));
        host.flush();
        assert_eq!(host.output(id), Some(&10));
    }

    #[test]
    fn local_state_persists_across_renders() {
        let mut host = RenderHost::new();
        let clicks: Arc<Mutex<Option<Signal<u32>>>> = Arc::new(Mutex::new(None));
        let handle = clicks.clone();

        let id = host.mount_fn(move |hooks| {
            let local = use_reactive(hooks, || 0u32).unwrap();
            let doubled = {
                let local = local.clone();
                use_computed(hooks, move || local.get() * 2).unwrap()
            };
            *handle.lock() = Some(local.clone());
            use_render(hooks, move || (local.get(), doubled.get())).unwrap()
        });

        let local = clicks.lock().clone().unwrap();
        local.update(|n| n + 1);
        local.update(|n| n + 1);
        assert_eq!(host.flush(), 1);
        assert_eq!(host.output(id), Some(&(2, 4)));
    }

    #[test]
    fn unmount_untracks() {
        let count = Signal::new(0);
        let mut host = RenderHost::new();

        let source = count.clone();
        let id = host.mount_fn(move |hooks| {
            let source = source.clone();
            use_render(hooks, move || source.get()).unwrap()
        });
        assert_eq!(count.subscriber_count(), 1);

        host.unmount(id);
        assert_eq!(count.subscriber_count(), 0);

        count.set(1);
        assert_eq!(host.pending(), 0);
    }

    #[test]
    fn observed_values_subscribe_the_render() {
        let items = vec![Signal::new(1), Signal::new(2)];
        let mut host = RenderHost::new();

        let watched = items.clone();
        let id = host.mount_fn(move |hooks| use_render_observed(hooks, &watched, || "static").unwrap());

        items[1].set(5);
        assert!(host.is_queued(id));
    }

    #[test]
    fn use_data_is_created_once() {
        let mut host = RenderHost::new();
        let created = Arc::new(Mutex::new(0));
        let counter = created.clone();

        let id = host.mount_fn(move |hooks| {
            let counter = counter.clone();
            let data = use_data(hooks, move || {
                *counter.lock() += 1;
                "bundle"
            })
            .unwrap();
            *data
        });

        host.render(id);
        host.render(id);
        assert_eq!(*created.lock(), 1);
    }
}
