//! Class-style component integration.
//!
//! Two ways to make a [`Component`] re-render from what it reads:
//!
//! - Hold a [`ReactiveBase`] and route `render` / `will_unmount` through it.
//! - Wrap an existing component in [`MakeReactive`], which does the same by
//!   composition without touching the component's code.

use std::sync::Arc;

use crate::host::Component;
use crate::reactive::EffectScope;

use super::observe::{traverse, Traverse};
use super::track::{RequestRerender, TrackingContext};

/// Reusable tracking state for a class-style component.
///
/// Reactive data created through [`create_reactive_data`](Self::create_reactive_data)
/// lives in a per-instance scope and is stopped on teardown.
#[derive(Debug)]
pub struct ReactiveBase {
    context: TrackingContext,
    scope: EffectScope,
}

impl ReactiveBase {
    /// Create the base from the instance's force-update capability.
    pub fn new(force_update: RequestRerender) -> Self {
        Self {
            context: TrackingContext::new(force_update),
            scope: EffectScope::new(),
        }
    }

    /// Build per-instance reactive data inside the instance scope.
    pub fn create_reactive_data<T>(&self, factory: impl FnOnce() -> T) -> T {
        self.scope.run(factory)
    }

    /// Render through the tracking context.
    pub fn render_reactive<R>(&mut self, render: impl FnOnce() -> R) -> R {
        self.context.track(render)
    }

    /// Stop the instance scope and the render effect.
    pub fn teardown(&mut self) {
        self.scope.stop();
        self.context.untrack();
    }

    /// The tracking context.
    pub fn context(&self) -> &TrackingContext {
        &self.context
    }
}

/// Wraps a component so its render is tracked.
///
/// Render runs the inner render inside the tracking context; unmount stops
/// tracking and then forwards to the inner component.
pub struct MakeReactive<C> {
    inner: C,
    context: TrackingContext,
    observe: Option<Arc<dyn Traverse + Send + Sync>>,
}

impl<C: Component> MakeReactive<C> {
    /// Wrap `inner`, re-rendering through `force_update`.
    pub fn new(inner: C, force_update: RequestRerender) -> Self {
        Self {
            inner,
            context: TrackingContext::new(force_update),
            observe: None,
        }
    }

    /// Wrap `inner` and deep-read `value` before every render.
    pub fn observing(
        inner: C,
        force_update: RequestRerender,
        value: Arc<dyn Traverse + Send + Sync>,
    ) -> Self {
        Self {
            observe: Some(value),
            ..Self::new(inner, force_update)
        }
    }

    /// The wrapped component.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The wrapped component, mutably.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// The tracking context.
    pub fn context(&self) -> &TrackingContext {
        &self.context
    }
}

impl<C: Component> Component for MakeReactive<C> {
    type Output = C::Output;

    fn render(&mut self) -> C::Output {
        let Self {
            inner,
            context,
            observe,
        } = self;

        context.track(|| {
            if let Some(value) = observe {
                traverse(&**value);
            }
            inner.render()
        })
    }

    fn will_unmount(&mut self) {
        self.context.untrack();
        self.inner.will_unmount();
    }
}

/// Wrap `inner` so its render is tracked.
pub fn make_reactive<C: Component>(inner: C, force_update: RequestRerender) -> MakeReactive<C> {
    MakeReactive::new(inner, force_update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RenderHost;
    use crate::reactive::{Memo, Signal};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        base: ReactiveBase,
        count: Signal<i32>,
        doubled: Memo<i32>,
    }

    impl Counter {
        fn new(force_update: RequestRerender, count: Signal<i32>) -> Self {
            let base = ReactiveBase::new(force_update);
            let doubled = base.create_reactive_data(|| {
                let count = count.clone();
                Memo::new(move || count.get() * 2)
            });
            Self { base, count, doubled }
        }
    }

    impl Component for Counter {
        type Output = String;

        fn render(&mut self) -> String {
            let (count, doubled) = (&self.count, &self.doubled);
            self.base
                .render_reactive(|| format!("{} * 2 = {}", count.get(), doubled.get()))
        }

        fn will_unmount(&mut self) {
            self.base.teardown();
        }
    }

    struct Plain {
        source: Signal<u8>,
        unmounted: Arc<AtomicUsize>,
    }

    impl Component for Plain {
        type Output = u8;

        fn render(&mut self) -> u8 {
            self.source.get()
        }

        fn will_unmount(&mut self) {
            self.unmounted.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn base_component_rerenders_and_tears_down() {
        let count = Signal::new(1);
        let mut host = RenderHost::new();

        let shared = count.clone();
        let id = host.mount(move |force_update| Counter::new(force_update, shared));
        assert_eq!(host.output(id).unwrap(), "1 * 2 = 2");

        count.set(3);
        host.flush();
        assert_eq!(host.output(id).unwrap(), "3 * 2 = 6");

        host.unmount(id);
        // Neither the render nor the instance memo read it any more
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn wrapper_tracks_existing_component() {
        let source = Signal::new(4u8);
        let unmounted = Arc::new(AtomicUsize::new(0));
        let mut host = RenderHost::new();

        let (signal, counter) = (source.clone(), unmounted.clone());
        let id = host.mount(move |force_update| {
            make_reactive(
                Plain {
                    source: signal,
                    unmounted: counter,
                },
                force_update,
            )
        });

        source.set(9);
        assert_eq!(host.flush(), 1);
        assert_eq!(host.output(id), Some(&9));

        host.unmount(id);
        source.set(1);
        assert_eq!(host.pending(), 0);
        assert_eq!(unmounted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observing_wrapper_reads_extra_cells() {
        let source = Signal::new(0u8);
        let extra = Arc::new(vec![Signal::new(1u32), Signal::new(2u32)]);
        let mut host = RenderHost::new();

        let (signal, watched) = (source.clone(), extra.clone());
        let id = host.mount(move |force_update| {
            MakeReactive::observing(
                Plain {
                    source: signal,
                    unmounted: Arc::new(AtomicUsize::new(0)),
                },
                force_update,
                watched,
            )
        });

        extra[0].set(10);
        assert!(host.is_queued(id));
    }
}
