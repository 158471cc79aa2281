//! Render Tracking
//!
//! Connects an opaque render callback to the reactive graph.
//!
//! Each render pass runs inside a brand-new tracked effect. The effect's
//! scheduler does not recompute anything: it asks the host to re-render, and
//! the host calls [`TrackingContext::track`] again when it gets to it. That
//! next pass stops the old effect first, so only what the latest pass read
//! stays subscribed.

use std::sync::Arc;

use tracing::trace;

use crate::reactive::Effect;

/// Host capability that makes the host re-invoke a component's render.
///
/// The host chooses when; calling it twice before a render pass may result
/// in a single pass.
pub type RequestRerender = Arc<dyn Fn() + Send + Sync>;

/// Per-component-instance tracking state.
///
/// Holds at most one live effect. Dropping the context stops it.
pub struct TrackingContext {
    active_effect: Option<Effect>,
    request_rerender: RequestRerender,
}

impl TrackingContext {
    /// Create an untracked context.
    pub fn new(request_rerender: RequestRerender) -> Self {
        Self {
            active_effect: None,
            request_rerender,
        }
    }

    /// Create an untracked context from a plain closure.
    pub fn from_fn<F>(request_rerender: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(Arc::new(request_rerender))
    }

    /// Run `render` once, subscribing this context to exactly what it reads.
    ///
    /// Any previous effect is stopped before the new pass starts. A change to
    /// something `render` read, including a change made by `render` itself,
    /// only results in a later `request_rerender` call.
    pub fn track<R>(&mut self, render: impl FnOnce() -> R) -> R {
        self.untrack();

        let request_rerender = Arc::clone(&self.request_rerender);
        let effect = Effect::tracked(move || request_rerender());
        trace!(effect = effect.id(), "render pass started");

        let output = effect.run_with(render);
        self.active_effect = Some(effect);
        output
    }

    /// Stop the live effect, if any. Safe to call repeatedly.
    pub fn untrack(&mut self) {
        if let Some(effect) = self.active_effect.take() {
            trace!(effect = effect.id(), "render effect stopped");
            effect.stop();
        }
    }

    /// Whether a live effect is held.
    pub fn is_tracking(&self) -> bool {
        self.active_effect.is_some()
    }

    /// Number of sources the last render pass read.
    pub fn dependency_count(&self) -> usize {
        self.active_effect
            .as_ref()
            .map(Effect::dependency_count)
            .unwrap_or(0)
    }

    /// Invoke the host's re-render capability directly.
    pub fn request_rerender(&self) {
        (self.request_rerender)();
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        self.untrack();
    }
}

impl std::fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingContext")
            .field("active_effect", &self.active_effect)
            .finish()
    }
}

/// Run `render` under `context`. See [`TrackingContext::track`].
pub fn track<R>(context: &mut TrackingContext, render: impl FnOnce() -> R) -> R {
    context.track(render)
}

/// Stop tracking for `context`. See [`TrackingContext::untrack`].
pub fn untrack(context: &mut TrackingContext) {
    context.untrack();
}
