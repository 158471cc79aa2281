//! Store construction options.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::StoreError;

use super::context::ActionContext;
use super::getters::Getters;

/// Argument passed to mutations and actions. Absent payloads are `Null`.
pub type Payload = Value;

/// Future returned by an action.
pub type ActionResult = BoxFuture<'static, Result<Value, StoreError>>;

/// Derives a value from state and the other getters.
pub type GetterFn<S> = Arc<dyn Fn(&S, &Getters<S>) -> Value + Send + Sync>;

/// Changes state in place.
pub type MutationFn<S> = Arc<dyn Fn(&mut S, Payload) + Send + Sync>;

/// Runs a workflow against the store.
pub type ActionFn<S> = Arc<dyn Fn(ActionContext<S>, Payload) -> ActionResult + Send + Sync>;

/// Getter definitions, used at construction and by
/// [`Store::hot_update`](super::Store::hot_update).
pub struct GetterDefs<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) defs: IndexMap<String, GetterFn<S>>,
}

impl<S> GetterDefs<S>
where
    S: Send + Sync + 'static,
{
    /// An empty set of definitions.
    pub fn new() -> Self {
        Self {
            defs: IndexMap::new(),
        }
    }

    /// Add a getter. A later definition with the same name replaces the
    /// earlier one.
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&S, &Getters<S>) -> Value + Send + Sync + 'static,
    {
        self.defs.insert(name.into(), Arc::new(getter));
        self
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether there are no definitions.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl<S> Default for GetterDefs<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [`Store`](super::Store).
///
/// ```rust
/// use serde_json::json;
/// use tessel_core::store::{Store, StoreOptions};
///
/// #[derive(Clone)]
/// struct Counter {
///     count: i64,
/// }
///
/// let store = Store::new(
///     StoreOptions::new()
///         .state(Counter { count: 0 })
///         .getter("double", |s: &Counter, _| json!(s.count * 2))
///         .mutation("add", |s: &mut Counter, n| s.count += n.as_i64().unwrap_or(1)),
/// )
/// .unwrap();
///
/// store.commit("add", json!(3)).unwrap();
/// assert_eq!(store.getter("double").unwrap(), json!(6));
/// ```
pub struct StoreOptions<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) state: Option<S>,
    pub(crate) getters: GetterDefs<S>,
    pub(crate) mutations: IndexMap<String, MutationFn<S>>,
    pub(crate) actions: IndexMap<String, ActionFn<S>>,
}

impl<S> StoreOptions<S>
where
    S: Send + Sync + 'static,
{
    /// Options with no state and empty tables.
    pub fn new() -> Self {
        Self {
            state: None,
            getters: GetterDefs::new(),
            mutations: IndexMap::new(),
            actions: IndexMap::new(),
        }
    }

    /// Set the initial state.
    pub fn state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }

    /// Add a getter.
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&S, &Getters<S>) -> Value + Send + Sync + 'static,
    {
        self.getters = self.getters.getter(name, getter);
        self
    }

    /// Replace all getters at once.
    pub fn getters(mut self, getters: GetterDefs<S>) -> Self {
        self.getters = getters;
        self
    }

    /// Add a mutation.
    pub fn mutation<F>(mut self, name: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(&mut S, Payload) + Send + Sync + 'static,
    {
        self.mutations.insert(name.into(), Arc::new(mutation));
        self
    }

    /// Add an action. The handler runs when dispatched; the future it
    /// returns runs when polled.
    pub fn action<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext<S>, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, StoreError>> + Send + 'static,
    {
        let action: ActionFn<S> = Arc::new(
            move |context: ActionContext<S>, payload: Payload| -> ActionResult {
                action(context, payload).boxed()
            },
        );
        self.actions.insert(name.into(), action);
        self
    }
}

impl<S> Default for StoreOptions<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
