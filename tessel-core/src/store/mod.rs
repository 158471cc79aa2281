//! Store Engine
//!
//! A centralized state container. State lives in one reactive cell and is
//! changed only through named mutations (or a wholesale
//! [`replace_state`](Store::replace_state)). Getters are memoized derived
//! values created lazily on first read. Actions are async workflows that can
//! read state and getters, commit mutations and dispatch other actions.
//!
//! Because state is a reactive cell, any tracked render or getter that reads
//! it re-runs after a commit.
//!
//! # Errors
//!
//! `commit` fails synchronously on an unknown name. `dispatch` never fails
//! synchronously: an unknown name yields a future that resolves to
//! [`StoreError::UnknownAction`].
//!
//! # Granularity
//!
//! The whole state is a single cell, so any commit invalidates every reader
//! of state. Put [`Signal`]s inside the state for finer-grained tracking.

mod context;
mod getters;
mod options;

pub use context::{ActionContext, BoundAction, BoundMutation};
pub use getters::Getters;
pub use options::{
    ActionFn, ActionResult, GetterDefs, GetterFn, MutationFn, Payload, StoreOptions,
};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future;
use futures_util::FutureExt;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::reactive::Signal;

struct StoreInner<S>
where
    S: Send + Sync + 'static,
{
    state: Signal<S>,
    /// Bumped by hot updates so readers of replaced getters re-read.
    getter_epoch: Signal<u64>,
    getters: RwLock<Option<Getters<S>>>,
    mutations: RwLock<Option<IndexMap<String, MutationFn<S>>>>,
    actions: RwLock<Option<IndexMap<String, ActionFn<S>>>>,
    disposed: AtomicBool,
}

/// A handle to a store. Clones share the same store.
pub struct Store<S>
where
    S: Send + Sync + 'static,
{
    inner: Arc<StoreInner<S>>,
}

/// Create a store from options.
pub fn create_store<S>(options: StoreOptions<S>) -> Result<Store<S>, StoreError>
where
    S: Send + Sync + 'static,
{
    Store::new(options)
}

impl<S> Store<S>
where
    S: Send + Sync + 'static,
{
    /// Create a store. Fails with [`StoreError::MissingState`] if no state
    /// was given.
    pub fn new(options: StoreOptions<S>) -> Result<Self, StoreError> {
        let StoreOptions {
            state,
            getters,
            mutations,
            actions,
        } = options;
        let state = Signal::new(state.ok_or(StoreError::MissingState)?);

        debug!(
            getters = getters.len(),
            mutations = mutations.len(),
            actions = actions.len(),
            "store created"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                getters: RwLock::new(Some(Getters::build(state.clone(), getters))),
                state,
                getter_epoch: Signal::new(0),
                mutations: RwLock::new(Some(mutations)),
                actions: RwLock::new(Some(actions)),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Apply a mutation to state and notify its readers before returning.
    pub fn commit(&self, name: &str, payload: Payload) -> Result<(), StoreError> {
        let mutation = {
            let mutations = self.inner.mutations.read();
            let table = mutations.as_ref().ok_or(StoreError::Disposed)?;
            table
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::UnknownMutation(name.to_string()))?
        };

        debug!(mutation = name, "commit");
        self.inner.state.modify(|state| mutation(state, payload));
        Ok(())
    }

    /// Start an action.
    ///
    /// The handler runs now; the future it returns runs when polled. Unknown
    /// names and disposed stores give a future that resolves to an error.
    pub fn dispatch(&self, name: &str, payload: Payload) -> ActionResult {
        let action = {
            let actions = self.inner.actions.read();
            match actions.as_ref() {
                Some(table) => table.get(name).cloned(),
                None => return future::ready(Err(StoreError::Disposed)).boxed(),
            }
        };

        match action {
            Some(action) => {
                debug!(action = name, "dispatch");
                action(ActionContext::new(self.clone()), payload)
            }
            None => {
                debug!(action = name, "dispatch of unknown action");
                future::ready(Err(StoreError::UnknownAction(name.to_string()))).boxed()
            }
        }
    }

    /// Borrow the current state, tracking the read.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.inner.state.with(f)
    }

    /// Clone the current state, tracking the read.
    pub fn state(&self) -> S
    where
        S: Clone,
    {
        self.inner.state.get()
    }

    /// Swap in a new state. Readers of state are invalidated.
    pub fn replace_state(&self, state: S) -> Result<(), StoreError> {
        self.ensure_live()?;
        debug!("replace state");
        self.inner.state.set(state);
        Ok(())
    }

    /// Read a getter, tracking the read.
    pub fn getter(&self, name: &str) -> Result<Value, StoreError> {
        self.getters()?.get(name)
    }

    /// Read a getter, deserialized.
    pub fn getter_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.getter(name)?)?)
    }

    /// The current getter table.
    ///
    /// A tracked reader of this table is invalidated when a hot update
    /// replaces it.
    pub fn getters(&self) -> Result<Getters<S>, StoreError> {
        self.inner.getter_epoch.with(|_| ());
        self.inner.getters.read().clone().ok_or(StoreError::Disposed)
    }

    /// Replace the getter definitions.
    ///
    /// The old getters are stopped and new ones are built against the current
    /// state. Mutations and actions are untouched.
    pub fn hot_update(&self, getters: GetterDefs<S>) -> Result<(), StoreError> {
        {
            let mut current = self.inner.getters.write();
            let previous = current.as_ref().ok_or(StoreError::Disposed)?;
            previous.stop();
            debug!(getters = getters.len(), "hot update");
            *current = Some(Getters::build(self.inner.state.clone(), getters));
        }

        self.inner.getter_epoch.modify(|epoch| *epoch += 1);
        Ok(())
    }

    /// Stop all getters and detach the handler tables. Disposing twice is a
    /// no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(getters) = self.inner.getters.write().take() {
            getters.stop();
        }
        self.inner.mutations.write().take();
        self.inner.actions.write().take();
        debug!("store disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// A mutation bound to this store, or `None` if it is not defined.
    pub fn mutation(&self, name: &str) -> Option<BoundMutation<S>> {
        self.has_mutation(name)
            .then(|| BoundMutation::new(self.clone(), name.to_string()))
    }

    /// An action bound to this store, or `None` if it is not defined.
    pub fn action(&self, name: &str) -> Option<BoundAction<S>> {
        self.has_action(name)
            .then(|| BoundAction::new(self.clone(), name.to_string()))
    }

    /// Whether a mutation with this name is defined.
    pub fn has_mutation(&self, name: &str) -> bool {
        self.inner
            .mutations
            .read()
            .as_ref()
            .is_some_and(|table| table.contains_key(name))
    }

    /// Whether an action with this name is defined.
    pub fn has_action(&self, name: &str) -> bool {
        self.inner
            .actions
            .read()
            .as_ref()
            .is_some_and(|table| table.contains_key(name))
    }

    /// Mutation names in definition order. Empty once disposed.
    pub fn mutation_names(&self) -> Vec<String> {
        self.inner
            .mutations
            .read()
            .as_ref()
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Action names in definition order. Empty once disposed.
    pub fn action_names(&self) -> Vec<String> {
        self.inner
            .actions
            .read()
            .as_ref()
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Getter names in definition order. Empty once disposed.
    pub fn getter_names(&self) -> Vec<String> {
        self.inner
            .getters
            .read()
            .as_ref()
            .map(Getters::names)
            .unwrap_or_default()
    }

    /// Snapshot of state and every getter as
    /// `{"state": .., "getters": {..}}`.
    pub fn to_json(&self) -> Result<Value, StoreError>
    where
        S: Serialize,
    {
        let state = self.inner.state.with(|state| serde_json::to_value(state))?;
        let getters = self.getters()?;

        let mut values = Map::new();
        for name in getters.names() {
            let value = getters.get(&name)?;
            values.insert(name, value);
        }

        Ok(json!({ "state": state, "getters": values }))
    }

    fn ensure_live(&self) -> Result<(), StoreError> {
        if self.is_disposed() {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<S> Clone for Store<S>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Display for Store<S>
where
    S: Serialize + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(snapshot) => write!(f, "{snapshot}"),
            Err(err) => write!(f, "<store: {err}>"),
        }
    }
}

impl<S> fmt::Debug for Store<S>
where
    S: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("getters", &self.getter_names())
            .field("mutations", &self.mutation_names())
            .field("actions", &self.action_names())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use futures_util::FutureExt;
    use serde::Deserialize;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: i64,
    }

    fn counter_store() -> Store<Counter> {
        Store::new(
            StoreOptions::new()
                .state(Counter { count: 0 })
                .getter("doubleCount", |s: &Counter, _| json!(s.count * 2))
                .mutation("add", |s: &mut Counter, n| s.count += n.as_i64().unwrap_or(1))
                .action("fail", |_, _| async { Err(StoreError::action("nope")) })
                .action("addLater", |ctx, n| async move {
                    ctx.commit("add", n)?;
                    Ok(json!(ctx.state().count))
                }),
        )
        .unwrap()
    }

    #[test]
    fn missing_state_is_a_construction_error() {
        let result = Store::new(StoreOptions::<Counter>::new());
        assert!(matches!(result, Err(StoreError::MissingState)));
    }

    #[test]
    fn commit_changes_state_in_place() {
        let store = counter_store();

        store.commit("add", Value::Null).unwrap();
        assert_eq!(store.state().count, 1);

        store.commit("add", json!(5)).unwrap();
        assert_eq!(store.state().count, 6);
        assert_eq!(store.getter("doubleCount").unwrap(), json!(12));
    }

    #[test]
    fn unknown_mutation_fails_fast() {
        let store = counter_store();

        let err = store.commit("remove", json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "unknown mutation: remove");
        assert_eq!(store.state().count, 0);
    }

    #[test]
    fn unknown_action_fails_softly() {
        let store = counter_store();

        let pending = store.dispatch("reset", Value::Null);
        let err = pending.now_or_never().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "unknown action: reset");
    }

    #[test]
    fn action_errors_propagate() {
        let store = counter_store();

        let err = store.dispatch("fail", Value::Null).now_or_never().unwrap();
        assert!(matches!(err, Err(StoreError::Action(message)) if message == "nope"));
    }

    #[test]
    fn action_body_runs_when_polled() {
        let store = counter_store();

        let pending = store.dispatch("addLater", json!(2));
        assert_eq!(store.state().count, 0);

        assert_eq!(pending.now_or_never().unwrap().unwrap(), json!(2));
        assert_eq!(store.state().count, 2);
    }

    #[test]
    fn commit_invalidates_tracked_readers() {
        let store = counter_store();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let effect = Effect::tracked(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        effect.run_with(|| store.getter("doubleCount").unwrap());

        store.commit("add", Value::Null).unwrap();
        store.commit("add", Value::Null).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        effect.stop();
    }

    #[test]
    fn replace_state_is_observed() {
        let store = counter_store();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let effect = Effect::tracked(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        effect.run_with(|| store.with_state(|s| s.count));

        store.replace_state(Counter { count: 10 }).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(store.getter_as::<i64>("doubleCount").unwrap(), 20);
        effect.stop();
    }

    #[test]
    fn hot_update_invalidates_getter_readers() {
        let store = counter_store();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let effect = Effect::tracked(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        effect.run_with(|| store.getter("doubleCount").unwrap());

        store
            .hot_update(GetterDefs::new().getter("doubleCount", |s: &Counter, _| json!(s.count * 20)))
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        effect.stop();
    }

    #[test]
    fn hot_update_keeps_state_and_handlers() {
        let store = counter_store();
        store.commit("add", json!(3)).unwrap();
        assert_eq!(store.getter("doubleCount").unwrap(), json!(6));

        store
            .hot_update(GetterDefs::new().getter("tripleCount", |s: &Counter, _| json!(s.count * 3)))
            .unwrap();

        assert_eq!(store.getter("tripleCount").unwrap(), json!(9));
        assert!(matches!(
            store.getter("doubleCount"),
            Err(StoreError::UnknownGetter(_))
        ));

        store.commit("add", json!(1)).unwrap();
        assert_eq!(store.getter("tripleCount").unwrap(), json!(12));
        assert_eq!(store.mutation_names(), vec!["add".to_string()]);
    }

    #[test]
    fn dispose_detaches_everything() {
        let store = counter_store();
        store.getter("doubleCount").unwrap();

        store.dispose();
        store.dispose();

        assert!(store.is_disposed());
        assert!(matches!(store.commit("add", json!(1)), Err(StoreError::Disposed)));
        assert!(matches!(store.getter("doubleCount"), Err(StoreError::Disposed)));
        assert!(matches!(
            store.dispatch("addLater", json!(1)).now_or_never(),
            Some(Err(StoreError::Disposed))
        ));
        assert!(store.mutation_names().is_empty());
        // State stays readable
        assert_eq!(store.state().count, 0);
    }

    #[test]
    fn bound_callables_reach_the_store() {
        let store = counter_store();

        let add = store.mutation("add").unwrap();
        add.call(json!(4)).unwrap();
        assert_eq!(store.state().count, 4);

        let later = store.action("addLater").unwrap();
        assert_eq!(later.call(json!(1)).now_or_never().unwrap().unwrap(), json!(5));

        assert!(store.mutation("missing").is_none());
        assert!(store.action("missing").is_none());
    }

    #[test]
    fn snapshot_includes_state_and_getters() {
        let store = counter_store();
        store.commit("add", json!(2)).unwrap();

        let expected = json!({ "state": { "count": 2 }, "getters": { "doubleCount": 4 } });
        assert_eq!(store.to_json().unwrap(), expected);
        assert_eq!(store.to_string(), expected.to_string());
    }
}
