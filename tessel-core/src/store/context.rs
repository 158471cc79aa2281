use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;

use super::options::{ActionResult, Payload};
use super::Store;

/// What an action sees of its store.
///
/// Every call goes through the same store the action was dispatched on, so
/// state reads inside an action body always observe the latest commits.
pub struct ActionContext<S>
where
    S: Send + Sync + 'static,
{
    store: Store<S>,
}

impl<S> ActionContext<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(store: Store<S>) -> Self {
        Self { store }
    }

    /// Borrow the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.store.with_state(f)
    }

    /// Clone the current state.
    pub fn state(&self) -> S
    where
        S: Clone,
    {
        self.store.state()
    }

    /// Read a getter.
    pub fn getter(&self, name: &str) -> Result<Value, StoreError> {
        self.store.getter(name)
    }

    /// Read a getter, deserialized.
    pub fn getter_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        self.store.getter_as(name)
    }

    /// Commit a mutation on the store.
    pub fn commit(&self, name: &str, payload: Payload) -> Result<(), StoreError> {
        self.store.commit(name, payload)
    }

    /// Dispatch another action on the store.
    pub fn dispatch(&self, name: &str, payload: Payload) -> ActionResult {
        self.store.dispatch(name, payload)
    }

    /// The store itself.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S> Clone for ActionContext<S>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// A mutation bound to its store, callable with just a payload.
pub struct BoundMutation<S>
where
    S: Send + Sync + 'static,
{
    store: Store<S>,
    name: String,
}

impl<S> BoundMutation<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(store: Store<S>, name: String) -> Self {
        Self { store, name }
    }

    /// Mutation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commit the mutation.
    pub fn call(&self, payload: Payload) -> Result<(), StoreError> {
        self.store.commit(&self.name, payload)
    }
}

/// An action bound to its store, callable with just a payload.
pub struct BoundAction<S>
where
    S: Send + Sync + 'static,
{
    store: Store<S>,
    name: String,
}

impl<S> BoundAction<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(store: Store<S>, name: String) -> Self {
        Self { store, name }
    }

    /// Action name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch the action.
    pub fn call(&self, payload: Payload) -> ActionResult {
        self.store.dispatch(&self.name, payload)
    }
}
