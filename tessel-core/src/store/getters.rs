//! Lazily memoized getters.
//!
//! A getter's memo is created the first time it is read, inside the table's
//! effect scope, and reads state plus any other getters it asks for. Stopping
//! the table stops every memo created so far.

use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::reactive::{EffectScope, Memo, Signal};

use super::options::{GetterDefs, GetterFn};

struct GetterSlot<S>
where
    S: Send + Sync + 'static,
{
    def: GetterFn<S>,
    memo: OnceLock<Memo<Value>>,
}

struct GetterTable<S>
where
    S: Send + Sync + 'static,
{
    state: Signal<S>,
    scope: EffectScope,
    slots: IndexMap<String, GetterSlot<S>>,
}

/// Read access to a store's getters.
///
/// Passed to every getter definition so getters can build on each other.
/// Clones share the same memos.
pub struct Getters<S>
where
    S: Send + Sync + 'static,
{
    table: Arc<GetterTable<S>>,
}

impl<S> Getters<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn build(state: Signal<S>, defs: GetterDefs<S>) -> Self {
        let slots = defs
            .defs
            .into_iter()
            .map(|(name, def)| {
                let slot = GetterSlot {
                    def,
                    memo: OnceLock::new(),
                };
                (name, slot)
            })
            .collect();

        Self {
            table: Arc::new(GetterTable {
                state,
                scope: EffectScope::new(),
                slots,
            }),
        }
    }

    /// Current value of a getter, tracking the read.
    pub fn get(&self, name: &str) -> Result<Value, StoreError> {
        let slot = self
            .table
            .slots
            .get(name)
            .ok_or_else(|| StoreError::UnknownGetter(name.to_string()))?;

        let memo = slot.memo.get_or_init(|| self.create_memo(&slot.def));
        Ok(memo.get())
    }

    /// Current value of a getter, deserialized.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.get(name)?)?)
    }

    /// Whether a getter with this name is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.table.slots.contains_key(name)
    }

    /// Getter names in definition order.
    pub fn names(&self) -> Vec<String> {
        self.table.slots.keys().cloned().collect()
    }

    /// Number of getters whose memo has been created.
    pub fn created_count(&self) -> usize {
        self.table
            .slots
            .values()
            .filter(|slot| slot.memo.get().is_some())
            .count()
    }

    pub(crate) fn stop(&self) {
        self.table.scope.stop();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        !self.table.scope.is_active()
    }

    fn create_memo(&self, def: &GetterFn<S>) -> Memo<Value> {
        let table: Weak<GetterTable<S>> = Arc::downgrade(&self.table);
        let def = Arc::clone(def);

        self.table.scope.run(|| {
            Memo::new(move || {
                let Some(table) = table.upgrade() else {
                    return Value::Null;
                };
                let getters = Getters { table };
                getters.table.state.with(|state| def(state, &getters))
            })
        })
    }
}

impl<S> Clone for Getters<S>
where
    S: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<S> std::fmt::Debug for Getters<S>
where
    S: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getters")
            .field("names", &self.names())
            .field("created", &self.created_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_getters(state: &Signal<i64>, runs: Arc<AtomicUsize>) -> Getters<i64> {
        let defs = GetterDefs::new()
            .getter("double", move |n: &i64, _| {
                runs.fetch_add(1, Ordering::SeqCst);
                json!(n * 2)
            })
            .getter("quadruple", |_, getters| {
                let double = getters.get_as::<i64>("double").unwrap_or(0);
                json!(double * 2)
            });
        Getters::build(state.clone(), defs)
    }

    #[test]
    fn memos_are_created_on_first_read() {
        let state = Signal::new(3);
        let getters = counting_getters(&state, Arc::new(AtomicUsize::new(0)));

        assert_eq!(getters.created_count(), 0);
        assert_eq!(getters.get("double").unwrap(), json!(6));
        assert_eq!(getters.created_count(), 1);
    }

    #[test]
    fn getters_cache_until_state_changes() {
        let state = Signal::new(3);
        let runs = Arc::new(AtomicUsize::new(0));
        let getters = counting_getters(&state, runs.clone());

        getters.get("double").unwrap();
        getters.get("double").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        state.set(5);
        assert_eq!(getters.get("double").unwrap(), json!(10));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn getters_can_read_other_getters() {
        let state = Signal::new(2);
        let getters = counting_getters(&state, Arc::new(AtomicUsize::new(0)));

        assert_eq!(getters.get("quadruple").unwrap(), json!(8));
        state.set(3);
        assert_eq!(getters.get("quadruple").unwrap(), json!(12));
    }

    #[test]
    fn unknown_getter_is_an_error() {
        let getters = counting_getters(&Signal::new(0), Arc::new(AtomicUsize::new(0)));

        assert!(matches!(
            getters.get("triple"),
            Err(StoreError::UnknownGetter(name)) if name == "triple"
        ));
    }

    #[test]
    fn stopping_releases_state_subscriptions() {
        let state = Signal::new(1);
        let getters = counting_getters(&state, Arc::new(AtomicUsize::new(0)));
        getters.get("double").unwrap();
        assert_eq!(state.subscriber_count(), 1);

        getters.stop();
        assert!(getters.is_stopped());
        assert_eq!(state.subscriber_count(), 0);
    }
}
