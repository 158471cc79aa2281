//! Error types.

use thiserror::Error;

/// Errors raised by a [`Store`](crate::store::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was constructed without a state value.
    #[error("missing state option")]
    MissingState,

    /// `commit` named a mutation the store does not define.
    #[error("unknown mutation: {0}")]
    UnknownMutation(String),

    /// `dispatch` named an action the store does not define.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A getter was read that the store does not define.
    #[error("unknown getter: {0}")]
    UnknownGetter(String),

    /// The store was used after `dispose`.
    #[error("store has been disposed")]
    Disposed,

    /// An action body failed.
    #[error("action failed: {0}")]
    Action(String),

    /// A value could not be converted to or from JSON.
    #[error("payload conversion failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl StoreError {
    /// Build an [`StoreError::Action`] from any message.
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }
}

/// Errors raised by the hook slot storage of function components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A hook slot holds a different type than the one requested, which means
    /// hooks were not called in the same order as on the previous render.
    #[error("hook slot {index} does not hold a {expected}; hooks must run in the same order on every render")]
    SlotTypeMismatch {
        /// Position of the slot.
        index: usize,
        /// Type the caller asked for.
        expected: &'static str,
    },
}
