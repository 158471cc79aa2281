//! Reactive Primitives
//!
//! This module implements the dependency-tracking layer everything else is
//! built on: signals, memos, effects and effect scopes.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a memo, an effect, or a tracked render), the
//! signal registers that context as a dependent. When the value changes, all
//! dependents are invalidated.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It is invalidated
//! eagerly but recomputed lazily, on the next read.
//!
//! ## Effects
//!
//! An Effect is a computation that is scheduled whenever its dependencies
//! change. By default scheduling re-runs it; a custom scheduler can do
//! something else instead, which is how render tracking defers to the host.
//!
//! ## Effect scopes
//!
//! An EffectScope collects the memos and effects created inside
//! [`EffectScope::run`] so they can be stopped together.
//!
//! # Implementation Notes
//!
//! A thread-local stack records the running computation; reads register an
//! edge with the [`Runtime`]. Every run starts from an empty dependency set,
//! so sources that are no longer read drop out automatically.

mod context;
mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;
mod subscriber;

pub use context::{untracked, ReactiveContext};
pub use effect::{Effect, EffectOptions, Scheduler};
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use scope::EffectScope;
pub use signal::Signal;
pub use subscriber::{SourceId, SubscriberId};
