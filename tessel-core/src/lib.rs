//! Tessel Core
//!
//! This crate lets UI components re-render exactly when the reactive data
//! they read changes, without manual subscription bookkeeping.
//! It provides:
//!
//! - Reactive primitives (signals, memos, effects, effect scopes)
//! - A render-tracking bridge between render callbacks and the reactive graph
//! - Function-style and class-style component adapters
//! - A store with mutations, memoized getters and async actions
//! - A minimal in-memory host for driving components
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `render`: Render tracking and component adapters
//! - `store`: Centralized state container
//! - `host`: Reference host that mounts and re-renders components
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tessel_core::host::RenderHost;
//! use tessel_core::render::use_render;
//! use tessel_core::store::{Store, StoreOptions};
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! // Create a store
//! let store = Store::new(
//!     StoreOptions::new()
//!         .state(Counter { count: 0 })
//!         .getter("doubleCount", |s: &Counter, _| json!(s.count * 2))
//!         .mutation("add", |s: &mut Counter, n| s.count += n.as_i64().unwrap_or(1)),
//! )
//! .unwrap();
//!
//! // Mount a component that reads it
//! let mut host = RenderHost::new();
//! let source = store.clone();
//! let id = host.mount_fn(move |hooks| {
//!     let store = source.clone();
//!     use_render(hooks, move || store.getter("doubleCount").unwrap()).unwrap()
//! });
//!
//! // Commit and let the host re-render
//! store.commit("add", json!(3)).unwrap();
//! host.flush();
//! assert_eq!(host.output(id), Some(&json!(6)));
//! ```

pub mod error;
pub mod host;
pub mod reactive;
pub mod render;
pub mod store;

pub use error::{HookError, StoreError};
pub use reactive::{Effect, EffectScope, Memo, Signal};
pub use render::{track, untrack, TrackingContext};
pub use store::{create_store, Store, StoreOptions};
