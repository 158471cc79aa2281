//! Component Integration
//!
//! Connects component render callbacks to the reactive graph. A render run
//! through a [`TrackingContext`] subscribes to exactly the cells it read;
//! when any of them changes the host is asked to render again, and the next
//! render replaces the subscription set.
//!
//! On top of the bridge sit the component adapters:
//!
//! - function components: [`use_render`] and the other `use_*` hooks
//! - class components: [`ReactiveBase`] and the [`MakeReactive`] wrapper
//! - deep observation: [`observe::traverse`] and the `*_observed` variants

mod component;
mod hooks;
pub mod observe;
mod track;

pub use component::{make_reactive, MakeReactive, ReactiveBase};
pub use hooks::{
    use_computed, use_data, use_force_update, use_mutable, use_reactive, use_render,
    use_render_observed,
};
pub use observe::{traverse, Seen, Skip, Traverse};
pub use track::{track, untrack, RequestRerender, TrackingContext};
