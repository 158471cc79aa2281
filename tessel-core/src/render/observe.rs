//! Deep observation.
//!
//! [`traverse`] walks a value and reads every reactive cell reachable from
//! it. Run inside a tracked render, this subscribes the render to all of
//! them even if the render itself never touches them.
//!
//! Cells are visited once per walk (by id); `Arc` allocations are visited
//! once per walk (by address), which is what breaks reference cycles. Wrap a
//! value in [`Skip`] to keep the walk out of it.
//!
//! Plain structs opt in with [`impl_traverse!`](crate::impl_traverse):
//!
//! ```rust
//! use tessel_core::impl_traverse;
//! use tessel_core::reactive::Signal;
//! use tessel_core::render::observe::Skip;
//!
//! struct Todo {
//!     title: Signal<String>,
//!     done: Signal<bool>,
//!     cache: Skip<Signal<u32>>,
//! }
//!
//! impl_traverse!(Todo { title, done, cache });
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::reactive::{Memo, Signal, SourceId};

/// Visited cells and allocations for one walk.
#[derive(Debug, Default)]
pub struct Seen {
    cells: HashSet<SourceId>,
    pointers: HashSet<usize>,
}

impl Seen {
    /// Record a cell; `true` on the first visit.
    pub fn first_cell(&mut self, id: SourceId) -> bool {
        self.cells.insert(id)
    }

    /// Record an allocation; `true` on the first visit.
    pub fn first_pointer<T: ?Sized>(&mut self, ptr: *const T) -> bool {
        self.pointers.insert(ptr.cast::<()>() as usize)
    }

    /// Number of distinct cells read so far.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// A value whose reactive cells can be reached by a deep walk.
pub trait Traverse {
    /// Read every reactive cell reachable from `self`.
    fn traverse(&self, seen: &mut Seen);
}

/// Read every reactive cell reachable from `value`.
///
/// Returns the number of distinct cells read.
pub fn traverse<T: Traverse + ?Sized>(value: &T) -> usize {
    let mut seen = Seen::default();
    value.traverse(&mut seen);
    seen.cell_count()
}

/// Marks a value the walk must not descend into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Skip<T>(pub T);

impl<T> Skip<T> {
    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Skip<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Skip<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Traverse for Skip<T> {
    fn traverse(&self, _seen: &mut Seen) {}
}

impl<T> Traverse for Signal<T>
where
    T: Traverse + Send + Sync + 'static,
{
    fn traverse(&self, seen: &mut Seen) {
        if seen.first_cell(self.id()) {
            self.with(|value| value.traverse(seen));
        }
    }
}

impl<T> Traverse for Memo<T>
where
    T: Traverse + Clone + Send + Sync + 'static,
{
    fn traverse(&self, seen: &mut Seen) {
        if seen.first_cell(self.id()) {
            self.get().traverse(seen);
        }
    }
}

macro_rules! leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Traverse for $ty {
                fn traverse(&self, _seen: &mut Seen) {}
            }
        )*
    };
}

leaf!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, str, serde_json::Value,
);

impl<T: Traverse + ?Sized> Traverse for &T {
    fn traverse(&self, seen: &mut Seen) {
        (**self).traverse(seen);
    }
}

impl<T: Traverse + ?Sized> Traverse for Box<T> {
    fn traverse(&self, seen: &mut Seen) {
        (**self).traverse(seen);
    }
}

impl<T: Traverse + ?Sized> Traverse for Arc<T> {
    fn traverse(&self, seen: &mut Seen) {
        if seen.first_pointer(Arc::as_ptr(self)) {
            (**self).traverse(seen);
        }
    }
}

impl<T: Traverse + ?Sized> Traverse for Rc<T> {
    fn traverse(&self, seen: &mut Seen) {
        if seen.first_pointer(Rc::as_ptr(self)) {
            (**self).traverse(seen);
        }
    }
}

impl<T: Traverse> Traverse for Option<T> {
    fn traverse(&self, seen: &mut Seen) {
        if let Some(value) = self {
            value.traverse(seen);
        }
    }
}

impl<T: Traverse> Traverse for [T] {
    fn traverse(&self, seen: &mut Seen) {
        for item in self {
            item.traverse(seen);
        }
    }
}

impl<T: Traverse, const N: usize> Traverse for [T; N] {
    fn traverse(&self, seen: &mut Seen) {
        self.as_slice().traverse(seen);
    }
}

impl<T: Traverse> Traverse for Vec<T> {
    fn traverse(&self, seen: &mut Seen) {
        self.as_slice().traverse(seen);
    }
}

impl<T: Traverse> Traverse for VecDeque<T> {
    fn traverse(&self, seen: &mut Seen) {
        for item in self {
            item.traverse(seen);
        }
    }
}

impl<T: Traverse, S> Traverse for HashSet<T, S> {
    fn traverse(&self, seen: &mut Seen) {
        for item in self {
            item.traverse(seen);
        }
    }
}

impl<T: Traverse> Traverse for BTreeSet<T> {
    fn traverse(&self, seen: &mut Seen) {
        for item in self {
            item.traverse(seen);
        }
    }
}

impl<T: Traverse, S> Traverse for IndexSet<T, S> {
    fn traverse(&self, seen: &mut Seen) {
        for item in self {
            item.traverse(seen);
        }
    }
}

impl<K, V: Traverse, S> Traverse for HashMap<K, V, S> {
    fn traverse(&self, seen: &mut Seen) {
        for value in self.values() {
            value.traverse(seen);
        }
    }
}

impl<K, V: Traverse> Traverse for BTreeMap<K, V> {
    fn traverse(&self, seen: &mut Seen) {
        for value in self.values() {
            value.traverse(seen);
        }
    }
}

impl<K, V: Traverse, S> Traverse for IndexMap<K, V, S> {
    fn traverse(&self, seen: &mut Seen) {
        for value in self.values() {
            value.traverse(seen);
        }
    }
}

macro_rules! tuple {
    ($($name:ident),+) => {
        impl<$($name: Traverse),+> Traverse for ($($name,)+) {
            #[allow(non_snake_case)]
            fn traverse(&self, seen: &mut Seen) {
                let ($($name,)+) = self;
                $($name.traverse(seen);)+
            }
        }
    };
}

tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
tuple!(A, B, C, D, E);
tuple!(A, B, C, D, E, F);

/// Implement [`Traverse`](crate::render::observe::Traverse) for a plain
/// struct by walking the listed fields.
#[macro_export]
macro_rules! impl_traverse {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::render::observe::Traverse for $ty {
            fn traverse(&self, seen: &mut $crate::render::observe::Seen) {
                $( $crate::render::observe::Traverse::traverse(&self.$field, seen); )*
            }
        }
    };
}
