//! Per-instance hook storage for function components.
//!
//! A function component is re-invoked on every render with the same
//! [`Hooks`]. Each `use_*` call claims the next slot, so values created on
//! the first render come back on later ones as long as the calls happen in
//! the same order.

use std::any::{type_name, Any};

use crate::error::HookError;
use crate::render::RequestRerender;

type Teardown = Box<dyn FnOnce() + Send>;

/// Slot storage and lifecycle hooks of one function-component instance.
pub struct Hooks {
    slots: Vec<Box<dyn Any + Send>>,
    cursor: usize,
    force_update: RequestRerender,
    teardowns: Vec<Teardown>,
}

impl Hooks {
    /// Create empty storage bound to the instance's force-update capability.
    pub fn new(force_update: RequestRerender) -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            force_update,
            teardowns: Vec::new(),
        }
    }

    /// Rewind the slot cursor before a render.
    pub(crate) fn begin_render(&mut self) {
        self.cursor = 0;
    }

    /// The capability that makes the host render this instance again.
    pub fn use_force_update(&self) -> RequestRerender {
        self.force_update.clone()
    }

    /// A value created by `factory` on first use and kept for the instance's
    /// lifetime.
    pub fn use_mutable<T>(&mut self, factory: impl FnOnce() -> T) -> Result<&mut T, HookError>
    where
        T: Send + 'static,
    {
        let index = self.cursor;
        self.cursor += 1;

        if index == self.slots.len() {
            self.slots.push(Box::new(factory()));
        }

        self.slots[index]
            .downcast_mut::<T>()
            .ok_or(HookError::SlotTypeMismatch {
                index,
                expected: type_name::<T>(),
            })
    }

    /// Register `teardown` to run when the instance is removed.
    ///
    /// Only the call made on the first render registers; later renders reuse
    /// the slot and drop their closure.
    pub fn use_teardown<F>(&mut self, teardown: F) -> Result<(), HookError>
    where
        F: FnOnce() + Send + 'static,
    {
        let registered = self.use_mutable(|| false)?;
        if !*registered {
            *registered = true;
            self.teardowns.push(Box::new(teardown));
        }
        Ok(())
    }

    /// Number of slots claimed so far.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Run registered teardowns (latest first) and release every slot.
    pub(crate) fn teardown(&mut self) {
        while let Some(teardown) = self.teardowns.pop() {
            teardown();
        }
        self.slots.clear();
        self.cursor = 0;
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("slots", &self.slots.len())
            .field("teardowns", &self.teardowns.len())
            .finish()
    }
}
