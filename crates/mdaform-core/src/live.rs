#![forbid(unsafe_code)]

//! Shared dirty flag readable without a render cycle.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A shared boolean cell.
///
/// The tracker writes it synchronously; collaborators (navigation predicates,
/// unload hooks) read it at call time. A write is visible to the very next
/// read on the same thread, which is what lets a save handler clear dirty
/// state and navigate in the same step.
///
/// Clones share the same cell. `LiveFlag` is `!Send`: all form state lives on
/// the UI thread.
#[derive(Clone, Default)]
pub struct LiveFlag {
    cell: Rc<Cell<bool>>,
}

impl LiveFlag {
    /// Create a flag with the given initial value.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            cell: Rc::new(Cell::new(value)),
        }
    }

    /// Read the current value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> bool {
        self.cell.get()
    }

    /// Overwrite the value.
    #[inline]
    pub fn set(&self, value: bool) {
        self.cell.set(value);
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for LiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LiveFlag").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = LiveFlag::new(false);
        let b = a.clone();
        a.set(true);
        assert!(b.get());
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&LiveFlag::default()));
    }
}
