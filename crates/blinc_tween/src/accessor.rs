//! Getter/setter pairs binding a tweener to the value it animates

use crate::callbacks::guard;
use crate::error::TweenError;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Reads the current value of the animated property
pub type Getter<T> = Box<dyn FnMut() -> Result<T, TweenError>>;

/// Writes a new value to the animated property
pub type Setter<T> = Box<dyn FnMut(T) -> Result<(), TweenError>>;

/// The host-side property a tweener drives
///
/// Both closures may fail with [`TweenError::TargetUnavailable`] when the
/// host value no longer exists; panics are caught and reported the same way
/// so a vanished target only ever kills its own tween.
pub struct Accessor<T> {
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T: Copy + 'static> Accessor<T> {
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: FnMut() -> Result<T, TweenError> + 'static,
        S: FnMut(T) -> Result<(), TweenError> + 'static,
    {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }

    /// Drive a shared cell
    pub fn shared(cell: Rc<Cell<T>>) -> Self {
        let read = cell.clone();
        Self::new(
            move || Ok(read.get()),
            move |value| {
                cell.set(value);
                Ok(())
            },
        )
    }

    /// Drive a cell without keeping it alive
    ///
    /// Once the cell is dropped the target is reported as unavailable.
    pub fn weak(cell: &Rc<Cell<T>>) -> Self {
        let read: Weak<Cell<T>> = Rc::downgrade(cell);
        let write = read.clone();
        Self::new(
            move || {
                read.upgrade()
                    .map(|c| c.get())
                    .ok_or_else(|| TweenError::target_gone("target cell was dropped"))
            },
            move |value| {
                write
                    .upgrade()
                    .map(|c| c.set(value))
                    .ok_or_else(|| TweenError::target_gone("target cell was dropped"))
            },
        )
    }

    pub fn get(&mut self) -> Result<T, TweenError> {
        let getter = &mut self.getter;
        guard(getter).and_then(|r| r)
    }

    pub fn set(&mut self, value: T) -> Result<(), TweenError> {
        let setter = &mut self.setter;
        guard(|| setter(value)).and_then(|r| r)
    }
}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_accessor_round_trips() {
        let cell = Rc::new(Cell::new(1.0f32));
        let mut accessor = Accessor::shared(cell.clone());
        assert_eq!(accessor.get(), Ok(1.0));
        accessor.set(4.0).unwrap();
        assert_eq!(cell.get(), 4.0);
    }

    #[test]
    fn test_weak_accessor_reports_dropped_target() {
        let cell = Rc::new(Cell::new(2i32));
        let mut accessor = Accessor::weak(&cell);
        assert_eq!(accessor.get(), Ok(2));
        drop(cell);
        assert!(matches!(accessor.get(), Err(TweenError::TargetUnavailable(_))));
        assert!(matches!(accessor.set(3), Err(TweenError::TargetUnavailable(_))));
    }

    #[test]
    fn test_panicking_setter_is_contained() {
        let mut accessor: Accessor<f32> =
            Accessor::new(|| Ok(0.0), |_| panic!("host object destroyed"));
        assert!(matches!(
            accessor.set(1.0),
            Err(TweenError::CallbackPanicked(_))
        ));
    }
}
