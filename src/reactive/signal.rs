//! `Signal<T>`: a typed, single-value reactive cell.
//!
//! Reading a signal inside an effect subscribes that effect; writing a
//! different value queues every subscriber for the next tick. Writes that
//! leave the value unchanged are dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Runtime, Source};

struct SignalInner<T> {
    value: RefCell<T>,
    source: Source,
}

/// A reactive value. Clones share the same slot.
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl Runtime {
    /// Create a signal holding `initial`.
    pub fn signal<T: 'static>(&self, initial: T) -> Signal<T> {
        Signal {
            inner: Rc::new(SignalInner {
                value: RefCell::new(initial),
                source: Source::new(&self.downgrade()),
            }),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Read the current value, subscribing the running effect (if any).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read by reference without cloning. Still subscribes the running effect.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.source.track();
        f(&*self.inner.value.borrow())
    }

    /// Read without subscribing anything.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Replace the value. Returns `false` (and notifies nobody) when the new
    /// value equals the current one.
    pub fn set(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.source.trigger();
        true
    }

    /// Mutate the value in place and notify subscribers unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value.borrow_mut());
        self.inner.source.trigger();
    }
}
