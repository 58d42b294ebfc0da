use std::cell::RefCell;
use std::rc::Rc;

use crate::timeline::Tag;

/// An observable, reactive value. Cloning a `Cell` aliases the same storage.
///
/// Reads participate in dependency tracking: calling `get()` inside a
/// [`Formula`](crate::Formula) makes the formula stale the next time this
/// cell is written.
pub struct Cell<T: 'static> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    value: RefCell<T>,
    tag: Tag,
}

impl<T> Cell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                tag: Tag::new(),
            }),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.tag.consume();
        self.inner.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.tag.update();
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut self.inner.value.borrow_mut());
        self.inner.tag.update();
    }

    /// Reads without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn cell<T>(value: T) -> Cell<T> {
    Cell::new(value)
}
