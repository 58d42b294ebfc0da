use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

use crate::timeline::{self, Revision, TagList};

/// A lazy, memoized reactive computation.
///
/// `read()` runs the wrapped function on first access and again exactly when
/// one of the dependencies recorded during the last run has changed since.
/// Between invalidations it returns the cached value.
///
/// Reading a formula inside another tracking frame forwards its dependencies
/// outward, so formulas compose: an outer formula goes stale when an inner
/// formula's inputs change.
pub struct Formula<T: 'static> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    deps: RefCell<TagList>,
    valid_at: StdCell<Revision>,
}

impl<T: Clone> Formula<T> {
    /// Wraps `f` lazily; nothing runs until the first `read()`.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                compute: Box::new(f),
                cached: RefCell::new(None),
                deps: RefCell::new(TagList::new()),
                valid_at: StdCell::new(0),
            }),
        }
    }

    fn is_stale(&self) -> bool {
        self.inner.cached.borrow().is_none()
            || self
                .inner
                .deps
                .borrow()
                .iter()
                .any(|tag| tag.revision() > self.inner.valid_at.get())
    }

    /// Returns the current value, recomputing if stale.
    pub fn read(&self) -> T {
        let value = if self.is_stale() {
            // Snapshot the revision before running: a write that lands while
            // the computation is in flight leaves its tag strictly newer than
            // `valid_at`, so the formula stays stale for the next read
            // instead of masking the invalidation.
            let fresh_at = timeline::current_revision();
            let (value, deps) = timeline::track(|| (self.inner.compute)());
            log::trace!(
                "formula recomputed at revision {fresh_at} ({} deps)",
                deps.len()
            );
            *self.inner.cached.borrow_mut() = Some(value.clone());
            *self.inner.deps.borrow_mut() = deps;
            self.inner.valid_at.set(fresh_at);
            value
        } else {
            match self.inner.cached.borrow().as_ref() {
                Some(v) => v.clone(),
                // `is_stale` is true whenever the cache is empty.
                None => unreachable!("formula cache empty while fresh"),
            }
        };

        // Forward our dependencies to any enclosing frame so that outer
        // computations invalidate when ours do.
        for tag in self.inner.deps.borrow().iter() {
            tag.consume();
        }

        value
    }
}

impl<T> Clone for Formula<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn formula<T: Clone>(f: impl Fn() -> T + 'static) -> Formula<T> {
    Formula::new(f)
}
