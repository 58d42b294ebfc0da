//! The revision timeline: a thread-local counter bumped on every write, plus
//! a stack of tracking frames that record which tags a computation consumed.

use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

pub type Revision = u64;

thread_local! {
    static REVISION: StdCell<Revision> = const { StdCell::new(1) };
    // `Some(frame)` records consumed tags; `None` is an untracked frame that
    // swallows them (see `untracked`).
    static FRAMES: RefCell<Vec<Option<TagList>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) type TagList = SmallVec<[Tag; 4]>;

/// Returns the current revision of the timeline.
pub fn current_revision() -> Revision {
    REVISION.with(|r| r.get())
}

fn bump() -> Revision {
    REVISION.with(|r| {
        r.set(r.get() + 1);
        r.get()
    })
}

/// A timestamp handle attached to one reactive value. Cloning a tag aliases
/// the same timestamp.
#[derive(Clone)]
pub struct Tag(Rc<StdCell<Revision>>);

impl Tag {
    pub fn new() -> Self {
        Tag(Rc::new(StdCell::new(current_revision())))
    }

    /// The revision at which the tagged value last changed.
    pub fn revision(&self) -> Revision {
        self.0.get()
    }

    /// Marks the tagged value as changed now (advances the timeline).
    pub fn update(&self) {
        self.0.set(bump());
    }

    /// Records this tag in the innermost tracking frame, if any.
    pub fn consume(&self) {
        FRAMES.with(|frames| {
            if let Some(Some(frame)) = frames.borrow_mut().last_mut()
                && !frame.iter().any(|seen| Rc::ptr_eq(&seen.0, &self.0))
            {
                frame.push(self.clone());
            }
        });
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::new()
    }
}

// Pops the top frame even if `f` unwinds.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Runs `f` under a fresh tracking frame and returns the tags it consumed.
pub(crate) fn track<R>(f: impl FnOnce() -> R) -> (R, TagList) {
    FRAMES.with(|frames| frames.borrow_mut().push(Some(TagList::new())));
    let guard = FrameGuard;
    let out = f();
    std::mem::forget(guard);
    let tags = FRAMES
        .with(|frames| frames.borrow_mut().pop())
        .flatten()
        .unwrap_or_default();
    (out, tags)
}

/// Runs `f` without recording any dependencies, even inside a formula.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    FRAMES.with(|frames| frames.borrow_mut().push(None));
    let _guard = FrameGuard;
    f()
}
