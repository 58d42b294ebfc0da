use std::rc::Rc;

use tether_reactive::{Cell, Formula};

use crate::blueprint::Blueprint;
use crate::lifetime::{self, NodeId};
use crate::state::State;

/// Everything a resource constructor may return, normalized by assimilation
/// into a uniform [`Resource<T>`].
///
/// The enum is closed: a value shape the engine cannot give correct lifetime
/// semantics simply cannot be expressed.
pub enum ResourceReturn<T: 'static> {
    /// An existing resource: assimilation links it to the current run
    /// (ownership transfer, no construction).
    Resource(Resource<T>),
    /// A blueprint: assimilation instantiates it as a child of the current
    /// run.
    Blueprint(Blueprint<T>),
    /// A plain reactive value: wrapped lifetime-free; reads delegate,
    /// finalize is a no-op.
    Reactive(Formula<T>),
    /// A plain value: wrapped as a static, lifetime-free resource.
    Value(T),
    /// No value yet.
    Uninitialized,
}

impl<T> ResourceReturn<T> {
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn uninitialized() -> Self {
        Self::Uninitialized
    }
}

impl<T> From<Resource<T>> for ResourceReturn<T> {
    fn from(resource: Resource<T>) -> Self {
        Self::Resource(resource)
    }
}

impl<T> From<Blueprint<T>> for ResourceReturn<T> {
    fn from(blueprint: Blueprint<T>) -> Self {
        Self::Blueprint(blueprint)
    }
}

impl<T> From<Formula<T>> for ResourceReturn<T> {
    fn from(formula: Formula<T>) -> Self {
        Self::Reactive(formula)
    }
}

impl<T: Clone> From<Cell<T>> for ResourceReturn<T> {
    fn from(cell: Cell<T>) -> Self {
        Self::Reactive(Formula::new(move || cell.get()))
    }
}

/// A reactive read-only handle over a resource.
///
/// Engine-backed resources own a lifetime: reading `current()` pulls through
/// the constructor formula and re-runs the generation transition when stale.
/// Lifetime-free resources (made from plain values or plain reactive values)
/// just delegate reads; there is nothing to finalize.
pub struct Resource<T: 'static> {
    repr: Repr<T>,
}

enum Repr<T: 'static> {
    Engine(Rc<State<T>>),
    Free(FreeValue<T>),
}

pub(crate) enum FreeValue<T: 'static> {
    Reactive(Formula<T>),
    Constant(Rc<T>),
    Uninitialized,
}

impl<T> Resource<T> {
    pub(crate) fn from_state(state: Rc<State<T>>) -> Self {
        Self {
            repr: Repr::Engine(state),
        }
    }

    pub(crate) fn free(value: FreeValue<T>) -> Self {
        Self {
            repr: Repr::Free(value),
        }
    }

    /// The graph node backing this resource, if it carries a lifetime.
    pub(crate) fn node(&self) -> Option<NodeId> {
        match &self.repr {
            Repr::Engine(state) => Some(state.node()),
            Repr::Free(_) => None,
        }
    }

    pub fn description(&self) -> &str {
        match &self.repr {
            Repr::Engine(state) => state.description(),
            Repr::Free(_) => "(lifetime-free)",
        }
    }

    /// Finalizes the resource and everything it still owns. No-op for
    /// lifetime-free resources and for already-finalized ones.
    pub fn finalize(&self) {
        if let Some(node) = self.node() {
            lifetime::finalize(node);
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.node().is_some_and(lifetime::is_finalized)
    }
}

impl<T: Clone> Resource<T> {
    /// The resource's current value, re-running the constructor first if its
    /// dependencies changed.
    ///
    /// Panics if the constructor returned [`ResourceReturn::Uninitialized`];
    /// use [`try_current`](Self::try_current) when that is expected.
    pub fn current(&self) -> T {
        match self.try_current() {
            Some(value) => value,
            None => panic!("resource '{}' has no value yet", self.description()),
        }
    }

    /// Like [`current`](Self::current), but `None` while uninitialized.
    pub fn try_current(&self) -> Option<T> {
        match &self.repr {
            Repr::Engine(state) => state.read().try_current(),
            Repr::Free(FreeValue::Reactive(formula)) => Some(formula.read()),
            Repr::Free(FreeValue::Constant(value)) => Some((**value).clone()),
            Repr::Free(FreeValue::Uninitialized) => None,
        }
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            repr: match &self.repr {
                Repr::Engine(state) => Repr::Engine(state.clone()),
                Repr::Free(value) => Repr::Free(value.clone()),
            },
        }
    }
}

impl<T> Clone for FreeValue<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Reactive(formula) => Self::Reactive(formula.clone()),
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::Uninitialized => Self::Uninitialized,
        }
    }
}
