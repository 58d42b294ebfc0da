use std::rc::Rc;

use crate::error::LifetimeError;
use crate::lifetime::{self, AsOwner, CleanupHandle, NodeId};
use crate::resource::{FreeValue, Resource, ResourceReturn};

/// One execution ("generation") of a resource's constructor.
///
/// The constructor receives `&Run` as its execution context: it may
/// [`use_resource`](Run::use_resource) nested values and register
/// [`on_cleanup`](Run::on_cleanup) callbacks. Children linked to a run are
/// finalized with it (on the next generation's transition, or when the owning
/// resource is finalized, whichever comes first) unless the next generation
/// adopts them first.
pub struct Run {
    node: NodeId,
    state_node: NodeId,
    generation: u64,
    prev: Option<NodeId>,
}

impl Run {
    pub(crate) fn new(state_node: NodeId, generation: u64, prev: Option<NodeId>) -> Rc<Run> {
        let node = lifetime::create_node(format!(
            "{} run #{generation}",
            lifetime::label_of(state_node)
        ));
        if let Err(e) = lifetime::link(state_node, node, None) {
            panic!("cannot begin generation {generation}: {e}");
        }
        Rc::new(Run {
            node,
            state_node,
            generation,
            prev,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    /// Registers `f` to run when this generation is finalized.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) -> CleanupHandle {
        lifetime::on_cleanup(self.node, f)
    }

    /// Brings a value into this generation, normalizing it to a
    /// [`Resource<T>`] (assimilation):
    ///
    /// - a resource owned by the previous generation is *adopted*: a pure
    ///   ownership transfer, its value and children untouched;
    /// - an unowned resource is linked here;
    /// - a blueprint is instantiated as a brand-new child of this run;
    /// - plain reactive values and plain values are wrapped lifetime-free.
    ///
    /// Panics if handed a resource currently owned by an unrelated owner.
    pub fn use_resource<T, R>(&self, value: R) -> Resource<T>
    where
        T: 'static,
        R: Into<ResourceReturn<T>>,
    {
        match value.into() {
            ResourceReturn::Resource(resource) => {
                self.adopt(&resource);
                resource
            }
            ResourceReturn::Blueprint(blueprint) => blueprint.create(self),
            ResourceReturn::Reactive(formula) => Resource::free(FreeValue::Reactive(formula)),
            ResourceReturn::Value(value) => Resource::free(FreeValue::Constant(Rc::new(value))),
            ResourceReturn::Uninitialized => Resource::free(FreeValue::Uninitialized),
        }
    }

    fn adopt<T: 'static>(&self, resource: &Resource<T>) {
        let Some(node) = resource.node() else {
            // lifetime-free: nothing to own
            return;
        };

        match lifetime::owner_of(node) {
            Some(owner) if owner == self.node => {}
            Some(owner) if Some(owner) == self.prev => {
                // Ownership transfer from the previous generation. Unlink
                // first: a child has at most one owner at any instant.
                log::trace!(
                    "generation {} adopting '{}'",
                    self.generation,
                    lifetime::label_of(node)
                );
                if let Err(e) = lifetime::unlink(owner, node) {
                    panic!("adoption of '{}' failed: {e}", lifetime::label_of(node));
                }
                if let Err(e) = lifetime::link(self.node, node, Some(self.state_node)) {
                    panic!("adoption of '{}' failed: {e}", lifetime::label_of(node));
                }
            }
            None => {
                if let Err(e) = lifetime::link(self.node, node, Some(self.state_node)) {
                    panic!("cannot use '{}' here: {e}", lifetime::label_of(node));
                }
            }
            Some(owner) => panic!(
                "cannot use '{}' here: {}",
                lifetime::label_of(node),
                LifetimeError::AlreadyOwned { child: node, owner }
            ),
        }
    }
}

impl AsOwner for Run {
    fn owner_node(&self) -> NodeId {
        self.node
    }
}
