use std::rc::Rc;

use crate::lifetime::{AsOwner, Owner};
use crate::resource::{Resource, ResourceReturn};
use crate::run::Run;
use crate::state::State;

/// An immutable, reusable factory for resource instances.
///
/// A blueprint is stateless: every [`create`](Blueprint::create) produces a
/// fully independent instance sharing nothing with its siblings.
pub struct Blueprint<T: 'static> {
    constructor: Rc<dyn Fn(&Run) -> ResourceReturn<T>>,
    desc: String,
}

impl<T> Blueprint<T> {
    pub fn new(constructor: impl Fn(&Run) -> ResourceReturn<T> + 'static) -> Self {
        Self::named("resource", constructor)
    }

    /// Like [`new`](Blueprint::new) with a description; the description
    /// labels graph nodes, log lines, and panic messages.
    pub fn named(
        desc: impl Into<String>,
        constructor: impl Fn(&Run) -> ResourceReturn<T> + 'static,
    ) -> Self {
        Self {
            constructor: Rc::new(constructor),
            desc: desc.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.desc
    }

    /// Instantiates this blueprint under `owner`. Finalizing the owner
    /// finalizes the instance.
    pub fn create(&self, owner: &impl AsOwner) -> Resource<T> {
        State::create(
            owner.owner_node(),
            self.desc.clone(),
            self.constructor.clone(),
        )
    }

    /// Instantiates under a fresh, throwaway owner, for top-level and test
    /// use.
    pub fn root(&self) -> RootResource<T> {
        let owner = Owner::named(format!("{} root", self.desc));
        RootResource {
            resource: self.create(&owner),
            owner,
        }
    }
}

impl<T> Clone for Blueprint<T> {
    fn clone(&self) -> Self {
        Self {
            constructor: self.constructor.clone(),
            desc: self.desc.clone(),
        }
    }
}

/// A resource instance together with the owner that keeps it alive.
pub struct RootResource<T: 'static> {
    pub resource: Resource<T>,
    pub owner: Owner,
}

/// Describes a resource: the constructor runs with a [`Run`] context on first
/// read and again whenever a reactive value it read has changed.
pub fn resource<T>(constructor: impl Fn(&Run) -> ResourceReturn<T> + 'static) -> Blueprint<T> {
    Blueprint::new(constructor)
}
