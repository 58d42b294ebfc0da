pub use crate::blueprint::{Blueprint, RootResource, resource};
pub use crate::error::LifetimeError;
pub use crate::lifetime::{AsOwner, CleanupHandle, NodeId, Owner};
pub use crate::resource::{Resource, ResourceReturn};
pub use crate::run::Run;
pub use tether_reactive::{Cell, Formula, cell, formula, untracked};
