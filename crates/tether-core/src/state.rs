use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_reactive::{Formula, untracked};

use crate::lifetime::{self, NodeId};
use crate::resource::{FreeValue, Resource, ResourceReturn};
use crate::run::Run;

/// Per-instance controller sequencing generation transitions.
///
/// The constructor formula wraps [`next`](State::next): forcing it (by
/// reading the resource while stale) builds a new [`Run`], invokes the user
/// constructor with it, assimilates the return value, and only then finalizes
/// the previous run. Building before destroying is what lets the new
/// generation adopt children out of the old one before the old one is torn
/// down.
pub(crate) struct State<T: 'static> {
    node: NodeId,
    desc: String,
    constructor: Rc<dyn Fn(&Run) -> ResourceReturn<T>>,
    run: RefCell<Option<Rc<Run>>>,
    // Last assimilated output; frozen once the state is finalized.
    last: RefCell<Option<Resource<T>>>,
    formula: Formula<Resource<T>>,
}

impl<T: 'static> State<T> {
    pub(crate) fn create(
        owner: NodeId,
        desc: String,
        constructor: Rc<dyn Fn(&Run) -> ResourceReturn<T>>,
    ) -> Resource<T> {
        let node = lifetime::create_node(desc.clone());
        if let Err(e) = lifetime::link(owner, node, None) {
            panic!("cannot create resource '{desc}': {e}");
        }

        let state = Rc::new_cyclic(|weak: &Weak<State<T>>| {
            let weak = weak.clone();
            State {
                node,
                desc,
                constructor,
                run: RefCell::new(None),
                last: RefCell::new(None),
                formula: Formula::new(move || match weak.upgrade() {
                    Some(state) => state.next(),
                    None => unreachable!("resource state dropped while its formula was alive"),
                }),
            }
        });

        Resource::from_state(state)
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn description(&self) -> &str {
        &self.desc
    }

    /// Pulls the current generation's output, advancing to the next
    /// generation first if the constructor's dependencies changed.
    pub(crate) fn read(&self) -> Resource<T> {
        self.formula.read()
    }

    /// The generation transition. Forced by the constructor formula exactly
    /// when stale.
    fn next(&self) -> Resource<T> {
        if lifetime::is_finalized(self.node) {
            // The constructor never runs again; the last output is frozen.
            return self
                .last
                .borrow()
                .clone()
                .unwrap_or_else(|| Resource::free(FreeValue::Uninitialized));
        }

        let prev = self.run.borrow().clone();
        let generation = prev.as_ref().map(|r| r.generation() + 1).unwrap_or(0);
        log::debug!("resource '{}' advancing to generation {generation}", self.desc);

        let run = Run::new(self.node, generation, prev.as_ref().map(|r| r.node()));
        // The old run is "previous" from this instant on.
        *self.run.borrow_mut() = Some(run.clone());

        // If the constructor (or assimilation) unwinds, reinstall the
        // previous run and tear down whatever the aborted one built, so the
        // next read retries the transition from the last consistent
        // generation instead of treating the partial run as "previous".
        let mut revert = RevertOnUnwind {
            state: self,
            prev: prev.clone(),
            node: run.node(),
            armed: true,
        };
        let returned = (self.constructor)(&run);
        let output = run.use_resource(returned);
        revert.armed = false;
        drop(revert);

        // Only now, with every adoption resolved, tear down what the new
        // generation did not claim. Untracked so that reactive reads inside
        // cleanups do not become dependencies of this generation.
        if let Some(prev) = prev {
            untracked(|| lifetime::finalize(prev.node()));
        }

        *self.last.borrow_mut() = Some(output.clone());
        output
    }
}

// Rolls a failed transition back on unwind. Disarmed on success.
struct RevertOnUnwind<'a, T: 'static> {
    state: &'a State<T>,
    prev: Option<Rc<Run>>,
    node: NodeId,
    armed: bool,
}

impl<T> Drop for RevertOnUnwind<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        log::debug!(
            "resource '{}' constructor panicked; reverting to the previous generation",
            self.state.desc
        );
        *self.state.run.borrow_mut() = self.prev.take();
        untracked(|| lifetime::finalize(self.node));
    }
}
