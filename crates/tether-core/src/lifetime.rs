//! # The ownership graph
//!
//! A process-wide (per-thread) forest of owner→child links with per-node
//! finalizer lists. Nodes are arena slots addressed by [`NodeId`]; a node has
//! at most one current owner at any instant, which `link` enforces.
//!
//! `finalize` cascades depth-first: a node's entire subtree is finalized
//! before the node's own cleanups run, and cleanups on a single node run in
//! reverse registration order. Finalizing twice is a no-op.
//!
//! Finalized nodes leave the arena entirely, so a long-lived resource does
//! not accumulate dead generations. `NodeId` keys are versioned and never
//! reused; a stale handle keeps reading as finalized.
//!
//! All state lives in a `thread_local!` registry. The registry borrow is
//! never held across a user callback, so cleanups are free to link, unlink,
//! or finalize other nodes.

use std::cell::RefCell;

use bitflags::bitflags;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::error::LifetimeError;

new_key_type! {
    /// Handle to a node in the ownership graph.
    pub struct NodeId;
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct NodeFlags: u8 {
        const FINALIZING = 1 << 0;
    }
}

type Callback = Box<dyn FnOnce()>;

// Callback slots are `Option` so an unsubscribed handle leaves a hole instead
// of shifting the indices other handles still point at.
#[derive(Default)]
struct Node {
    label: String,
    owner: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    cleanups: Vec<Option<Callback>>,
    finalize_listeners: Vec<Option<Callback>>,
    flags: NodeFlags,
}

#[derive(Default)]
struct Forest {
    nodes: SlotMap<NodeId, Node>,
    // Nodes to reap when a given root finalizes, even if their owning edge
    // has moved since they were linked (see `link`'s `root` parameter).
    rooted: SecondaryMap<NodeId, SmallVec<[NodeId; 2]>>,
}

thread_local! {
    static FOREST: RefCell<Forest> = RefCell::new(Forest::default());
}

/// Allocates a fresh, unowned node.
pub fn create_node(label: impl Into<String>) -> NodeId {
    FOREST.with(|f| {
        f.borrow_mut().nodes.insert(Node {
            label: label.into(),
            ..Node::default()
        })
    })
}

/// Registers the edge `(owner, child)`.
///
/// Fails if `child` already has a different current owner (it must be
/// `unlink`ed first; this is how adoption transfers ownership), or if either
/// node has been finalized. Linking a child to its current owner is a no-op.
///
/// When `root` is given, `finalize(root)` will also finalize `child` even if
/// this edge has since been moved elsewhere.
pub fn link(owner: NodeId, child: NodeId, root: Option<NodeId>) -> Result<(), LifetimeError> {
    FOREST.with(|f| {
        let mut f = f.borrow_mut();

        if !f.nodes.contains_key(owner) {
            return Err(LifetimeError::Finalized { node: owner });
        }
        match f.nodes.get(child) {
            Some(n) => match n.owner {
                Some(current) if current == owner => return Ok(()),
                Some(current) => {
                    return Err(LifetimeError::AlreadyOwned {
                        child,
                        owner: current,
                    });
                }
                None => {}
            },
            None => return Err(LifetimeError::Finalized { node: child }),
        }

        if let Some(n) = f.nodes.get_mut(child) {
            n.owner = Some(owner);
        }
        if let Some(n) = f.nodes.get_mut(owner) {
            n.children.push(child);
        }
        if let Some(root) = root
            && root != owner
        {
            if let Some(deps) = f.rooted.get_mut(root) {
                if !deps.contains(&child) {
                    deps.push(child);
                }
            } else {
                let mut deps = SmallVec::new();
                deps.push(child);
                f.rooted.insert(root, deps);
            }
        }
        Ok(())
    })
}

/// Removes the edge `(owner, child)` without running any finalizer.
///
/// Used exclusively for adoption: detach from the previous owner, then `link`
/// to the new one.
pub fn unlink(owner: NodeId, child: NodeId) -> Result<(), LifetimeError> {
    FOREST.with(|f| {
        let mut f = f.borrow_mut();

        match f.nodes.get(child) {
            Some(n) if n.owner == Some(owner) => {}
            Some(_) => return Err(LifetimeError::NotOwned { node: child, owner }),
            None => return Err(LifetimeError::Finalized { node: child }),
        }

        if let Some(n) = f.nodes.get_mut(child) {
            n.owner = None;
        }
        if let Some(n) = f.nodes.get_mut(owner) {
            n.children.retain(|c| *c != child);
        }
        Ok(())
    })
}

enum ListKind {
    Cleanup,
    Finalize,
}

/// Unsubscribe token for a registered cleanup/finalize callback.
pub struct CleanupHandle {
    node: NodeId,
    kind: ListKind,
    index: usize,
}

impl CleanupHandle {
    /// Removes the callback without running it. No-op after finalize.
    pub fn unsubscribe(self) {
        FOREST.with(|f| {
            let mut f = f.borrow_mut();
            if let Some(n) = f.nodes.get_mut(self.node) {
                let list = match self.kind {
                    ListKind::Cleanup => &mut n.cleanups,
                    ListKind::Finalize => &mut n.finalize_listeners,
                };
                if let Some(slot) = list.get_mut(self.index) {
                    *slot = None;
                }
            }
        });
    }
}

/// Registers a cleanup to run when `node` is finalized. Cleanups on one node
/// run in reverse registration order, after the node's subtree.
pub fn on_cleanup(node: NodeId, f: impl FnOnce() + 'static) -> CleanupHandle {
    push_callback(node, ListKind::Cleanup, Box::new(f))
}

/// Registers a finalize listener: runs after `node`'s cleanups.
pub fn on_finalize(node: NodeId, f: impl FnOnce() + 'static) -> CleanupHandle {
    push_callback(node, ListKind::Finalize, Box::new(f))
}

fn push_callback(node: NodeId, kind: ListKind, cb: Callback) -> CleanupHandle {
    FOREST.with(|f| {
        let mut f = f.borrow_mut();
        let index = match f.nodes.get_mut(node) {
            Some(n) => {
                let list = match kind {
                    ListKind::Cleanup => &mut n.cleanups,
                    ListKind::Finalize => &mut n.finalize_listeners,
                };
                list.push(Some(cb));
                list.len() - 1
            }
            // Registering on a finalized node keeps nothing; the callback
            // will never fire.
            None => {
                log::warn!("cleanup registered on finalized node {node:?}; it will never run");
                usize::MAX
            }
        };
        CleanupHandle { node, kind, index }
    })
}

/// A finalized node has left the arena, so an absent key reads as finalized.
pub fn is_finalized(node: NodeId) -> bool {
    FOREST.with(|f| !f.borrow().nodes.contains_key(node))
}

pub fn owner_of(node: NodeId) -> Option<NodeId> {
    FOREST.with(|f| f.borrow().nodes.get(node).and_then(|n| n.owner))
}

#[cfg(test)]
pub(crate) fn live_node_count() -> usize {
    FOREST.with(|f| f.borrow().nodes.len())
}

pub fn label_of(node: NodeId) -> String {
    FOREST.with(|f| {
        f.borrow()
            .nodes
            .get(node)
            .map(|n| n.label.clone())
            .unwrap_or_default()
    })
}

/// Finalizes `node`: its still-linked subtree first (depth-first, children
/// before parent), then its root-tagged dependents, then its own cleanups in
/// LIFO order, then its finalize listeners in LIFO order.
///
/// Idempotent: finalizing an already-finalized node does nothing, and no
/// callback ever runs twice.
pub fn finalize(node: NodeId) {
    let proceed = FOREST.with(|f| {
        let mut f = f.borrow_mut();
        match f.nodes.get_mut(node) {
            Some(n) if !n.flags.contains(NodeFlags::FINALIZING) => {
                n.flags.insert(NodeFlags::FINALIZING);
                true
            }
            _ => false,
        }
    });
    if !proceed {
        return;
    }
    log::trace!("finalizing {node:?} ({})", label_of(node));

    // Children first. Re-read one edge at a time so links made (or removed)
    // by a running cleanup are respected.
    loop {
        let child = FOREST.with(|f| {
            let mut f = f.borrow_mut();
            let child = f.nodes.get(node).and_then(|n| n.children.first().copied());
            if let Some(c) = child {
                if let Some(n) = f.nodes.get_mut(node) {
                    n.children.remove(0);
                }
                if let Some(n) = f.nodes.get_mut(c) {
                    n.owner = None;
                }
            }
            child
        });
        match child {
            Some(c) => finalize(c),
            None => break,
        }
    }

    // Dependents that named this node as their root when linked.
    loop {
        let dep = FOREST.with(|f| {
            f.borrow_mut()
                .rooted
                .get_mut(node)
                .and_then(|deps| deps.pop())
        });
        match dep {
            Some(d) => finalize(d),
            None => break,
        }
    }

    run_callbacks(node, ListKind::Cleanup);
    run_callbacks(node, ListKind::Finalize);

    FOREST.with(|f| {
        let mut f = f.borrow_mut();
        // Detach from the former owner so dead nodes do not accumulate there.
        let owner = f.nodes.get(node).and_then(|n| n.owner);
        if let Some(o) = owner
            && let Some(n) = f.nodes.get_mut(o)
        {
            n.children.retain(|c| *c != node);
        }
        f.rooted.remove(node);
        // Reclaim the slot; the versioned key keeps reading as finalized.
        f.nodes.remove(node);
    });
}

// Pops callbacks from the end (LIFO), dropping the borrow before each call.
fn run_callbacks(node: NodeId, kind: ListKind) {
    loop {
        let cb = FOREST.with(|f| {
            let mut f = f.borrow_mut();
            let list = match f.nodes.get_mut(node) {
                Some(n) => match kind {
                    ListKind::Cleanup => &mut n.cleanups,
                    ListKind::Finalize => &mut n.finalize_listeners,
                },
                None => return None,
            };
            while let Some(slot) = list.pop() {
                if let Some(cb) = slot {
                    return Some(cb);
                }
            }
            None
        });
        match cb {
            Some(cb) => cb(),
            None => break,
        }
    }
}

/// An owned handle over a fresh graph node, for top-level and test use.
///
/// Finalization is explicit; dropping an `Owner` does not finalize it.
pub struct Owner {
    node: NodeId,
}

impl Owner {
    pub fn new() -> Self {
        Self::named("owner")
    }

    pub fn named(label: impl Into<String>) -> Self {
        Self {
            node: create_node(label),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) -> CleanupHandle {
        on_cleanup(self.node, f)
    }

    pub fn finalize(&self) {
        finalize(self.node);
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that can own resources in the graph.
pub trait AsOwner {
    fn owner_node(&self) -> NodeId;
}

impl AsOwner for Owner {
    fn owner_node(&self) -> NodeId {
        self.node
    }
}

impl AsOwner for NodeId {
    fn owner_node(&self) -> NodeId {
        *self
    }
}
