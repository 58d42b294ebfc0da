use thiserror::Error;

use crate::lifetime::NodeId;

/// Ownership-graph violations. These are programmer errors: the engine
/// surfaces them as `Result` at the graph API and panics with the message
/// when one is hit mid-transition.
#[derive(Debug, Error)]
pub enum LifetimeError {
    #[error("node {child:?} is already owned by {owner:?}; unlink it before linking elsewhere")]
    AlreadyOwned { child: NodeId, owner: NodeId },

    #[error("node {node:?} has already been finalized")]
    Finalized { node: NodeId },

    #[error("node {node:?} is not owned by {owner:?}")]
    NotOwned { node: NodeId, owner: NodeId },
}
