//! # Resources, Runs, and the Ownership Graph
//!
//! Tether provides reactive values ("resources") whose *construction* is
//! itself reactive: a resource's setup logic re-runs when its reactive inputs
//! change, and setup side effects (connections, handles, child resources) are
//! torn down deterministically when superseded or when the owning scope ends.
//!
//! There are three main pieces:
//!
//! - `Blueprint<T>` — immutable factory describing how to construct a
//!   resource instance given an owner.
//! - `Resource<T>` — reactive read-only handle; reading `current()` pulls
//!   through the constructor formula and advances to the next generation
//!   when stale.
//! - the `lifetime` graph — owner→child links with per-node cleanup lists and
//!   cascading, idempotent finalize.
//!
//! ## A resource
//!
//! ```rust
//! use tether_core::prelude::*;
//! use tether_reactive::cell;
//!
//! let interval = cell(100u64);
//!
//! let ticker = Blueprint::named("ticker", {
//!     let interval = interval.clone();
//!     move |run: &Run| {
//!         let ms = interval.get();
//!         run.on_cleanup(move || log::debug!("ticker ({ms}ms) torn down"));
//!         ResourceReturn::value(format!("ticking every {ms}ms"))
//!     }
//! });
//!
//! let root = ticker.root();
//! assert_eq!(root.resource.current(), "ticking every 100ms");
//!
//! // Writing a dependency re-runs the constructor on the next read; the
//! // previous generation's cleanups fire only after the new one is built.
//! interval.set(250);
//! assert_eq!(root.resource.current(), "ticking every 250ms");
//!
//! root.owner.finalize();
//! ```
//!
//! ## Nesting and adoption
//!
//! A constructor may bring other values into its generation with
//! [`Run::use_resource`]. A nested resource that is used again by the next
//! generation is *adopted*: its ownership edge moves to the new run and its
//! state is untouched, with no cleanup and no re-setup. Anything the new
//! generation does not claim is finalized with the old run, children before
//! parents, LIFO within each node.
//!
//! The engine is single-threaded and pull-based: reading `current()` either
//! returns a cached value or synchronously runs the whole generation
//! transition before returning.

pub mod blueprint;
pub mod error;
pub mod lifetime;
pub mod prelude;
pub mod resource;
pub mod run;

mod state;

pub use blueprint::*;
pub use error::*;
pub use lifetime::*;
pub use prelude::*;
pub use resource::*;
pub use run::*;
