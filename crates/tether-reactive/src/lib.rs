//! # Cells, Formulas, and the Timeline
//!
//! A small pull-based reactive core. There are three pieces:
//!
//! - `Cell<T>` — observable, reactive value.
//! - `Formula<T>` — lazy memoized computation that re-runs exactly when one
//!   of the cells/formulas it read has changed.
//! - the timeline — a thread-local revision counter that stamps every write.
//!
//! ```rust
//! use tether_reactive::{cell, Formula};
//!
//! let first = cell("Jane".to_string());
//! let last = cell("Doe".to_string());
//!
//! let full = Formula::new({
//!     let first = first.clone();
//!     let last = last.clone();
//!     move || format!("{} {}", first.get(), last.get())
//! });
//!
//! assert_eq!(full.read(), "Jane Doe");
//!
//! first.set("Joan".to_string());
//! assert_eq!(full.read(), "Joan Doe");
//! ```
//!
//! Everything is single-threaded: values live behind `Rc`, and the timeline
//! is a `thread_local!`. There is no scheduler: reads pull, writes only
//! bump revisions.

pub mod cell;
pub mod formula;
pub mod tests;
pub mod timeline;

pub use cell::{Cell, cell};
pub use formula::{Formula, formula};
pub use timeline::{Tag, current_revision, untracked};
