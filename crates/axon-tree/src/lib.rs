#![forbid(unsafe_code)]

//! Tree-side vocabulary for Axon.
//!
//! # Role in Axon
//! `axon-tree` defines the types the event queue shares with the hosting
//! accessibility tree: non-owning node handles, node state bits, relation
//! kinds, name-resolution results, and the [`TreeAccess`] trait through which
//! the queue asks the tree questions.
//!
//! The crate deliberately contains no tree *implementation*. The hosting
//! application owns the tree; the queue only ever holds [`NodeId`] values and
//! revalidates them through [`TreeAccess::is_alive`] before every use. A test
//! implementation lives in `axon-harness`.

pub mod node;
pub mod state;
pub mod tree;

pub use node::NodeId;
pub use state::State;
pub use tree::{NameResolution, NameSource, RelationKind, TreeAccess};
