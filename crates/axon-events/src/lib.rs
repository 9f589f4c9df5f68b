#![forbid(unsafe_code)]

//! Event coalescing and ordered dispatch for live accessibility trees.
//!
//! # Role in Axon
//! `axon-events` buffers the semantic notifications a document produces while
//! its tree mutates, reduces redundant or superseded ones, derives the
//! notifications implied by structural changes, and delivers a minimal,
//! correctly ordered stream to external sinks.
//!
//! # Primary responsibilities
//! - **Event**: notification records with per-kind coalescing rules.
//! - **EventQueue**: insertion with whole-history duplicate suppression, a
//!   latest-wins focus slot, and in-place coalescing of the buffered
//!   history, including the selection-merge algorithm for burst reduction.
//! - **Dependency propagation**: ancestor and label/description-relation
//!   walks that synthesize derived name/description-change events.
//! - **Dispatch**: one detach-and-deliver cycle per drain, safe against
//!   sinks that mutate the tree and push new events mid-delivery.
//!
//! # How it fits in the system
//! The hosting document owns one `EventQueue` per document context and
//! threads its tree (`&dyn TreeAccess`, from `axon-tree`) and collaborator
//! sinks into every call. Nothing here touches platform delivery APIs; the
//! sinks are the boundary.
//!
//! # Example
//!
//! ```
//! use axon_events::{Event, EventKind, EventQueue};
//! use axon_harness::{Recorder, SimTree};
//!
//! let mut tree = SimTree::new();
//! let doc = tree.add_document();
//! let node = tree.add_node(doc);
//!
//! let mut queue = EventQueue::new(doc);
//! queue.push(&tree, Event::new(EventKind::ValueChange, node));
//! queue.push(&tree, Event::new(EventKind::ValueChange, node)); // duplicate
//!
//! let mut recorder = Recorder::new();
//! queue.drain(&tree, &mut recorder.sinks());
//! assert_eq!(recorder.deliveries().len(), 1);
//! ```

pub mod event;
pub mod queue;
pub mod sink;

mod coalesce;
mod dispatch;
mod propagate;

pub use event::{
    CoalesceRule, Event, EventKind, Payload, SelectionAction, SelectionChange, SelectionId,
    StateChange, TextChange,
};
pub use queue::{EventQueue, QueueConfig};
pub use sink::{DrainSinks, EventSink, FocusSink, RemoteTransport, TextSelectionSink};
