#![forbid(unsafe_code)]

//! Collaborator traits the dispatcher delivers into.
//!
//! Every sink callback receives a mutable re-entry handle to the queue:
//! delivering a notification routinely mutates the tree, and those mutations
//! produce new events. Pushing them through the handle is safe mid-drain —
//! the dispatcher iterates a detached generation, so re-entrant pushes land
//! in the *next* generation (see the `dispatch` module).
//!
//! No ambient globals: a document resolves its collaborators once and
//! threads them into [`EventQueue::drain`] as a [`DrainSinks`] bundle.

use axon_tree::{NodeId, TreeAccess};

use crate::event::Event;
use crate::queue::EventQueue;

/// Consumer of the single pending focus event of a generation.
pub trait FocusSink {
    /// A focus event survived to drain time and its target is alive.
    fn focus_changed(&mut self, queue: &mut EventQueue, tree: &dyn TreeAccess, event: &Event);
}

/// Consumer of text-selection/caret events, which bypass the generic sink.
pub trait TextSelectionSink {
    /// A text-selection-changed event survived to drain time.
    fn text_selection_changed(
        &mut self,
        queue: &mut EventQueue,
        tree: &dyn TreeAccess,
        event: &Event,
    );
}

/// The generic notification sink.
pub trait EventSink {
    /// An item's selected state flipped. Fired ahead of the selection event
    /// that implies it, once per affected item.
    fn selected_state_changed(
        &mut self,
        queue: &mut EventQueue,
        tree: &dyn TreeAccess,
        item: NodeId,
        selected: bool,
        from_user_input: bool,
    );

    /// A surviving event is delivered.
    fn event_fired(&mut self, queue: &mut EventQueue, tree: &dyn TreeAccess, event: &Event);
}

/// Mirror of selection and mutation state in a remote process.
pub trait RemoteTransport {
    /// Whether a remote side is currently listening. When inactive, the
    /// dispatcher skips selection-delta bookkeeping entirely.
    fn is_active(&self) -> bool;

    /// Push out any mutation records queued out-of-band, so they stay
    /// ordered relative to this queue's stream.
    fn flush_mutations(&mut self);

    /// Net selected/unselected item ids of one drained generation.
    /// Documents are reported as id 0.
    fn selected_items_changed(&mut self, selected: &[u64], unselected: &[u64]);
}

/// The collaborator bundle for one drain call.
pub struct DrainSinks<'a> {
    /// Focus collaborator.
    pub focus: &'a mut dyn FocusSink,
    /// Text-selection collaborator.
    pub text_selection: &'a mut dyn TextSelectionSink,
    /// Generic event sink.
    pub events: &'a mut dyn EventSink,
    /// Remote transport, when one exists for this document.
    pub transport: Option<&'a mut dyn RemoteTransport>,
}
