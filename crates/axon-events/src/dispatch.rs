#![forbid(unsafe_code)]

//! The dispatcher: one detach-and-deliver cycle per call.
//!
//! [`EventQueue::drain`] moves the buffered generation (sequence plus focus
//! slot) into locals before touching any sink. That detach is the only
//! reentrancy guard and it is sufficient: a sink that mutates the tree and
//! pushes new events grows the *live* queue, never the generation being
//! iterated, so each drain is bounded and ordering cannot invert.
//!
//! Delivery order within a generation:
//! 1. the pending focus event, ahead of everything else;
//! 2. surviving entries in insertion order, with selected-state
//!    notifications fired ahead of the selection events that imply them;
//! 3. one aggregated selection-delta report to the remote transport.

use axon_tree::{NodeId, TreeAccess};

use crate::event::{Event, EventKind, SelectionAction};
use crate::queue::EventQueue;
use crate::sink::DrainSinks;

impl EventQueue {
    /// Deliver the current generation and leave the queue empty.
    ///
    /// Entries whose target died since they were queued are skipped
    /// silently. If the owning document itself dies mid-drain the rest of
    /// the generation is discarded. Events pushed by sink side effects
    /// during the drain are buffered for the next one.
    pub fn drain(&mut self, tree: &dyn TreeAccess, sinks: &mut DrainSinks<'_>) {
        let (pending_focus, events) = self.detach_generation();

        tracing::debug!(
            document = %self.document,
            count = events.len(),
            has_focus = pending_focus.is_some(),
            "draining generation"
        );

        // Net selection flips whose ordinary events will never fire; the
        // remote side learns about them from one aggregate report instead.
        let mut selected_ids: Vec<u64> = Vec::new();
        let mut unselected_ids: Vec<u64> = Vec::new();

        // Focus always fires first: focus reporting must not lag behind
        // whatever property changes accompanied it.
        if let Some(focus_event) = pending_focus {
            if tree.is_alive(focus_event.target()) {
                sinks.focus.focus_changed(self, tree, &focus_event);
            }
        }

        for event in &events {
            if !tree.is_alive(event.target()) {
                tracing::trace!(target_node = %event.target(), "stale target; event skipped");
                continue;
            }

            if sinks.transport.as_deref().is_some_and(|t| t.is_active()) {
                collect_selection_delta(tree, event, &mut selected_ids, &mut unselected_ids);
            }

            if event.is_suppressed() {
                continue;
            }

            if event.kind() == EventKind::TextSelectionChanged {
                sinks.text_selection.text_selection_changed(self, tree, event);
                continue;
            }

            self.fire_selected_states(tree, sinks, event, &events);
            sinks.events.event_fired(self, tree, event);

            if !tree.is_alive(self.document) {
                tracing::debug!(document = %self.document, "document died mid-drain; generation discarded");
                return;
            }

            // Out-of-band mutation records must not overtake the structural
            // event they follow.
            if matches!(
                event.kind(),
                EventKind::Reorder | EventKind::TextInserted | EventKind::TextRemoved
            ) {
                if let Some(transport) = sinks.transport.as_deref_mut() {
                    transport.flush_mutations();
                }
            }
        }

        if (!selected_ids.is_empty() || !unselected_ids.is_empty())
            && tree.is_alive(self.document)
        {
            if let Some(transport) = sinks.transport.as_deref_mut() {
                if transport.is_active() {
                    transport.selected_items_changed(&selected_ids, &unselected_ids);
                }
            }
        }
    }

    /// Selected-state notifications implied by a surviving selection event,
    /// fired ahead of it: the primary item's flip, then — for a merged
    /// pair — the packed partner's.
    fn fire_selected_states(
        &mut self,
        tree: &dyn TreeAccess,
        sinks: &mut DrainSinks<'_>,
        event: &Event,
        generation: &[Event],
    ) {
        match event.kind() {
            EventKind::SelectionAdd => {
                sinks.events.selected_state_changed(
                    self,
                    tree,
                    event.target(),
                    true,
                    event.is_from_user_input(),
                );
            }
            EventKind::SelectionRemove => {
                sinks.events.selected_state_changed(
                    self,
                    tree,
                    event.target(),
                    false,
                    event.is_from_user_input(),
                );
            }
            EventKind::Selection => {
                let Some(sel) = event.selection() else {
                    return;
                };
                sinks.events.selected_state_changed(
                    self,
                    tree,
                    event.target(),
                    sel.action == SelectionAction::Add,
                    event.is_from_user_input(),
                );
                if let Some(packed) = sel.packed.and_then(|idx| generation.get(idx)) {
                    if let Some(packed_sel) = packed.selection() {
                        sinks.events.selected_state_changed(
                            self,
                            tree,
                            packed.target(),
                            packed_sel.action == SelectionAction::Add,
                            packed.is_from_user_input(),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

/// Record the item of a dropped or morphed selection event.
///
/// Suppressed add/remove/merged entries never reach the sink, and a
/// selection-within stands in for an entire burst; in both cases the remote
/// side would miss the per-item flips without this bookkeeping.
fn collect_selection_delta(
    tree: &dyn TreeAccess,
    event: &Event,
    selected_ids: &mut Vec<u64>,
    unselected_ids: &mut Vec<u64>,
) {
    let dropped_selection = event.is_suppressed()
        && matches!(
            event.kind(),
            EventKind::Selection | EventKind::SelectionAdd | EventKind::SelectionRemove
        );
    if !dropped_selection && event.kind() != EventKind::SelectionWithin {
        return;
    }
    let Some(sel) = event.selection() else {
        return;
    };
    if !tree.is_alive(sel.item) {
        return;
    }
    let id = remote_item_id(tree, sel.item);
    match sel.action {
        SelectionAction::Add => selected_ids.push(id),
        SelectionAction::Remove => unselected_ids.push(id),
    }
}

fn remote_item_id(tree: &dyn TreeAccess, item: NodeId) -> u64 {
    if tree.is_document(item) { 0 } else { item.raw() }
}
