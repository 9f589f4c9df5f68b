#![forbid(unsafe_code)]

//! The coalescing engine.
//!
//! One pass runs after every append, over the just-appended tail entry only.
//! Which reduction applies is chosen by the tail's [`CoalesceRule`]; every
//! reduction works by retagging entries [`CoalesceRule::DoNotEmit`] in place,
//! never by removing them, so look-back scans from later passes keep seeing
//! the full history.
//!
//! The selection-merge algorithm lives here too: it is the engine's most
//! involved rule, packing bursts of selection add/remove events within one
//! widget into pairs (`Selection`), and whole runs into a single
//! widget-level `SelectionWithin`.

use axon_tree::TreeAccess;

use crate::event::{CoalesceRule, EventKind, SelectionAction};
use crate::queue::EventQueue;

impl EventQueue {
    /// Apply the tail entry's reduction rule against the buffered history.
    pub(crate) fn coalesce_tail(&mut self, tree: &dyn TreeAccess) {
        debug_assert!(!self.events.is_empty(), "coalescing an empty queue");
        let tail = self.events.len() - 1;

        match self.events[tail].rule {
            CoalesceRule::CoalesceReorder => {
                // Structural reduction for these events happens in the
                // producer; only the queue-side invariant is checked here.
                let ev = &self.events[tail];
                debug_assert!(
                    tree.is_application(ev.target)
                        || tree.is_outer_document(ev.target)
                        || tree.is_composite_widget_root(ev.target),
                    "reorder event queued for a non-root target"
                );
                debug_assert_eq!(
                    ev.kind,
                    EventKind::Reorder,
                    "only reorder events may use the reorder rule"
                );
            }

            CoalesceRule::CoalesceSameType => {
                // Nearest earlier duplicate only: anything older was already
                // collapsed when that duplicate arrived.
                let kind = self.events[tail].kind;
                for idx in (0..tail).rev() {
                    let earlier = &mut self.events[idx];
                    if earlier.kind == kind && earlier.rule == CoalesceRule::CoalesceSameType {
                        earlier.rule = CoalesceRule::DoNotEmit;
                        tracing::trace!(?kind, index = idx, "same-type entry suppressed");
                        return;
                    }
                }
            }

            CoalesceRule::CoalesceSelectionChange => {
                let Some(widget) = self.events[tail].selection().map(|sel| sel.widget)
                else {
                    debug_assert!(false, "selection rule without selection payload");
                    return;
                };
                for idx in (0..tail).rev() {
                    if self.events[idx].rule != CoalesceRule::CoalesceSelectionChange {
                        continue;
                    }
                    if self.events[idx].selection().map(|sel| sel.widget) == Some(widget) {
                        self.merge_selection_events(tail, idx);
                        return;
                    }
                }
            }

            CoalesceRule::CoalesceStateChange => {
                let ev = &self.events[tail];
                let (kind, target) = (ev.kind, ev.target);
                let Some(tail_sc) = ev.state() else {
                    debug_assert!(false, "state rule without state payload");
                    return;
                };
                // Every earlier live entry for the same bit is superseded;
                // an odd/even disagreement on the flag means the state
                // toggled back, so neither event should fire.
                let mut cancel_tail = false;
                for idx in (0..tail).rev() {
                    let earlier = &mut self.events[idx];
                    if earlier.rule == CoalesceRule::DoNotEmit
                        || earlier.kind != kind
                        || earlier.target != target
                    {
                        continue;
                    }
                    if let Some(sc) = earlier.state() {
                        if sc.state == tail_sc.state {
                            earlier.rule = CoalesceRule::DoNotEmit;
                            if sc.enabled != tail_sc.enabled {
                                cancel_tail = true;
                            }
                        }
                    }
                }
                if cancel_tail {
                    self.events[tail].rule = CoalesceRule::DoNotEmit;
                    tracing::trace!(%target, "opposite state changes cancelled");
                }
            }

            CoalesceRule::CoalesceTextSelectionChange => {
                // Events for the same selection may have different targets
                // and one target may be pointed at by different selections;
                // both directions collapse to the newest event.
                let ev = &self.events[tail];
                let (kind, target, sel) = (ev.kind, ev.target, ev.selection_id());
                for idx in (0..tail).rev() {
                    let earlier = &mut self.events[idx];
                    if earlier.rule != CoalesceRule::DoNotEmit
                        && earlier.kind == kind
                        && (earlier.selection_id() == sel || earlier.target == target)
                    {
                        earlier.rule = CoalesceRule::DoNotEmit;
                    }
                }
            }

            // RemoveDuplicates is fully handled before append; the other two
            // never interact with history.
            CoalesceRule::RemoveDuplicates
            | CoalesceRule::AllowDuplicates
            | CoalesceRule::DoNotEmit => {}
        }
    }

    /// Merge the tail selection event with the nearest earlier selection
    /// event for the same widget (at `this_idx`).
    fn merge_selection_events(&mut self, tail: usize, this_idx: usize) {
        let this_ev = &self.events[this_idx];
        let this_kind = this_ev.kind;
        let Some(this_sel) = this_ev.selection() else {
            debug_assert!(false, "selection rule without selection payload");
            return;
        };
        let (this_item, this_action, this_preceding, this_packed) = (
            this_sel.item,
            this_sel.action,
            this_sel.preceding,
            this_sel.packed,
        );

        let preceding = this_preceding + 1;
        let threshold = self.config.selection_pack_threshold;

        let tail_ev = &mut self.events[tail];
        let tail_kind = tail_ev.kind;
        let Some(tail_sel) = tail_ev.selection_mut() else {
            debug_assert!(false, "selection rule without selection payload");
            return;
        };
        tail_sel.preceding = preceding;
        let (widget, tail_item, tail_action) = (tail_sel.widget, tail_sel.item, tail_sel.action);

        // Too many selection changes for one widget: collapse the whole run
        // into a single selection-within on the widget itself.
        if preceding >= threshold {
            self.events[tail].kind = EventKind::SelectionWithin;
            self.events[tail].target = widget;
            self.events[this_idx].rule = CoalesceRule::DoNotEmit;

            // Suppress any preceding events for the same widget that were
            // not coalesced yet. A matched selection-within already did
            // this when it was packed.
            if this_kind != EventKind::SelectionWithin {
                for jdx in (0..this_idx).rev() {
                    let prev = &mut self.events[jdx];
                    if prev.rule == CoalesceRule::CoalesceSelectionChange
                        && prev.selection().map(|sel| sel.widget) == Some(widget)
                    {
                        prev.rule = CoalesceRule::DoNotEmit;
                    }
                }
            }
            tracing::trace!(%widget, preceding, "selection burst packed into selection-within");
            return;
        }

        // A sequential remove+add pair on two different items becomes one
        // merged selection event; the suppressed half rides along packed
        // inside the survivor for two-step delivery.
        if preceding == 1 && tail_item != this_item {
            if tail_action == SelectionAction::Add && this_action == SelectionAction::Remove {
                self.events[this_idx].rule = CoalesceRule::DoNotEmit;
                self.events[tail].kind = EventKind::Selection;
                if let Some(sel) = self.events[tail].selection_mut() {
                    sel.packed = Some(this_idx);
                }
                return;
            }

            if this_action == SelectionAction::Add && tail_action == SelectionAction::Remove {
                self.events[tail].rule = CoalesceRule::DoNotEmit;
                self.events[this_idx].kind = EventKind::Selection;
                if let Some(sel) = self.events[this_idx].selection_mut() {
                    sel.packed = Some(tail);
                }
                return;
            }
        }

        // A third selection change arrived for an already-merged pair:
        // unpack it so both halves can coalesce independently again.
        if this_kind == EventKind::Selection {
            if let Some(packed_idx) = this_packed {
                let partner_action = self.events[packed_idx]
                    .selection()
                    .map(|sel| sel.action);
                let partner = &mut self.events[packed_idx];
                partner.kind = match partner_action {
                    Some(SelectionAction::Add) => EventKind::SelectionAdd,
                    _ => EventKind::SelectionRemove,
                };
                partner.rule = CoalesceRule::CoalesceSelectionChange;
            }
            if let Some(sel) = self.events[this_idx].selection_mut() {
                sel.packed = None;
            }
            self.events[this_idx].kind = match this_action {
                SelectionAction::Add => EventKind::SelectionAdd,
                SelectionAction::Remove => EventKind::SelectionRemove,
            };
            return;
        }

        // The widget reported a merged selection but other selection events
        // for it are queued: demote to a plain add.
        if tail_kind == EventKind::Selection {
            self.events[tail].kind = EventKind::SelectionAdd;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, SelectionId};
    use axon_harness::SimTree;
    use axon_tree::{NodeId, State};

    struct Fixture {
        tree: SimTree,
        doc: NodeId,
        widget: NodeId,
        items: Vec<NodeId>,
    }

    fn fixture(items: usize) -> Fixture {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let widget = tree.add_node(doc);
        let items = (0..items).map(|_| tree.add_node(widget)).collect();
        Fixture {
            tree,
            doc,
            widget,
            items,
        }
    }

    fn add(f: &Fixture, item: NodeId) -> Event {
        Event::selection_change(f.widget, item, SelectionAction::Add, false)
    }

    fn remove(f: &Fixture, item: NodeId) -> Event {
        Event::selection_change(f.widget, item, SelectionAction::Remove, false)
    }

    #[test]
    fn same_type_suppresses_nearest_earlier_only() {
        let f = fixture(0);
        let mut queue = EventQueue::new(f.doc);
        let a = f.widget;
        queue.push(&f.tree, Event::new(EventKind::Alert, a));
        queue.push(&f.tree, Event::new(EventKind::Alert, a));
        queue.push(&f.tree, Event::new(EventKind::Alert, a));
        // Each arrival suppresses exactly one earlier entry.
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.suppressed_len(), 2);
        assert!(!queue.iter().last().unwrap().is_suppressed());
    }

    #[test]
    fn state_change_repeat_keeps_newest() {
        let f = fixture(0);
        let node = f.widget;
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, Event::state_change(node, State::BUSY, true));
        queue.push(&f.tree, Event::state_change(node, State::BUSY, true));
        let rules: Vec<_> = queue.iter().map(Event::rule).collect();
        assert_eq!(
            rules,
            vec![CoalesceRule::DoNotEmit, CoalesceRule::CoalesceStateChange]
        );
    }

    #[test]
    fn opposite_state_changes_cancel() {
        let f = fixture(0);
        let node = f.widget;
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, Event::state_change(node, State::CHECKED, true));
        queue.push(&f.tree, Event::state_change(node, State::CHECKED, false));
        assert_eq!(queue.suppressed_len(), 2);
    }

    #[test]
    fn state_changes_on_different_bits_are_independent() {
        let f = fixture(0);
        let node = f.widget;
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, Event::state_change(node, State::CHECKED, true));
        queue.push(&f.tree, Event::state_change(node, State::BUSY, false));
        assert_eq!(queue.suppressed_len(), 0);
    }

    #[test]
    fn text_selection_collapses_same_selection_across_targets() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let a = tree.add_node(doc);
        let b = tree.add_node(doc);
        let mut queue = EventQueue::new(doc);
        queue.push(&tree, Event::text_selection_change(a, SelectionId(9)));
        queue.push(&tree, Event::text_selection_change(b, SelectionId(9)));
        assert_eq!(queue.suppressed_len(), 1);
        assert_eq!(queue.iter().last().unwrap().target(), b);
    }

    #[test]
    fn text_selection_collapses_distinct_selections_on_same_target() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let a = tree.add_node(doc);
        let mut queue = EventQueue::new(doc);
        queue.push(&tree, Event::text_selection_change(a, SelectionId(1)));
        queue.push(&tree, Event::text_selection_change(a, SelectionId(2)));
        assert_eq!(queue.suppressed_len(), 1);
    }

    #[test]
    fn add_after_remove_merges_into_selection() {
        let f = fixture(2);
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, remove(&f, f.items[0]));
        queue.push(&f.tree, add(&f, f.items[1]));

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events[0].rule(), CoalesceRule::DoNotEmit);
        assert_eq!(events[1].kind(), EventKind::Selection);
        let sel = events[1].selection().unwrap();
        assert_eq!(sel.item, f.items[1]);
        assert_eq!(sel.packed_index(), Some(0));
    }

    #[test]
    fn remove_after_add_merges_onto_the_add() {
        let f = fixture(2);
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, add(&f, f.items[0]));
        queue.push(&f.tree, remove(&f, f.items[1]));

        let events: Vec<_> = queue.iter().collect();
        // The earlier add survives as the merged event; the tail remove is
        // suppressed and packed into it.
        assert_eq!(events[0].kind(), EventKind::Selection);
        assert_eq!(events[0].selection().unwrap().packed_index(), Some(1));
        assert_eq!(events[1].rule(), CoalesceRule::DoNotEmit);
    }

    #[test]
    fn same_item_add_remove_does_not_pair() {
        let f = fixture(1);
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, remove(&f, f.items[0]));
        queue.push(&f.tree, add(&f, f.items[0]));
        // Same item: no merge, both stay live.
        assert_eq!(queue.suppressed_len(), 0);
        assert_eq!(
            queue.iter().map(Event::kind).collect::<Vec<_>>(),
            vec![EventKind::SelectionRemove, EventKind::SelectionAdd]
        );
    }

    #[test]
    fn third_event_unpacks_a_merged_pair() {
        let f = fixture(3);
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, remove(&f, f.items[0]));
        queue.push(&f.tree, add(&f, f.items[1]));
        queue.push(&f.tree, add(&f, f.items[2]));

        let events: Vec<_> = queue.iter().collect();
        // Pair restored to its original kinds...
        assert_eq!(events[0].kind(), EventKind::SelectionRemove);
        assert_eq!(events[0].rule(), CoalesceRule::CoalesceSelectionChange);
        assert_eq!(events[1].kind(), EventKind::SelectionAdd);
        assert_eq!(events[1].selection().unwrap().packed_index(), None);
        // ...and the new event is still live.
        assert_eq!(events[2].kind(), EventKind::SelectionAdd);
    }

    #[test]
    fn burst_packs_into_selection_within() {
        let f = fixture(6);
        let mut queue = EventQueue::new(f.doc);
        for item in &f.items {
            queue.push(&f.tree, add(&f, *item));
        }
        let tail = queue.iter().last().unwrap();
        assert_eq!(tail.kind(), EventKind::SelectionWithin);
        assert_eq!(tail.target(), f.widget);
        // Every earlier entry for the widget is suppressed.
        assert_eq!(queue.suppressed_len(), queue.len() - 1);
    }

    #[test]
    fn burst_packing_spares_other_widgets() {
        let mut f = fixture(6);
        let other_widget = f.tree.add_node(f.doc);
        let other_item = f.tree.add_node(other_widget);
        let mut queue = EventQueue::new(f.doc);
        queue.push(
            &f.tree,
            Event::selection_change(other_widget, other_item, SelectionAction::Add, false),
        );
        for item in &f.items {
            queue.push(&f.tree, add(&f, *item));
        }
        let other = queue
            .iter()
            .find(|ev| ev.selection().is_some_and(|sel| sel.widget == other_widget))
            .unwrap();
        assert!(!other.is_suppressed());
    }

    #[test]
    fn continued_burst_repacks_over_previous_within() {
        let f = fixture(8);
        let mut queue = EventQueue::new(f.doc);
        for item in &f.items {
            queue.push(&f.tree, add(&f, *item));
        }
        // Exactly one live entry remains and it is the widget-level one.
        let live: Vec<_> = queue.iter().filter(|ev| !ev.is_suppressed()).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind(), EventKind::SelectionWithin);
    }

    #[test]
    fn producer_merged_selection_demotes_to_add_when_contested() {
        let f = fixture(2);
        let mut queue = EventQueue::new(f.doc);
        queue.push(&f.tree, add(&f, f.items[0]));
        // Single-select widget reports a merged selection directly.
        queue.push(
            &f.tree,
            Event::selection_change(f.widget, f.items[1], SelectionAction::Add, true),
        );
        let tail = queue.iter().last().unwrap();
        assert_eq!(tail.kind(), EventKind::SelectionAdd);
    }
}
