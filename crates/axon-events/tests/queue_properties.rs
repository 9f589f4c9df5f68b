//! End-to-end behavior of the queue, from push to delivery.
//!
//! Each test drives a [`SimTree`] scenario through push/drain and asserts on
//! the recorder's ordered delivery log.

use axon_events::{Event, EventKind, EventQueue, SelectionAction};
use axon_harness::{Delivered, Recorder, SimTree};
use axon_tree::{NameSource, NodeId, RelationKind, State};

fn doc_tree() -> (SimTree, NodeId) {
    let mut tree = SimTree::new();
    let doc = tree.add_document();
    (tree, doc)
}

fn delivered_events(recorder: &Recorder) -> Vec<(EventKind, NodeId)> {
    recorder
        .deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivered::Event { kind, target } => Some((kind, target)),
            _ => None,
        })
        .collect()
}

#[test]
fn deliveries_never_exceed_pushes() {
    let (mut tree, doc) = doc_tree();
    let nodes: Vec<_> = (0..4).map(|_| tree.add_node(doc)).collect();
    let mut queue = EventQueue::new(doc);

    let mut pushes = 0;
    for _ in 0..3 {
        for node in &nodes {
            queue.push(&tree, Event::new(EventKind::ValueChange, *node));
            pushes += 1;
        }
    }

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    assert!(delivered_events(&recorder).len() <= pushes);
}

#[test]
fn queue_length_accounts_for_early_drops_only() {
    let (mut tree, doc) = doc_tree();
    let node = tree.add_node(doc);
    let other = tree.add_node(doc);
    let mut queue = EventQueue::new(doc);

    // 5 pushes: one focus (slot), one duplicate (dropped pre-append),
    // three appended. Suppression by coalescing must not shrink the queue.
    queue.push(&tree, Event::new(EventKind::Focus, node));
    queue.push(&tree, Event::new(EventKind::ValueChange, node));
    queue.push(&tree, Event::new(EventKind::ValueChange, node)); // dup
    queue.push(&tree, Event::state_change(other, State::BUSY, true));
    queue.push(&tree, Event::state_change(other, State::BUSY, false)); // cancels both

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.suppressed_len(), 2);
}

#[test]
fn identical_events_yield_one_delivery() {
    let (mut tree, doc) = doc_tree();
    let node = tree.add_node(doc);
    let spacer = tree.add_node(doc);
    let mut queue = EventQueue::new(doc);

    queue.push(&tree, Event::new(EventKind::NameChange, node));
    queue.push(&tree, Event::new(EventKind::NameChange, spacer));
    queue.push(&tree, Event::new(EventKind::NameChange, node)); // far dup

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    let for_node: Vec<_> = delivered_events(&recorder)
        .into_iter()
        .filter(|(_, t)| *t == node)
        .collect();
    assert_eq!(for_node, vec![(EventKind::NameChange, node)]);
}

#[test]
fn selection_burst_collapses_to_one_within_delivery() {
    let (mut tree, doc) = doc_tree();
    let widget = tree.add_node(doc);
    let items: Vec<_> = (0..6).map(|_| tree.add_node(widget)).collect();
    let mut queue = EventQueue::new(doc);

    for item in &items {
        queue.push(
            &tree,
            Event::selection_change(widget, *item, SelectionAction::Add, false),
        );
    }

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    assert_eq!(
        delivered_events(&recorder),
        vec![(EventKind::SelectionWithin, widget)]
    );
}

#[test]
fn remove_then_add_becomes_one_selection_with_two_state_flips() {
    let (mut tree, doc) = doc_tree();
    let widget = tree.add_node(doc);
    let item_a = tree.add_node(widget);
    let item_b = tree.add_node(widget);
    let mut queue = EventQueue::new(doc);

    queue.push(
        &tree,
        Event::selection_change(widget, item_a, SelectionAction::Remove, false),
    );
    queue.push(
        &tree,
        Event::selection_change(widget, item_b, SelectionAction::Add, false),
    );

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());

    let deliveries = recorder.deliveries();
    assert!(matches!(
        deliveries[0],
        Delivered::SelectedState { item, selected: true, .. } if item == item_b
    ));
    assert!(matches!(
        deliveries[1],
        Delivered::SelectedState { item, selected: false, .. } if item == item_a
    ));
    assert!(matches!(
        deliveries[2],
        Delivered::Event { kind: EventKind::Selection, target } if target == item_b
    ));
    assert_eq!(delivered_events(&recorder).len(), 1);
}

#[test]
fn pending_focus_outruns_everything_queued_before_it() {
    let (mut tree, doc) = doc_tree();
    let focused = tree.add_node(doc);
    let other = tree.add_node(doc);
    let mut queue = EventQueue::new(doc);

    queue.push(&tree, Event::new(EventKind::ValueChange, other));
    queue.push(&tree, Event::new(EventKind::Alert, other));
    queue.push(&tree, Event::new(EventKind::Focus, focused));

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    assert!(matches!(
        recorder.deliveries().first(),
        Some(Delivered::Focus { target }) if *target == focused
    ));
}

#[test]
fn text_removal_notifies_parent_and_labelled_node() {
    let (mut tree, doc) = doc_tree();
    let container = tree.add_node(doc);
    let leaf = tree.add_node(container);
    let labelled = tree.add_node(doc);
    tree.set_subtree_name_rule(container, true);
    tree.set_name(container, Some("old"), NameSource::FromSubtree);
    tree.relate(container, RelationKind::LabelFor, labelled);

    let mut queue = EventQueue::new(doc);
    queue.push(&tree, Event::text_removed(leaf, 0, "old"));

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());

    let events = delivered_events(&recorder);
    assert!(events.contains(&(EventKind::TextRemoved, leaf)));
    assert!(events.contains(&(EventKind::NameChange, container)));
    assert!(events.contains(&(EventKind::NameChange, labelled)));
}

#[test]
fn opposite_state_changes_cancel_entirely() {
    let (mut tree, doc) = doc_tree();
    let node = tree.add_node(doc);
    let mut queue = EventQueue::new(doc);

    queue.push(&tree, Event::state_change(node, State::EXPANDED, true));
    queue.push(&tree, Event::state_change(node, State::EXPANDED, false));

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    assert!(recorder.deliveries().is_empty());
}

#[test]
fn generations_stay_separate_across_drains() {
    let (mut tree, doc) = doc_tree();
    let a = tree.add_node(doc);
    let b = tree.add_node(doc);
    let mut queue = EventQueue::new(doc);

    queue.push(&tree, Event::new(EventKind::ValueChange, a));
    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    assert_eq!(delivered_events(&recorder).len(), 1);

    // An identical event in the next generation is not a duplicate of the
    // drained one: history does not survive a drain.
    queue.push(&tree, Event::new(EventKind::ValueChange, a));
    queue.push(&tree, Event::new(EventKind::ValueChange, b));
    queue.drain(&tree, &mut recorder.sinks());
    assert_eq!(delivered_events(&recorder).len(), 3);
}

#[test]
fn reorder_on_composite_widget_root_passes_validation() {
    let (mut tree, doc) = doc_tree();
    let grid = tree.add_node(doc);
    tree.set_composite_widget_root(grid, true);
    let mut queue = EventQueue::new(doc);
    queue.push(&tree, Event::new(EventKind::Reorder, grid));

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    let deliveries = recorder.deliveries();
    // The reorder fires, then the transport flushes its mutation records.
    assert!(matches!(
        deliveries[0],
        Delivered::Event { kind: EventKind::Reorder, target } if target == grid
    ));
    assert!(matches!(deliveries[1], Delivered::MutationsFlushed));
}

#[test]
fn propagation_does_not_cross_into_the_host_document() {
    let mut tree = SimTree::new();
    let outer = tree.add_document();
    let host = tree.add_node(outer);
    let subdoc = tree.add_subdocument(host);
    let container = tree.add_node(subdoc);
    let leaf = tree.add_node(container);
    tree.set_subtree_name_rule(container, true);
    tree.set_name(container, Some("inner"), NameSource::FromSubtree);
    // The walk may reach the subdocument, but never the host above it.
    tree.set_conditional_subtree_name_rule(subdoc, true);
    let labelled_by_host = tree.add_node(outer);
    tree.relate(host, RelationKind::LabelFor, labelled_by_host);

    let mut queue = EventQueue::new(subdoc);
    queue.push(&tree, Event::text_removed(leaf, 0, "x"));

    assert!(
        queue
            .iter()
            .all(|ev| ev.target() != labelled_by_host && ev.target() != host)
    );
}

#[test]
fn drain_without_transport_delivers_normally() {
    let (mut tree, doc) = doc_tree();
    let widget = tree.add_node(doc);
    let item = tree.add_node(widget);
    let mut queue = EventQueue::new(doc);
    queue.push(
        &tree,
        Event::selection_change(widget, item, SelectionAction::Add, false),
    );
    queue.push(&tree, Event::text_inserted(item, 0, "x"));

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks_without_transport());

    let deliveries = recorder.deliveries();
    // No transport: no flushes, no deltas, but ordinary delivery holds.
    assert!(
        deliveries
            .iter()
            .all(|d| !matches!(d, Delivered::MutationsFlushed | Delivered::SelectionDelta { .. }))
    );
    assert_eq!(delivered_events(&recorder).len(), 2);
}

#[test]
fn alternating_selection_churn_unpacks_back_to_individual_events() {
    let (mut tree, doc) = doc_tree();
    let widget = tree.add_node(doc);
    let items: Vec<_> = (0..4).map(|_| tree.add_node(widget)).collect();
    let mut queue = EventQueue::new(doc);

    // remove/add forms a merged pair; the third change unpacks it, and the
    // run ends below the pack threshold, so all four deliver individually
    // in push order.
    queue.push(
        &tree,
        Event::selection_change(widget, items[0], SelectionAction::Remove, false),
    );
    queue.push(
        &tree,
        Event::selection_change(widget, items[1], SelectionAction::Add, false),
    );
    queue.push(
        &tree,
        Event::selection_change(widget, items[2], SelectionAction::Remove, false),
    );
    queue.push(
        &tree,
        Event::selection_change(widget, items[3], SelectionAction::Add, false),
    );

    let mut recorder = Recorder::new();
    queue.drain(&tree, &mut recorder.sinks());
    let kinds: Vec<_> = delivered_events(&recorder)
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::SelectionRemove,
            EventKind::SelectionAdd,
            EventKind::SelectionRemove,
            EventKind::SelectionAdd,
        ]
    );
}
