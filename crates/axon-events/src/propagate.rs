#![forbid(unsafe_code)]

//! Dependency propagation for name- and description-affecting events.
//!
//! A text or name change on one node can change the *computed* name or
//! description of other nodes: ancestors whose names derive from their
//! subtree, and nodes labelled or described by those ancestors. This module
//! walks the minimal ancestor chain and synthesizes the derived
//! name-change/description-change events, feeding them back through
//! insertion so they coalesce like any producer event.
//!
//! Cascades are *not* native recursion: a derived event that itself affects
//! names lands on the queue's propagation work list, which the outermost
//! [`EventQueue::push`] drains to a fixed point. A per-cascade visited set
//! bounds the loop even if the tree reports cyclic label/description
//! relations.

use axon_tree::{NameSource, NodeId, RelationKind, TreeAccess};

use crate::event::{Event, EventKind};
use crate::queue::EventQueue;

impl EventQueue {
    /// Synthesize name/description-change events implied by a change at
    /// `target`, re-entering insertion for each derived event.
    ///
    /// Producers normally never call this: [`push`](Self::push) invokes it
    /// for name-change, text-inserted and text-removed events. It is public
    /// for structural reorders reported outside this queue, which can expose
    /// the same name dependencies (`kind` then is reorder or inner-reorder).
    ///
    /// Returns whether any derived event was queued by this walk.
    pub fn push_name_or_description_change(
        &mut self,
        tree: &dyn TreeAccess,
        kind: EventKind,
        target: NodeId,
    ) -> bool {
        let pushed = self.propagate_one(tree, kind, target);
        self.run_propagation(tree);
        pushed
    }

    /// Drain the propagation work list to a fixed point, then forget the
    /// cascade's visited set.
    pub(crate) fn run_propagation(&mut self, tree: &dyn TreeAccess) {
        while let Some((kind, target)) = self.propagation_queue.pop_front() {
            self.propagate_one(tree, kind, target);
        }
        self.propagation_seen.clear();
    }

    /// One ancestor/relation walk for a single origin event.
    fn propagate_one(&mut self, tree: &dyn TreeAccess, kind: EventKind, target: NodeId) -> bool {
        if !self.propagation_seen.insert((kind, target)) {
            tracing::trace!(?kind, %target, "propagation cycle cut");
            return false;
        }

        // If the text of a leaf changed without replacing it, the only event
        // queued targets the container; a reorder can likewise change the
        // target's own computed name. Those cases need a name-change on the
        // target itself, not just on ancestors.
        let maybe_target_name_changed = matches!(
            kind,
            EventKind::TextRemoved
                | EventKind::TextInserted
                | EventKind::Reorder
                | EventKind::InnerReorder
        ) && tree.has_subtree_name_rule(target);

        let do_name = tree.has_name_dependent(target) || maybe_target_name_changed;
        let do_desc = tree.has_description_dependent(target);
        if !do_name && !do_desc {
            return false;
        }

        let mut pushed = false;
        let mut name_check_ancestor = true;
        let mut visited = target;
        loop {
            if do_name {
                if name_check_ancestor
                    && (maybe_target_name_changed || visited != target)
                    && tree.has_subtree_name_rule(visited)
                {
                    if self.subtree_name_may_have_changed(tree, visited) {
                        pushed |= self.enqueue(tree, Event::new(EventKind::NameChange, visited));
                    }
                    // Whether or not it fired, ancestors further up resolve
                    // their names independently of this subtree.
                    name_check_ancestor = false;
                }
                pushed |= self.push_change_to_relations(tree, visited, RelationKind::LabelFor);
            }

            if do_desc {
                pushed |=
                    self.push_change_to_relations(tree, visited, RelationKind::DescriptionFor);
            }

            // Never cross document boundaries.
            if tree.is_document(visited) {
                break;
            }
            let Some(parent) = tree.parent(visited) else {
                break;
            };
            // Continue only while the parent's name can fall back to its
            // subtree at all.
            if !tree.has_conditional_subtree_name_rule(parent) {
                break;
            }
            visited = parent;
        }

        pushed
    }

    /// Whether a subtree-named ancestor should get a derived name-change,
    /// keyed on how its name was last resolved.
    fn subtree_name_may_have_changed(&self, tree: &dyn TreeAccess, node: NodeId) -> bool {
        // File-picker-like controls take part of their name from the subtree
        // even when the author supplied one.
        if tree.name_always_from_subtree(node) {
            return true;
        }
        let resolved = tree.name(node);
        match resolved.source {
            // Author-supplied literal: only a now-undefined name means the
            // subtree mattered (its descendants may have been removed).
            NameSource::Explicit => resolved.text.is_none(),
            NameSource::FromSubtree => true,
            // The fallback may only have become visible because the subtree
            // emptied; assume the name used to come from the subtree.
            NameSource::FromTooltip => true,
            NameSource::FromRelations => true,
        }
    }

    /// One derived event per node related to `node` by `relation`.
    fn push_change_to_relations(
        &mut self,
        tree: &dyn TreeAccess,
        node: NodeId,
        relation: RelationKind,
    ) -> bool {
        let kind = match relation {
            RelationKind::LabelFor => EventKind::NameChange,
            RelationKind::DescriptionFor => EventKind::DescriptionChange,
        };
        let mut pushed = false;
        for related in tree.relation_targets(node, relation) {
            pushed |= self.enqueue(tree, Event::new(kind, related));
        }
        pushed
    }
}
