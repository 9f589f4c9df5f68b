#![forbid(unsafe_code)]

//! The event queue: insertion, duplicate suppression, and the focus slot.
//!
//! [`EventQueue`] buffers one *generation* of pending notifications for a
//! single document. Producers push events as the tree mutates; each push
//! synchronously coalesces against the buffered history (`coalesce` module)
//! and may fan out derived name/description changes (`propagate` module).
//! A later [`drain`](EventQueue::drain) (`dispatch` module) delivers the
//! surviving entries in order and starts the next generation.
//!
//! Suppression never removes entries: a coalesced-away event stays in the
//! sequence retagged [`CoalesceRule::DoNotEmit`] so later look-back scans
//! still see it. The only pre-append drop is whole-history duplicate
//! suppression, which exists precisely so that repeated no-op notifications
//! cannot grow the queue without bound.
//!
//! # Thread Safety
//!
//! `EventQueue` is not thread-safe; it lives on the tree's owning thread and
//! all operations are synchronous.

use std::collections::VecDeque;

use axon_tree::{NodeId, TreeAccess};

use crate::event::{CoalesceRule, Event, EventKind};

/// Tuning knobs for a queue.
///
/// # Example
///
/// ```
/// use axon_events::QueueConfig;
///
/// let config = QueueConfig::new().selection_pack_threshold(3);
/// assert_eq!(config.selection_pack_threshold, 3);
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of merged same-widget selection events at which a burst
    /// collapses into a single selection-within notification.
    pub selection_pack_threshold: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            selection_pack_threshold: 5,
        }
    }
}

impl QueueConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selection pack threshold.
    #[must_use]
    pub fn selection_pack_threshold(mut self, threshold: u32) -> Self {
        self.selection_pack_threshold = threshold;
        self
    }
}

/// Per-document buffer of pending notifications.
///
/// See the [module docs](self) for the lifecycle. All tree questions go
/// through the `&dyn TreeAccess` argument threaded into each call; the queue
/// itself owns nothing but event records.
#[derive(Debug)]
pub struct EventQueue {
    pub(crate) document: NodeId,
    pub(crate) config: QueueConfig,
    pub(crate) events: Vec<Event>,
    pub(crate) pending_focus: Option<Event>,
    /// Deferred dependency-propagation requests (origin kind, origin target).
    /// Drained by the outermost `push`; see the `propagate` module.
    pub(crate) propagation_queue: VecDeque<(EventKind, NodeId)>,
    /// (kind, node) pairs already walked in the current cascade.
    pub(crate) propagation_seen: ahash::AHashSet<(EventKind, NodeId)>,
}

impl EventQueue {
    /// Create an empty queue for the given document with default settings.
    #[must_use]
    pub fn new(document: NodeId) -> Self {
        Self::with_config(document, QueueConfig::default())
    }

    /// Create an empty queue with explicit settings.
    #[must_use]
    pub fn with_config(document: NodeId, config: QueueConfig) -> Self {
        Self {
            document,
            config,
            events: Vec::new(),
            pending_focus: None,
            propagation_queue: VecDeque::new(),
            propagation_seen: ahash::AHashSet::new(),
        }
    }

    /// The document this queue buffers notifications for.
    #[must_use]
    pub const fn document(&self) -> NodeId {
        self.document
    }

    /// The queue's configuration.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of buffered entries, suppressed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the sequence is empty (the focus slot does not count).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of buffered entries currently retagged do-not-emit.
    #[must_use]
    pub fn suppressed_len(&self) -> usize {
        self.events.iter().filter(|ev| ev.is_suppressed()).count()
    }

    /// Whether a focus event is waiting in the focus slot.
    #[must_use]
    pub const fn has_pending_focus(&self) -> bool {
        self.pending_focus.is_some()
    }

    /// Iterate the buffered entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Push a pending notification.
    ///
    /// Always returns `true`: an event is always handled, even when it is
    /// logically suppressed on arrival. Focus events replace the focus slot
    /// and never enter the main sequence. Everything else is appended (unless
    /// dropped by whole-history duplicate suppression), coalesced against the
    /// buffered history, and — for name-affecting kinds — fanned out to
    /// dependent nodes.
    pub fn push(&mut self, tree: &dyn TreeAccess, event: Event) -> bool {
        let handled = self.enqueue(tree, event);
        self.run_propagation(tree);
        handled
    }

    /// Insertion steps 1–4 without draining the propagation work list.
    ///
    /// The propagator re-enters here for derived events so cascades become
    /// work-list items instead of native recursion.
    pub(crate) fn enqueue(&mut self, tree: &dyn TreeAccess, event: Event) -> bool {
        debug_assert!(
            tree.is_application(event.target)
                || tree.document_of(event.target) == Some(self.document),
            "queued event belongs to another document"
        );

        if event.kind == EventKind::Focus {
            tracing::trace!(target_node = %event.target, "focus event replaces pending slot");
            self.pending_focus = Some(event);
            return true;
        }

        // Whole-history duplicate check. Done before append rather than in
        // the coalescing engine because coalescing never removes entries,
        // only retags them; appending every duplicate would let repeated
        // no-op notifications grow the queue without bound.
        if event.rule == CoalesceRule::RemoveDuplicates && !self.events.is_empty() {
            if self.events.iter().rev().any(|queued| queued.is_duplicate_of(&event)) {
                tracing::trace!(
                    kind = ?event.kind,
                    target_node = %event.target,
                    "duplicate suppressed before append"
                );
                return true;
            }
        }

        let kind = event.kind;
        let target = event.target;
        self.events.push(event);
        self.coalesce_tail(tree);

        if kind.propagates_name_changes() {
            debug_assert!(
                !self.events[self.events.len() - 1].is_suppressed(),
                "name-affecting event suppressed by its own coalescing pass"
            );
            self.propagation_queue.push_back((kind, target));
        }
        true
    }

    /// Take the current generation out of the queue, leaving it empty.
    pub(crate) fn detach_generation(&mut self) -> (Option<Event>, Vec<Event>) {
        (self.pending_focus.take(), std::mem::take(&mut self.events))
    }
}
