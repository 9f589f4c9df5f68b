#![forbid(unsafe_code)]

//! Pending-notification events.
//!
//! An [`Event`] is one pending notification about a change in the hosting
//! tree: a kind, a target node, a coalescing rule, a user-input-origin flag,
//! and a kind-specific payload. Events are plain mutable records; the queue
//! retags and reclassifies them in place while coalescing (see the `queue`
//! and `coalesce` modules), so nothing here is reference counted.
//!
//! # Design Notes
//!
//! - The target is a non-owning [`NodeId`]; every consumer revalidates it
//!   through [`TreeAccess::is_alive`](axon_tree::TreeAccess::is_alive).
//! - Each kind has a default coalescing rule ([`EventKind::default_rule`]);
//!   producers can override it with [`Event::with_rule`].
//! - A merged selection event remembers its suppressed sibling by *index*
//!   into the owning queue sequence, never by a second owned copy.

use axon_tree::{NodeId, State};

/// Notification kinds understood by the queue.
///
/// Kinds the queue itself never creates (everything except [`Selection`],
/// [`SelectionWithin`]) enter through [`EventQueue::push`]; the two merged
/// kinds are also producible by coalescing.
///
/// [`Selection`]: EventKind::Selection
/// [`SelectionWithin`]: EventKind::SelectionWithin
/// [`EventQueue::push`]: crate::EventQueue::push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A node gained focus. Held in the queue's single focus slot.
    Focus,
    /// Children of the target were reordered. Only queued for roots that
    /// handle their own structural reduction.
    Reorder,
    /// Children were reordered without crossing the target's boundary.
    InnerReorder,
    /// The target's accessible name changed.
    NameChange,
    /// The target's accessible description changed.
    DescriptionChange,
    /// Text was inserted into the target.
    TextInserted,
    /// Text was removed from the target.
    TextRemoved,
    /// A text selection or caret within the target changed.
    TextSelectionChanged,
    /// A merged add+remove pair in a single-selection widget.
    Selection,
    /// An item was added to a widget's selection.
    SelectionAdd,
    /// An item was removed from a widget's selection.
    SelectionRemove,
    /// Many selection changes collapsed into one widget-level notification.
    SelectionWithin,
    /// A boolean state bit of the target flipped.
    StateChange,
    /// The target's value changed.
    ValueChange,
    /// The target raised an alert.
    Alert,
}

impl EventKind {
    /// The coalescing rule applied when a producer does not override it.
    #[must_use]
    pub const fn default_rule(self) -> CoalesceRule {
        match self {
            Self::Reorder => CoalesceRule::CoalesceReorder,
            Self::InnerReorder | Self::TextInserted | Self::TextRemoved => {
                CoalesceRule::AllowDuplicates
            }
            Self::TextSelectionChanged => CoalesceRule::CoalesceTextSelectionChange,
            Self::Selection | Self::SelectionAdd | Self::SelectionRemove | Self::SelectionWithin => {
                CoalesceRule::CoalesceSelectionChange
            }
            Self::StateChange => CoalesceRule::CoalesceStateChange,
            Self::Alert => CoalesceRule::CoalesceSameType,
            Self::Focus | Self::NameChange | Self::DescriptionChange | Self::ValueChange => {
                CoalesceRule::RemoveDuplicates
            }
        }
    }

    /// Whether queuing this kind may change some other node's computed name
    /// or description, requiring a dependency-propagation pass.
    #[must_use]
    pub const fn propagates_name_changes(self) -> bool {
        matches!(
            self,
            Self::NameChange | Self::TextInserted | Self::TextRemoved
        )
    }

    /// Whether this kind carries a selection-change payload.
    #[must_use]
    pub const fn is_selection_kind(self) -> bool {
        matches!(
            self,
            Self::Selection | Self::SelectionAdd | Self::SelectionRemove | Self::SelectionWithin
        )
    }
}

/// How a newly queued event interacts with previously queued events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoalesceRule {
    /// Drop the new event when an identical (kind, rule, target) entry is
    /// anywhere in the queued history.
    RemoveDuplicates,
    /// Structural reorder on a root; reduction happened upstream, the queue
    /// only validates.
    CoalesceReorder,
    /// Suppress the nearest earlier entry of the same (kind, rule).
    CoalesceSameType,
    /// Merge bursts of selection changes within one widget.
    CoalesceSelectionChange,
    /// Cancel paired opposite state flips; suppress repeats.
    CoalesceStateChange,
    /// Suppress earlier entries for the same selection or target.
    CoalesceTextSelectionChange,
    /// Never coalesced.
    AllowDuplicates,
    /// Logically void: stays queued for look-back, is never delivered.
    DoNotEmit,
}

/// Whether a selection change added or removed an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionAction {
    /// The item became selected.
    Add,
    /// The item became unselected.
    Remove,
}

/// Payload of the selection-change kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// The composite widget owning the selection.
    pub widget: NodeId,
    /// The affected item.
    pub item: NodeId,
    /// Add/remove discriminator. Survives kind reclassification so unpacking
    /// can restore the original kind.
    pub action: SelectionAction,
    /// Number of consecutive same-widget selection events merged into this
    /// entry.
    pub(crate) preceding: u32,
    /// Index of the suppressed sibling packed into this entry, within the
    /// same owning sequence.
    pub(crate) packed: Option<usize>,
}

impl SelectionChange {
    /// Number of consecutive same-widget selection events merged so far.
    #[must_use]
    pub const fn preceding_count(&self) -> u32 {
        self.preceding
    }

    /// Index of the packed sibling entry, if a pair was merged.
    #[must_use]
    pub const fn packed_index(&self) -> Option<usize> {
        self.packed
    }
}

/// Payload of state-change events: one bit and its new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// The single state bit that flipped.
    pub state: State,
    /// Whether the bit is now set.
    pub enabled: bool,
}

/// Payload of text-inserted / text-removed events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Character offset of the change within the target.
    pub start: u32,
    /// The inserted or removed text.
    pub text: String,
}

/// Opaque identity of an underlying text-selection object.
///
/// Two text-selection-changed events with equal ids describe the same
/// selection even when their targets differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionId(pub u64);

/// Kind-specific event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Kinds without extra data.
    None,
    /// State-change data.
    State(StateChange),
    /// Selection-change data.
    Selection(SelectionChange),
    /// Text-change data.
    Text(TextChange),
    /// Text-selection identity.
    TextSelection(SelectionId),
}

/// A pending notification about a change in the accessibility tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub(crate) kind: EventKind,
    pub(crate) rule: CoalesceRule,
    pub(crate) target: NodeId,
    pub(crate) from_user_input: bool,
    pub(crate) payload: Payload,
}

impl Event {
    /// Create an event of a payload-free kind with its default rule.
    ///
    /// Use the dedicated constructors for state-change, selection and text
    /// kinds; this one debug-asserts the kind carries no payload.
    #[must_use]
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        debug_assert!(
            !kind.is_selection_kind()
                && !matches!(
                    kind,
                    EventKind::StateChange
                        | EventKind::TextSelectionChanged
                        | EventKind::TextInserted
                        | EventKind::TextRemoved
                ),
            "kind {kind:?} requires a payload constructor"
        );
        Self {
            kind,
            rule: kind.default_rule(),
            target,
            from_user_input: false,
            payload: Payload::None,
        }
    }

    /// A state-change event for a single state bit.
    #[must_use]
    pub fn state_change(target: NodeId, state: State, enabled: bool) -> Self {
        debug_assert_eq!(state.bits().count_ones(), 1, "one state bit per event");
        Self {
            kind: EventKind::StateChange,
            rule: CoalesceRule::CoalesceStateChange,
            target,
            from_user_input: false,
            payload: Payload::State(StateChange { state, enabled }),
        }
    }

    /// A selection change of `item` within `widget`.
    ///
    /// For a single-selection widget an added item is reported as the merged
    /// [`EventKind::Selection`] directly; everything else becomes
    /// selection-add or selection-remove.
    #[must_use]
    pub fn selection_change(
        widget: NodeId,
        item: NodeId,
        action: SelectionAction,
        single_select: bool,
    ) -> Self {
        let kind = match action {
            SelectionAction::Add if single_select => EventKind::Selection,
            SelectionAction::Add => EventKind::SelectionAdd,
            SelectionAction::Remove => EventKind::SelectionRemove,
        };
        Self {
            kind,
            rule: CoalesceRule::CoalesceSelectionChange,
            target: item,
            from_user_input: false,
            payload: Payload::Selection(SelectionChange {
                widget,
                item,
                action,
                preceding: 0,
                packed: None,
            }),
        }
    }

    /// A text-selection-changed event for the selection identified by `sel`.
    #[must_use]
    pub fn text_selection_change(target: NodeId, sel: SelectionId) -> Self {
        Self {
            kind: EventKind::TextSelectionChanged,
            rule: CoalesceRule::CoalesceTextSelectionChange,
            target,
            from_user_input: false,
            payload: Payload::TextSelection(sel),
        }
    }

    /// A text-inserted event.
    #[must_use]
    pub fn text_inserted(target: NodeId, start: u32, text: impl Into<String>) -> Self {
        Self::new_text_change(EventKind::TextInserted, target, start, text.into())
    }

    /// A text-removed event.
    #[must_use]
    pub fn text_removed(target: NodeId, start: u32, text: impl Into<String>) -> Self {
        Self::new_text_change(EventKind::TextRemoved, target, start, text.into())
    }

    fn new_text_change(kind: EventKind, target: NodeId, start: u32, text: String) -> Self {
        Self {
            kind,
            rule: CoalesceRule::AllowDuplicates,
            target,
            from_user_input: false,
            payload: Payload::Text(TextChange { start, text }),
        }
    }

    /// Override the coalescing rule.
    #[must_use]
    pub fn with_rule(mut self, rule: CoalesceRule) -> Self {
        self.rule = rule;
        self
    }

    /// Mark whether the event originated from direct user input.
    #[must_use]
    pub fn from_user_input(mut self, from_user: bool) -> Self {
        self.from_user_input = from_user;
        self
    }

    /// The event's kind. May have been reclassified by coalescing.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The event's coalescing rule. May have been retagged by coalescing.
    #[must_use]
    pub const fn rule(&self) -> CoalesceRule {
        self.rule
    }

    /// The target node.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// Whether the event originated from direct user input.
    #[must_use]
    pub const fn is_from_user_input(&self) -> bool {
        self.from_user_input
    }

    /// Whether the event is logically void.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        matches!(self.rule, CoalesceRule::DoNotEmit)
    }

    /// The selection-change payload, for selection kinds.
    #[must_use]
    pub const fn selection(&self) -> Option<&SelectionChange> {
        match &self.payload {
            Payload::Selection(sel) => Some(sel),
            _ => None,
        }
    }

    pub(crate) fn selection_mut(&mut self) -> Option<&mut SelectionChange> {
        match &mut self.payload {
            Payload::Selection(sel) => Some(sel),
            _ => None,
        }
    }

    /// The state-change payload.
    #[must_use]
    pub const fn state(&self) -> Option<StateChange> {
        match self.payload {
            Payload::State(sc) => Some(sc),
            _ => None,
        }
    }

    /// The text-change payload.
    #[must_use]
    pub const fn text(&self) -> Option<&TextChange> {
        match &self.payload {
            Payload::Text(tc) => Some(tc),
            _ => None,
        }
    }

    /// The text-selection identity.
    #[must_use]
    pub const fn selection_id(&self) -> Option<SelectionId> {
        match self.payload {
            Payload::TextSelection(sel) => Some(sel),
            _ => None,
        }
    }

    /// Duplicate-suppression identity: kind, rule and target all equal.
    #[must_use]
    pub(crate) fn is_duplicate_of(&self, other: &Self) -> bool {
        self.kind == other.kind && self.rule == other.rule && self.target == other.target
    }
}
