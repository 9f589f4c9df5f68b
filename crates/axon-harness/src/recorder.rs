#![forbid(unsafe_code)]

//! Recording sinks.
//!
//! [`Recorder`] implements every collaborator the dispatcher delivers into
//! and appends each callback to one shared, ordered log, so a test can
//! assert on global delivery order across sinks. It can also script two
//! drain-time side effects: pushing events back into the queue on the next
//! fire (reentrancy) and killing a node on the next fire (mid-drain
//! document death).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use axon_events::{
    DrainSinks, Event, EventKind, EventQueue, EventSink, FocusSink, RemoteTransport, SelectionId,
    TextSelectionSink,
};
use axon_tree::{NodeId, TreeAccess};

use crate::sim_tree::KillSwitch;

/// One observed sink callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    /// The pending focus event reached the focus collaborator.
    Focus {
        /// Focused node.
        target: NodeId,
    },
    /// A text-selection event reached the text-selection collaborator.
    TextSelection {
        /// Event target.
        target: NodeId,
        /// Selection identity.
        sel: SelectionId,
    },
    /// A selected-state flip fired ahead of its selection event.
    SelectedState {
        /// Affected item.
        item: NodeId,
        /// New selected state.
        selected: bool,
        /// User-input origin of the implying event.
        from_user_input: bool,
    },
    /// A surviving event reached the generic sink.
    Event {
        /// Delivered kind.
        kind: EventKind,
        /// Event target.
        target: NodeId,
    },
    /// The transport was asked to flush out-of-band mutation records.
    MutationsFlushed,
    /// The aggregated per-generation selection delta.
    SelectionDelta {
        /// Item ids reported selected.
        selected: Vec<u64>,
        /// Item ids reported unselected.
        unselected: Vec<u64>,
    },
}

type Log = Rc<RefCell<Vec<Delivered>>>;

#[derive(Debug, Default)]
struct FocusRecorder {
    log: Log,
}

impl FocusSink for FocusRecorder {
    fn focus_changed(&mut self, _queue: &mut EventQueue, _tree: &dyn TreeAccess, event: &Event) {
        self.log.borrow_mut().push(Delivered::Focus {
            target: event.target(),
        });
    }
}

#[derive(Debug, Default)]
struct TextSelectionRecorder {
    log: Log,
}

impl TextSelectionSink for TextSelectionRecorder {
    fn text_selection_changed(
        &mut self,
        _queue: &mut EventQueue,
        _tree: &dyn TreeAccess,
        event: &Event,
    ) {
        self.log.borrow_mut().push(Delivered::TextSelection {
            target: event.target(),
            sel: event.selection_id().unwrap_or(SelectionId(0)),
        });
    }
}

#[derive(Debug, Default)]
struct EventRecorder {
    log: Log,
    pending_pushes: Rc<RefCell<Vec<Event>>>,
    kill_on_fire: Rc<RefCell<Option<KillSwitch>>>,
}

impl EventSink for EventRecorder {
    fn selected_state_changed(
        &mut self,
        _queue: &mut EventQueue,
        _tree: &dyn TreeAccess,
        item: NodeId,
        selected: bool,
        from_user_input: bool,
    ) {
        self.log.borrow_mut().push(Delivered::SelectedState {
            item,
            selected,
            from_user_input,
        });
    }

    fn event_fired(&mut self, queue: &mut EventQueue, tree: &dyn TreeAccess, event: &Event) {
        self.log.borrow_mut().push(Delivered::Event {
            kind: event.kind(),
            target: event.target(),
        });
        for pushed in self.pending_pushes.borrow_mut().drain(..) {
            queue.push(tree, pushed);
        }
        if let Some(switch) = self.kill_on_fire.borrow_mut().take() {
            switch.kill();
        }
    }
}

#[derive(Debug)]
struct TransportRecorder {
    log: Log,
    active: Rc<Cell<bool>>,
}

impl RemoteTransport for TransportRecorder {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn flush_mutations(&mut self) {
        self.log.borrow_mut().push(Delivered::MutationsFlushed);
    }

    fn selected_items_changed(&mut self, selected: &[u64], unselected: &[u64]) {
        self.log.borrow_mut().push(Delivered::SelectionDelta {
            selected: selected.to_vec(),
            unselected: unselected.to_vec(),
        });
    }
}

/// All four drain collaborators in one recording bundle.
#[derive(Debug)]
pub struct Recorder {
    log: Log,
    focus: FocusRecorder,
    text_selection: TextSelectionRecorder,
    events: EventRecorder,
    transport: TransportRecorder,
    transport_active: Rc<Cell<bool>>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    /// Create a recorder with an active transport.
    #[must_use]
    pub fn new() -> Self {
        let log: Log = Rc::default();
        let active = Rc::new(Cell::new(true));
        Self {
            focus: FocusRecorder {
                log: Rc::clone(&log),
            },
            text_selection: TextSelectionRecorder {
                log: Rc::clone(&log),
            },
            events: EventRecorder {
                log: Rc::clone(&log),
                pending_pushes: Rc::default(),
                kill_on_fire: Rc::default(),
            },
            transport: TransportRecorder {
                log: Rc::clone(&log),
                active: Rc::clone(&active),
            },
            transport_active: active,
            log,
        }
    }

    /// The collaborator bundle to pass to [`EventQueue::drain`].
    pub fn sinks(&mut self) -> DrainSinks<'_> {
        DrainSinks {
            focus: &mut self.focus,
            text_selection: &mut self.text_selection,
            events: &mut self.events,
            transport: Some(&mut self.transport),
        }
    }

    /// The bundle without a remote transport.
    pub fn sinks_without_transport(&mut self) -> DrainSinks<'_> {
        DrainSinks {
            focus: &mut self.focus,
            text_selection: &mut self.text_selection,
            events: &mut self.events,
            transport: None,
        }
    }

    /// Everything delivered so far, in order, across all sinks.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivered> {
        self.log.borrow().clone()
    }

    /// Forget recorded deliveries.
    pub fn clear(&mut self) {
        self.log.borrow_mut().clear();
    }

    /// Toggle the transport's activity flag.
    pub fn set_transport_active(&mut self, active: bool) {
        self.transport_active.set(active);
    }

    /// Queue an event to be pushed back into the queue when the next event
    /// fires through the generic sink.
    pub fn push_on_next_fire(&mut self, event: Event) {
        self.events.pending_pushes.borrow_mut().push(event);
    }

    /// Trip the switch when the next event fires through the generic sink.
    pub fn kill_on_next_fire(&mut self, switch: KillSwitch) {
        *self.events.kill_on_fire.borrow_mut() = Some(switch);
    }
}
