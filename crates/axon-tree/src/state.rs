#![forbid(unsafe_code)]

//! Node state bits.

use bitflags::bitflags;

bitflags! {
    /// Boolean states a node can expose to assistive technology.
    ///
    /// A state-change event always carries exactly one of these bits together
    /// with an enabled flag; the queue coalesces per bit, so combined masks
    /// never appear in queued events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct State: u32 {
        /// The node is selected within its owning widget.
        const SELECTED = 1 << 0;
        /// The node has keyboard focus.
        const FOCUSED = 1 << 1;
        /// The node is expanded (tree items, disclosure widgets).
        const EXPANDED = 1 << 2;
        /// The node is checked (check boxes, toggle buttons).
        const CHECKED = 1 << 3;
        /// The node accepts interaction.
        const ENABLED = 1 << 4;
        /// The node is busy loading or updating.
        const BUSY = 1 << 5;
        /// The node's current value fails validation.
        const INVALID = 1 << 6;
        /// The node is offscreen.
        const OFFSCREEN = 1 << 7;
    }
}
