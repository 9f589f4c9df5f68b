#![forbid(unsafe_code)]

//! Non-owning node handles.

use std::fmt;

/// A non-owning reference to a node in the hosting accessibility tree.
///
/// The handle stays meaningful after the node it names is destroyed; holders
/// must revalidate through [`TreeAccess::is_alive`](crate::TreeAccess::is_alive)
/// before acting on it. Never assume the handle outlives the node.
///
/// The raw value doubles as the identifier reported to remote processes,
/// except for document nodes which are reported as 0 by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a handle from a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
