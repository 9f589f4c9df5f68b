#![forbid(unsafe_code)]

//! The [`TreeAccess`] trait: questions the queue asks the hosting tree.
//!
//! The event queue never walks the tree on its own. Everything it needs —
//! liveness, parents, document ownership, name resolution, relations — goes
//! through this trait, resolved against the live tree at the moment of the
//! call. Implementations are expected to be cheap; the queue calls these
//! methods from hot coalescing paths.

use crate::node::NodeId;

/// How a node's accessible name was computed the last time it was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// An author-supplied literal (attribute, property).
    Explicit,
    /// Concatenated from the node's subtree content.
    FromSubtree,
    /// Fallback to the node's tooltip.
    FromTooltip,
    /// Derived from a labelling relation.
    FromRelations,
}

/// A resolved accessible name: the current text (if any) and how it was
/// obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolution {
    /// The current name, or `None` when the name is undefined.
    pub text: Option<String>,
    /// How `text` was computed.
    pub source: NameSource,
}

impl NameResolution {
    /// Convenience constructor.
    #[must_use]
    pub fn new(text: Option<impl Into<String>>, source: NameSource) -> Self {
        Self {
            text: text.map(Into::into),
            source,
        }
    }
}

/// Directed relations a node can declare toward other nodes.
///
/// Read from the perspective of the *source* node: a node with a `LabelFor`
/// relation toward `n` contributes to `n`'s accessible name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The source node labels the target node.
    LabelFor,
    /// The source node describes the target node.
    DescriptionFor,
}

/// Read access to the hosting accessibility tree.
///
/// Object safe; the queue takes `&dyn TreeAccess` so a document can hand the
/// queue whatever view of the tree it owns. All methods take node handles
/// that may be stale — implementations must answer rather than panic for
/// dead nodes (`is_alive` is the designated staleness probe; other methods
/// may return arbitrary-but-safe answers for dead nodes).
pub trait TreeAccess {
    /// Whether the node still exists and is attached.
    fn is_alive(&self, node: NodeId) -> bool;

    /// The node's parent, if it has one.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The document node owning this node, if any.
    fn document_of(&self, node: NodeId) -> Option<NodeId>;

    /// Whether the node is a document root.
    fn is_document(&self, node: NodeId) -> bool;

    /// Whether the node is the process-wide application root.
    fn is_application(&self, node: NodeId) -> bool;

    /// Whether the node hosts an embedded document (an out-of-document
    /// subtree boundary).
    fn is_outer_document(&self, node: NodeId) -> bool;

    /// Whether the node is a composite widget that manages the order of its
    /// own subtree, so structural reorders below it are reported on the
    /// widget itself.
    fn is_composite_widget_root(&self, node: NodeId) -> bool;

    /// Resolve the node's current accessible name.
    fn name(&self, node: NodeId) -> NameResolution;

    /// Whether the node's name may be computed from its subtree content.
    fn has_subtree_name_rule(&self, node: NodeId) -> bool;

    /// Whether the node's name *falls back* to subtree content when nothing
    /// more specific applies. Ancestor walks continue only through nodes
    /// satisfying this.
    fn has_conditional_subtree_name_rule(&self, node: NodeId) -> bool;

    /// Whether the node's name always partly derives from its own subtree
    /// regardless of author-supplied naming (file-picker-like controls).
    fn name_always_from_subtree(&self, node: NodeId) -> bool;

    /// Whether some other node's name could derive from this node (via
    /// subtree containment or a labelling relation).
    fn has_name_dependent(&self, node: NodeId) -> bool;

    /// Whether some other node's description could derive from this node.
    fn has_description_dependent(&self, node: NodeId) -> bool;

    /// All nodes toward which `node` declares the given relation.
    fn relation_targets(&self, node: NodeId, kind: RelationKind) -> Vec<NodeId>;
}
