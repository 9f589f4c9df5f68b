#![forbid(unsafe_code)]

//! An in-memory accessibility tree for tests.
//!
//! [`SimTree`] implements [`TreeAccess`] over a flat node table. Structure
//! and naming are set up front with the builder-style mutators; liveness can
//! additionally be flipped *during* a drain through a [`KillSwitch`], which
//! is how tests exercise mid-drain document death.
//!
//! Name/description dependency bits are derived rather than stored: a node
//! has a name dependent when it labels another node, or when an ancestor
//! inside its document computes its name from subtree content. This mirrors
//! how a real tree maintains those bits incrementally.

use std::cell::Cell;
use std::rc::Rc;

use ahash::AHashMap;
use axon_tree::{NameResolution, NameSource, NodeId, RelationKind, TreeAccess};

/// Shared handle to one node's liveness flag.
///
/// Cloning the switch out of the tree lets a sink kill the node while the
/// dispatcher holds the tree as `&dyn TreeAccess`.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    alive: Rc<Cell<bool>>,
}

impl KillSwitch {
    /// Mark the node dead.
    pub fn kill(&self) {
        self.alive.set(false);
    }
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    alive: Rc<Cell<bool>>,
    is_document: bool,
    is_application: bool,
    outer_document: bool,
    composite_widget_root: bool,
    name: NameResolution,
    subtree_name_rule: bool,
    /// `None` means the default: regular nodes allow the walk through,
    /// documents and the application root do not.
    conditional_subtree_name_rule: Option<bool>,
    name_always_from_subtree: bool,
    relations: Vec<(RelationKind, NodeId)>,
}

impl NodeData {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            alive: Rc::new(Cell::new(true)),
            is_document: false,
            is_application: false,
            outer_document: false,
            composite_widget_root: false,
            name: NameResolution::new(None::<&str>, NameSource::Explicit),
            subtree_name_rule: false,
            conditional_subtree_name_rule: None,
            name_always_from_subtree: false,
            relations: Vec::new(),
        }
    }
}

/// A scriptable tree fixture.
#[derive(Debug, Default)]
pub struct SimTree {
    nodes: AHashMap<NodeId, NodeData>,
    next_id: u64,
}

impl SimTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        self.next_id += 1;
        let id = NodeId::new(self.next_id);
        self.nodes.insert(id, data);
        id
    }

    /// Add a root document node.
    pub fn add_document(&mut self) -> NodeId {
        let mut data = NodeData::new(None);
        data.is_document = true;
        self.insert(data)
    }

    /// Add a document node hosted inside `host` (an embedded document).
    pub fn add_subdocument(&mut self, host: NodeId) -> NodeId {
        self.set_outer_document(host, true);
        let mut data = NodeData::new(Some(host));
        data.is_document = true;
        self.insert(data)
    }

    /// Add the process-wide application root.
    pub fn add_application(&mut self) -> NodeId {
        let mut data = NodeData::new(None);
        data.is_application = true;
        self.insert(data)
    }

    /// Add a regular node under `parent`.
    pub fn add_node(&mut self, parent: NodeId) -> NodeId {
        debug_assert!(self.nodes.contains_key(&parent), "unknown parent node");
        self.insert(NodeData::new(Some(parent)))
    }

    /// Mark the node and its whole subtree dead.
    pub fn kill(&self, node: NodeId) {
        for (id, data) in &self.nodes {
            if *id == node || self.descends_from(*id, node) {
                data.alive.set(false);
            }
        }
    }

    /// A shared handle to the node's liveness flag, usable mid-drain.
    #[must_use]
    pub fn kill_switch(&self, node: NodeId) -> KillSwitch {
        KillSwitch {
            alive: self
                .nodes
                .get(&node)
                .map(|data| Rc::clone(&data.alive))
                .unwrap_or_else(|| Rc::new(Cell::new(false))),
        }
    }

    /// Set the node's resolved name and resolution method.
    pub fn set_name(&mut self, node: NodeId, text: Option<impl Into<String>>, source: NameSource) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.name = NameResolution::new(text, source);
        }
    }

    /// Whether the node's name is computed from its subtree.
    pub fn set_subtree_name_rule(&mut self, node: NodeId, value: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.subtree_name_rule = value;
        }
    }

    /// Override whether ancestor walks may continue through this node.
    pub fn set_conditional_subtree_name_rule(&mut self, node: NodeId, value: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.conditional_subtree_name_rule = Some(value);
        }
    }

    /// Whether the node always takes part of its name from its subtree.
    pub fn set_name_always_from_subtree(&mut self, node: NodeId, value: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.name_always_from_subtree = value;
        }
    }

    /// Mark the node as hosting an embedded document.
    pub fn set_outer_document(&mut self, node: NodeId, value: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.outer_document = value;
        }
    }

    /// Mark the node as a composite widget managing its own subtree order.
    pub fn set_composite_widget_root(&mut self, node: NodeId, value: bool) {
        if let Some(data) = self.nodes.get_mut(&node) {
            data.composite_widget_root = value;
        }
    }

    /// Declare a relation from `source` toward `target`.
    pub fn relate(&mut self, source: NodeId, kind: RelationKind, target: NodeId) {
        if let Some(data) = self.nodes.get_mut(&source) {
            data.relations.push((kind, target));
        }
    }

    fn descends_from(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cur = node;
        while let Some(data) = self.nodes.get(&cur) {
            match data.parent {
                Some(p) if p == ancestor => return true,
                Some(p) => cur = p,
                None => return false,
            }
        }
        false
    }
}

impl TreeAccess for SimTree {
    fn is_alive(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.alive.get())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|data| data.parent)
    }

    fn document_of(&self, node: NodeId) -> Option<NodeId> {
        let mut cur = node;
        loop {
            let data = self.nodes.get(&cur)?;
            if data.is_document {
                return Some(cur);
            }
            cur = data.parent?;
        }
    }

    fn is_document(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|data| data.is_document)
    }

    fn is_application(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.is_application)
    }

    fn is_outer_document(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.outer_document)
    }

    fn is_composite_widget_root(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.composite_widget_root)
    }

    fn name(&self, node: NodeId) -> NameResolution {
        self.nodes
            .get(&node)
            .map(|data| data.name.clone())
            .unwrap_or_else(|| NameResolution::new(None::<&str>, NameSource::Explicit))
    }

    fn has_subtree_name_rule(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.subtree_name_rule)
    }

    fn has_conditional_subtree_name_rule(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|data| {
            data.conditional_subtree_name_rule
                .unwrap_or(!(data.is_document || data.is_application))
        })
    }

    fn name_always_from_subtree(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|data| data.name_always_from_subtree)
    }

    fn has_name_dependent(&self, node: NodeId) -> bool {
        if !self.relation_targets(node, RelationKind::LabelFor).is_empty() {
            return true;
        }
        let mut cur = node;
        while let Some(parent) = self.parent(cur) {
            if self.has_subtree_name_rule(parent)
                || !self.relation_targets(parent, RelationKind::LabelFor).is_empty()
            {
                return true;
            }
            if self.is_document(parent) {
                break;
            }
            cur = parent;
        }
        false
    }

    fn has_description_dependent(&self, node: NodeId) -> bool {
        if !self
            .relation_targets(node, RelationKind::DescriptionFor)
            .is_empty()
        {
            return true;
        }
        let mut cur = node;
        while let Some(parent) = self.parent(cur) {
            if !self
                .relation_targets(parent, RelationKind::DescriptionFor)
                .is_empty()
            {
                return true;
            }
            if self.is_document(parent) {
                break;
            }
            cur = parent;
        }
        false
    }

    fn relation_targets(&self, node: NodeId, kind: RelationKind) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|data| {
                data.relations
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, target)| *target)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_are_alive_until_killed() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let node = tree.add_node(doc);
        assert!(tree.is_alive(node));
        tree.kill(node);
        assert!(!tree.is_alive(node));
        assert!(tree.is_alive(doc));
    }

    #[test]
    fn kill_takes_the_subtree_down() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let parent = tree.add_node(doc);
        let child = tree.add_node(parent);
        tree.kill(parent);
        assert!(!tree.is_alive(child));
        assert!(tree.is_alive(doc));
    }

    #[test]
    fn kill_switch_works_through_shared_handle() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let switch = tree.kill_switch(doc);
        assert!(tree.is_alive(doc));
        switch.kill();
        assert!(!tree.is_alive(doc));
    }

    #[test]
    fn document_of_finds_nearest_document() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let host = tree.add_node(doc);
        let subdoc = tree.add_subdocument(host);
        let inner = tree.add_node(subdoc);
        assert_eq!(tree.document_of(host), Some(doc));
        assert_eq!(tree.document_of(inner), Some(subdoc));
        assert_eq!(tree.document_of(subdoc), Some(subdoc));
        assert!(tree.is_outer_document(host));
    }

    #[test]
    fn application_root_has_no_document() {
        let mut tree = SimTree::new();
        let app = tree.add_application();
        assert!(tree.is_application(app));
        assert_eq!(tree.document_of(app), None);
    }

    #[test]
    fn name_dependent_derives_from_subtree_rule_above() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let container = tree.add_node(doc);
        let leaf = tree.add_node(container);
        assert!(!tree.has_name_dependent(leaf));
        tree.set_subtree_name_rule(container, true);
        assert!(tree.has_name_dependent(leaf));
    }

    #[test]
    fn name_dependent_derives_from_label_relations() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let label = tree.add_node(doc);
        let field = tree.add_node(doc);
        tree.relate(label, RelationKind::LabelFor, field);
        assert!(tree.has_name_dependent(label));
        assert!(!tree.has_name_dependent(field));
        assert_eq!(
            tree.relation_targets(label, RelationKind::LabelFor),
            vec![field]
        );
    }

    #[test]
    fn walk_permission_defaults_follow_node_role() {
        let mut tree = SimTree::new();
        let doc = tree.add_document();
        let node = tree.add_node(doc);
        assert!(tree.has_conditional_subtree_name_rule(node));
        assert!(!tree.has_conditional_subtree_name_rule(doc));
        tree.set_conditional_subtree_name_rule(node, false);
        assert!(!tree.has_conditional_subtree_name_rule(node));
    }
}
