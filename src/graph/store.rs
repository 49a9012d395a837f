//! In-memory property graph store
//!
//! Backs [`EmbeddedClient`](crate::client::EmbeddedClient). Supports the
//! operations the connector issues against a graph database: labelled node
//! creation under unique/existence constraints, detach-delete by property,
//! merge-and-replace, typed relationships between node ids, and label/type
//! pattern matches.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Node({label}) already exists with property {key} = {value}")]
    UniqueViolation {
        label: Label,
        key: String,
        value: String,
    },

    #[error("Node({label}) must have the property {key}")]
    MissingProperty { label: Label, key: String },

    #[error("Cannot create constraint on {label}.{key}: {reason}")]
    ConstraintRejected {
        label: Label,
        key: String,
        reason: String,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Schema constraint on nodes carrying a label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// No two nodes with `label` share a value for `key`
    Unique { label: Label, key: String },
    /// Every node with `label` has a non-null `key`
    Exists { label: Label, key: String },
}

impl Constraint {
    pub fn label(&self) -> &Label {
        match self {
            Constraint::Unique { label, .. } | Constraint::Exists { label, .. } => label,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Constraint::Unique { key, .. } | Constraint::Exists { key, .. } => key,
        }
    }
}

type UniqueIndex = HashMap<(Label, String), HashMap<String, NodeId>>;

/// In-memory graph storage
///
/// - nodes / edges: ordered by id so scans are deterministic
/// - outgoing / incoming: adjacency lists per node
/// - label_index / edge_type_index: lookups by label and type
/// - unique_index: (label, key) -> value -> node, one entry per unique constraint
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    label_index: HashMap<Label, BTreeSet<NodeId>>,
    edge_type_index: HashMap<EdgeType, BTreeSet<EdgeId>>,
    constraints: Vec<Constraint>,
    unique_index: UniqueIndex,
    next_node_id: u64,
    next_edge_id: u64,
}

fn index_key(value: &PropertyValue) -> String {
    format!("{}:{}", value.type_name(), value)
}

fn defined<'a>(properties: &'a PropertyMap, key: &str) -> Option<&'a PropertyValue> {
    properties.get(key).filter(|v| !v.is_null())
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            next_node_id: 1,
            next_edge_id: 1,
            ..Default::default()
        }
    }

    /// Register a constraint. Returns `false` when it was already present.
    ///
    /// Existing nodes are validated first, so a constraint never holds over
    /// data that violates it.
    pub fn add_constraint(&mut self, constraint: Constraint) -> GraphResult<bool> {
        if self.constraints.contains(&constraint) {
            return Ok(false);
        }

        let label = constraint.label().clone();
        let key = constraint.key().to_string();
        let members: Vec<&Node> = self.get_nodes_by_label(&label);

        match &constraint {
            Constraint::Exists { .. } => {
                if members.iter().any(|n| defined(&n.properties, &key).is_none()) {
                    return Err(GraphError::ConstraintRejected {
                        label,
                        key,
                        reason: "a node is missing the property".to_string(),
                    });
                }
            }
            Constraint::Unique { .. } => {
                let mut entries = HashMap::new();
                for node in members {
                    if let Some(value) = defined(&node.properties, &key) {
                        if entries.insert(index_key(value), node.id).is_some() {
                            return Err(GraphError::ConstraintRejected {
                                label,
                                key,
                                reason: format!("duplicate value {}", value),
                            });
                        }
                    }
                }
                self.unique_index.insert((label, key), entries);
            }
        }

        self.constraints.push(constraint);
        Ok(true)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    fn check_constraints(
        &self,
        labels: &[Label],
        properties: &PropertyMap,
        ignore: Option<NodeId>,
    ) -> GraphResult<()> {
        for constraint in &self.constraints {
            if !labels.contains(constraint.label()) {
                continue;
            }
            let value = defined(properties, constraint.key());
            match constraint {
                Constraint::Exists { label, key } => {
                    if value.is_none() {
                        return Err(GraphError::MissingProperty {
                            label: label.clone(),
                            key: key.clone(),
                        });
                    }
                }
                Constraint::Unique { label, key } => {
                    let Some(value) = value else { continue };
                    let holder = self
                        .unique_index
                        .get(&(label.clone(), key.clone()))
                        .and_then(|entries| entries.get(&index_key(value)));
                    if let Some(holder) = holder {
                        if Some(*holder) != ignore {
                            return Err(GraphError::UniqueViolation {
                                label: label.clone(),
                                key: key.clone(),
                                value: value.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn index_unique(unique_index: &mut UniqueIndex, node: &Node) {
        for ((label, key), entries) in unique_index.iter_mut() {
            if node.has_label(label) {
                if let Some(value) = defined(&node.properties, key) {
                    entries.insert(index_key(value), node.id);
                }
            }
        }
    }

    fn unindex_unique(unique_index: &mut UniqueIndex, node: &Node) {
        for ((label, key), entries) in unique_index.iter_mut() {
            if node.has_label(label) {
                if let Some(value) = defined(&node.properties, key) {
                    entries.remove(&index_key(value));
                }
            }
        }
    }

    /// Create a node with labels and properties, enforcing constraints
    pub fn create_node(&mut self, labels: Vec<Label>, properties: PropertyMap) -> GraphResult<NodeId> {
        self.check_constraints(&labels, &properties, None)?;

        let node_id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;

        let node = Node::new(node_id, labels, properties);
        for label in &node.labels {
            self.label_index
                .entry(label.clone())
                .or_default()
                .insert(node_id);
        }
        Self::index_unique(&mut self.unique_index, &node);

        self.outgoing.insert(node_id, Vec::new());
        self.incoming.insert(node_id, Vec::new());
        self.nodes.insert(node_id, node);
        Ok(node_id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes with `label` whose `key` property equals `value`
    pub fn find_nodes(&self, label: &Label, key: &str, value: &PropertyValue) -> Vec<NodeId> {
        self.label_index
            .get(label)
            .into_iter()
            .flatten()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .and_then(|n| n.get_property(key))
                    .is_some_and(|v| v == value)
            })
            .copied()
            .collect()
    }

    /// Replace every property of a node (`SET n = $props` semantics)
    pub fn replace_properties(&mut self, id: NodeId, properties: PropertyMap) -> GraphResult<()> {
        let labels = self
            .nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .labels
            .clone();
        self.check_constraints(&labels, &properties, Some(id))?;

        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Self::unindex_unique(&mut self.unique_index, node);
        node.properties = properties;
        Self::index_unique(&mut self.unique_index, node);
        Ok(())
    }

    /// Match a node carrying all `labels` and the same `key` value as
    /// `properties`; replace its properties, or create it when absent.
    pub fn merge_node(
        &mut self,
        labels: Vec<Label>,
        key: &str,
        properties: PropertyMap,
    ) -> GraphResult<NodeId> {
        let first = labels.first().cloned().unwrap_or_else(|| Label::new(""));
        let value = defined(&properties, key)
            .cloned()
            .ok_or_else(|| GraphError::MissingProperty {
                label: first.clone(),
                key: key.to_string(),
            })?;

        let existing = self
            .find_nodes(&first, key, &value)
            .into_iter()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.has_labels(&labels)));

        match existing {
            Some(id) => {
                self.replace_properties(id, properties)?;
                Ok(id)
            }
            None => self.create_node(labels, properties),
        }
    }

    /// Delete a node and all its connected edges
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<Node> {
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;

        for label in &node.labels {
            if let Some(members) = self.label_index.get_mut(label) {
                members.remove(&id);
            }
        }
        Self::unindex_unique(&mut self.unique_index, &node);

        let outgoing = self.outgoing.remove(&id).unwrap_or_default();
        let incoming = self.incoming.remove(&id).unwrap_or_default();
        for edge_id in outgoing.iter().chain(incoming.iter()) {
            // a self-loop shows up in both lists
            let _ = self.delete_edge(*edge_id);
        }

        Ok(node)
    }

    /// Detach-delete every node with `label` whose `key` equals `value`
    pub fn delete_nodes_where(&mut self, label: &Label, key: &str, value: &PropertyValue) -> usize {
        let ids = self.find_nodes(label, key, value);
        ids.into_iter()
            .filter(|id| self.delete_node(*id).is_ok())
            .count()
    }

    /// Create an edge with properties between two existing nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;

        let edge = Edge::new(edge_id, source, target, edge_type, properties);
        self.outgoing.entry(source).or_default().push(edge_id);
        self.incoming.entry(target).or_default().push(edge_id);
        self.edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .insert(edge_id);
        self.edges.insert(edge_id, edge);
        Ok(edge_id)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;

        if let Some(list) = self.outgoing.get_mut(&edge.source) {
            list.retain(|e| *e != id);
        }
        if let Some(list) = self.incoming.get_mut(&edge.target) {
            list.retain(|e| *e != id);
        }
        if let Some(set) = self.edge_type_index.get_mut(&edge.edge_type) {
            set.remove(&id);
        }
        Ok(edge)
    }

    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    /// `MATCH (s:source)-[r:edge_type]->(t:target)`
    pub fn match_edges(
        &self,
        source: &Label,
        edge_type: &EdgeType,
        target: &Label,
    ) -> Vec<(&Node, &Edge, &Node)> {
        self.get_edges_by_type(edge_type)
            .into_iter()
            .filter_map(|edge| {
                let s = self.nodes.get(&edge.source)?;
                let t = self.nodes.get(&edge.target)?;
                (s.has_label(source) && t.has_label(target)).then_some((s, edge, t))
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drop all data; constraints stay registered
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.label_index.clear();
        self.edge_type_index.clear();
        for entries in self.unique_index.values_mut() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn marker_store() -> GraphStore {
        let mut store = GraphStore::new();
        store
            .add_constraint(Constraint::Exists { label: "M".into(), key: "uid".into() })
            .unwrap();
        store
            .add_constraint(Constraint::Unique { label: "M".into(), key: "uid".into() })
            .unwrap();
        store
    }

    #[test]
    fn test_create_and_get_node() {
        let mut store = GraphStore::new();
        let id = store
            .create_node(vec!["Person".into()], props(&[("name", "Alice".into())]))
            .unwrap();

        let node = store.get_node(id).unwrap();
        assert!(node.has_label(&"Person".into()));
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.get_nodes_by_label(&"Person".into()).len(), 1);
    }

    #[test]
    fn test_constraints_are_idempotent() {
        let mut store = marker_store();
        let again = store
            .add_constraint(Constraint::Unique { label: "M".into(), key: "uid".into() })
            .unwrap();
        assert!(!again);
        assert_eq!(store.constraints().len(), 2);
    }

    #[test]
    fn test_unique_constraint_rejects_duplicates() {
        let mut store = marker_store();
        store
            .create_node(vec!["A".into(), "M".into()], props(&[("uid", "1".into())]))
            .unwrap();

        let err = store
            .create_node(vec!["B".into(), "M".into()], props(&[("uid", "1".into())]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UniqueViolation { .. }));

        // Different label set outside the constraint is not affected
        store
            .create_node(vec!["B".into()], props(&[("uid", "1".into())]))
            .unwrap();
    }

    #[test]
    fn test_existence_constraint() {
        let mut store = marker_store();
        let err = store
            .create_node(vec!["M".into()], PropertyMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingProperty { label: "M".into(), key: "uid".into() }
        );
    }

    #[test]
    fn test_constraint_rejected_over_existing_duplicates() {
        let mut store = GraphStore::new();
        store.create_node(vec!["M".into()], props(&[("uid", "x".into())])).unwrap();
        store.create_node(vec!["M".into()], props(&[("uid", "x".into())])).unwrap();

        let err = store
            .add_constraint(Constraint::Unique { label: "M".into(), key: "uid".into() })
            .unwrap_err();
        assert!(matches!(err, GraphError::ConstraintRejected { .. }));
    }

    #[test]
    fn test_delete_frees_unique_value() {
        let mut store = marker_store();
        let a = store
            .create_node(vec!["M".into()], props(&[("uid", "1".into())]))
            .unwrap();
        let b = store
            .create_node(vec!["M".into()], props(&[("uid", "2".into())]))
            .unwrap();
        store.create_edge(a, b, "knows", PropertyMap::new()).unwrap();

        let deleted = store.delete_nodes_where(&"M".into(), "uid", &"1".into());
        assert_eq!(deleted, 1);
        assert_eq!(store.edge_count(), 0);
        assert!(store.get_edges_by_type(&"knows".into()).is_empty());

        store
            .create_node(vec!["M".into()], props(&[("uid", "1".into())]))
            .unwrap();
    }

    #[test]
    fn test_merge_replaces_properties() {
        let mut store = marker_store();
        let labels: Vec<Label> = vec!["Person".into(), "M".into()];
        let first = store
            .merge_node(labels.clone(), "uid", props(&[("uid", "1".into()), ("age", 3i64.into())]))
            .unwrap();
        let second = store
            .merge_node(labels, "uid", props(&[("uid", "1".into()), ("name", "Ada".into())]))
            .unwrap();

        assert_eq!(first, second);
        let node = store.get_node(first).unwrap();
        assert!(node.get_property("age").is_none());
        assert_eq!(node.get_property("name").unwrap().as_string(), Some("Ada"));
    }

    #[test]
    fn test_merge_requires_key() {
        let mut store = GraphStore::new();
        let err = store
            .merge_node(vec!["Person".into()], "uid", PropertyMap::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingProperty { .. }));
    }

    #[test]
    fn test_edge_validation() {
        let mut store = GraphStore::new();
        let a = store.create_node(vec!["A".into()], PropertyMap::new()).unwrap();

        assert_eq!(
            store.create_edge(a, NodeId::new(99), "r", PropertyMap::new()),
            Err(GraphError::InvalidEdgeTarget(NodeId::new(99)))
        );
        assert_eq!(
            store.create_edge(NodeId::new(99), a, "r", PropertyMap::new()),
            Err(GraphError::InvalidEdgeSource(NodeId::new(99)))
        );
    }

    #[test]
    fn test_match_edges_by_labels() {
        let mut store = GraphStore::new();
        let alice = store.create_node(vec!["Person".into()], PropertyMap::new()).unwrap();
        let bob = store.create_node(vec!["Person".into()], PropertyMap::new()).unwrap();
        let acme = store.create_node(vec!["Company".into()], PropertyMap::new()).unwrap();
        store.create_edge(alice, bob, "knows", PropertyMap::new()).unwrap();
        store.create_edge(alice, acme, "knows", PropertyMap::new()).unwrap();

        let matches = store.match_edges(&"Person".into(), &"knows".into(), &"Person".into());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].2.id, bob);
        assert_eq!(store.get_edges_by_type(&"knows".into()).len(), 2);
    }

    #[test]
    fn test_self_loop_deletion() {
        let mut store = GraphStore::new();
        let a = store.create_node(vec!["A".into()], PropertyMap::new()).unwrap();
        store.create_edge(a, a, "self", PropertyMap::new()).unwrap();
        store.delete_node(a).unwrap();
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_clear_keeps_constraints() {
        let mut store = marker_store();
        store
            .create_node(vec!["M".into()], props(&[("uid", "1".into())]))
            .unwrap();
        store.clear();

        assert_eq!(store.node_count(), 0);
        assert_eq!(store.constraints().len(), 2);
        store
            .create_node(vec!["M".into()], props(&[("uid", "1".into())]))
            .unwrap();
    }
}
