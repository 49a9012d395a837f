//! Relationship records

use super::property::PropertyMap;
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, typed relationship between two stored nodes
///
/// When a model link carries an associated element, that element's
/// serialized properties become the relationship's properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Store-assigned identifier
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    /// Relationship type, i.e. the reference name
    pub edge_type: EdgeType,

    /// Properties associated with this edge
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties,
        }
    }

    /// Whether the edge carries associated data
    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Check if this edge touches `node` at either end
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_edge() {
        let edge = Edge::new(
            EdgeId::new(1),
            NodeId::new(1),
            NodeId::new(2),
            "knows",
            PropertyMap::new(),
        );

        assert_eq!(edge.source, NodeId::new(1));
        assert_eq!(edge.target, NodeId::new(2));
        assert_eq!(edge.edge_type.as_str(), "knows");
        assert!(!edge.has_properties());
        assert!(edge.touches(NodeId::new(2)));
        assert!(!edge.touches(NodeId::new(3)));
    }

    #[test]
    fn test_edge_with_properties() {
        let mut props = PropertyMap::new();
        props.insert("since".to_string(), 2020i64.into());
        let edge = Edge::new(EdgeId::new(4), NodeId::new(5), NodeId::new(6), "knows", props);
        assert!(edge.has_properties());
    }
}
