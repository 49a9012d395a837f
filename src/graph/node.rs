//! Node records as held by the in-memory store and returned by clients

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};

/// A stored node: store id, label set, properties
///
/// Labels keep insertion order, which for saved elements is the
/// inheritance chain from the most specific class upward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned identifier
    pub id: NodeId,

    /// Labels, deduplicated, in insertion order
    pub labels: Vec<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node with labels and properties
    pub fn new(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        let mut node = Node {
            id,
            labels: Vec::with_capacity(labels.len()),
            properties,
        };
        for label in labels {
            node.add_label(label);
        }
        node
    }

    /// Add a label unless already present
    pub fn add_label(&mut self, label: impl Into<Label>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Check if node carries every label in `labels`
    pub fn has_labels(&self, labels: &[Label]) -> bool {
        labels.iter().all(|l| self.has_label(l))
    }

    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Get number of labels
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
