//! Property graph primitives
//!
//! The store-side vocabulary the connector maps models onto:
//! - Nodes with label sets and properties
//! - Directed, typed relationships with properties
//! - An in-memory store with unique/existence constraints

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{describe_properties, properties_to_json, PropertyMap, PropertyValue};
pub use store::{Constraint, GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
