//! Graph store clients
//!
//! The connector only ever talks to a store through [`GraphClient`], a small
//! request/response surface covering what model persistence needs. Two
//! implementations:
//!
//! - **`EmbeddedClient`**: in-process [`GraphStore`](crate::graph::GraphStore),
//!   no network. Used by tests, the benchmark and embedded applications.
//! - **`RemoteClient`**: a graph database reached over the HTTP transactional
//!   Cypher endpoint.

pub mod cypher;
pub mod embedded;
pub mod error;
pub mod models;
pub mod remote;

pub use embedded::EmbeddedClient;
pub use error::{ClientError, ClientResult};
pub use models::{EdgeMatch, Statement};
pub use remote::RemoteClient;

use crate::graph::{EdgeId, EdgeType, Label, Node, NodeId, PropertyMap, PropertyValue};
use async_trait::async_trait;

/// Unified client interface for the graph store
///
/// Implemented by:
/// - `EmbeddedClient`: in-process, no network
/// - `RemoteClient`: HTTP Cypher endpoint
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Address identifying the store. Elements remember it once stored there.
    fn address(&self) -> &str;

    /// Declare that nodes with `label` must carry a non-null, unique `key`.
    /// Idempotent.
    async fn ensure_identity_constraints(&self, label: &Label, key: &str) -> ClientResult<()>;

    /// Create a node. A uniqueness conflict is reported as
    /// [`ClientError::ConstraintViolation`].
    async fn create_node(&self, labels: &[Label], properties: PropertyMap) -> ClientResult<NodeId>;

    /// Detach-delete every node with `label` whose `key` equals `value`
    async fn delete_nodes(&self, label: &Label, key: &str, value: &PropertyValue) -> ClientResult<usize>;

    /// Merge a node on `labels` and `properties[key]`, then replace all of
    /// its properties
    async fn merge_node(&self, labels: &[Label], key: &str, properties: PropertyMap) -> ClientResult<NodeId>;

    /// All nodes carrying `label`
    async fn nodes_by_label(&self, label: &Label) -> ClientResult<Vec<Node>>;

    /// Create a relationship between two stored nodes
    async fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> ClientResult<EdgeId>;

    /// `MATCH (s:source)-[r:edge_type]->(t:target) RETURN s, r, t`
    async fn match_edges(
        &self,
        source: &Label,
        edge_type: &EdgeType,
        target: &Label,
    ) -> ClientResult<Vec<EdgeMatch>>;

    /// Release the connection; later calls fail with [`ClientError::Closed`]
    async fn close(&self) -> ClientResult<()>;
}
