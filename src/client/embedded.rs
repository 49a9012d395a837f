//! EmbeddedClient: in-process graph store client
//!
//! Uses GraphStore directly, no network needed.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::graph::{EdgeId, EdgeType, GraphStore, Label, Node, NodeId, PropertyMap, PropertyValue};
use crate::graph::Constraint;

use super::error::{ClientError, ClientResult};
use super::models::EdgeMatch;
use super::GraphClient;

/// In-process client that wraps a GraphStore directly.
///
/// Every client gets its own `embedded://<uuid>` address, so two embedded
/// stores never mistake each other's elements as already stored.
pub struct EmbeddedClient {
    store: Arc<RwLock<GraphStore>>,
    address: String,
    closed: AtomicBool,
}

impl EmbeddedClient {
    /// Create a new EmbeddedClient with a fresh empty graph store
    pub fn new() -> Self {
        Self::with_store(Arc::new(RwLock::new(GraphStore::new())))
    }

    /// Create an EmbeddedClient wrapping an existing store
    pub fn with_store(store: Arc<RwLock<GraphStore>>) -> Self {
        Self {
            store,
            address: format!("embedded://{}", Uuid::new_v4()),
            closed: AtomicBool::new(false),
        }
    }

    /// Get a reference to the underlying store (for direct graph inspection)
    pub fn store(&self) -> &Arc<RwLock<GraphStore>> {
        &self.store
    }

    /// Acquire a read lock on the store.
    pub async fn store_read(&self) -> tokio::sync::RwLockReadGuard<'_, GraphStore> {
        self.store.read().await
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for EmbeddedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphClient for EmbeddedClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn ensure_identity_constraints(&self, label: &Label, key: &str) -> ClientResult<()> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        store.add_constraint(Constraint::Exists {
            label: label.clone(),
            key: key.to_string(),
        })?;
        store.add_constraint(Constraint::Unique {
            label: label.clone(),
            key: key.to_string(),
        })?;
        Ok(())
    }

    async fn create_node(&self, labels: &[Label], properties: PropertyMap) -> ClientResult<NodeId> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.create_node(labels.to_vec(), properties)?)
    }

    async fn delete_nodes(&self, label: &Label, key: &str, value: &PropertyValue) -> ClientResult<usize> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.delete_nodes_where(label, key, value))
    }

    async fn merge_node(&self, labels: &[Label], key: &str, properties: PropertyMap) -> ClientResult<NodeId> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.merge_node(labels.to_vec(), key, properties)?)
    }

    async fn nodes_by_label(&self, label: &Label) -> ClientResult<Vec<Node>> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store.get_nodes_by_label(label).into_iter().cloned().collect())
    }

    async fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> ClientResult<EdgeId> {
        self.ensure_open()?;
        let mut store = self.store.write().await;
        Ok(store.create_edge(source, target, edge_type.clone(), properties)?)
    }

    async fn match_edges(
        &self,
        source: &Label,
        edge_type: &EdgeType,
        target: &Label,
    ) -> ClientResult<Vec<EdgeMatch>> {
        self.ensure_open()?;
        let store = self.store.read().await;
        Ok(store
            .match_edges(source, edge_type, target)
            .into_iter()
            .map(|(s, r, t)| EdgeMatch {
                source: s.clone(),
                edge: r.clone(),
                target: t.clone(),
            })
            .collect())
    }

    async fn close(&self) -> ClientResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(value: &str) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("uid".to_string(), value.into());
        props
    }

    #[tokio::test]
    async fn test_embedded_addresses_are_distinct() {
        let a = EmbeddedClient::new();
        let b = EmbeddedClient::new();
        assert!(a.address().starts_with("embedded://"));
        assert_ne!(a.address(), b.address());
    }

    #[tokio::test]
    async fn test_embedded_constraint_violation() {
        let client = EmbeddedClient::new();
        let marker = Label::new("M");
        client.ensure_identity_constraints(&marker, "uid").await.unwrap();
        client.ensure_identity_constraints(&marker, "uid").await.unwrap();

        client.create_node(&[marker.clone()], uid("1")).await.unwrap();
        let err = client.create_node(&[marker.clone()], uid("1")).await.unwrap_err();
        assert!(err.is_constraint_violation());

        let err = client.create_node(&[marker], PropertyMap::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::StoreError(_)));
    }

    #[tokio::test]
    async fn test_embedded_edges() {
        let client = EmbeddedClient::new();
        let person = Label::new("Person");
        let a = client.create_node(&[person.clone()], uid("a")).await.unwrap();
        let b = client.create_node(&[person.clone()], uid("b")).await.unwrap();
        client
            .create_edge(a, b, &"knows".into(), PropertyMap::new())
            .await
            .unwrap();

        let matches = client.match_edges(&person, &"knows".into(), &person).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source.id, a);
        assert_eq!(matches[0].target.id, b);
    }

    #[tokio::test]
    async fn test_embedded_merge_and_delete() {
        let client = EmbeddedClient::new();
        let labels = vec![Label::new("Person")];
        let first = client.merge_node(&labels, "uid", uid("x")).await.unwrap();
        let second = client.merge_node(&labels, "uid", uid("x")).await.unwrap();
        assert_eq!(first, second);

        let deleted = client.delete_nodes(&labels[0], "uid", &"x".into()).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(client.nodes_by_label(&labels[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedded_close() {
        let client = EmbeddedClient::new();
        client.close().await.unwrap();
        let err = client.nodes_by_label(&"Person".into()).await.unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
