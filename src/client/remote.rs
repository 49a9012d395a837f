//! RemoteClient: network client for a graph database
//!
//! Connects via HTTP to the transactional Cypher endpoint
//! (`POST {url}/db/{database}/tx/commit`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::graph::{Edge, EdgeId, EdgeType, Label, Node, NodeId, PropertyMap, PropertyValue};

use super::cypher;
use super::error::{ClientError, ClientResult};
use super::models::{EdgeMatch, Statement, TxRequest, TxResponse, TxRow};
use super::GraphClient;

/// Network client that talks to a graph database over HTTP.
///
/// Each call is one auto-committed transaction holding a single statement.
pub struct RemoteClient {
    /// `{url}/db/{database}`: stored markers are per database
    address: String,
    credentials: Option<(String, String)>,
    http_client: Client,
    closed: AtomicBool,
}

impl RemoteClient {
    /// Create a new RemoteClient for the given HTTP base URL and database.
    ///
    /// No request is sent until the first operation.
    ///
    /// # Example
    /// ```no_run
    /// # use modelgraph::client::RemoteClient;
    /// let client = RemoteClient::new("http://localhost:7474", "neo4j", None).unwrap();
    /// ```
    pub fn new(
        http_base_url: &str,
        database: &str,
        credentials: Option<(String, String)>,
    ) -> ClientResult<Self> {
        let http_base_url = http_base_url.trim_end_matches('/').to_string();
        if !(http_base_url.starts_with("http://") || http_base_url.starts_with("https://")) {
            return Err(ClientError::ConnectionError(format!(
                "Unsupported URL scheme: {}",
                http_base_url
            )));
        }
        let http_client = Client::builder().build()?;
        Ok(Self {
            address: format!("{}/db/{}", http_base_url, database),
            credentials,
            http_client,
            closed: AtomicBool::new(false),
        })
    }

    fn commit_url(&self) -> String {
        format!("{}/tx/commit", self.address)
    }

    /// Run one statement and return its result rows
    pub async fn run(&self, statement: Statement) -> ClientResult<Vec<TxRow>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        debug!("cypher: {}", statement.statement);

        let body = TxRequest {
            statements: vec![statement],
        };
        let mut request = self.http_client.post(self.commit_url()).json(&body);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ClientError::ConnectionError(format!(
                "Transaction endpoint returned {}",
                response.status()
            )));
        }

        let mut result: TxResponse = response.json().await?;
        if let Some(error) = result.errors.first() {
            let msg = format!("{}: {}", error.code, error.message);
            return Err(if error.is_constraint_violation() {
                ClientError::ConstraintViolation(msg)
            } else {
                ClientError::QueryError(msg)
            });
        }
        Ok(result
            .results
            .pop()
            .map(|r| r.data)
            .unwrap_or_default())
    }

    async fn run_single_id(&self, statement: Statement) -> ClientResult<u64> {
        let rows = self.run(statement).await?;
        let row = rows
            .first()
            .ok_or_else(|| ClientError::ProtocolError("Statement returned no rows".to_string()))?;
        column_u64(&row.row, 0)
    }
}

fn column<'a>(row: &'a [Value], index: usize) -> ClientResult<&'a Value> {
    row.get(index)
        .ok_or_else(|| ClientError::ProtocolError(format!("Missing column {}", index)))
}

fn column_u64(row: &[Value], index: usize) -> ClientResult<u64> {
    column(row, index)?
        .as_u64()
        .ok_or_else(|| ClientError::ProtocolError(format!("Column {} is not an id", index)))
}

fn column_properties(row: &[Value], index: usize) -> ClientResult<PropertyMap> {
    match column(row, index)? {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
            .collect()),
        Value::Null => Ok(PropertyMap::new()),
        other => Err(ClientError::ProtocolError(format!(
            "Column {} is not a property map: {}",
            index, other
        ))),
    }
}

fn column_labels(row: &[Value], index: usize) -> ClientResult<Vec<Label>> {
    match column(row, index)? {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|v| v.as_str())
            .map(Label::new)
            .collect()),
        other => Err(ClientError::ProtocolError(format!(
            "Column {} is not a label list: {}",
            index, other
        ))),
    }
}

/// Parse `id, labels, properties` starting at `offset`
pub(crate) fn parse_node(row: &[Value], offset: usize) -> ClientResult<Node> {
    Ok(Node::new(
        NodeId::new(column_u64(row, offset)?),
        column_labels(row, offset + 1)?,
        column_properties(row, offset + 2)?,
    ))
}

/// Parse a row produced by [`cypher::match_edges`]
pub(crate) fn parse_edge_match(row: &[Value], edge_type: &EdgeType) -> ClientResult<EdgeMatch> {
    let source = parse_node(row, 0)?;
    let edge_id = EdgeId::new(column_u64(row, 3)?);
    let properties = column_properties(row, 4)?;
    let target = parse_node(row, 5)?;
    let edge = Edge::new(edge_id, source.id, target.id, edge_type.clone(), properties);
    Ok(EdgeMatch { source, edge, target })
}

#[async_trait]
impl GraphClient for RemoteClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn ensure_identity_constraints(&self, label: &Label, key: &str) -> ClientResult<()> {
        self.run(cypher::existence_constraint(label, key)).await?;
        self.run(cypher::unique_constraint(label, key)).await?;
        Ok(())
    }

    async fn create_node(&self, labels: &[Label], properties: PropertyMap) -> ClientResult<NodeId> {
        let id = self.run_single_id(cypher::create_node(labels, &properties)).await?;
        Ok(NodeId::new(id))
    }

    async fn delete_nodes(&self, label: &Label, key: &str, value: &PropertyValue) -> ClientResult<usize> {
        let deleted = self.run_single_id(cypher::delete_nodes(label, key, value)).await?;
        Ok(deleted as usize)
    }

    async fn merge_node(&self, labels: &[Label], key: &str, properties: PropertyMap) -> ClientResult<NodeId> {
        let id = self
            .run_single_id(cypher::merge_node(labels, key, &properties))
            .await?;
        Ok(NodeId::new(id))
    }

    async fn nodes_by_label(&self, label: &Label) -> ClientResult<Vec<Node>> {
        let rows = self.run(cypher::nodes_by_label(label)).await?;
        rows.iter().map(|r| parse_node(&r.row, 0)).collect()
    }

    async fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> ClientResult<EdgeId> {
        let id = self
            .run_single_id(cypher::create_edge(source, target, edge_type, &properties))
            .await?;
        Ok(EdgeId::new(id))
    }

    async fn match_edges(
        &self,
        source: &Label,
        edge_type: &EdgeType,
        target: &Label,
    ) -> ClientResult<Vec<EdgeMatch>> {
        let rows = self.run(cypher::match_edges(source, edge_type, target)).await?;
        rows.iter()
            .map(|r| parse_edge_match(&r.row, edge_type))
            .collect()
    }

    async fn close(&self) -> ClientResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = RemoteClient::new("http://localhost:7474/", "neo4j", None).unwrap();
        assert_eq!(client.address(), "http://localhost:7474/db/neo4j");
        assert_eq!(client.commit_url(), "http://localhost:7474/db/neo4j/tx/commit");
    }

    #[test]
    fn test_databases_have_distinct_addresses() {
        let a = RemoteClient::new("http://localhost:7474", "a", None).unwrap();
        let b = RemoteClient::new("http://localhost:7474", "b", None).unwrap();
        assert_ne!(a.address(), b.address());

        let identity = crate::model::Identity::shared();
        identity.mark_stored(a.address());
        assert!(!identity.is_stored_in(b.address()));
    }

    #[test]
    fn test_new_rejects_unknown_scheme() {
        let result = RemoteClient::new("bolt://localhost:7687", "neo4j", None);
        assert!(matches!(result, Err(ClientError::ConnectionError(_))));
    }

    #[test]
    fn test_parse_node() {
        let row = vec![json!(5), json!(["Person", "ModelGraph"]), json!({"name": "Ada", "age": 36})];
        let node = parse_node(&row, 0).unwrap();
        assert_eq!(node.id, NodeId::new(5));
        assert!(node.has_label(&Label::new("Person")));
        assert_eq!(node.get_property("age"), Some(&PropertyValue::Integer(36)));
    }

    #[test]
    fn test_parse_edge_match() {
        let row = vec![
            json!(1),
            json!(["Person"]),
            json!({"name": "X"}),
            json!(9),
            json!({"since": 2020}),
            json!(2),
            json!(["Person"]),
            json!({"name": "Y"}),
        ];
        let m = parse_edge_match(&row, &EdgeType::new("knows")).unwrap();
        assert_eq!(m.source.id, NodeId::new(1));
        assert_eq!(m.target.id, NodeId::new(2));
        assert_eq!(m.edge.id, EdgeId::new(9));
        assert_eq!(m.edge.source, NodeId::new(1));
        assert_eq!(m.edge.properties.get("since"), Some(&PropertyValue::Integer(2020)));
    }

    #[test]
    fn test_parse_rejects_short_rows() {
        let row = vec![json!(1)];
        assert!(matches!(parse_node(&row, 0), Err(ClientError::ProtocolError(_))));
    }

    #[tokio::test]
    async fn test_closed_client_refuses_statements() {
        let client = RemoteClient::new("http://localhost:7474", "neo4j", None).unwrap();
        client.close().await.unwrap();
        let err = client.nodes_by_label(&Label::new("Person")).await.unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
