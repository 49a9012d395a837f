//! Cypher statements issued by [`RemoteClient`](crate::client::RemoteClient)
//!
//! Labels, relationship types and property keys come from model class and
//! reference names, so every identifier is backtick-quoted. Values always
//! travel as parameters.

use super::models::Statement;
use crate::graph::{properties_to_json, EdgeType, Label, NodeId, PropertyMap, PropertyValue};
use serde_json::json;

/// Quote an identifier: `` Person `` -> `` `Person` ``, embedded backticks doubled
pub fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// `:`A`:`B`` for a label set
pub fn label_expr(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| format!(":{}", quote(l.as_str())))
        .collect()
}

fn constraint_name(label: &Label, key: &str, kind: &str) -> String {
    let raw = format!("{}_{}_{}", label.as_str(), key, kind);
    quote(&raw)
}

/// Every node with `label` has a unique `key`
pub fn unique_constraint(label: &Label, key: &str) -> Statement {
    Statement::new(format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (a:{}) REQUIRE a.{} IS UNIQUE",
        constraint_name(label, key, "unique"),
        quote(label.as_str()),
        quote(key)
    ))
}

/// Every node with `label` has a non-null `key`
pub fn existence_constraint(label: &Label, key: &str) -> Statement {
    Statement::new(format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (a:{}) REQUIRE a.{} IS NOT NULL",
        constraint_name(label, key, "exists"),
        quote(label.as_str()),
        quote(key)
    ))
}

pub fn create_node(labels: &[Label], properties: &PropertyMap) -> Statement {
    Statement::new(format!(
        "CREATE (x{} $props) RETURN id(x)",
        label_expr(labels)
    ))
    .param("props", properties_to_json(properties))
}

pub fn delete_nodes(label: &Label, key: &str, value: &PropertyValue) -> Statement {
    Statement::new(format!(
        "MATCH (x:{} {{{}: $value}}) DETACH DELETE x RETURN count(x)",
        quote(label.as_str()),
        quote(key)
    ))
    .param("value", value.to_json())
}

pub fn merge_node(labels: &[Label], key: &str, properties: &PropertyMap) -> Statement {
    let identity = properties
        .get(key)
        .map(PropertyValue::to_json)
        .unwrap_or(serde_json::Value::Null);
    Statement::new(format!(
        "MERGE (x{} {{{}: $identity}}) SET x = $props RETURN id(x)",
        label_expr(labels),
        quote(key)
    ))
    .param("identity", identity)
    .param("props", properties_to_json(properties))
}

pub fn nodes_by_label(label: &Label) -> Statement {
    Statement::new(format!(
        "MATCH (a:{}) RETURN id(a), labels(a), properties(a)",
        quote(label.as_str())
    ))
}

/// Endpoints are addressed by store id, never re-matched by identity
pub fn create_edge(
    source: NodeId,
    target: NodeId,
    edge_type: &EdgeType,
    associated: &PropertyMap,
) -> Statement {
    Statement::new(format!(
        "MATCH (s) WHERE id(s) = $source MATCH (t) WHERE id(t) = $target \
         CREATE (s)-[r:{}]->(t) SET r = $associated RETURN id(r)",
        quote(edge_type.as_str())
    ))
    .param("source", json!(source.as_u64()))
    .param("target", json!(target.as_u64()))
    .param("associated", properties_to_json(associated))
}

pub fn match_edges(source: &Label, edge_type: &EdgeType, target: &Label) -> Statement {
    Statement::new(format!(
        "MATCH (s:{})-[r:{}]->(t:{}) \
         RETURN id(s), labels(s), properties(s), id(r), properties(r), id(t), labels(t), properties(t)",
        quote(source.as_str()),
        quote(edge_type.as_str()),
        quote(target.as_str())
    ))
}
