//! Data models exchanged with graph stores
//!
//! [`EdgeMatch`] is returned by every client; the `Tx*` types describe the
//! JSON bodies of the HTTP transactional Cypher endpoint used by
//! [`RemoteClient`](crate::client::RemoteClient).

use crate::graph::{Edge, Node};
use serde::{Deserialize, Serialize};

/// One `(s)-[r]->(t)` result row
#[derive(Debug, Clone)]
pub struct EdgeMatch {
    pub source: Node,
    pub edge: Edge,
    pub target: Node,
}

/// A Cypher statement with its parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub statement: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl Statement {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: serde_json::Map::new(),
        }
    }

    /// Add a parameter (referenced as `$name` in the statement)
    pub fn param(mut self, name: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// Request body for `POST /db/{database}/tx/commit`
#[derive(Debug, Serialize)]
pub struct TxRequest {
    pub statements: Vec<Statement>,
}

/// Response body of the transactional endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<TxResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

/// Result of one statement
#[derive(Debug, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<TxRow>,
}

/// One result row
#[derive(Debug, Deserialize)]
pub struct TxRow {
    pub row: Vec<serde_json::Value>,
}

/// Error reported by the store, e.g. `Neo.ClientError.Schema.ConstraintValidationFailed`
#[derive(Debug, Clone, Deserialize)]
pub struct TxError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl TxError {
    pub fn is_constraint_violation(&self) -> bool {
        self.code.contains("ConstraintValidationFailed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_serializes_parameters() {
        let statement = Statement::new("RETURN $x").param("x", serde_json::json!(1));
        let body = serde_json::to_value(TxRequest { statements: vec![statement] }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "statements": [{ "statement": "RETURN $x", "parameters": { "x": 1 } }] })
        );
    }

    #[test]
    fn test_response_with_constraint_error() {
        let body = r#"{
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Schema.ConstraintValidationFailed",
                "message": "Node(12) already exists"
            }]
        }"#;
        let response: TxResponse = serde_json::from_str(body).unwrap();
        assert!(response.results.is_empty());
        assert!(response.errors[0].is_constraint_violation());
    }

    #[test]
    fn test_response_rows() {
        let body = r#"{"results":[{"columns":["id(x)"],"data":[{"row":[7],"meta":[null]}]}],"errors":[]}"#;
        let response: TxResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.results[0].data[0].row[0], serde_json::json!(7));
    }
}
