//! Connector configuration
//!
//! ```yaml
//! url: http://localhost:7474
//! database: neo4j
//! user: neo4j
//! password: secret
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::graph::Label;
use crate::mapping::{MappingError, MappingResult};

/// Connector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Base URL of the store's HTTP endpoint
    pub url: String,
    /// Database name
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Label carried by every stored node
    pub marker_label: String,
    /// Property holding the element's UUID
    pub identity_key: String,
    /// Identity regenerations allowed per element on collision
    pub max_identity_retries: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: None,
            password: None,
            marker_label: "ModelGraph".to_string(),
            identity_key: "__modelgraph__".to_string(),
            max_identity_retries: 32,
        }
    }
}

impl ConnectorConfig {
    pub fn from_yaml_str(yaml: &str) -> MappingResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> MappingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> MappingResult<()> {
        if self.marker_label.is_empty() {
            return Err(MappingError::Config("marker_label must not be empty".to_string()));
        }
        if self.identity_key.is_empty() {
            return Err(MappingError::Config("identity_key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Basic-auth credentials: both or neither of user and password
    pub fn credentials(&self) -> MappingResult<Option<(String, String)>> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Ok(Some((user.clone(), password.clone()))),
            (None, None) => Ok(None),
            _ => Err(MappingError::InvalidCredentials),
        }
    }

    pub fn marker(&self) -> Label {
        Label::new(&self.marker_label)
    }
}
