//! Connector: the public save/load surface

use indexmap::IndexSet;
use std::sync::Arc;
use tracing::info;

use crate::client::{EmbeddedClient, GraphClient, RemoteClient};
use crate::config::ConnectorConfig;
use crate::model::{Element, Model};

use super::element_store::ElementStore;
use super::error::MappingResult;
use super::loader::Loader;
use super::reify::{gather, Reifier};
use super::relationship_store::RelationshipStore;

/// Counts from one save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    /// Nodes written, including elements saved on demand
    pub elements: usize,
    pub relationships: usize,
}

/// Persists models to a graph store and loads them back
pub struct Connector {
    client: Arc<dyn GraphClient>,
    config: ConnectorConfig,
}

impl Connector {
    /// Connect to the remote store described by `config`.
    ///
    /// Fails with [`MappingError::InvalidCredentials`](super::MappingError::InvalidCredentials)
    /// when only one of user and password is set, before any connection attempt.
    pub fn connect(config: &ConnectorConfig) -> MappingResult<Self> {
        let credentials = config.credentials()?;
        let client = RemoteClient::new(&config.url, &config.database, credentials)?;
        info!("Connecting to {} (database {})", config.url, config.database);
        Ok(Self::with_client(Arc::new(client), config.clone()))
    }

    pub fn with_client(client: Arc<dyn GraphClient>, config: ConnectorConfig) -> Self {
        Self { client, config }
    }

    /// Connector over a fresh in-process store
    pub fn embedded() -> Self {
        Self::with_client(Arc::new(EmbeddedClient::new()), ConnectorConfig::default())
    }

    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub async fn close(&self) -> MappingResult<()> {
        self.client.close().await?;
        Ok(())
    }

    /// Require every node under the marker label to carry a unique,
    /// non-null identity
    pub async fn init_storage(&self) -> MappingResult<()> {
        self.client
            .ensure_identity_constraints(&self.config.marker(), &self.config.identity_key)
            .await?;
        info!(
            "Storage initialized: {}.{} exists and is unique",
            self.config.marker_label, self.config.identity_key
        );
        Ok(())
    }

    /// Persist `model` with its meta-model chain.
    ///
    /// All elements are written before any relationship. With `own_types`
    /// the built-in meta-model describing the reified classes is saved too.
    pub async fn save_model(&self, model: &Model, own_types: bool) -> MappingResult<SaveReport> {
        let reifier = Reifier::new();
        let mut elements: IndexSet<Element> = IndexSet::new();
        for item in gather(model, own_types) {
            elements.extend(reifier.reify(item)?);
        }
        elements.extend(reifier.reified_elements());
        let elements: Vec<Element> = elements.into_iter().collect();

        let element_store = ElementStore::new(self.client.clone(), self.config.clone());
        element_store.save_all(&elements).await?;

        let relationship_store =
            RelationshipStore::new(self.client.clone(), &element_store, &self.config.identity_key);
        let relationships = relationship_store.save_all(&elements).await?;

        let report = SaveReport {
            elements: element_store.saved_count(),
            relationships,
        };
        info!(
            "Saved model {}: {} elements, {} relationships",
            model.name(),
            report.elements,
            report.relationships
        );
        Ok(report)
    }

    /// Rebuild the model stored for `meta` as `LoadedModel`
    pub async fn load_model(&self, meta: &Arc<Model>) -> MappingResult<Model> {
        Loader::new(self.client.clone(), meta.clone(), &self.config.identity_key)
            .load()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingError;

    #[test]
    fn test_connect_rejects_half_credentials() {
        let config = ConnectorConfig {
            user: Some("neo4j".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Connector::connect(&config),
            Err(MappingError::InvalidCredentials)
        ));

        let config = ConnectorConfig {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Connector::connect(&config),
            Err(MappingError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_connect_without_credentials() {
        let connector = Connector::connect(&ConnectorConfig::default()).unwrap();
        assert_eq!(connector.client().address(), "http://localhost:7474");
    }

    #[tokio::test]
    async fn test_save_empty_model() {
        let connector = Connector::embedded();
        connector.init_storage().await.unwrap();
        let report = connector.save_model(&Model::new("Empty"), false).await.unwrap();
        assert_eq!(report, SaveReport { elements: 1, relationships: 0 });
    }

    #[tokio::test]
    async fn test_close() {
        let connector = Connector::embedded();
        connector.close().await.unwrap();
        assert!(connector.init_storage().await.is_err());
    }
}
