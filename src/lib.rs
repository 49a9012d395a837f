//! modelgraph
//!
//! Persists typed object models to a property-graph database and loads them
//! back. Elements become nodes labelled with their class's inheritance chain,
//! references become typed relationships, and meta-level constructs (models,
//! classes, enums) are reified so they are stored alongside instance data.
//!
//! # Layers
//!
//! - [`graph`]: property graph primitives and an in-memory store
//! - [`client`]: the [`GraphClient`](client::GraphClient) trait, with an
//!   embedded implementation and an HTTP Cypher one
//! - [`model`]: classes, elements, models and their JSON documents
//! - [`mapping`]: reification, save and load, behind [`Connector`]
//! - [`config`]: connector configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use modelgraph::model::{AttributeType, Class, Model, Reference};
//! use modelgraph::Connector;
//! use std::sync::Arc;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let person = Class::builder("Person")
//!     .attribute("name", AttributeType::String)
//!     .reference(Reference::new("knows", "Person"))
//!     .build();
//! let mut meta = Model::new("People");
//! meta.add_class(person.clone());
//! let meta = Arc::new(meta);
//!
//! let x = person.new_instance();
//! let y = person.new_instance();
//! x.set("name", "X").unwrap();
//! y.set("name", "Y").unwrap();
//! x.add_reference("knows", &y, None).unwrap();
//!
//! let mut model = Model::with_meta("Family", meta.clone());
//! model.add_element(x.clone());
//! model.add_element(y.clone());
//!
//! let connector = Connector::embedded();
//! connector.init_storage().await.unwrap();
//! connector.save_model(&model, false).await.unwrap();
//!
//! let loaded = connector.load_model(&meta).await.unwrap();
//! assert_eq!(loaded.elements().len(), 2);
//! # });
//! # }
//! ```

pub mod client;
pub mod config;
pub mod graph;
pub mod mapping;
pub mod model;

pub use client::{ClientError, ClientResult, EmbeddedClient, GraphClient, RemoteClient};
pub use config::ConnectorConfig;
pub use graph::{GraphStore, Label, PropertyValue};
pub use mapping::{Connector, MappingError, MappingResult, SaveReport};
pub use model::{Class, Element, Model};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
