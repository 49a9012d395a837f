//! Model ↔ property graph mapping
//!
//! Save: gather the model and its meta chain, reify meta-objects, write
//! every element, then every relationship. Load: query each class, rebuild
//! instances, keep the most specific class per identity, resolve references.

pub mod connector;
pub mod element_store;
pub mod error;
pub mod loader;
pub mod reify;
pub mod relationship_store;

pub use connector::{Connector, SaveReport};
pub use element_store::{label_set, serialize, ElementStore};
pub use error::{MappingError, MappingResult};
pub use loader::{filter_class_hierarchy, Loader};
pub use reify::{gather, meta_model, meta_schema, MetaSchema, ModelItem, Reifier};
pub use relationship_store::RelationshipStore;
