//! Element persistence
//!
//! Each element becomes one node: label set = inheritance chain names plus
//! the marker label, properties = the defined attributes plus the identity.
//! An element already stored in the target store, or one with a name-derived
//! identity, is replaced (delete, then merge). Otherwise it is created,
//! regenerating its identity when another node already holds it. Two
//! distinct elements sharing one identity are never merged: the second one
//! to be written gets an identity of its own.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::GraphClient;
use crate::config::ConnectorConfig;
use crate::graph::{describe_properties, Label, NodeId, PropertyMap, PropertyValue};
use crate::model::Element;

use super::error::{MappingError, MappingResult};

/// Flat property map for `element`: every attribute of the inheritance
/// chain that has a value, plus the identity under `identity_key`
pub fn serialize(element: &Element, identity_key: &str) -> PropertyMap {
    let mut properties: PropertyMap = element
        .attributes()
        .into_iter()
        .filter(|(name, value)| !value.is_null() && element.class().attribute(name).is_some())
        .collect();
    properties.insert(
        identity_key.to_string(),
        PropertyValue::String(element.uuid().to_string()),
    );
    properties
}

/// Inheritance chain names followed by the marker label
pub fn label_set(element: &Element, marker: &Label) -> Vec<Label> {
    let mut labels: Vec<Label> = element
        .class()
        .chain_names()
        .into_iter()
        .map(Label::new)
        .collect();
    labels.push(marker.clone());
    labels
}

/// Saves elements for one save operation and remembers their node ids.
///
/// Each element is written at most once: concurrent requests for the same
/// element wait on the same one-shot cell.
pub struct ElementStore {
    client: Arc<dyn GraphClient>,
    config: ConnectorConfig,
    saved: Mutex<HashMap<Element, Arc<OnceCell<NodeId>>>>,
    claimed: Mutex<HashMap<Uuid, Element>>,
}

impl ElementStore {
    pub fn new(client: Arc<dyn GraphClient>, config: ConnectorConfig) -> Self {
        Self {
            client,
            config,
            saved: Mutex::new(HashMap::new()),
            claimed: Mutex::new(HashMap::new()),
        }
    }

    /// Save all elements concurrently
    pub async fn save_all(&self, elements: &[Element]) -> MappingResult<Vec<NodeId>> {
        try_join_all(elements.iter().map(|e| self.save_element(e))).await
    }

    /// Node id of `element` if it was saved in this operation
    pub fn node_id(&self, element: &Element) -> Option<NodeId> {
        self.saved
            .lock()
            .unwrap()
            .get(element)
            .and_then(|cell| cell.get().copied())
    }

    /// Number of elements written so far
    pub fn saved_count(&self) -> usize {
        self.saved
            .lock()
            .unwrap()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Save `element` unless already saved in this operation; its node id
    pub async fn save_element(&self, element: &Element) -> MappingResult<NodeId> {
        let cell = {
            let mut saved = self.saved.lock().unwrap();
            saved.entry(element.clone()).or_default().clone()
        };
        cell.get_or_try_init(|| self.write(element)).await.copied()
    }

    /// Reserve the element's UUID for this save. An element whose UUID was
    /// already written by another element is given a fresh identity.
    fn claim(&self, element: &Element) {
        let mut claimed = self.claimed.lock().unwrap();
        let uuid = element.uuid();
        match claimed.get(&uuid) {
            Some(owner) if owner != element => {
                let fresh = element.detach_identity();
                warn!("Identity {} shared by two elements, saving the second as {}", uuid, fresh);
                claimed.insert(fresh, element.clone());
            }
            Some(_) => {}
            None => {
                claimed.insert(uuid, element.clone());
            }
        }
    }

    async fn write(&self, element: &Element) -> MappingResult<NodeId> {
        self.claim(element);
        let address = self.client.address().to_string();
        let key = self.config.identity_key.as_str();
        let marker = self.config.marker();
        let labels = label_set(element, &marker);
        let mut properties = serialize(element, key);
        let identity = element.identity();

        let id = if identity.is_stored_in(&address) || identity.is_named() {
            let value = PropertyValue::String(element.uuid().to_string());
            self.client
                .delete_nodes(&marker, key, &value)
                .await
                .map_err(|source| element_error(&properties, source))?;
            self.client
                .merge_node(&labels, key, properties.clone())
                .await
                .map_err(|source| element_error(&properties, source))?
        } else {
            let mut attempts = 0;
            loop {
                match self.client.create_node(&labels, properties.clone()).await {
                    Ok(id) => break id,
                    Err(err) if err.is_constraint_violation() => {
                        if attempts >= self.config.max_identity_retries {
                            return Err(MappingError::IdentityExhausted {
                                element: describe_properties(&properties),
                                attempts,
                            });
                        }
                        attempts += 1;
                        let previous = identity.uuid();
                        let fresh = identity.regenerate();
                        self.claimed.lock().unwrap().insert(fresh, element.clone());
                        warn!("Identity {} already taken, retrying as {}", previous, fresh);
                        properties.insert(key.to_string(), PropertyValue::String(fresh.to_string()));
                    }
                    Err(err) => return Err(element_error(&properties, err)),
                }
            }
        };

        identity.mark_stored(&address);
        debug!("Saved {} {} as {}", element.class().name(), element.uuid(), id);
        Ok(id)
    }
}

fn element_error(properties: &PropertyMap, source: crate::client::ClientError) -> MappingError {
    MappingError::Element {
        element: describe_properties(properties),
        source,
    }
}
