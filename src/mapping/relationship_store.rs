//! Relationship persistence
//!
//! One edge per link, typed by the reference name and addressed by the node
//! ids recorded in the [`ElementStore`]. Links to elements that were not
//! part of the save are saved on demand first.
//!
//! Both halves of an opposite pair resolve to one persisted direction, so a
//! pair becomes a single edge whichever endpoint is being saved.

use futures::future::try_join_all;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::client::GraphClient;
use crate::graph::{EdgeId, EdgeType, PropertyMap};
use crate::model::element::persisted_direction;
use crate::model::Element;

use super::element_store::{serialize, ElementStore};
use super::error::{MappingError, MappingResult};

/// Associated elements of the links seen for one persisted direction,
/// split by the side they were reached from
#[derive(Default)]
struct LinkHalves {
    direct: Vec<Option<Element>>,
    mirrored: Vec<Option<Element>>,
}

impl LinkHalves {
    /// One edge per link; a link mirrored by its opposite counts once
    fn edges(&self) -> &[Option<Element>] {
        if self.mirrored.len() > self.direct.len() {
            &self.mirrored
        } else {
            &self.direct
        }
    }
}

pub struct RelationshipStore<'a> {
    client: Arc<dyn GraphClient>,
    elements: &'a ElementStore,
    identity_key: &'a str,
}

impl<'a> RelationshipStore<'a> {
    pub fn new(client: Arc<dyn GraphClient>, elements: &'a ElementStore, identity_key: &'a str) -> Self {
        Self {
            client,
            elements,
            identity_key,
        }
    }

    /// Create the edges of every reference of every element, concurrently.
    /// Links mirrored by an opposite reference are written once.
    pub async fn save_all(&self, sources: &[Element]) -> MappingResult<usize> {
        let mut pairs: IndexMap<(Element, String, Element), LinkHalves> = IndexMap::new();
        for source in sources {
            for (_, reference) in source.class().all_references() {
                for link in source.links(&reference.name) {
                    let (from, name, to, flipped) = persisted_direction(reference, source, &link.target);
                    let halves = pairs.entry((from, name, to)).or_default();
                    if flipped {
                        halves.mirrored.push(link.associated);
                    } else {
                        halves.direct.push(link.associated);
                    }
                }
            }
        }

        let mut pending = Vec::new();
        for ((source, reference, target), halves) in &pairs {
            for associated in halves.edges() {
                pending.push(self.save_relationship(source, reference, target, associated.as_ref()));
            }
        }
        let created = try_join_all(pending).await?;
        Ok(created.len())
    }

    /// Fetch-or-save the associated element, then serialize it
    async fn associated_properties(&self, associated: Option<&Element>) -> MappingResult<PropertyMap> {
        match associated {
            Some(element) => {
                self.elements.save_element(element).await?;
                Ok(serialize(element, self.identity_key))
            }
            None => Ok(PropertyMap::new()),
        }
    }

    async fn save_relationship(
        &self,
        source: &Element,
        reference: &str,
        target: &Element,
        associated: Option<&Element>,
    ) -> MappingResult<EdgeId> {
        let source_id = self.elements.save_element(source).await?;
        let target_id = self.elements.save_element(target).await?;
        let properties = self.associated_properties(associated).await?;

        let edge_id = self
            .client
            .create_edge(source_id, target_id, &EdgeType::new(reference), properties)
            .await
            .map_err(|err| MappingError::Relationship {
                source_id: source.uuid().to_string(),
                reference: reference.to_string(),
                target_id: target.uuid().to_string(),
                source: err,
            })?;
        debug!("OK reference: {} - {} - {}", source_id, reference, target_id);
        Ok(edge_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EmbeddedClient;
    use crate::config::ConnectorConfig;
    use crate::graph::{Label, PropertyValue};
    use crate::model::{AttributeType, Class, Reference};

    fn employment() -> (Arc<Class>, Arc<Class>) {
        let person = Class::builder("Person")
            .reference(Reference::new("employer", "Company").with_opposite("employees"))
            .build();
        let company = Class::builder("Company")
            .reference(Reference::new("employees", "Person").with_opposite("employer"))
            .build();
        (person, company)
    }

    fn classes() -> (Arc<Class>, Arc<Class>) {
        let person = Class::builder("Person")
            .attribute("name", AttributeType::String)
            .reference(Reference::new("knows", "Person").with_opposite("knows"))
            .reference(Reference::new("friends", "Person").with_associated("Friendship"))
            .build();
        let friendship = Class::builder("Friendship")
            .attribute("since", AttributeType::Integer)
            .build();
        (person, friendship)
    }

    #[tokio::test]
    async fn test_opposite_pair_is_one_edge() {
        let client = Arc::new(EmbeddedClient::new());
        let config = ConnectorConfig::default();
        let elements = ElementStore::new(client.clone(), config.clone());
        let relationships = RelationshipStore::new(client.clone(), &elements, &config.identity_key);

        let (person, _) = classes();
        let x = person.new_instance();
        let y = person.new_instance();
        x.add_reference("knows", &y, None).unwrap();

        let sources = vec![x, y];
        elements.save_all(&sources).await.unwrap();
        let created = relationships.save_all(&sources).await.unwrap();

        assert_eq!(created, 1);
        let graph = client.store_read().await;
        assert_eq!(graph.get_edges_by_type(&"knows".into()).len(), 1);
    }

    #[tokio::test]
    async fn test_opposite_pair_from_either_side() {
        let (person, company) = employment();

        for from_person in [true, false] {
            let client = Arc::new(EmbeddedClient::new());
            let config = ConnectorConfig::default();
            let elements = ElementStore::new(client.clone(), config.clone());
            let relationships = RelationshipStore::new(client.clone(), &elements, &config.identity_key);

            let p = person.new_instance();
            let c = company.new_instance();
            p.add_reference("employer", &c, None).unwrap();

            // only one endpoint takes part; the other is saved on demand
            let sources = if from_person { vec![p.clone()] } else { vec![c.clone()] };
            elements.save_all(&sources).await.unwrap();
            assert_eq!(relationships.save_all(&sources).await.unwrap(), 1);

            let graph = client.store_read().await;
            let edges = graph.get_edges_by_type(&"employees".into());
            assert_eq!(edges.len(), 1);
            assert_eq!(Some(edges[0].source), elements.node_id(&c));
            assert_eq!(Some(edges[0].target), elements.node_id(&p));
            assert!(graph.get_edges_by_type(&"employer".into()).is_empty());
        }
    }

    #[tokio::test]
    async fn test_self_opposite_with_target_outside_the_save() {
        let (person, _) = classes();
        let client = Arc::new(EmbeddedClient::new());
        let config = ConnectorConfig::default();
        let elements = ElementStore::new(client.clone(), config.clone());
        let relationships = RelationshipStore::new(client.clone(), &elements, &config.identity_key);

        let low = Element::with_identity(&person, crate::model::Identity::with_uuid(uuid::Uuid::from_u128(1)));
        let high = Element::with_identity(&person, crate::model::Identity::with_uuid(uuid::Uuid::from_u128(2)));
        high.add_reference("knows", &low, None).unwrap();

        let sources = vec![high.clone()];
        elements.save_all(&sources).await.unwrap();
        assert_eq!(relationships.save_all(&sources).await.unwrap(), 1);

        let graph = client.store_read().await;
        let edges = graph.get_edges_by_type(&"knows".into());
        assert_eq!(edges.len(), 1);
        assert_eq!(Some(edges[0].source), elements.node_id(&low));
    }

    #[tokio::test]
    async fn test_targets_and_associated_are_saved_on_demand() {
        let client = Arc::new(EmbeddedClient::new());
        let config = ConnectorConfig::default();
        let elements = ElementStore::new(client.clone(), config.clone());
        let relationships = RelationshipStore::new(client.clone(), &elements, &config.identity_key);

        let (person, friendship) = classes();
        let x = person.new_instance();
        let y = person.new_instance();
        let since = friendship.new_instance();
        since.set("since", 2020).unwrap();
        x.add_reference("friends", &y, Some(&since)).unwrap();

        elements.save_all(std::slice::from_ref(&x)).await.unwrap();
        relationships.save_all(std::slice::from_ref(&x)).await.unwrap();

        assert!(elements.node_id(&y).is_some());
        assert!(elements.node_id(&since).is_some());

        let graph = client.store_read().await;
        assert_eq!(graph.get_nodes_by_label(&Label::new("Friendship")).len(), 1);
        let edge = graph.get_edges_by_type(&"friends".into())[0];
        assert_eq!(edge.properties.get("since"), Some(&PropertyValue::Integer(2020)));
        assert_eq!(
            edge.properties.get(&config.identity_key),
            Some(&PropertyValue::String(since.uuid().to_string()))
        );
    }

    #[tokio::test]
    async fn test_edge_failure_names_endpoints() {
        let client = Arc::new(EmbeddedClient::new());
        let config = ConnectorConfig::default();
        let elements = ElementStore::new(client.clone(), config.clone());
        let relationships = RelationshipStore::new(client.clone(), &elements, &config.identity_key);

        let (person, _) = classes();
        let x = person.new_instance();
        let y = person.new_instance();
        x.add_reference("friends", &y, None).unwrap();
        elements.save_all(&[x.clone(), y.clone()]).await.unwrap();

        // the target disappears between the two phases
        client.store().write().await.clear();

        let err = relationships.save_all(&[x.clone()]).await.unwrap_err();
        match err {
            MappingError::Relationship { source_id, reference, target_id, .. } => {
                assert_eq!(source_id, x.uuid().to_string());
                assert_eq!(reference, "friends");
                assert_eq!(target_id, y.uuid().to_string());
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
