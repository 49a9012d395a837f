//! Model reconstruction
//!
//! 1. query the nodes of every class of the meta-model (concurrently)
//! 2. rebuild one instance per node
//! 3. keep the most specific instance per identity
//! 4. resolve every reference through its edges, materializing endpoints
//!    that were not loaded in step 2

use futures::future::try_join_all;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::GraphClient;
use crate::graph::{EdgeType, Label, Node, PropertyMap};
use crate::model::{Class, Element, Identity, Model, Reference};

use super::error::MappingResult;

/// Keep, for each identity, the instance built from the most specific class.
///
/// An instance replaces the current one unless its class is in the current
/// one's inheritance chain. First-seen order is preserved.
pub fn filter_class_hierarchy(elements: Vec<Element>) -> IndexMap<Uuid, Element> {
    let mut kept: IndexMap<Uuid, Element> = IndexMap::new();
    for element in elements {
        let uuid = element.uuid();
        let replace = match kept.get(&uuid) {
            Some(current) => !current.class().is_a(element.class().name()),
            None => true,
        };
        if replace {
            kept.insert(uuid, element);
        }
    }
    kept
}

pub struct Loader {
    client: Arc<dyn GraphClient>,
    meta: Arc<Model>,
    identity_key: String,
    index: Mutex<IndexMap<Uuid, Element>>,
}

impl Loader {
    pub fn new(client: Arc<dyn GraphClient>, meta: Arc<Model>, identity_key: &str) -> Self {
        Self {
            client,
            meta,
            identity_key: identity_key.to_string(),
            index: Mutex::new(IndexMap::new()),
        }
    }

    pub async fn load(self) -> MappingResult<Model> {
        let classes: Vec<Arc<Class>> = self.meta.classes().cloned().collect();

        let client = &self.client;
        let by_class = try_join_all(classes.iter().map(|class| async move {
            let nodes = client.nodes_by_label(&Label::new(class.name())).await?;
            debug!("{} nodes labelled {}", nodes.len(), class.name());
            MappingResult::Ok((class, nodes))
        }))
        .await?;

        let mut rebuilt: Vec<Element> = Vec::new();
        for (class, nodes) in &by_class {
            rebuilt.extend(nodes.iter().filter_map(|n| self.rebuild(class, &n.properties)));
        }
        *self.index.lock().unwrap() = filter_class_hierarchy(rebuilt);

        self.resolve_references(&classes).await?;

        let mut model = Model::with_meta("LoadedModel", self.meta.clone());
        let index = self.index.into_inner().unwrap();
        info!("Loaded {} elements", index.len());
        for element in index.into_values() {
            model.add_element(element);
        }
        Ok(model)
    }

    /// New instance of `class` from node or edge properties, marked stored
    fn rebuild(&self, class: &Arc<Class>, properties: &PropertyMap) -> Option<Element> {
        let uuid = match properties
            .get(&self.identity_key)
            .and_then(|v| v.as_string())
            .map(Uuid::parse_str)
        {
            Some(Ok(uuid)) => uuid,
            _ => {
                warn!("Skipping {} without a valid {}", class.name(), self.identity_key);
                return None;
            }
        };

        let element = Element::with_identity(class, Identity::with_uuid(uuid));
        for attribute in class.all_attributes() {
            if let Some(value) = properties.get(&attribute.name) {
                if let Err(e) = element.set(&attribute.name, value.clone()) {
                    warn!("Dropping attribute of {}: {}", uuid, e);
                }
            }
        }
        element.identity().mark_stored(self.client.address());
        Some(element)
    }

    /// The declaring class and reference under which a pair is persisted
    fn canonical(&self, owner: &Class, reference: &Reference) -> (String, Reference) {
        if let Some(target) = self.meta.find_class(&reference.target) {
            if reference.defers_to_opposite(&target) {
                if let (Some(opposite), Some(opposite_owner)) = (
                    reference.opposite.as_deref().and_then(|o| target.reference(o)),
                    reference.opposite.as_deref().and_then(|o| target.reference_owner(o)),
                ) {
                    return (opposite_owner.name().to_string(), opposite.clone());
                }
            }
        }
        (owner.name().to_string(), reference.clone())
    }

    async fn resolve_references(&self, classes: &[Arc<Class>]) -> MappingResult<()> {
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut pending = Vec::new();

        for class in classes {
            for (owner, reference) in class.all_references() {
                let (owner, reference) = self.canonical(owner, reference);
                if !visited.insert((owner.clone(), reference.name.clone())) {
                    continue;
                }
                if let Some(opposite) = &reference.opposite {
                    if let Some(opposite_owner) = self
                        .meta
                        .find_class(&reference.target)
                        .and_then(|t| t.reference_owner(opposite).map(|o| o.name().to_string()))
                    {
                        visited.insert((opposite_owner, opposite.clone()));
                    }
                }
                pending.push(self.resolve_reference(owner, reference));
            }
        }

        try_join_all(pending).await?;
        Ok(())
    }

    async fn resolve_reference(&self, owner: String, reference: Reference) -> MappingResult<()> {
        let source_class = self.meta.find_class(&owner);
        let target_class = self.meta.find_class(&reference.target);
        let associated_class = reference
            .associated
            .as_deref()
            .and_then(|a| self.meta.find_class(a));

        let matches = self
            .client
            .match_edges(
                &Label::new(&owner),
                &EdgeType::new(&reference.name),
                &Label::new(&reference.target),
            )
            .await?;
        debug!("{} edges for {}.{}", matches.len(), owner, reference.name);

        for m in matches {
            let source = self.resolve_element(&m.source, source_class.as_ref());
            let target = self.resolve_element(&m.target, target_class.as_ref());
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };
            let associated = if m.edge.has_properties() {
                self.resolve_properties(&[], &m.edge.properties, associated_class.as_ref())
            } else {
                None
            };
            if let Err(e) = source.add_reference(&reference.name, &target, associated.as_ref()) {
                warn!("Cannot restore {} -> {}: {}", source.uuid(), target.uuid(), e);
            }
        }
        Ok(())
    }

    fn resolve_element(&self, node: &Node, declared: Option<&Arc<Class>>) -> Option<Element> {
        self.resolve_properties(&node.labels, &node.properties, declared)
    }

    /// Indexed instance for these properties, or a new one: class from the
    /// most specific label naming a known class, else `declared`, else a
    /// bare class named after the first label.
    fn resolve_properties(
        &self,
        labels: &[Label],
        properties: &PropertyMap,
        declared: Option<&Arc<Class>>,
    ) -> Option<Element> {
        let uuid = properties
            .get(&self.identity_key)
            .and_then(|v| v.as_string())
            .and_then(|s| Uuid::parse_str(s).ok());
        if let Some(existing) = uuid.and_then(|u| self.index.lock().unwrap().get(&u).cloned()) {
            return Some(existing);
        }

        let class = labels
            .iter()
            .find_map(|l| self.meta.find_class(l.as_str()))
            .or_else(|| declared.cloned())
            .unwrap_or_else(|| {
                let name = labels.first().map(Label::as_str).unwrap_or("Element");
                warn!("No class for node labelled {}, materializing bare", name);
                Class::bare(name, properties, &self.identity_key)
            });
        let element = self.rebuild(&class, properties)?;

        let mut index = self.index.lock().unwrap();
        Some(index.entry(element.uuid()).or_insert(element).clone())
    }
}
