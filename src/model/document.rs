//! JSON interchange documents for meta-models and models
//!
//! ```json
//! { "name": "People",
//!   "classes": [
//!     { "name": "Person",
//!       "attributes": { "name": "string", "age": "integer" },
//!       "references": { "knows": { "target": "Person", "opposite": "knows" } } }
//!   ] }
//! ```
//!
//! Model documents name elements by a local `key`; links refer to keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::class::{AttributeType, Class, EnumDef, Reference};
use super::container::Model;
use super::element::Element;
use super::error::{ModelError, ModelResult};
use super::identity::Identity;
use crate::graph::PropertyValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaModelDocument {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superclasses: Vec<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeType>,
    #[serde(default)]
    pub references: IndexMap<String, ReferenceDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opposite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDocument {
    pub name: String,
    /// Literal name to value
    pub literals: IndexMap<String, i64>,
}

impl MetaModelDocument {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the meta-model. Classes may list superclasses declared later
    /// in the document; reference targets must be declared classes.
    pub fn build(&self) -> ModelResult<Model> {
        let declared: HashMap<&str, &ClassDocument> =
            self.classes.iter().map(|c| (c.name.as_str(), c)).collect();
        if declared.len() != self.classes.len() {
            return Err(ModelError::InvalidDocument(format!(
                "duplicate class name in {}",
                self.name
            )));
        }

        for class in &self.classes {
            for name in class
                .superclasses
                .iter()
                .chain(class.references.values().map(|r| &r.target))
                .chain(class.references.values().filter_map(|r| r.associated.as_ref()))
            {
                if !declared.contains_key(name.as_str()) {
                    return Err(ModelError::UnknownClass(name.clone()));
                }
            }
        }

        // superclasses first
        let mut built: IndexMap<String, Arc<Class>> = IndexMap::new();
        while built.len() < self.classes.len() {
            let before = built.len();
            for doc in &self.classes {
                if built.contains_key(&doc.name)
                    || !doc.superclasses.iter().all(|s| built.contains_key(s))
                {
                    continue;
                }
                let class = doc.to_class(&built);
                built.insert(doc.name.clone(), class);
            }
            if built.len() == before {
                return Err(ModelError::InvalidDocument(format!(
                    "cyclic inheritance in {}",
                    self.name
                )));
            }
        }

        let mut model = Model::new(&self.name);
        for doc in &self.classes {
            if let Some(class) = built.get(&doc.name) {
                model.add_class(class.clone());
            }
        }
        for def in &self.enums {
            model.add_enum(EnumDef::with_values(
                &def.name,
                def.literals.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            ));
        }
        Ok(model)
    }

    pub fn from_model(model: &Model) -> Self {
        Self {
            name: model.name().to_string(),
            classes: model.classes().map(|c| ClassDocument::from_class(c)).collect(),
            enums: model
                .enums()
                .map(|e| EnumDocument {
                    name: e.name().to_string(),
                    literals: e.literals().iter().map(|l| (l.name.clone(), l.value)).collect(),
                })
                .collect(),
        }
    }
}

impl ClassDocument {
    fn to_class(&self, built: &IndexMap<String, Arc<Class>>) -> Arc<Class> {
        let mut builder = Class::builder(&self.name);
        for parent in self.superclasses.iter().filter_map(|s| built.get(s)) {
            builder = builder.super_class(parent);
        }
        for (name, ty) in &self.attributes {
            builder = builder.attribute(name, ty.clone());
        }
        for (name, r) in &self.references {
            let mut reference = Reference::new(name, &r.target);
            if let Some(opposite) = &r.opposite {
                reference = reference.with_opposite(opposite);
            }
            if let Some(associated) = &r.associated {
                reference = reference.with_associated(associated);
            }
            builder = builder.reference(reference);
        }
        builder.build()
    }

    fn from_class(class: &Class) -> Self {
        Self {
            name: class.name().to_string(),
            superclasses: class.super_classes().iter().map(|c| c.name().to_string()).collect(),
            attributes: class
                .own_attributes()
                .map(|a| (a.name.clone(), a.ty.clone()))
                .collect(),
            references: class
                .own_references()
                .map(|r| {
                    (
                        r.name.clone(),
                        ReferenceDocument {
                            target: r.target.clone(),
                            opposite: r.opposite.clone(),
                            associated: r.associated.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDocument {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub class: String,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub references: IndexMap<String, Vec<LinkDocument>>,
}

/// `"bob"` or `{ "target": "bob", "associated": "since2020" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkDocument {
    Key(String),
    Associated { target: String, associated: String },
}

impl LinkDocument {
    fn target(&self) -> &str {
        match self {
            LinkDocument::Key(key) => key,
            LinkDocument::Associated { target, .. } => target,
        }
    }
}

impl ModelDocument {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the model over `meta`. A link that was already added as the
    /// opposite of an earlier one is not added twice; any other repeated
    /// link is kept.
    pub fn build(&self, meta: &Arc<Model>) -> ModelResult<Model> {
        let mut model = Model::with_meta(&self.name, meta.clone());
        let mut by_key: HashMap<&str, Element> = HashMap::new();

        for doc in &self.elements {
            let class = meta
                .find_class(&doc.class)
                .ok_or_else(|| ModelError::UnknownClass(doc.class.clone()))?;
            let identity = match doc.id {
                Some(uuid) => Identity::with_uuid(uuid),
                None => Identity::shared(),
            };
            let element = Element::with_identity(&class, identity);
            for (name, value) in &doc.attributes {
                element.set(name, PropertyValue::from_json(value))?;
            }
            if by_key.insert(doc.key.as_str(), element.clone()).is_some() {
                return Err(ModelError::InvalidDocument(format!("duplicate key {}", doc.key)));
            }
            model.add_element(element);
        }

        let lookup = |key: &str| {
            by_key
                .get(key)
                .cloned()
                .ok_or_else(|| ModelError::UnknownKey(key.to_string()))
        };
        // opposite links added implicitly and not yet met in the document
        let mut implied: HashMap<(Element, String, Element), usize> = HashMap::new();
        for doc in &self.elements {
            let source = lookup(&doc.key)?;
            for (name, links) in &doc.references {
                for link in links {
                    let target = lookup(link.target())?;
                    let associated = match link {
                        LinkDocument::Associated { associated, .. } => Some(lookup(associated)?),
                        LinkDocument::Key(_) => None,
                    };
                    let key = (source.clone(), name.clone(), target.clone());
                    if let Some(count) = implied.get_mut(&key).filter(|c| **c > 0) {
                        *count -= 1;
                        continue;
                    }

                    if let Some(opposite) = source.link(name, &target, associated.as_ref())? {
                        *implied.entry((target, opposite, source.clone())).or_default() += 1;
                    }
                }
            }
        }
        Ok(model)
    }

    /// Export a model; element keys are their UUIDs
    pub fn from_model(model: &Model) -> Self {
        let elements = model
            .elements()
            .iter()
            .map(|e| ElementDocument {
                key: e.uuid().to_string(),
                id: Some(e.uuid()),
                class: e.class().name().to_string(),
                attributes: e
                    .attributes()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
                references: e
                    .references()
                    .into_iter()
                    .map(|(name, links)| {
                        let links = links
                            .into_iter()
                            .map(|l| match l.associated {
                                Some(a) => LinkDocument::Associated {
                                    target: l.target.uuid().to_string(),
                                    associated: a.uuid().to_string(),
                                },
                                None => LinkDocument::Key(l.target.uuid().to_string()),
                            })
                            .collect();
                        (name, links)
                    })
                    .collect(),
            })
            .collect();
        Self {
            name: model.name().to_string(),
            elements,
        }
    }
}
