//! Models: named collections of elements over an optional meta-model

use indexmap::IndexMap;
use std::sync::Arc;

use super::class::{Class, EnumDef};
use super::element::Element;
use super::identity::Identity;

/// A named, ordered collection of elements.
///
/// A model may also declare classes and enums, which is what makes it usable
/// as the meta-model of another one. Class lookups fall back through the
/// meta chain.
#[derive(Debug)]
pub struct Model {
    name: String,
    identity: Arc<Identity>,
    meta: Option<Arc<Model>>,
    classes: IndexMap<String, Arc<Class>>,
    enums: IndexMap<String, Arc<EnumDef>>,
    elements: Vec<Element>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: Identity::shared(),
            meta: None,
            classes: IndexMap::new(),
            enums: IndexMap::new(),
            elements: Vec::new(),
        }
    }

    /// A model conforming to `meta`
    pub fn with_meta(name: impl Into<String>, meta: Arc<Model>) -> Self {
        let mut model = Self::new(name);
        model.meta = Some(meta);
        model
    }

    pub fn with_identity(mut self, identity: Arc<Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn meta(&self) -> Option<&Arc<Model>> {
        self.meta.as_ref()
    }

    /// Declare a class; a class of the same name is replaced
    pub fn add_class(&mut self, class: Arc<Class>) -> &mut Self {
        self.classes.insert(class.name().to_string(), class);
        self
    }

    pub fn add_enum(&mut self, def: Arc<EnumDef>) -> &mut Self {
        self.enums.insert(def.name().to_string(), def);
        self
    }

    pub fn add_element(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Classes declared by this model
    pub fn classes(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.classes.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &Arc<EnumDef>> {
        self.enums.values()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Elements that are instances of `class` (or of a subclass)
    pub fn elements_of(&self, class: &str) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| e.class().is_a(class))
            .collect()
    }

    /// Resolve a class by name: own classes first, then the meta chain
    pub fn find_class(&self, name: &str) -> Option<Arc<Class>> {
        self.classes
            .get(name)
            .cloned()
            .or_else(|| self.meta.as_ref().and_then(|m| m.find_class(name)))
    }

    pub fn find_enum(&self, name: &str) -> Option<Arc<EnumDef>> {
        self.enums
            .get(name)
            .cloned()
            .or_else(|| self.meta.as_ref().and_then(|m| m.find_enum(name)))
    }
}
