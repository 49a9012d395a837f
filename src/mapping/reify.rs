//! Reification of meta-level constructs
//!
//! Models, classes and enums are turned into ordinary elements of the
//! built-in meta-schema so they can be stored next to instance data. A
//! reified element shares the [`Identity`] of the object it was built from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

use crate::model::{
    AttributeType, Class, Element, EnumDef, Identity, Model, ModelResult, Reference,
};

/// The built-in meta-model describing models, classes and enums
pub struct MetaSchema {
    pub model: Arc<Model>,
    pub model_class: Arc<Class>,
    pub class_class: Arc<Class>,
    pub attribute_class: Arc<Class>,
    pub reference_class: Arc<Class>,
    pub enum_class: Arc<Class>,
    pub literal_class: Arc<Class>,
}

static META_SCHEMA: OnceLock<MetaSchema> = OnceLock::new();

fn named_class(name: &str) -> crate::model::ClassBuilder {
    Class::builder(name).identity(Identity::named(name))
}

fn build_meta_schema() -> MetaSchema {
    let model_class = named_class("Model")
        .attribute("name", AttributeType::String)
        .reference(Reference::new("referenceModel", "Model"))
        .reference(Reference::new("classes", "Class"))
        .reference(Reference::new("enums", "Enum"))
        .build();
    let class_class = named_class("Class")
        .attribute("name", AttributeType::String)
        .reference(Reference::new("superClasses", "Class"))
        .reference(Reference::new("attributes", "Attribute"))
        .reference(Reference::new("references", "Reference"))
        .build();
    let attribute_class = named_class("Attribute")
        .attribute("name", AttributeType::String)
        .attribute("type", AttributeType::String)
        .build();
    let reference_class = named_class("Reference")
        .attribute("name", AttributeType::String)
        .attribute("opposite", AttributeType::String)
        .reference(Reference::new("type", "Class"))
        .reference(Reference::new("associated", "Class"))
        .build();
    let enum_class = named_class("Enum")
        .attribute("name", AttributeType::String)
        .reference(Reference::new("literals", "Literal"))
        .build();
    let literal_class = named_class("Literal")
        .attribute("name", AttributeType::String)
        .attribute("value", AttributeType::Integer)
        .build();

    let mut model = Model::new("MetaModel").with_identity(Identity::named("MetaModel"));
    for class in [
        &model_class,
        &class_class,
        &attribute_class,
        &reference_class,
        &enum_class,
        &literal_class,
    ] {
        model.add_class(class.clone());
    }

    MetaSchema {
        model: Arc::new(model),
        model_class,
        class_class,
        attribute_class,
        reference_class,
        enum_class,
        literal_class,
    }
}

pub fn meta_schema() -> &'static MetaSchema {
    META_SCHEMA.get_or_init(build_meta_schema)
}

/// The built-in meta-model
pub fn meta_model() -> &'static Arc<Model> {
    &meta_schema().model
}

/// Something reachable from a model being saved
#[derive(Debug, Clone, Copy)]
pub enum ModelItem<'a> {
    Model(&'a Model),
    /// A class, with the model that declares it (its name scope)
    Class(&'a Arc<Class>, &'a Model),
    Enum(&'a Arc<EnumDef>),
    Element(&'a Element),
}

/// Everything to persist for `model`: its elements, then for the model and
/// each model of its meta chain, the declared classes and enums and the
/// model itself. With `own_types` the built-in meta-model is included too.
pub fn gather(model: &Model, own_types: bool) -> Vec<ModelItem<'_>> {
    let mut items: Vec<ModelItem<'_>> = model.elements().iter().map(ModelItem::Element).collect();
    let mut chain: Vec<&Model> = Vec::new();
    let mut current = Some(model);
    while let Some(m) = current {
        chain.push(m);
        current = m.meta().map(|meta| meta.as_ref());
    }
    let builtin: &Model = meta_model();
    if own_types && !chain.iter().any(|m| std::ptr::eq(*m, builtin)) {
        chain.push(builtin);
    }

    for (depth, m) in chain.into_iter().enumerate() {
        if depth > 0 {
            items.extend(m.elements().iter().map(ModelItem::Element));
        }
        items.extend(m.classes().map(|c| ModelItem::Class(c, m)));
        items.extend(m.enums().map(ModelItem::Enum));
        items.push(ModelItem::Model(m));
    }
    items
}

fn cache_key(identity: &Arc<Identity>) -> usize {
    Arc::as_ptr(identity) as usize
}

/// Per-save reification cache
///
/// Keyed by the meta-object's identity allocation, so the same class
/// reached through different models or references is reified once.
#[derive(Default)]
pub struct Reifier {
    cache: Mutex<HashMap<usize, Vec<Element>>>,
}

impl Reifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements standing for `item`; plain elements are returned unchanged
    pub fn reify(&self, item: ModelItem<'_>) -> ModelResult<Vec<Element>> {
        match item {
            ModelItem::Model(m) => Ok(vec![self.reify_model(m)?]),
            ModelItem::Class(c, scope) => self.reify_class(c, scope),
            ModelItem::Enum(e) => self.reify_enum(e),
            ModelItem::Element(e) => Ok(vec![e.clone()]),
        }
    }

    fn cached(&self, identity: &Arc<Identity>) -> Option<Vec<Element>> {
        self.cache.lock().unwrap().get(&cache_key(identity)).cloned()
    }

    fn remember(&self, identity: &Arc<Identity>, elements: Vec<Element>) {
        self.cache.lock().unwrap().insert(cache_key(identity), elements);
    }

    pub fn reify_model(&self, model: &Model) -> ModelResult<Element> {
        if let Some(hit) = self.cached(model.identity()) {
            return Ok(hit[0].clone());
        }
        let schema = meta_schema();
        let element = Element::with_identity(&schema.model_class, model.identity().clone());
        element.set("name", model.name())?;
        self.remember(model.identity(), vec![element.clone()]);

        if let Some(meta) = model.meta() {
            let reified = self.reify_model(meta)?;
            element.add_reference("referenceModel", &reified, None)?;
        }
        for class in model.classes() {
            let reified = self.reify_class(class, model)?;
            element.add_reference("classes", &reified[0], None)?;
        }
        for def in model.enums() {
            let reified = self.reify_enum(def)?;
            element.add_reference("enums", &reified[0], None)?;
        }
        Ok(element)
    }

    /// The class element followed by its attribute and reference elements.
    /// Reference targets are resolved by name in `scope`.
    pub fn reify_class(&self, class: &Arc<Class>, scope: &Model) -> ModelResult<Vec<Element>> {
        if let Some(hit) = self.cached(class.identity()) {
            return Ok(hit);
        }
        let schema = meta_schema();
        let element = Element::with_identity(&schema.class_class, class.identity().clone());
        element.set("name", class.name())?;
        // visible to recursive lookups through self-references
        self.remember(class.identity(), vec![element.clone()]);
        let mut reified = vec![element.clone()];

        for parent in class.super_classes() {
            let parent = self.reify_class(parent, scope)?;
            element.add_reference("superClasses", &parent[0], None)?;
        }
        for attribute in class.own_attributes() {
            let a = Element::with_identity(&schema.attribute_class, attribute.identity.clone());
            a.set("name", attribute.name.as_str())?;
            a.set("type", attribute.ty.to_string())?;
            element.add_reference("attributes", &a, None)?;
            reified.push(a);
        }
        for reference in class.own_references() {
            let r = Element::with_identity(&schema.reference_class, reference.identity.clone());
            r.set("name", reference.name.as_str())?;
            if let Some(opposite) = &reference.opposite {
                r.set("opposite", opposite.as_str())?;
            }
            self.link_class(&r, "type", &reference.target, scope)?;
            if let Some(associated) = &reference.associated {
                self.link_class(&r, "associated", associated, scope)?;
            }
            element.add_reference("references", &r, None)?;
            reified.push(r);
        }

        self.remember(class.identity(), reified.clone());
        Ok(reified)
    }

    fn link_class(&self, from: &Element, name: &str, class: &str, scope: &Model) -> ModelResult<()> {
        match scope.find_class(class) {
            Some(target) => {
                let target = self.reify_class(&target, scope)?;
                from.add_reference(name, &target[0], None)
            }
            None => {
                warn!("Cannot reify {} -> {}: class not found in {}", name, class, scope.name());
                Ok(())
            }
        }
    }

    /// The enum element followed by its literal elements
    pub fn reify_enum(&self, def: &Arc<EnumDef>) -> ModelResult<Vec<Element>> {
        if let Some(hit) = self.cached(def.identity()) {
            return Ok(hit);
        }
        let schema = meta_schema();
        let element = Element::with_identity(&schema.enum_class, def.identity().clone());
        element.set("name", def.name())?;
        let mut reified = vec![element.clone()];
        for literal in def.literals() {
            let l = Element::with_identity(&schema.literal_class, literal.identity.clone());
            l.set("name", literal.name.as_str())?;
            l.set("value", literal.value)?;
            element.add_reference("literals", &l, None)?;
            reified.push(l);
        }
        self.remember(def.identity(), reified.clone());
        Ok(reified)
    }

    /// Every element produced so far, including meta-objects reified only
    /// because something referenced them
    pub fn reified_elements(&self) -> Vec<Element> {
        self.cache
            .lock()
            .unwrap()
            .values()
            .flat_map(|v| v.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    fn people() -> Arc<Model> {
        let named = Class::builder("Named").attribute("name", AttributeType::String).build();
        let person = Class::builder("Person")
            .super_class(&named)
            .reference(Reference::new("knows", "Person").with_opposite("knows"))
            .build();
        let mut meta = Model::new("People");
        meta.add_class(named).add_class(person);
        meta.add_enum(EnumDef::new("Mood", ["Happy", "Sad"]));
        Arc::new(meta)
    }

    #[test]
    fn test_meta_schema_is_stable() {
        let schema = meta_schema();
        assert_eq!(schema.class_class.identity().uuid(), Identity::named("Class").uuid());
        assert_eq!(meta_model().classes().count(), 6);
        assert!(std::ptr::eq(meta_schema(), schema));
    }

    #[test]
    fn test_reify_class_is_idempotent() {
        let meta = people();
        let person = meta.find_class("Person").unwrap();
        let reifier = Reifier::new();

        let first = reifier.reify_class(&person, &meta).unwrap();
        let second = reifier.reify_class(&person, &meta).unwrap();
        assert_eq!(first, second);
        // class element + the `knows` reference element
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].uuid(), person.identity().uuid());
        assert!(Arc::ptr_eq(&first[0].identity(), person.identity()));
    }

    #[test]
    fn test_reified_class_structure() {
        let meta = people();
        let person = meta.find_class("Person").unwrap();
        let reifier = Reifier::new();
        let reified = reifier.reify_class(&person, &meta).unwrap();

        let class = &reified[0];
        assert_eq!(class.get("name"), Some(PropertyValue::String("Person".to_string())));
        let parents = class.targets("superClasses");
        assert_eq!(parents[0].get("name"), Some(PropertyValue::String("Named".to_string())));

        let knows = &reified[1];
        assert_eq!(knows.get("opposite"), Some(PropertyValue::String("knows".to_string())));
        // self-reference resolves to the same class element
        assert_eq!(knows.targets("type"), vec![class.clone()]);
    }

    #[test]
    fn test_reify_model_links_classes_and_enums() {
        let meta = people();
        let reifier = Reifier::new();
        let element = reifier.reify_model(&meta).unwrap();

        assert_eq!(element.class().name(), "Model");
        assert_eq!(element.targets("classes").len(), 2);
        let mood = &element.targets("enums")[0];
        assert_eq!(mood.targets("literals").len(), 2);
        assert!(element.targets("referenceModel").is_empty());
    }

    #[test]
    fn test_plain_elements_pass_through() {
        let meta = people();
        let ada = meta.find_class("Person").unwrap().new_instance();
        let reified = Reifier::new().reify(ModelItem::Element(&ada)).unwrap();
        assert_eq!(reified, vec![ada]);
    }

    #[test]
    fn test_gather_walks_meta_chain() {
        let meta = people();
        let mut model = Model::with_meta("Family", meta.clone());
        model.add_element(meta.find_class("Person").unwrap().new_instance());

        let items = gather(&model, false);
        // element, Family, Named, Person, Mood, People
        assert_eq!(items.len(), 6);
        assert!(matches!(items[0], ModelItem::Element(_)));
        assert!(matches!(items.last(), Some(ModelItem::Model(m)) if m.name() == "People"));

        let with_types = gather(&model, true);
        // + 6 built-in classes + MetaModel
        assert_eq!(with_types.len(), 13);
    }
}
