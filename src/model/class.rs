//! Classes, attributes, references and enumerations
//!
//! A [`Class`] is the schema registry entry for a family of elements: its
//! own attributes and references, its superclasses, and the factory
//! ([`Class::new_instance`]) that creates elements of it. Reference targets
//! are class *names*, resolved through the owning [`Model`](super::Model),
//! so self-referencing and mutually referencing classes need no cycles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::element::Element;
use super::error::ModelError;
use super::identity::Identity;
use crate::graph::{PropertyMap, PropertyValue};

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Boolean,
    /// Epoch milliseconds
    DateTime,
    /// Literal name of the named enum
    Enum(String),
    Any,
}

impl AttributeType {
    /// Convert `value` to this type, if it can be represented.
    ///
    /// Null is accepted by every type and means "unset".
    pub fn coerce(&self, value: &PropertyValue) -> Option<PropertyValue> {
        if value.is_null() {
            return Some(PropertyValue::Null);
        }
        match (self, value) {
            (AttributeType::Any, v) => Some(v.clone()),
            (AttributeType::String, PropertyValue::String(_)) => Some(value.clone()),
            (AttributeType::Enum(_), PropertyValue::String(_)) => Some(value.clone()),
            (AttributeType::Integer, PropertyValue::Integer(_)) => Some(value.clone()),
            (AttributeType::Integer, PropertyValue::Float(f)) if f.fract() == 0.0 => {
                Some(PropertyValue::Integer(*f as i64))
            }
            (AttributeType::Float, PropertyValue::Float(_)) => Some(value.clone()),
            (AttributeType::Float, PropertyValue::Integer(i)) => Some(PropertyValue::Float(*i as f64)),
            (AttributeType::Boolean, PropertyValue::Boolean(_)) => Some(value.clone()),
            (AttributeType::DateTime, PropertyValue::DateTime(_)) => Some(value.clone()),
            (AttributeType::DateTime, PropertyValue::Integer(i)) => Some(PropertyValue::DateTime(*i)),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Integer => write!(f, "integer"),
            AttributeType::Float => write!(f, "float"),
            AttributeType::Boolean => write!(f, "boolean"),
            AttributeType::DateTime => write!(f, "datetime"),
            AttributeType::Enum(name) => write!(f, "enum({})", name),
            AttributeType::Any => write!(f, "any"),
        }
    }
}

impl FromStr for AttributeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "string" => Ok(AttributeType::String),
            "integer" | "int" => Ok(AttributeType::Integer),
            "float" | "number" => Ok(AttributeType::Float),
            "boolean" | "bool" => Ok(AttributeType::Boolean),
            "datetime" | "date" => Ok(AttributeType::DateTime),
            "any" => Ok(AttributeType::Any),
            _ if lower.starts_with("enum(") && lower.ends_with(')') => {
                let inner = s.trim();
                let name = &inner[5..inner.len() - 1];
                Ok(AttributeType::Enum(name.trim().to_string()))
            }
            _ => Err(ModelError::InvalidDocument(format!("Unknown attribute type: {}", s))),
        }
    }
}

impl TryFrom<String> for AttributeType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeType> for String {
    fn from(ty: AttributeType) -> Self {
        ty.to_string()
    }
}

/// A typed attribute declaration
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub ty: AttributeType,
    pub identity: Arc<Identity>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
            identity: Identity::shared(),
        }
    }
}

/// A reference declaration: name, target class, optional opposite and
/// optional associated (edge) class
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub target: String,
    pub opposite: Option<String>,
    pub associated: Option<String>,
    pub identity: Arc<Identity>,
}

impl Reference {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            opposite: None,
            associated: None,
            identity: Identity::shared(),
        }
    }

    /// Name of the reverse reference declared on the target class
    pub fn with_opposite(mut self, opposite: impl Into<String>) -> Self {
        self.opposite = Some(opposite.into());
        self
    }

    /// Class of the elements carried on links of this reference
    pub fn with_associated(mut self, associated: impl Into<String>) -> Self {
        self.associated = Some(associated.into());
        self
    }

    /// Whether links of this reference are persisted under the opposite's
    /// name instead: the target class declares the opposite and its name
    /// sorts first.
    pub fn defers_to_opposite(&self, target_class: &Class) -> bool {
        match &self.opposite {
            Some(opposite) => {
                opposite.as_str() < self.name.as_str() && target_class.reference(opposite).is_some()
            }
            None => false,
        }
    }
}

/// One enum literal
#[derive(Debug, Clone)]
pub struct Literal {
    pub name: String,
    pub value: i64,
    pub identity: Arc<Identity>,
}

/// An enumeration
#[derive(Debug)]
pub struct EnumDef {
    name: String,
    identity: Arc<Identity>,
    literals: Vec<Literal>,
}

impl EnumDef {
    /// Literals get values 0, 1, 2, ... in order
    pub fn new<I, S>(name: impl Into<String>, literals: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let literals = literals
            .into_iter()
            .enumerate()
            .map(|(i, l)| (l.into(), i as i64))
            .collect::<Vec<_>>();
        Self::with_values(name, literals)
    }

    pub fn with_values(name: impl Into<String>, literals: Vec<(String, i64)>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            identity: Identity::shared(),
            literals: literals
                .into_iter()
                .map(|(name, value)| Literal {
                    name,
                    value,
                    identity: Identity::shared(),
                })
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn literal(&self, name: &str) -> Option<&Literal> {
        self.literals.iter().find(|l| l.name == name)
    }
}

/// A class of elements
#[derive(Debug)]
pub struct Class {
    name: String,
    identity: Arc<Identity>,
    super_classes: Vec<Arc<Class>>,
    attributes: IndexMap<String, Attribute>,
    references: IndexMap<String, Reference>,
}

impl Class {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            identity: None,
            super_classes: Vec::new(),
            attributes: IndexMap::new(),
            references: IndexMap::new(),
        }
    }

    /// Synthetic class for a node whose labels name no known class: one
    /// untyped attribute per property.
    pub fn bare(name: &str, properties: &PropertyMap, skip: &str) -> Arc<Self> {
        let mut keys: Vec<&String> = properties.keys().filter(|k| k.as_str() != skip).collect();
        keys.sort();
        keys.into_iter()
            .fold(Class::builder(name), |b, k| b.attribute(k.as_str(), AttributeType::Any))
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn super_classes(&self) -> &[Arc<Class>] {
        &self.super_classes
    }

    /// Attributes declared on this class only
    pub fn own_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// References declared on this class only
    pub fn own_references(&self) -> impl Iterator<Item = &Reference> {
        self.references.values()
    }

    /// This class followed by its ancestors, depth-first, each once
    fn chain(&self) -> Vec<&Class> {
        let mut chain: Vec<&Class> = vec![self];
        let mut i = 0;
        while i < chain.len() {
            let current: &Class = chain[i];
            for parent in &current.super_classes {
                if !chain.iter().any(|c| std::ptr::eq(*c, parent.as_ref())) {
                    chain.push(parent.as_ref());
                }
            }
            i += 1;
        }
        chain
    }

    /// Names of the inheritance chain
    pub fn chain_names(&self) -> Vec<&str> {
        self.chain().into_iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether `name` is this class or one of its ancestors
    pub fn is_a(&self, name: &str) -> bool {
        self.chain().iter().any(|c| c.name == name)
    }

    /// Attributes across the inheritance chain; the most specific
    /// declaration of a name wins
    pub fn all_attributes(&self) -> Vec<&Attribute> {
        let mut seen: IndexMap<&str, &Attribute> = IndexMap::new();
        for class in self.chain() {
            for attribute in class.attributes.values() {
                seen.entry(attribute.name.as_str()).or_insert(attribute);
            }
        }
        seen.into_values().collect()
    }

    /// References across the inheritance chain, with their declaring class
    pub fn all_references(&self) -> Vec<(&Class, &Reference)> {
        let mut seen: IndexMap<&str, (&Class, &Reference)> = IndexMap::new();
        for class in self.chain() {
            for reference in class.references.values() {
                seen.entry(reference.name.as_str()).or_insert((class, reference));
            }
        }
        seen.into_values().collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.chain().into_iter().find_map(|c| c.attributes.get(name))
    }

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        self.chain().into_iter().find_map(|c| c.references.get(name))
    }

    /// Class declaring the reference `name`
    pub fn reference_owner(&self, name: &str) -> Option<&Class> {
        self.chain()
            .into_iter()
            .find(|c| c.references.contains_key(name))
    }

    /// Factory: a new element of this class with a fresh identity
    pub fn new_instance(self: &Arc<Self>) -> Element {
        Element::new(self)
    }
}

/// Builder for [`Class`]
pub struct ClassBuilder {
    name: String,
    identity: Option<Arc<Identity>>,
    super_classes: Vec<Arc<Class>>,
    attributes: IndexMap<String, Attribute>,
    references: IndexMap<String, Reference>,
}

impl ClassBuilder {
    pub fn identity(mut self, identity: Arc<Identity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn super_class(mut self, parent: &Arc<Class>) -> Self {
        self.super_classes.push(Arc::clone(parent));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        let attribute = Attribute::new(name, ty);
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.references.insert(reference.name.clone(), reference);
        self
    }

    /// Finish the class. A class with a name-derived identity gets
    /// name-derived identities for its features too (`Class.feature`).
    pub fn build(mut self) -> Arc<Class> {
        let identity = self.identity.unwrap_or_else(Identity::shared);
        if identity.is_named() {
            for attribute in self.attributes.values_mut() {
                attribute.identity = Identity::named(&format!("{}.{}", self.name, attribute.name));
            }
            for reference in self.references.values_mut() {
                reference.identity = Identity::named(&format!("{}.{}", self.name, reference.name));
            }
        }
        Arc::new(Class {
            name: self.name,
            identity,
            super_classes: self.super_classes,
            attributes: self.attributes,
            references: self.references,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (Arc<Class>, Arc<Class>, Arc<Class>) {
        let named = Class::builder("Named")
            .attribute("name", AttributeType::String)
            .build();
        let person = Class::builder("Person")
            .super_class(&named)
            .attribute("age", AttributeType::Integer)
            .reference(Reference::new("knows", "Person").with_opposite("knows"))
            .build();
        let employee = Class::builder("Employee")
            .super_class(&person)
            .attribute("salary", AttributeType::Float)
            .build();
        (named, person, employee)
    }

    #[test]
    fn test_inheritance_chain_order() {
        let (_, _, employee) = hierarchy();
        assert_eq!(employee.chain_names(), vec!["Employee", "Person", "Named"]);
        assert!(employee.is_a("Named"));
        assert!(!employee.is_a("Company"));
    }

    #[test]
    fn test_diamond_chain_lists_each_class_once() {
        let root = Class::builder("Root").build();
        let left = Class::builder("Left").super_class(&root).build();
        let right = Class::builder("Right").super_class(&root).build();
        let bottom = Class::builder("Bottom").super_class(&left).super_class(&right).build();
        assert_eq!(bottom.chain_names(), vec!["Bottom", "Left", "Right", "Root"]);
    }

    #[test]
    fn test_all_attributes_and_references() {
        let (_, _, employee) = hierarchy();
        let attributes: Vec<&str> = employee.all_attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attributes, vec!["salary", "age", "name"]);

        let references = employee.all_references();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].0.name(), "Person");
        assert_eq!(employee.reference_owner("knows").map(Class::name), Some("Person"));
        assert!(employee.attribute("name").is_some());
    }

    #[test]
    fn test_attribute_type_parsing() {
        assert_eq!("string".parse::<AttributeType>().unwrap(), AttributeType::String);
        assert_eq!("Integer".parse::<AttributeType>().unwrap(), AttributeType::Integer);
        assert_eq!(
            "enum(Color)".parse::<AttributeType>().unwrap(),
            AttributeType::Enum("Color".to_string())
        );
        assert_eq!(AttributeType::Enum("Color".to_string()).to_string(), "enum(Color)");
        assert!("blob".parse::<AttributeType>().is_err());
    }

    #[test]
    fn test_attribute_type_coercion() {
        assert_eq!(
            AttributeType::Float.coerce(&PropertyValue::Integer(3)),
            Some(PropertyValue::Float(3.0))
        );
        assert_eq!(
            AttributeType::DateTime.coerce(&PropertyValue::Integer(1_000)),
            Some(PropertyValue::DateTime(1_000))
        );
        assert_eq!(AttributeType::Integer.coerce(&PropertyValue::Float(1.5)), None);
        assert_eq!(AttributeType::Boolean.coerce(&"yes".into()), None);
        assert_eq!(AttributeType::String.coerce(&PropertyValue::Null), Some(PropertyValue::Null));
    }

    #[test]
    fn test_named_class_names_its_features() {
        let build = || {
            Class::builder("Class")
                .identity(Identity::named("Class"))
                .attribute("name", AttributeType::String)
                .reference(Reference::new("superClasses", "Class"))
                .build()
        };
        let (first, second) = (build(), build());
        let name = first.attribute("name").unwrap();
        assert!(name.identity.is_named());
        assert_eq!(name.identity.uuid(), second.attribute("name").unwrap().identity.uuid());
        assert_eq!(
            first.reference("superClasses").unwrap().identity.uuid(),
            Identity::named("Class.superClasses").uuid()
        );

        let plain = Class::builder("Plain").attribute("name", AttributeType::String).build();
        assert!(!plain.attribute("name").unwrap().identity.is_named());
    }

    #[test]
    fn test_defers_to_opposite() {
        let person = Class::builder("Person")
            .reference(Reference::new("employer", "Company").with_opposite("employees"))
            .build();
        let company = Class::builder("Company")
            .reference(Reference::new("employees", "Person").with_opposite("employer"))
            .build();

        let employer = person.reference("employer").unwrap();
        let employees = company.reference("employees").unwrap();
        assert!(employer.defers_to_opposite(&company));
        assert!(!employees.defers_to_opposite(&person));

        // undeclared on the target: both directions are kept
        let bare = Class::builder("Company").build();
        assert!(!employer.defers_to_opposite(&bare));
    }

    #[test]
    fn test_bare_class() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "x".into());
        props.insert("__id__".to_string(), "u".into());
        let class = Class::bare("Ghost", &props, "__id__");
        assert_eq!(class.name(), "Ghost");
        assert_eq!(class.all_attributes().len(), 1);
        assert_eq!(class.attribute("name").unwrap().ty, AttributeType::Any);
    }

    #[test]
    fn test_enum_literals() {
        let color = EnumDef::new("Color", ["Red", "Green"]);
        assert_eq!(color.literal("Green").map(|l| l.value), Some(1));
        assert!(color.literal("Blue").is_none());
    }
}
