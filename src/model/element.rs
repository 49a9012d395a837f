//! Model elements
//!
//! An [`Element`] is a shared handle: cloning it yields another handle to the
//! same instance, and equality/hashing are by instance, not by value. Links
//! between elements are strong handles, so the object graph lives as long
//! as any element of it is reachable.

use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::class::{Class, Reference};
use super::error::{ModelError, ModelResult};
use super::identity::Identity;
use crate::graph::PropertyValue;

/// One entry of a reference: the target and, optionally, the element
/// carrying the link's own data
#[derive(Debug, Clone)]
pub struct Link {
    pub target: Element,
    pub associated: Option<Element>,
}

#[derive(Default)]
struct Slots {
    attributes: IndexMap<String, PropertyValue>,
    references: IndexMap<String, Vec<Link>>,
}

struct ElementInner {
    class: Arc<Class>,
    identity: RwLock<Arc<Identity>>,
    slots: RwLock<Slots>,
}

/// An instance of a [`Class`]
#[derive(Clone)]
pub struct Element(Arc<ElementInner>);

impl Element {
    pub fn new(class: &Arc<Class>) -> Self {
        Self::with_identity(class, Identity::shared())
    }

    pub fn with_identity(class: &Arc<Class>, identity: Arc<Identity>) -> Self {
        Element(Arc::new(ElementInner {
            class: Arc::clone(class),
            identity: RwLock::new(identity),
            slots: RwLock::new(Slots::default()),
        }))
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.0.class
    }

    pub fn identity(&self) -> Arc<Identity> {
        self.0.identity.read().unwrap().clone()
    }

    pub fn uuid(&self) -> Uuid {
        self.0.identity.read().unwrap().uuid()
    }

    /// Give this element a fresh identity of its own, leaving the one it
    /// shared untouched. Returns the new UUID.
    pub(crate) fn detach_identity(&self) -> Uuid {
        let fresh = Identity::shared();
        let uuid = fresh.uuid();
        *self.0.identity.write().unwrap() = fresh;
        uuid
    }

    /// Current value of an attribute, if set
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.0.slots.read().unwrap().attributes.get(name).cloned()
    }

    /// Set an attribute declared anywhere in the class's inheritance chain.
    /// The value is coerced to the declared type; `Null` unsets it.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) -> ModelResult<()> {
        let value = value.into();
        let attribute = self
            .0
            .class
            .attribute(name)
            .ok_or_else(|| ModelError::UnknownAttribute {
                class: self.0.class.name().to_string(),
                attribute: name.to_string(),
            })?;
        let coerced = attribute.ty.coerce(&value).ok_or_else(|| ModelError::TypeMismatch {
            name: format!("{}.{}", self.0.class.name(), name),
            expected: attribute.ty.to_string(),
            found: value.type_name().to_string(),
        })?;

        let mut slots = self.0.slots.write().unwrap();
        if coerced.is_null() {
            slots.attributes.shift_remove(name);
        } else {
            slots.attributes.insert(name.to_string(), coerced);
        }
        Ok(())
    }

    /// Attributes currently set, in assignment order
    pub fn attributes(&self) -> IndexMap<String, PropertyValue> {
        self.0.slots.read().unwrap().attributes.clone()
    }

    /// Links of the reference `name`, in insertion order
    pub fn links(&self, name: &str) -> Vec<Link> {
        self.0
            .slots
            .read()
            .unwrap()
            .references
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Targets of the reference `name`
    pub fn targets(&self, name: &str) -> Vec<Element> {
        self.links(name).into_iter().map(|l| l.target).collect()
    }

    /// All non-empty references
    pub fn references(&self) -> IndexMap<String, Vec<Link>> {
        self.0.slots.read().unwrap().references.clone()
    }

    /// Add a link through the reference `name`.
    ///
    /// The target must conform to the reference's target class and the
    /// associated element to its associated class. When the target's class
    /// declares the opposite reference, the reverse link is added too.
    pub fn add_reference(
        &self,
        name: &str,
        target: &Element,
        associated: Option<&Element>,
    ) -> ModelResult<()> {
        self.link(name, target, associated).map(|_| ())
    }

    /// [`add_reference`](Self::add_reference), returning the name of the
    /// opposite reference when the reverse link was added on `target`
    pub(crate) fn link(
        &self,
        name: &str,
        target: &Element,
        associated: Option<&Element>,
    ) -> ModelResult<Option<String>> {
        let reference = self
            .0
            .class
            .reference(name)
            .ok_or_else(|| ModelError::UnknownReference {
                class: self.0.class.name().to_string(),
                reference: name.to_string(),
            })?
            .clone();

        if !target.class().is_a(&reference.target) {
            return Err(ModelError::TypeMismatch {
                name: format!("{}.{}", self.0.class.name(), name),
                expected: reference.target.clone(),
                found: target.class().name().to_string(),
            });
        }
        if let Some(associated) = associated {
            let conforms = reference
                .associated
                .as_deref()
                .is_some_and(|a| associated.class().is_a(a));
            if !conforms {
                return Err(ModelError::TypeMismatch {
                    name: format!("{}.{} (associated)", self.0.class.name(), name),
                    expected: reference.associated.clone().unwrap_or_else(|| "none".to_string()),
                    found: associated.class().name().to_string(),
                });
            }
        }

        self.push_link(name, target, associated);

        if let Some(opposite) = reference.opposite {
            let mirrored = opposite == name && target == self;
            if !mirrored && target.class().reference(&opposite).is_some() {
                target.push_link(&opposite, self, associated);
                return Ok(Some(opposite));
            }
        }
        Ok(None)
    }

    pub(crate) fn push_link(&self, name: &str, target: &Element, associated: Option<&Element>) {
        self.0
            .slots
            .write()
            .unwrap()
            .references
            .entry(name.to_string())
            .or_default()
            .push(Link {
                target: target.clone(),
                associated: associated.cloned(),
            });
    }
}

/// The `(source, reference name, target)` under which the link
/// `source -> target` through `reference` is persisted, and whether that
/// flips the link around.
///
/// Both halves of an opposite pair map to the same triple: the reference
/// whose name sorts first, or for a self-opposite reference the endpoint
/// with the smaller UUID as source.
pub(crate) fn persisted_direction(
    reference: &Reference,
    source: &Element,
    target: &Element,
) -> (Element, String, Element, bool) {
    let flipped = match &reference.opposite {
        Some(opposite) if opposite == &reference.name => {
            target.class().reference(opposite).is_some() && target.uuid() < source.uuid()
        }
        Some(_) => reference.defers_to_opposite(target.class()),
        None => false,
    };
    match (&reference.opposite, flipped) {
        (Some(opposite), true) => (target.clone(), opposite.clone(), source.clone(), true),
        _ => (source.clone(), reference.name.clone(), target.clone(), false),
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("class", &self.0.class.name())
            .field("uuid", &self.uuid())
            .field("attributes", &self.attributes())
            .finish()
    }
}
