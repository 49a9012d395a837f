//! Object model
//!
//! Typed elements with inheritance, multi-valued references and associated
//! link data:
//!
//! - [`Class`] / [`Attribute`] / [`Reference`] / [`EnumDef`]: schema
//! - [`Element`]: instances, shared handles with interior mutability
//! - [`Model`]: named element collections, optionally over a meta-model
//! - [`Identity`]: UUID plus stored-in marker, shared between a meta-object
//!   and its reified element
//! - [`document`]: JSON interchange format

pub mod class;
pub mod container;
pub mod document;
pub mod element;
pub mod error;
pub mod identity;

pub use class::{Attribute, AttributeType, Class, ClassBuilder, EnumDef, Literal, Reference};
pub use container::Model;
pub use document::{MetaModelDocument, ModelDocument};
pub use element::{Element, Link};
pub use error::{ModelError, ModelResult};
pub use identity::Identity;
