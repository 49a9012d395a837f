//! Identifier and tag types shared by the store clients

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric id assigned by a store, shown as `Kind(n)`
macro_rules! store_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                $name(id)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

/// Name taken verbatim from the model and used as-is in the store
macro_rules! store_name {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                $name(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                $name(name)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                $name(name.to_string())
            }
        }
    };
}

store_id! {
    /// Store-assigned identifier of a persisted node
    ///
    /// Only meaningful for the store that produced it; elements are matched
    /// across stores by their stable identity instead.
    NodeId
}

store_id! {
    /// Store-assigned identifier of a persisted relationship
    EdgeId
}

store_name! {
    /// Node label. Saved elements carry one label per class of their
    /// inheritance chain plus the connector's marker label.
    Label
}

store_name! {
    /// Relationship type; one per model reference name
    EdgeType
}
