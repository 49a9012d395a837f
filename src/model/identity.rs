//! Stable element identity

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Namespace for name-derived identities of built-in classes
const MODELGRAPH_NAMESPACE: Uuid = Uuid::from_u128(0x6d6f_6465_6c67_7261_7068_0000_0000_0001);

#[derive(Debug)]
struct IdentityState {
    uuid: Uuid,
    stored_in: BTreeSet<String>,
}

/// UUID plus the addresses of the stores holding a persisted copy.
///
/// Always handled as `Arc<Identity>`: a reified meta-element shares the
/// identity of the class, enum or model it was built from, so reassigning
/// the UUID on one side is visible on the other.
#[derive(Debug)]
pub struct Identity {
    state: RwLock<IdentityState>,
    derived: bool,
}

impl Identity {
    fn from_uuid(uuid: Uuid) -> Self {
        Self {
            state: RwLock::new(IdentityState {
                uuid,
                stored_in: BTreeSet::new(),
            }),
            derived: false,
        }
    }

    /// Fresh random identity
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::from_uuid(Uuid::new_v4()))
    }

    pub fn with_uuid(uuid: Uuid) -> Arc<Self> {
        Arc::new(Self::from_uuid(uuid))
    }

    /// Deterministic identity derived from `name` (UUID v5)
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            derived: true,
            ..Self::from_uuid(Uuid::new_v5(&MODELGRAPH_NAMESPACE, name.as_bytes()))
        })
    }

    /// Whether the UUID is derived from a name. Such identities are the same
    /// in every process and are never reassigned.
    pub fn is_named(&self) -> bool {
        self.derived
    }

    pub fn uuid(&self) -> Uuid {
        self.state.read().unwrap().uuid
    }

    /// Replace the UUID. The identity is no longer considered stored anywhere.
    pub fn set_uuid(&self, uuid: Uuid) {
        let mut state = self.state.write().unwrap();
        state.uuid = uuid;
        state.stored_in.clear();
    }

    /// Assign a fresh random UUID and return it
    pub fn regenerate(&self) -> Uuid {
        let uuid = Uuid::new_v4();
        self.set_uuid(uuid);
        uuid
    }

    /// Store addresses holding this identity
    pub fn stored_in(&self) -> Vec<String> {
        self.state.read().unwrap().stored_in.iter().cloned().collect()
    }

    pub fn is_stored_in(&self, address: &str) -> bool {
        self.state.read().unwrap().stored_in.contains(address)
    }

    pub fn mark_stored(&self, address: &str) {
        self.state
            .write()
            .unwrap()
            .stored_in
            .insert(address.to_string());
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid())
    }
}
