//! Stable, serializable actor addresses.

// Layer 1: Standard library imports
use std::fmt;
use std::str::FromStr;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal crate imports
use crate::util::ActorId;

/// Identifies an actor uniquely within a running system: the owning
/// system's name plus a 64-bit actor id, unique for the life of the
/// process.
///
/// The external string form is `"<system>:<actor-id>"`, used
/// for logging, persisted records, and dead-letter display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    system: String,
    id: ActorId,
}

impl Address {
    pub fn new(system: impl Into<String>, id: ActorId) -> Self {
        Self {
            system: system.into(),
            id,
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Sentinel address for a persisted record whose `actor_address`
    /// field was absent from the source JSON. Never assigned to a real
    /// actor: `ActorIdGenerator` starts at 1.
    pub fn unknown() -> Self {
        Self::new("unknown", ActorId(0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.id)
    }
}

/// Error returned when an address string does not match `"<system>:<id>"`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid address string: {0:?}")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (system, id_str) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if system.is_empty() {
            return Err(AddressParseError(s.to_string()));
        }
        let id = id_str
            .parse::<u64>()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address::new(system, ActorId(id)))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
