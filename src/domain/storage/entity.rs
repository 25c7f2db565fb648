//! Storage entity traits and types

use std::fmt::{self, Debug};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;
}

/// Plain string key for bookkeeping records (cursors, idempotency markers)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Joins parts with `:`, e.g. `audit:evt-1`
    pub fn composite(parts: &[&str]) -> Self {
        Self(parts.join(":"))
    }
}

impl StorageKey for RecordKey {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct TestEntity {
        id: RecordKey,
        name: String,
    }

    impl StorageEntity for TestEntity {
        type Key = RecordKey;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    #[test]
    fn test_record_key_as_str() {
        let key = RecordKey::new("cursor-1");
        assert_eq!(key.as_str(), "cursor-1");
    }

    #[test]
    fn test_record_key_composite() {
        let key = RecordKey::composite(&["audit", "evt-1"]);
        assert_eq!(key.as_str(), "audit:evt-1");
        assert_eq!(key.to_string(), "audit:evt-1");
    }

    #[test]
    fn test_storage_entity_key() {
        let entity = TestEntity {
            id: RecordKey::new("entity-1"),
            name: "Test".to_string(),
        };
        assert_eq!(entity.key().as_str(), "entity-1");
    }

    #[test]
    fn test_record_key_serializes_transparently() {
        let json = serde_json::to_string(&RecordKey::new("k")).unwrap();
        assert_eq!(json, "\"k\"");
    }
}
