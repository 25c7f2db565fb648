//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe in-memory document store
///
/// Used for development, tests and single-process deployments. Data is
/// lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Creates storage pre-populated with entities
    pub fn with_entities(entities: Vec<E>) -> Self {
        let map = entities
            .into_iter()
            .map(|entity| (entity.key().as_str().to_string(), entity))
            .collect();

        Self {
            entities: RwLock::new(map),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry,
    // so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, E>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, E>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        Ok(self.read().get(key.as_str()).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        Ok(self.read().values().cloned().collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write();

        if entities.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write();

        match entities.get_mut(&key) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            ))),
        }
    }

    /// Single write lock, so concurrent saves of one key never race
    async fn save(&self, entity: E) -> Result<E, DomainError> {
        self.write()
            .insert(entity.key().as_str().to_string(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.write().remove(key.as_str()).is_some())
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.read().contains_key(key.as_str()))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::RecordKey;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: RecordKey,
        body: String,
    }

    impl StorageEntity for Note {
        type Key = RecordKey;

        fn key(&self) -> &Self::Key {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: RecordKey::new(id),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let storage = InMemoryStorage::new();
        storage.create(note("1", "first")).await.unwrap();

        let stored = storage.get(&RecordKey::new("1")).await.unwrap();
        assert_eq!(stored, Some(note("1", "first")));
        assert!(storage.get(&RecordKey::new("2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let storage = InMemoryStorage::with_entities(vec![note("1", "first")]);

        let result = storage.create(note("1", "again")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_requires_existing() {
        let storage = InMemoryStorage::new();

        let result = storage.update(note("1", "missing")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));

        storage.create(note("1", "first")).await.unwrap();
        storage.update(note("1", "second")).await.unwrap();

        let stored = storage.get(&RecordKey::new("1")).await.unwrap().unwrap();
        assert_eq!(stored.body, "second");
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let storage = InMemoryStorage::new();

        storage.save(note("1", "first")).await.unwrap();
        storage.save(note("1", "second")).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 1);
        assert_eq!(
            storage.get(&RecordKey::new("1")).await.unwrap().unwrap().body,
            "second"
        );
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let storage = InMemoryStorage::with_entities(vec![note("1", "a"), note("2", "b")]);

        assert!(storage.delete(&RecordKey::new("1")).await.unwrap());
        assert!(!storage.delete(&RecordKey::new("1")).await.unwrap());
        assert!(!storage.exists(&RecordKey::new("1")).await.unwrap());
        assert!(storage.exists(&RecordKey::new("2")).await.unwrap());
        assert_eq!(storage.list().await.unwrap().len(), 1);
    }
}
