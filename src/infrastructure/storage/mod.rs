//! Storage backends

mod factory;
mod in_memory;
mod postgres;

pub use factory::{tables, StorageBackend, StorageConfig, StorageType};
pub use in_memory::InMemoryStorage;
pub use postgres::{PostgresConfig, PostgresStorage};
