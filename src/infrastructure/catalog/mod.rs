//! Template catalog loading

mod defaults;
mod loader;

pub use defaults::default_templates;
pub use loader::{CatalogConfig, CatalogLoader};
