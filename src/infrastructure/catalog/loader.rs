use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use super::defaults::default_templates;
use crate::domain::template::{Template, TemplateCatalog};
use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `.json` and `.toml` template files
    pub templates_dir: Option<PathBuf>,
    pub include_builtin: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            include_builtin: true,
        }
    }
}

/// Builds the catalog from built-in templates and an optional directory
///
/// Directory templates replace built-in ones with the same id. A file that
/// fails to parse or validate is logged and skipped.
#[derive(Debug)]
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn load(config: &CatalogConfig) -> Result<TemplateCatalog, DomainError> {
        let mut catalog = if config.include_builtin {
            TemplateCatalog::from_templates(default_templates())?
        } else {
            TemplateCatalog::new()
        };

        if let Some(dir) = &config.templates_dir {
            Self::load_dir(dir, &mut catalog)?;
        }

        if catalog.is_empty() {
            return Err(DomainError::configuration("Template catalog is empty"));
        }

        info!(templates = catalog.len(), "Template catalog loaded");
        Ok(catalog)
    }

    fn load_dir(dir: &Path, catalog: &mut TemplateCatalog) -> Result<(), DomainError> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Templates directory not found");
            return Ok(());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| {
                DomainError::configuration(format!(
                    "Failed to read templates directory {}: {}",
                    dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| matches!(extension(path), Some("json" | "toml")))
            .collect();

        paths.sort();

        for path in paths {
            match Self::parse_file(&path).and_then(|template| catalog.upsert(template)) {
                Ok(true) => info!(file = %path.display(), "Template overrides built-in"),
                Ok(false) => info!(file = %path.display(), "Template loaded"),
                Err(e) => error!(file = %path.display(), error = %e, "Failed to load template"),
            }
        }

        Ok(())
    }

    pub fn parse_file(path: &Path) -> Result<Template, DomainError> {
        let content = fs::read_to_string(path)
            .map_err(|e| DomainError::configuration(format!("Failed to read file: {}", e)))?;

        match extension(path) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| DomainError::validation(format!("Invalid template JSON: {}", e))),
            Some("toml") => toml::from_str(&content)
                .map_err(|e| DomainError::validation(format!("Invalid template TOML: {}", e))),
            _ => Err(DomainError::validation(format!(
                "Unsupported template file {}",
                path.display()
            ))),
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("catalog-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        fn write(&self, name: &str, content: &str) {
            fs::write(self.0.join(name), content).unwrap();
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    const JSON_TEMPLATE: &str = r#"{
        "id": "finance-payment-tracker",
        "name": "Custom Payment Tracker",
        "category": "finance",
        "keywords": ["payment", "ccp"],
        "required_inputs": [{"name": "account_number", "label": "Account", "type": "text"}],
        "execution_graph": {"nodes": []},
        "estimated_cost": 99.0,
        "estimated_duration_seconds": 10
    }"#;

    const TOML_TEMPLATE: &str = r#"
id = "hr-leave-tracker"
name = "Leave Tracker"
category = "general"
keywords = ["leave", "conge"]
estimated_cost = 40.0
estimated_duration_seconds = 20

[execution_graph]
nodes = []

[[required_inputs]]
name = "wilaya"
label = "Wilaya"
type = "region_code"
"#;

    #[test]
    fn test_builtin_only() {
        let catalog = CatalogLoader::load(&CatalogConfig::default()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_directory_overrides_and_extends() {
        let dir = TempDir::new();
        dir.write("finance.json", JSON_TEMPLATE);
        dir.write("leave.toml", TOML_TEMPLATE);
        dir.write("notes.txt", "ignored");

        let catalog = CatalogLoader::load(&CatalogConfig {
            templates_dir: Some(dir.0.clone()),
            include_builtin: true,
        })
        .unwrap();

        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.get("finance-payment-tracker").unwrap().name,
            "Custom Payment Tracker"
        );
        assert_eq!(catalog.get("hr-leave-tracker").unwrap().version, "1.0.0");
    }

    #[test]
    fn test_invalid_file_skipped() {
        let dir = TempDir::new();
        dir.write("broken.json", "{not json");
        dir.write("leave.toml", TOML_TEMPLATE);

        let catalog = CatalogLoader::load(&CatalogConfig {
            templates_dir: Some(dir.0.clone()),
            include_builtin: false,
        })
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("hr-leave-tracker").is_some());
    }

    #[test]
    fn test_empty_catalog_is_error() {
        let result = CatalogLoader::load(&CatalogConfig {
            templates_dir: Some(PathBuf::from("/nonexistent/templates")),
            include_builtin: false,
        });

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
