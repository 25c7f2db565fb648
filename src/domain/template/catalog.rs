//! In-memory template index

use std::collections::BTreeMap;
use std::sync::Arc;

use super::entity::Template;
use crate::domain::DomainError;

/// Read-mostly catalog of templates keyed by id
///
/// Built once at startup and shared behind an `Arc`; iteration order is
/// the lexicographic id order.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, rejecting invalid or duplicate templates
    pub fn from_templates(
        templates: impl IntoIterator<Item = Template>,
    ) -> Result<Self, DomainError> {
        let mut catalog = Self::new();

        for template in templates {
            catalog.insert(template)?;
        }

        Ok(catalog)
    }

    pub fn insert(&mut self, template: Template) -> Result<(), DomainError> {
        template.validate()?;

        if self.templates.contains_key(&template.id) {
            return Err(DomainError::conflict(format!(
                "Template '{}' already exists",
                template.id
            )));
        }

        self.templates
            .insert(template.id.clone(), Arc::new(template));
        Ok(())
    }

    /// Inserts or replaces, used when a directory template overrides a built-in one
    pub fn upsert(&mut self, template: Template) -> Result<bool, DomainError> {
        template.validate()?;

        Ok(self
            .templates
            .insert(template.id.clone(), Arc::new(template))
            .is_some())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Template>> {
        self.templates.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str) -> Template {
        Template::new(id, format!("Template {}", id), "sales").with_keywords(["lead"])
    }

    #[test]
    fn test_insert_and_get() {
        let catalog =
            TemplateCatalog::from_templates(vec![template("b"), template("a")]).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("a").is_some());
        assert!(catalog.get("c").is_none());

        let ids: Vec<_> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = TemplateCatalog::from_templates(vec![template("a"), template("a")]);
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[test]
    fn test_upsert_replaces() {
        let mut catalog = TemplateCatalog::from_templates(vec![template("a")]).unwrap();

        let replaced = catalog
            .upsert(template("a").with_description("override"))
            .unwrap();

        assert!(replaced);
        assert_eq!(catalog.get("a").unwrap().description, "override");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut catalog = TemplateCatalog::new();
        assert!(catalog.insert(Template::new("", "x", "sales")).is_err());
        assert!(catalog.is_empty());
    }
}
