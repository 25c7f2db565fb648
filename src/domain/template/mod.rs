//! Automation templates, the catalog and the intent matcher

mod catalog;
mod entity;
mod matcher;

pub use catalog::TemplateCatalog;
pub use entity::{Template, MAX_TEMPLATE_ID_LENGTH, RESERVED_INPUT_NAMES};
pub use matcher::{tokenize, MatchResult, TemplateMatcher};
