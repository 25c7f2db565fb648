//! Keyword-overlap scoring of free text against the catalog

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use super::catalog::TemplateCatalog;
use super::entity::Template;
use crate::domain::track::DomainTrack;
use crate::domain::validation::{fold_accents, normalize_free_text};

/// Minimum token length before the plural `s` is stripped
const STEM_MIN_LEN: usize = 4;

/// One scored template
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub template: Arc<Template>,
    /// In `[0, 1]`
    pub confidence: f64,
    /// Keywords of the template found in the text, in declaration order
    pub matched_keywords: Vec<String>,
}

/// Splits text into normalized match tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|word| {
            let token = normalize_free_text(&fold_accents(word));

            if token.chars().count() >= STEM_MIN_LEN && token.ends_with('s') {
                token[..token.len() - 1].to_string()
            } else {
                token
            }
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Pure scorer; holds only the category prior weight
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatcher {
    prior_weight: f64,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl TemplateMatcher {
    /// `prior_weight` is clamped to `[0, 1]`
    pub fn new(prior_weight: f64) -> Self {
        let prior_weight = if prior_weight.is_finite() {
            prior_weight.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self { prior_weight }
    }

    /// Scores every template, highest confidence first, ties by id
    ///
    /// Templates scoring zero are omitted.
    pub fn rank(
        &self,
        text: &str,
        catalog: &TemplateCatalog,
        active_domain: Option<DomainTrack>,
    ) -> Vec<MatchResult> {
        let tokens: HashSet<String> = tokenize(text).into_iter().collect();

        let mut results: Vec<MatchResult> = catalog
            .iter()
            .filter_map(|template| self.score(template, &tokens, active_domain))
            .collect();

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.template.id.cmp(&b.template.id))
        });

        results
    }

    fn score(
        &self,
        template: &Arc<Template>,
        tokens: &HashSet<String>,
        active_domain: Option<DomainTrack>,
    ) -> Option<MatchResult> {
        let mut seen = HashSet::new();
        let mut total = 0usize;
        let mut matched_keywords = Vec::new();

        for keyword in &template.keywords {
            let parts = tokenize(keyword);

            if parts.is_empty() || !seen.insert(parts.clone()) {
                continue;
            }

            total += 1;

            if parts.iter().all(|part| tokens.contains(part)) {
                matched_keywords.push(keyword.clone());
            }
        }

        if total == 0 {
            return None;
        }

        let overlap = matched_keywords.len() as f64 / total as f64;

        let confidence = match active_domain {
            Some(domain) => {
                let base = (1.0 - self.prior_weight) * overlap;

                if template.category.eq_ignore_ascii_case(domain.as_str()) {
                    base + self.prior_weight
                } else {
                    base
                }
            }
            None => overlap,
        };

        (confidence > 0.0).then(|| MatchResult {
            template: Arc::clone(template),
            confidence: confidence.min(1.0),
            matched_keywords,
        })
    }
}
