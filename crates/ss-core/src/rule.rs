//! Declarative rule model.
//!
//! These types are what the options UI authors and the settings store
//! persists. They are plain data: compilation into executable matchers
//! happens in `compile`, and nothing here is mutated once loaded.

use serde::{Deserialize, Serialize};

// =============================================================================
// Rules
// =============================================================================

/// A single find/replace rule.
///
/// `enabled` is deliberately not a field: a rule is suppressed by listing its
/// id in the settings' disabled-id set, so it can be toggled without being
/// deleted from its bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Stable unique key.
    pub id: String,
    /// Literal text or regex pattern source, depending on `is_regex`.
    pub find: String,
    /// Replacement text, or a substitution template with `$n` capture
    /// references when `is_regex` is set.
    pub replace: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default)]
    pub is_case_sensitive: bool,
    /// Require word boundaries around literal matches. Ignored for regex
    /// rules, which express boundaries themselves.
    #[serde(default)]
    pub is_whole_word: bool,
    /// Optional inline style for the generated replacement span.
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub domain_filter: DomainFilter,
}

impl Rule {
    /// Convenience constructor for literal rules; used by the built-in
    /// fallback set and throughout the tests.
    pub fn literal(id: &str, find: &str, replace: &str) -> Self {
        Self {
            id: id.to_string(),
            find: find.to_string(),
            replace: replace.to_string(),
            is_regex: false,
            is_case_sensitive: false,
            is_whole_word: false,
            css: None,
            domain_filter: DomainFilter::default(),
        }
    }
}

// =============================================================================
// Domain filters
// =============================================================================

/// How a filter's pattern list is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Use the global filter instead (mode and patterns both).
    #[default]
    Inherit,
    /// No host filtering; the rule is active everywhere.
    Disabled,
    /// Active only on hosts matching some pattern.
    Whitelist,
    /// Active everywhere except hosts matching some pattern.
    Blacklist,
}

/// Host allow/deny list attached to a rule or to the global settings.
///
/// Each pattern is either a literal hostname or, when wrapped in slashes
/// (`/…/`), a regex over the full hostname.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFilter {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl DomainFilter {
    pub fn new(mode: FilterMode, patterns: &[&str]) -> Self {
        Self {
            mode,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

// =============================================================================
// Bundles
// =============================================================================

/// Where a bundle came from. Only `User` bundles are mutable by the
/// rule-authoring UI; the other two are read-only templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleSource {
    Hardcoded,
    Preloaded,
    User,
}

/// A named, ordered collection of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    pub name: String,
    pub source: BundleSource,
    /// Premium bundle; usable as the active bundle only when licensed.
    #[serde(default)]
    pub requires_license: bool,
    /// Fallback bundle when the active one is unavailable. At most one
    /// bundle in a catalog sets this.
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Bundle {
    /// Whether the rule-authoring UI may edit this bundle in place.
    pub fn is_mutable(&self) -> bool {
        self.source == BundleSource::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults_from_sparse_json() {
        let rule: Rule = serde_json::from_str(
            r#"{"id":"r1","find":"teh","replace":"the"}"#,
        )
        .unwrap();
        assert!(!rule.is_regex);
        assert!(!rule.is_case_sensitive);
        assert!(!rule.is_whole_word);
        assert_eq!(rule.css, None);
        assert_eq!(rule.domain_filter.mode, FilterMode::Inherit);
        assert!(rule.domain_filter.patterns.is_empty());
    }

    #[test]
    fn test_filter_mode_wire_names() {
        let filter: DomainFilter = serde_json::from_str(
            r#"{"mode":"blacklist","patterns":["example.com","/^news\\./"]}"#,
        )
        .unwrap();
        assert_eq!(filter.mode, FilterMode::Blacklist);
        assert_eq!(filter.patterns.len(), 2);
    }

    #[test]
    fn test_only_user_bundles_are_mutable() {
        let mut bundle: Bundle = serde_json::from_str(
            r#"{"id":"b1","name":"Mine","source":"user"}"#,
        )
        .unwrap();
        assert!(bundle.is_mutable());

        bundle.source = BundleSource::Preloaded;
        assert!(!bundle.is_mutable());
        bundle.source = BundleSource::Hardcoded;
        assert!(!bundle.is_mutable());
    }
}
