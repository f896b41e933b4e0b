//! Bundle selection cascade and applicable-rule-set assembly.
//!
//! A licensing or storage failure must never silently disable all
//! replacement: the cascade always ends at a hardcoded built-in rule set,
//! so the extension keeps its default behavior even when the catalog is
//! missing or corrupt.

use crate::compile::{compile, CompiledRule};
use crate::rule::{Bundle, Rule};
use crate::settings::Settings;

/// The ordered set of compiled rules eligible for the current page.
///
/// Recomputed (never patched) on every pass; no component keeps a long-lived
/// reference to one across passes.
#[derive(Debug, Clone, Default)]
pub struct ApplicableRuleSet {
    pub rules: Vec<CompiledRule>,
}

impl ApplicableRuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Pick the working rule list from the bundle catalog. First match wins:
/// licensed users get the active bundle unconditionally; unlicensed users
/// get it only if it is free, else the default bundle, else the built-in
/// fallback.
pub fn select_rules(bundles: &[Bundle], active_bundle_id: &str, licensed: bool) -> Vec<Rule> {
    let active = bundles.iter().find(|b| b.id == active_bundle_id);

    if licensed {
        return active.map(|b| b.rules.clone()).unwrap_or_default();
    }

    if let Some(bundle) = active {
        if !bundle.requires_license {
            return bundle.rules.clone();
        }
    }

    if let Some(bundle) = bundles.iter().find(|b| b.is_default) {
        return bundle.rules.clone();
    }

    fallback_rules()
}

/// Built-in last-resort rules, compiled into the binary so total storage
/// failure still leaves the extension doing something visible.
pub fn fallback_rules() -> Vec<Rule> {
    let mut teh = Rule::literal("builtin:teh", "teh", "the");
    teh.is_whole_word = true;
    let mut recieve = Rule::literal("builtin:recieve", "recieve", "receive");
    recieve.is_whole_word = true;
    vec![teh, recieve]
}

/// Produce the applicable rule set for one page from a settings snapshot.
///
/// Order is preserved from the selected bundle, which fixes the
/// substitution order inside each text node.
pub fn build_applicable_rules(settings: &Settings, host: &str) -> ApplicableRuleSet {
    if !settings.enabled {
        return ApplicableRuleSet::default();
    }

    let selected = select_rules(&settings.bundles, &settings.active_bundle_id, settings.licensed);

    let rules: Vec<CompiledRule> = selected
        .iter()
        .filter(|rule| !settings.disabled_rule_ids.contains(&rule.id))
        .filter_map(|rule| compile(rule, &settings.global_domain_filter))
        .filter(|compiled| compiled.host_filter.allows(host))
        .collect();

    log::debug!("{} of {} selected rules applicable on {host}", rules.len(), selected.len());

    ApplicableRuleSet { rules }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BundleSource, DomainFilter, FilterMode};

    fn bundle(id: &str, requires_license: bool, is_default: bool, rules: Vec<Rule>) -> Bundle {
        Bundle {
            id: id.to_string(),
            name: id.to_string(),
            source: BundleSource::Preloaded,
            requires_license,
            is_default,
            rules,
        }
    }

    fn catalog() -> Vec<Bundle> {
        vec![
            bundle("premium", true, false, vec![Rule::literal("p1", "alpha", "beta")]),
            bundle("free", false, true, vec![Rule::literal("f1", "gamma", "delta")]),
        ]
    }

    #[test]
    fn test_licensed_gets_active_bundle() {
        let rules = select_rules(&catalog(), "premium", true);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "p1");
    }

    #[test]
    fn test_licensed_with_missing_bundle_gets_nothing() {
        assert!(select_rules(&catalog(), "gone", true).is_empty());
    }

    #[test]
    fn test_license_downgrade_falls_back_to_default_bundle() {
        // Active bundle needs a license the user no longer has.
        let rules = select_rules(&catalog(), "premium", false);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "f1");
    }

    #[test]
    fn test_unlicensed_keeps_free_active_bundle() {
        let rules = select_rules(&catalog(), "free", false);
        assert_eq!(rules[0].id, "f1");
    }

    #[test]
    fn test_empty_catalog_yields_builtin_fallback() {
        let rules = select_rules(&[], "anything", false);
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r.id.starts_with("builtin:")));
    }

    #[test]
    fn test_disabled_master_switch_empties_the_set() {
        let mut settings = Settings::default();
        settings.bundles = catalog();
        settings.active_bundle_id = "free".to_string();
        settings.enabled = false;
        assert!(build_applicable_rules(&settings, "example.com").is_empty());
    }

    #[test]
    fn test_disabled_rule_ids_suppress_without_deleting() {
        let mut settings = Settings::default();
        settings.bundles = catalog();
        settings.active_bundle_id = "free".to_string();
        settings.disabled_rule_ids.insert("f1".to_string());
        assert!(build_applicable_rules(&settings, "example.com").is_empty());

        settings.disabled_rule_ids.clear();
        assert_eq!(build_applicable_rules(&settings, "example.com").len(), 1);
    }

    #[test]
    fn test_global_blacklist_applies_through_inherit() {
        let mut settings = Settings::default();
        settings.bundles = catalog();
        settings.active_bundle_id = "free".to_string();
        settings.global_domain_filter =
            DomainFilter::new(FilterMode::Blacklist, &["example.com"]);

        assert!(build_applicable_rules(&settings, "example.com").is_empty());
        assert_eq!(build_applicable_rules(&settings, "example.org").len(), 1);
    }
}
