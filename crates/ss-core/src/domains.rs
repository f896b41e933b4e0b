//! Host filter compilation and evaluation.
//!
//! A [`DomainFilter`](crate::rule::DomainFilter) is declarative; this module
//! compiles it into a [`HostFilter`] whose patterns are pre-parsed, then
//! answers "is this rule active on this host" without reparsing per node.

use regex::RegexBuilder;

use crate::rule::{DomainFilter, FilterMode};

/// One compiled pattern from a filter's list.
#[derive(Debug, Clone)]
enum HostPattern {
    /// ASCII-case-insensitive exact hostname match.
    Literal(String),
    /// `/…/`-delimited pattern, matched anywhere in the full hostname.
    Pattern(regex::Regex),
    /// A `/…/` form that failed to parse. Kept so list emptiness is
    /// preserved: an invalid pattern matches nothing, it does not vanish.
    Invalid,
}

impl HostPattern {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Literal(name) => name.eq_ignore_ascii_case(host),
            HostPattern::Pattern(re) => re.is_match(host),
            HostPattern::Invalid => false,
        }
    }
}

/// Compiled, effective host filter for one rule (post `inherit` resolution).
#[derive(Debug, Clone)]
pub struct HostFilter {
    mode: FilterMode,
    patterns: Vec<HostPattern>,
}

impl HostFilter {
    /// Compile a declarative filter. Invalid regex-form patterns are logged
    /// once here and thereafter match nothing; filtering degrades
    /// gracefully instead of failing the rule.
    pub fn compile(filter: &DomainFilter) -> Self {
        let patterns = filter
            .patterns
            .iter()
            .map(|raw| compile_pattern(raw))
            .collect();
        Self {
            mode: filter.mode,
            patterns,
        }
    }

    /// Whether a rule carrying this filter is active on `host`.
    pub fn allows(&self, host: &str) -> bool {
        // `Inherit` only reaches this layer through corrupt storage (it is
        // resolved against the global filter at compile time); treat it
        // like no filtering rather than disabling the rule.
        if matches!(self.mode, FilterMode::Disabled | FilterMode::Inherit) {
            return true;
        }
        if self.patterns.is_empty() {
            return true;
        }

        let matched = self.patterns.iter().any(|p| p.matches(host));
        match self.mode {
            FilterMode::Whitelist => matched,
            FilterMode::Blacklist => !matched,
            FilterMode::Disabled | FilterMode::Inherit => true,
        }
    }
}

fn compile_pattern(raw: &str) -> HostPattern {
    if let Some(source) = regex_form(raw) {
        match RegexBuilder::new(source).case_insensitive(true).build() {
            Ok(re) => HostPattern::Pattern(re),
            Err(e) => {
                log::warn!("ignoring invalid host pattern {raw:?}: {e}");
                HostPattern::Invalid
            }
        }
    } else {
        HostPattern::Literal(raw.trim().to_ascii_lowercase())
    }
}

/// Strip the `/…/` delimiters if present. A bare `/` is not a regex form.
fn regex_form(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('/') && trimmed.ends_with('/') {
        Some(&trimmed[1..trimmed.len() - 1])
    } else {
        None
    }
}
