//! Rule compiler: declarative rule -> executable matcher.
//!
//! Compiled rules are rebuilt from scratch whenever settings change and are
//! never mutated in place. The `regex::Regex` matcher is stateless; scan
//! position is an explicit cursor owned by the substitution engine, not
//! hidden matcher state.

use regex::{Regex, RegexBuilder};

use crate::domains::HostFilter;
use crate::rule::{DomainFilter, FilterMode, Rule};

/// A rule ready for matching on a page: the declarative rule, its compiled
/// matcher, and its effective (post-`inherit`) host filter.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub matcher: Regex,
    pub host_filter: HostFilter,
}

/// Compile one rule against the global domain filter.
///
/// Returns `None` for inert rules: an empty `find`, or a regex rule whose
/// pattern does not parse. Both are logged and skipped, never fatal.
pub fn compile(rule: &Rule, global_filter: &DomainFilter) -> Option<CompiledRule> {
    if rule.find.is_empty() {
        return None;
    }

    let source = if rule.is_regex {
        rule.find.clone()
    } else {
        literal_pattern(rule)
    };

    let matcher = match RegexBuilder::new(&source)
        .case_insensitive(!rule.is_case_sensitive)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            log::warn!("skipping rule {:?}, invalid pattern: {e}", rule.id);
            return None;
        }
    };

    let effective = if rule.domain_filter.mode == FilterMode::Inherit {
        global_filter
    } else {
        &rule.domain_filter
    };

    Some(CompiledRule {
        rule: rule.clone(),
        matcher,
        host_filter: HostFilter::compile(effective),
    })
}

/// Escape a literal `find` and optionally fence it with word boundaries.
///
/// A boundary is added at an end only when that end of the literal is a
/// word character; `\b` before punctuation would demand a word character
/// outside the match and silently break literals like `(c)` or `c++`.
fn literal_pattern(rule: &Rule) -> String {
    let mut pattern = regex::escape(&rule.find);
    if rule.is_whole_word {
        if rule.find.chars().next().is_some_and(is_word_char) {
            pattern.insert_str(0, r"\b");
        }
        if rule.find.chars().next_back().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }
    }
    pattern
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_simple(rule: &Rule) -> CompiledRule {
        compile(rule, &DomainFilter::default()).unwrap()
    }

    #[test]
    fn test_empty_find_is_inert() {
        let rule = Rule::literal("r1", "", "x");
        assert!(compile(&rule, &DomainFilter::default()).is_none());
    }

    #[test]
    fn test_invalid_regex_is_skipped() {
        let mut rule = Rule::literal("r1", "([a-", "x");
        rule.is_regex = true;
        assert!(compile(&rule, &DomainFilter::default()).is_none());
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let compiled = compile_simple(&Rule::literal("r1", "1+1 (really)", "two"));
        assert!(compiled.matcher.is_match("so 1+1 (really) then"));
        assert!(!compiled.matcher.is_match("111 really"));
    }

    #[test]
    fn test_whole_word_matches_words_only() {
        let mut rule = Rule::literal("r1", "cat", "dog");
        rule.is_whole_word = true;
        let compiled = compile_simple(&rule);
        assert!(compiled.matcher.is_match("a cat sat"));
        assert!(!compiled.matcher.is_match("concatenate"));
    }

    #[test]
    fn test_whole_word_skips_boundary_at_punctuation_edge() {
        // `\b(` would require a word character before the paren; the
        // boundary must be omitted on that side.
        let mut rule = Rule::literal("r1", "(c)", "©");
        rule.is_whole_word = true;
        let compiled = compile_simple(&rule);
        assert!(compiled.matcher.is_match("mark (c) here"));
        assert!(compiled.matcher.is_match("(c)"));
    }

    #[test]
    fn test_case_sensitivity_flag() {
        let insensitive = compile_simple(&Rule::literal("r1", "mall", "x"));
        assert!(insensitive.matcher.is_match("MALL"));

        let mut rule = Rule::literal("r2", "m", "x");
        rule.is_case_sensitive = true;
        let sensitive = compile_simple(&rule);
        assert!(!sensitive.matcher.is_match("Michigan"));
        assert!(sensitive.matcher.is_match("mall"));
    }

    #[test]
    fn test_inherit_resolves_to_global_filter() {
        let global = DomainFilter::new(FilterMode::Blacklist, &["example.com"]);
        let rule = Rule::literal("r1", "cat", "dog");
        let compiled = compile(&rule, &global).unwrap();
        assert!(!compiled.host_filter.allows("example.com"));
        assert!(compiled.host_filter.allows("example.org"));
    }

    #[test]
    fn test_own_filter_wins_over_global() {
        let global = DomainFilter::new(FilterMode::Blacklist, &["example.com"]);
        let mut rule = Rule::literal("r1", "cat", "dog");
        rule.domain_filter = DomainFilter::new(FilterMode::Disabled, &[]);
        let compiled = compile(&rule, &global).unwrap();
        assert!(compiled.host_filter.allows("example.com"));
    }
}
