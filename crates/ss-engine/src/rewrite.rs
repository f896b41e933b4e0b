//! Substitution engine.
//!
//! Segment computation is pure (text in, segments out) so the wasm bindings
//! can reuse it without a document; DOM application sits on top and does
//! the actual node swap. A single explicit cursor is threaded through the
//! whole multi-rule scan, which is what guarantees replacements never
//! overlap no matter how many rules fire on one node.

use ss_core::compile::CompiledRule;
use ss_core::select::ApplicableRuleSet;

use crate::dom::{Document, NodeData, NodeFlags, NodeId, SWAP_MARKER_ATTR};
use crate::scanner::candidates;

// =============================================================================
// Segments
// =============================================================================

/// One replaced run within a text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    /// Substituted text (template-expanded for regex rules).
    pub text: String,
    /// The matched input run, kept for the hover tooltip.
    pub original: String,
    pub rule_id: String,
    pub css: Option<String>,
}

/// A piece of a rewritten text node, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Untouched input, copied verbatim.
    Text(String),
    Swap(Swap),
}

/// Apply every rule to `text`, in rule-set order.
///
/// Returns `None` when no rule matched, so untouched nodes carry zero
/// wrapper overhead. Otherwise the concatenation of `Text` pieces and each
/// swap's `original` reconstructs the input exactly.
pub fn rewrite_segments(text: &str, rules: &[CompiledRule]) -> Option<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    // End of consumed input. Shared across rules: a later rule only sees
    // text after the last accepted match, never inside it.
    let mut cursor = 0usize;
    let mut swapped = false;

    for rule in rules {
        let mut pos = cursor;
        while pos <= text.len() {
            let caps = match rule.matcher.captures_at(text, pos) {
                Some(caps) => caps,
                None => break,
            };
            let m = match caps.get(0) {
                Some(m) => m,
                None => break,
            };

            if m.start() > cursor {
                segments.push(Segment::Text(text[cursor..m.start()].to_string()));
            }

            let replacement = if rule.rule.is_regex {
                let mut out = String::new();
                // Unknown capture references expand to the empty string.
                caps.expand(&rule.rule.replace, &mut out);
                out
            } else {
                rule.rule.replace.clone()
            };

            segments.push(Segment::Swap(Swap {
                text: replacement,
                original: m.as_str().to_string(),
                rule_id: rule.rule.id.clone(),
                css: rule.rule.css.clone(),
            }));
            swapped = true;
            cursor = m.end();
            pos = m.end();

            if m.is_empty() {
                // Zero-width match: step one char so the scan terminates,
                // visiting each position at most once.
                pos = match text[pos..].chars().next() {
                    Some(c) => pos + c.len_utf8(),
                    None => text.len() + 1,
                };
            }
        }
    }

    if !swapped {
        return None;
    }
    if cursor < text.len() {
        segments.push(Segment::Text(text[cursor..].to_string()));
    }
    Some(segments)
}

// =============================================================================
// Inline styles
// =============================================================================

/// Best-effort validation of a rule's `css` string. Malformed declarations
/// are dropped individually; a fully malformed string yields `None` and the
/// replacement proceeds unstyled.
pub fn sanitize_css(css: &str) -> Option<String> {
    let mut kept: Vec<String> = Vec::new();
    for declaration in css.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        match declaration.split_once(':') {
            Some((property, value))
                if is_css_ident(property.trim()) && !value.trim().is_empty() =>
            {
                kept.push(format!("{}: {}", property.trim(), value.trim()));
            }
            _ => log::debug!("dropping malformed style declaration {declaration:?}"),
        }
    }
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

fn is_css_ident(property: &str) -> bool {
    !property.is_empty()
        && property
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// =============================================================================
// DOM application
// =============================================================================

/// Rewrite one text node in place. Returns the number of swaps performed;
/// zero means the node was left completely untouched (no match, not a text
/// node, or detached by unrelated page script while we were working).
///
/// All output, verbatim pieces included, lands inside one marked container
/// element. The cursor skips text a later rule would otherwise match; if
/// the skipped pieces came back as bare text nodes, the next pass would
/// pick them up and the result would keep changing.
pub fn rewrite_node(doc: &mut Document, node: NodeId, set: &ApplicableRuleSet) -> usize {
    if !doc.is_attached(node) {
        return 0;
    }
    let text = match doc.data(node) {
        NodeData::Text(text) => text.clone(),
        NodeData::Element(_) => return 0,
    };
    let segments = match rewrite_segments(&text, &set.rules) {
        Some(segments) => segments,
        None => return 0,
    };

    // If this node sits inside an earlier replacement span (a mutation
    // batch can hand us fresh text under a rewritten parent), chain the
    // provenance instead of clobbering it.
    let prior_title = enclosing_swap_title(doc, node);

    let container = doc.create_element("span");
    doc.add_flags(container, NodeFlags::REPLACEMENT);
    doc.set_attr(container, SWAP_MARKER_ATTR, "1");

    let mut swaps = 0usize;
    for segment in segments {
        let new_node = match segment {
            Segment::Text(t) => doc.create_text(&t),
            Segment::Swap(swap) => {
                swaps += 1;
                materialize_swap(doc, &swap, prior_title.as_deref())
            }
        };
        doc.append(container, new_node);
    }
    doc.insert_before(node, container);
    doc.detach(node);
    swaps
}

fn enclosing_swap_title(doc: &Document, node: NodeId) -> Option<String> {
    doc.ancestors(node).find_map(|id| {
        let el = doc.element(id)?;
        if el.flags.contains(NodeFlags::REPLACEMENT) {
            el.attr("title").map(|t| t.to_string())
        } else {
            None
        }
    })
}

fn materialize_swap(doc: &mut Document, swap: &Swap, prior_title: Option<&str>) -> NodeId {
    let span = doc.create_element("span");
    doc.add_flags(span, NodeFlags::REPLACEMENT);
    doc.set_attr(span, SWAP_MARKER_ATTR, "1");

    let title = match prior_title {
        Some(prior) => format!("{prior} -> {}", swap.original),
        None => swap.original.clone(),
    };
    doc.set_attr(span, "title", &title);

    if let Some(css) = &swap.css {
        if let Some(clean) = sanitize_css(css) {
            doc.set_attr(span, "style", &clean);
        }
    }

    let text = doc.create_text(&swap.text);
    doc.append(span, text);
    span
}

// =============================================================================
// Whole-subtree pass
// =============================================================================

/// Counters for one scan+rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Candidate text nodes the scanner yielded.
    pub candidates: usize,
    /// Nodes actually swapped out.
    pub rewritten: usize,
    /// Replacement spans created.
    pub swaps: usize,
}

impl ApplyStats {
    pub fn merge(&mut self, other: ApplyStats) {
        self.candidates += other.candidates;
        self.rewritten += other.rewritten;
        self.swaps += other.swaps;
    }
}

/// Run scanner + engine over the subtree at `root`, to completion.
pub fn apply_rules(doc: &mut Document, root: NodeId, set: &ApplicableRuleSet) -> ApplyStats {
    let mut stats = ApplyStats::default();
    if set.is_empty() {
        return stats;
    }

    let found: Vec<NodeId> = candidates(doc, root, set).collect();
    stats.candidates = found.len();

    for node in found {
        let swaps = rewrite_node(doc, node, set);
        if swaps > 0 {
            stats.rewritten += 1;
            stats.swaps += swaps;
        }
    }

    log::debug!(
        "pass complete: {} candidates, {} rewritten, {} swaps",
        stats.candidates,
        stats.rewritten,
        stats.swaps
    );
    stats
}
