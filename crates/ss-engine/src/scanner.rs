//! Candidate discovery.
//!
//! A lazy, restartable depth-first walk over a subtree that yields the text
//! nodes worth rewriting. Exclusion prunes whole subtrees (we never descend
//! into a script element or a generated span) but keeps visiting their
//! siblings. Acceptance is a cheap any-rule prefilter so the expensive
//! multi-rule rewrite only runs on nodes that will actually change.

use ss_core::select::ApplicableRuleSet;

use crate::dom::{Document, Element, NodeData, NodeFlags, NodeId};

/// Containers whose text is never prose: non-renderable or structural
/// elements plus text-entry form controls.
const EXCLUDED_ELEMENTS: [&str; 9] = [
    "script", "style", "noscript", "template", "textarea", "input", "select", "option", "button",
];

/// Whether the scanner may descend into this element.
fn element_eligible(el: &Element) -> bool {
    if el.flags.contains(NodeFlags::REPLACEMENT) {
        // Already-substituted output; re-entering it would cascade.
        return false;
    }
    if EXCLUDED_ELEMENTS.contains(&el.name.as_str()) {
        return false;
    }
    // Editable regions behave like form controls.
    match el.attr("contenteditable") {
        Some(value) if !value.eq_ignore_ascii_case("false") => false,
        _ => true,
    }
}

/// Does any compiled matcher find at least one occurrence?
pub(crate) fn matches_any(text: &str, set: &ApplicableRuleSet) -> bool {
    set.rules.iter().any(|rule| rule.matcher.is_match(text))
}

/// Lazily iterate candidate text nodes under `root`, document order.
pub fn candidates<'a>(
    doc: &'a Document,
    root: NodeId,
    set: &'a ApplicableRuleSet,
) -> Candidates<'a> {
    Candidates {
        doc,
        set,
        stack: vec![root],
    }
}

pub struct Candidates<'a> {
    doc: &'a Document,
    set: &'a ApplicableRuleSet,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            match self.doc.data(id) {
                NodeData::Element(el) => {
                    if element_eligible(el) {
                        // Reverse so the stack pops in document order.
                        let children: Vec<NodeId> = self.doc.children(id).collect();
                        self.stack.extend(children.into_iter().rev());
                    }
                }
                NodeData::Text(text) => {
                    if matches_any(text, self.set) {
                        return Some(id);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ss_core::rule::{DomainFilter, Rule};
    use ss_core::select::ApplicableRuleSet;

    fn rule_set(find: &str) -> ApplicableRuleSet {
        let rule = Rule::literal("r1", find, "x");
        ApplicableRuleSet {
            rules: vec![ss_core::compile(&rule, &DomainFilter::default()).unwrap()],
        }
    }

    /// body > p("one cat") , script("cat()") , div > span("cat nap"), "dog"
    fn sample_doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let p_text = doc.create_text("one cat");
        doc.append(doc.root(), p);
        doc.append(p, p_text);

        let script = doc.create_element("script");
        let script_text = doc.create_text("cat()");
        doc.append(doc.root(), script);
        doc.append(script, script_text);

        let div = doc.create_element("div");
        let span = doc.create_element("span");
        let span_text = doc.create_text("cat nap");
        let dog_text = doc.create_text("dog");
        doc.append(doc.root(), div);
        doc.append(div, span);
        doc.append(span, span_text);
        doc.append(div, dog_text);

        (doc, p_text, span_text)
    }

    #[test]
    fn test_yields_matching_text_in_document_order() {
        let (doc, p_text, span_text) = sample_doc();
        let set = rule_set("cat");
        let found: Vec<NodeId> = candidates(&doc, doc.root(), &set).collect();
        assert_eq!(found, vec![p_text, span_text]);
    }

    #[test]
    fn test_prefilter_rejects_non_matching_text() {
        let (doc, _, _) = sample_doc();
        let set = rule_set("zebra");
        assert_eq!(candidates(&doc, doc.root(), &set).count(), 0);
    }

    #[test]
    fn test_excluded_container_pruned_but_siblings_visited() {
        let (doc, p_text, span_text) = sample_doc();
        // "cat()" inside the script matches the rule but must not surface;
        // nodes on either side of the script still do.
        let set = rule_set("cat");
        let found: Vec<NodeId> = candidates(&doc, doc.root(), &set).collect();
        assert!(!found.is_empty());
        assert!(found.contains(&p_text));
        assert!(found.contains(&span_text));
    }

    #[test]
    fn test_replacement_spans_are_never_reentered() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.add_flags(span, NodeFlags::REPLACEMENT);
        let text = doc.create_text("cat");
        doc.append(doc.root(), span);
        doc.append(span, text);

        let set = rule_set("cat");
        assert_eq!(candidates(&doc, doc.root(), &set).count(), 0);
    }

    #[test]
    fn test_contenteditable_regions_are_skipped() {
        let mut doc = Document::new();
        let editor = doc.create_element("div");
        doc.set_attr(editor, "contenteditable", "");
        let text = doc.create_text("cat");
        doc.append(doc.root(), editor);
        doc.append(editor, text);

        let viewer = doc.create_element("div");
        doc.set_attr(viewer, "contenteditable", "false");
        let visible = doc.create_text("cat");
        doc.append(doc.root(), viewer);
        doc.append(viewer, visible);

        let set = rule_set("cat");
        let found: Vec<NodeId> = candidates(&doc, doc.root(), &set).collect();
        assert_eq!(found, vec![visible]);
    }

    #[test]
    fn test_traversal_is_restartable() {
        let (doc, _, _) = sample_doc();
        let set = rule_set("cat");
        let first: Vec<NodeId> = candidates(&doc, doc.root(), &set).collect();
        let second: Vec<NodeId> = candidates(&doc, doc.root(), &set).collect();
        assert_eq!(first, second);
    }
}
