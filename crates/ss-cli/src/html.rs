//! HTML ingestion and output for the offline rewrite tool.
//!
//! Drives the html5ever tokenizer directly (no tree builder) into a small
//! stack-based sink that assembles an `ss-engine` document. Good enough for
//! the dev workflow; the real extension operates on the browser's own DOM
//! through the wasm bindings.

use std::cell::RefCell;

use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tendril::StrTendril;

use ss_engine::dom::{Document, NodeData, NodeFlags, NodeId, SWAP_MARKER_ATTR};

/// Elements with no content and no end tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Default)]
struct DomSink {
    doc: RefCell<Document>,
    /// Open elements; the document root sits below the bottom entry.
    stack: RefCell<Vec<NodeId>>,
    /// Character tokens arrive in fragments; buffer until the next tag so
    /// each text run becomes a single node.
    pending_text: RefCell<String>,
}

impl TokenSink for DomSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => self.start_tag(&tag),
                TagKind::EndTag => self.end_tag(&tag),
            },
            Token::CharacterTokens(text) => self.pending_text.borrow_mut().push_str(&text),
            Token::NullCharacterToken
            | Token::CommentToken(_)
            | Token::DoctypeToken(_)
            | Token::ParseError(_)
            | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

impl DomSink {
    fn current_parent(&self) -> NodeId {
        self.stack
            .borrow()
            .last()
            .copied()
            .unwrap_or_else(|| self.doc.borrow().root())
    }

    fn flush_text(&self) {
        let text = std::mem::take(&mut *self.pending_text.borrow_mut());
        if text.is_empty() {
            return;
        }
        let parent = self.current_parent();
        let mut doc = self.doc.borrow_mut();
        let node = doc.create_text(&text);
        doc.append(parent, node);
    }

    fn start_tag(&self, tag: &Tag) {
        self.flush_text();
        let name = tag.name.as_ref().to_ascii_lowercase();
        let parent = self.current_parent();

        let node = {
            let mut doc = self.doc.borrow_mut();
            let node = doc.create_element(&name);
            for attr in &tag.attrs {
                doc.set_attr(node, attr.name.local.as_ref(), &attr.value);
            }
            // Re-ingesting our own output: restore the processed marker so
            // a second rewrite pass stays idempotent.
            if doc
                .element(node)
                .and_then(|el| el.attr(SWAP_MARKER_ATTR))
                .is_some()
            {
                doc.add_flags(node, NodeFlags::REPLACEMENT);
            }
            doc.append(parent, node);
            node
        };

        if !tag.self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            self.stack.borrow_mut().push(node);
        }
    }

    fn end_tag(&self, tag: &Tag) {
        self.flush_text();
        let name = tag.name.as_ref().to_ascii_lowercase();
        let mut stack = self.stack.borrow_mut();
        let doc = self.doc.borrow();
        // Pop to the nearest matching open element; ignore stray end tags.
        if let Some(pos) = stack
            .iter()
            .rposition(|&id| doc.element(id).map(|el| el.name == name).unwrap_or(false))
        {
            stack.truncate(pos);
        }
    }

    fn finish(self) -> Document {
        self.flush_text();
        self.doc.into_inner()
    }
}

/// Tokenize `html` into a document rooted at a synthetic body element.
pub fn parse_html(html: &str) -> Document {
    let tokenizer = Tokenizer::new(DomSink::default(), TokenizerOpts::default());
    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from(html));

    let _ = tokenizer.feed(&queue);
    tokenizer.end();

    tokenizer.sink.finish()
}

/// Serialize the document's content (the synthetic root itself is elided).
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        serialize_node(doc, child, &mut out);
    }
    out
}

fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in el.attrs() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }
            for child in doc.children(id) {
                serialize_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
