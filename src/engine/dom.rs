//! HTML → DOM.
//!
//! Card templates are small and well formed, so instead of a full tree
//! builder we run the `html5ever` tokenizer and nest elements ourselves.
//! The tokenizer takes care of entities and attribute quoting; this module
//! handles nesting, void elements and stray end tags.

use std::cell::RefCell;
use std::collections::HashMap;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag as TokenTag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    Span,
    Img,
    Body,
    Html,
    Head,
    /// Anything else; laid out as a block.
    Other(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "span" => Tag::Span,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Other(other.to_string()),
        }
    }

    /// Lower-case tag name, as matched by stylesheet selectors.
    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::Span => "span",
            Tag::Img => "img",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Other(name) => name,
        }
    }

    /// Text blocks whose inline content is merged and word-wrapped as one.
    pub fn is_text_block(&self) -> bool {
        matches!(self, Tag::P | Tag::H1 | Tag::H2 | Tag::H3)
    }
}

/// Elements that never have children or an end tag.
fn is_void(name: &str) -> bool {
    matches!(
        name,
        "img" | "br" | "hr" | "meta" | "link" | "input" | "col" | "source" | "wbr"
    )
}

/// A node in the DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Token sink that nests start/end tags into a tree. The tokenizer already
/// lower-cases tag and attribute names.
#[derive(Default)]
struct DomBuilder {
    /// Open elements, innermost last.
    open: RefCell<Vec<ElementNode>>,
    roots: RefCell<Vec<DomNode>>,
}

impl DomBuilder {
    fn append(&self, node: DomNode) {
        let mut open = self.open.borrow_mut();
        let siblings = match open.last_mut() {
            Some(parent) => &mut parent.children,
            None => return self.roots.borrow_mut().push(node),
        };
        // The tokenizer may split one run of text into several tokens.
        if let (DomNode::Text(new), Some(DomNode::Text(prev))) = (&node, siblings.last_mut()) {
            prev.push_str(new);
            return;
        }
        siblings.push(node);
    }

    fn start(&self, tag: TokenTag) {
        let name = tag.name.to_string();
        let mut element = ElementNode::new(Tag::from_name(&name));
        for attr in tag.attrs {
            element
                .attributes
                .insert(attr.name.local.to_string(), attr.value.to_string());
        }
        if tag.self_closing || is_void(&name) {
            self.append(DomNode::Element(element));
        } else {
            self.open.borrow_mut().push(element);
        }
    }

    fn end(&self, name: &str) {
        let matching = self
            .open
            .borrow()
            .iter()
            .rposition(|e| e.tag.name() == name);
        // A stray end tag closes nothing.
        let Some(depth) = matching else {
            return;
        };
        while self.open.borrow().len() > depth {
            self.close_innermost();
        }
    }

    fn close_innermost(&self) {
        let closed = self.open.borrow_mut().pop();
        if let Some(element) = closed {
            self.append(DomNode::Element(element));
        }
    }

    fn finish(&self) -> Vec<DomNode> {
        while !self.open.borrow().is_empty() {
            self.close_innermost();
        }
        self.roots.take()
    }
}

impl TokenSink for DomBuilder {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => self.start(tag),
                TagKind::EndTag => self.end(&tag.name),
            },
            Token::CharacterTokens(text) => self.append(DomNode::Text(text.to_string())),
            Token::ParseError(msg) => log::debug!("HTML parse error: {msg}"),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Parse an HTML string into a list of top-level DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let tokenizer = Tokenizer::new(DomBuilder::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(html));
    let _ = tokenizer.feed(&input);
    tokenizer.end();
    tokenizer.sink.finish()
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}
