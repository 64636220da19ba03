//! Owned markup tree built from an immutable parse.
//!
//! The parse tree produced by `scraper` is never mutated. Instead the parts
//! the engine works on are copied into [`ElementNode`] trees whose leaves are
//! already-serialized strings, which makes cost evaluation and reassembly
//! plain string work.
//!
//! Serialization follows the source's [`Syntax`]: XHTML chapters get
//! self-closed void elements and numeric character references so the
//! output stays well-formed XML.

use scraper::node::Element;
use scraper::{ElementRef, Node};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Serialization flavor of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Syntax {
    #[default]
    Html,
    /// XML serialization of HTML, used by EPUB content documents.
    Xhtml,
}

/// A node of the owned markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    /// An element with its serialized tag pair and children.
    Element(ElementNode),
    /// Serialized text or comment.
    Raw(String),
    /// A placeholder token standing in for a removed subtree.
    Placeholder(String),
}

impl MarkupNode {
    /// Appends the serialized form of this node to `out`.
    pub fn write_html(&self, out: &mut String) {
        match self {
            MarkupNode::Element(element) => element.write_html(out),
            MarkupNode::Raw(markup) | MarkupNode::Placeholder(markup) => out.push_str(markup),
        }
    }

    /// Returns the serialized form of this node.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }
}

/// An element of the owned markup tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    /// Tag name as parsed (lowercase, prefix kept for names like `epub:switch`).
    pub name: String,
    /// Opening tag including attributes.
    pub open_tag: String,
    /// Closing tag; empty for void elements.
    pub close_tag: String,
    pub children: Vec<MarkupNode>,
}

impl ElementNode {
    /// Copies a parsed element into an owned tree.
    ///
    /// `substitute` is offered every descendant element before it is copied;
    /// returning `Some` puts that node in the element's place and skips the
    /// subtree. The element passed in is never offered.
    pub fn from_parsed<F>(element: ElementRef<'_>, syntax: Syntax, substitute: &mut F) -> Self
    where
        F: FnMut(ElementRef<'_>) -> Option<MarkupNode>,
    {
        let value = element.value();
        let raw_text = is_raw_text(value.name());
        let mut children = Vec::new();

        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    let Some(child_element) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let node = substitute(child_element).unwrap_or_else(|| {
                        MarkupNode::Element(ElementNode::from_parsed(
                            child_element,
                            syntax,
                            substitute,
                        ))
                    });
                    children.push(node);
                }
                Node::Text(text) => {
                    let text: &str = text;
                    let serialized = if raw_text {
                        text.to_string()
                    } else {
                        escape_text(text, syntax)
                    };
                    push_raw(&mut children, serialized);
                }
                Node::Comment(comment) => {
                    let comment: &str = comment;
                    push_raw(&mut children, format!("<!--{comment}-->"));
                }
                _ => {}
            }
        }

        Self {
            name: value.name().to_string(),
            open_tag: open_tag(value, syntax),
            close_tag: close_tag(value),
            children,
        }
    }

    /// Appends the element, tags included, to `out`.
    pub fn write_html(&self, out: &mut String) {
        out.push_str(&self.open_tag);
        self.write_inner_html(out);
        out.push_str(&self.close_tag);
    }

    /// Appends the serialized children to `out`.
    pub fn write_inner_html(&self, out: &mut String) {
        for child in &self.children {
            child.write_html(out);
        }
    }

    /// Serializes the element, tags included.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Serializes the children only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        self.write_inner_html(&mut out);
        out
    }

    /// Returns true if any direct child is an element.
    pub fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, MarkupNode::Element(_)))
    }

    /// Returns true if this element or any descendant has tag `name`.
    pub fn contains_tag(&self, name: &str) -> bool {
        self.name == name
            || self.children.iter().any(|child| match child {
                MarkupNode::Element(element) => element.contains_tag(name),
                _ => false,
            })
    }
}

/// Merges adjacent raw strings so text split by the parser stays in one node.
fn push_raw(children: &mut Vec<MarkupNode>, serialized: String) {
    if let Some(MarkupNode::Raw(last)) = children.last_mut() {
        last.push_str(&serialized);
    } else {
        children.push(MarkupNode::Raw(serialized));
    }
}

/// Serializes the opening tag of a parsed element. Void elements are
/// self-closed in XHTML.
pub fn open_tag(element: &Element, syntax: Syntax) -> String {
    let mut tag = format!("<{}", element.name());
    for (name, value) in element.attrs.iter() {
        tag.push(' ');
        if let Some(prefix) = &name.prefix {
            tag.push_str(prefix);
            tag.push(':');
        }
        tag.push_str(&name.local);
        tag.push_str("=\"");
        tag.push_str(&escape_attr(value, syntax));
        tag.push('"');
    }
    if syntax == Syntax::Xhtml && is_void(element.name()) {
        tag.push_str("/>");
    } else {
        tag.push('>');
    }
    tag
}

/// Serializes the closing tag of a parsed element; empty for void elements.
pub fn close_tag(element: &Element) -> String {
    if is_void(element.name()) {
        String::new()
    } else {
        format!("</{}>", element.name())
    }
}

/// Serializes a parsed element and its subtree.
pub fn serialize_element(element: ElementRef<'_>, syntax: Syntax) -> String {
    ElementNode::from_parsed(element, syntax, &mut |_| None).outer_html()
}

/// Returns true for elements that never have a closing tag.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Returns true for elements whose text is not escaped on output.
pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Escapes text content the way the HTML serialization algorithm does.
/// XHTML has no `&nbsp;`, so the no-break space is written as `&#160;`.
pub fn escape_text(text: &str, syntax: Syntax) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str(nbsp(syntax)),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes an attribute value for use inside double quotes.
pub fn escape_attr(value: &str, syntax: Syntax) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str(nbsp(syntax)),
            '"' => out.push_str("&quot;"),
            '<' if syntax == Syntax::Xhtml => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

fn nbsp(syntax: Syntax) -> &'static str {
    match syntax {
        Syntax::Html => "&nbsp;",
        Syntax::Xhtml => "&#160;",
    }
}
