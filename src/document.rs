//! Source documents and their translation boundary.
//!
//! Only the children of `<body>` are ever translated. Everything around the
//! body (XML declaration, doctype, `<head>`, the body's own attributes) is
//! written back from the source parse.
//!
//! XHTML sources (an XML declaration or the XHTML namespace on `<html>`)
//! are written back in XML form. Since the HTML parser reads `<a id="x"/>`
//! as an open tag, self-closed non-void elements are expanded to a tag pair
//! before parsing.

use crate::markup::{ElementNode, MarkupNode, Syntax, close_tag, is_void, open_tag};
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

/// Presence of a body start tag selects full-document parsing.
static BODY_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[\s>/]").expect("Invalid BODY_TAG_REGEX"));

/// Leading XML declaration together with the line break that follows it.
static XML_DECLARATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A\u{feff}?\s*<\?xml[^>]*\?>[ \t]*(?:\r?\n)?").expect("Invalid XML_DECLARATION_REGEX")
});

/// `<html>` start tag declaring the XHTML namespace.
static XHTML_NAMESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<html\b[^>]*\sxmlns\s*=\s*["']http://www\.w3\.org/1999/xhtml["']"#)
        .expect("Invalid XHTML_NAMESPACE_REGEX")
});

/// Self-closed tags, plus the comments, CDATA sections and script/style
/// bodies in which a `/>` is not a tag.
static SELF_CLOSING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)<!--.*?-->|<!\[CDATA\[.*?\]\]>",
        r#"|<([a-z][a-z0-9:._-]*)((?:\s+[^\s/>"'=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/>"#,
        r"|<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>",
    ))
    .expect("Invalid SELF_CLOSING_REGEX")
});

/// Marks the splice point when rendering a shell. The parser replaces NUL
/// characters in its input, so the marker cannot come from the source.
const SPLICE_MARK: &str = "\u{0}";

/// How the source was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A complete document with a `<body>`.
    Full,
    /// Body content without a surrounding document.
    Fragment,
}

/// A parsed source document.
pub struct SourceDocument {
    html: Html,
    kind: DocumentKind,
    syntax: Syntax,
    /// XML declaration prefix, kept byte for byte.
    prolog: Option<String>,
}

impl SourceDocument {
    /// Parses `source` as a full document if it has a `<body>` tag and as a
    /// body fragment otherwise. Malformed markup is repaired by the parser.
    pub fn parse(source: &str) -> Self {
        let (prolog, rest) = match XML_DECLARATION_REGEX.find(source) {
            Some(m) => (Some(m.as_str().to_string()), &source[m.end()..]),
            None => (None, source),
        };

        let syntax = if prolog.is_some() || XHTML_NAMESPACE_REGEX.is_match(rest) {
            Syntax::Xhtml
        } else {
            Syntax::Html
        };
        let expanded;
        let rest = match syntax {
            Syntax::Xhtml => {
                expanded = expand_self_closing(rest);
                expanded.as_str()
            }
            Syntax::Html => rest,
        };

        let (html, kind) = if BODY_TAG_REGEX.is_match(rest) {
            (Html::parse_document(rest), DocumentKind::Full)
        } else {
            (Html::parse_fragment(rest), DocumentKind::Fragment)
        };

        Self {
            html,
            kind,
            syntax,
            prolog,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Serialization the output is written in.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Returns the XML declaration the source started with, if any.
    pub fn prolog(&self) -> Option<&str> {
        self.prolog.as_deref()
    }

    /// The element whose children are translated.
    ///
    /// For fragments this is the parser's synthetic root element.
    pub fn body(&self) -> ElementRef<'_> {
        let root = self.html.root_element();
        match self.kind {
            DocumentKind::Fragment => root,
            DocumentKind::Full => root
                .children()
                .filter_map(ElementRef::wrap)
                .find(|element| element.value().name() == "body")
                .unwrap_or(root),
        }
    }

    /// Serializes the document with the body's children replaced by
    /// `body_inner`.
    pub fn render(&self, body_inner: &str) -> String {
        let mut out = String::new();
        if let Some(prolog) = &self.prolog {
            out.push_str(prolog);
        }

        match self.kind {
            DocumentKind::Fragment => out.push_str(body_inner),
            DocumentKind::Full => self.render_full(body_inner, &mut out),
        }
        out
    }

    /// Renders everything around the body's children so the parse can be
    /// dropped before translation starts.
    pub fn shell(&self) -> DocumentShell {
        let rendered = self.render(SPLICE_MARK);
        let (head, tail) = rendered.split_once(SPLICE_MARK).unwrap_or((&rendered, ""));
        DocumentShell {
            head: head.to_string(),
            tail: tail.to_string(),
        }
    }

    fn render_full(&self, body_inner: &str, out: &mut String) {
        let body = self.body();
        let body_id = body.id();

        for node in self.html.tree.root().children() {
            match node.value() {
                Node::Doctype(doctype) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(doctype.name());
                    if !doctype.public_id().is_empty() {
                        out.push_str(&format!(" PUBLIC \"{}\"", doctype.public_id()));
                    }
                    if !doctype.system_id().is_empty() {
                        if doctype.public_id().is_empty() {
                            out.push_str(" SYSTEM");
                        }
                        out.push_str(&format!(" \"{}\"", doctype.system_id()));
                    }
                    out.push('>');
                }
                Node::Comment(comment) => {
                    let comment: &str = comment;
                    out.push_str(&format!("<!--{comment}-->"));
                }
                Node::Element(_) => {
                    let Some(element) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if element.id() == body_id {
                        write_body(element, self.syntax, body_inner, out);
                        continue;
                    }
                    let shell = ElementNode::from_parsed(element, self.syntax, &mut |child| {
                        (child.id() == body_id).then(|| {
                            let mut markup = String::new();
                            write_body(child, self.syntax, body_inner, &mut markup);
                            MarkupNode::Raw(markup)
                        })
                    });
                    shell.write_html(out);
                }
                _ => {}
            }
        }
    }
}

/// Pre-rendered markup around the body's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentShell {
    head: String,
    tail: String,
}

impl DocumentShell {
    /// Produces the final document with `body_inner` as the body content.
    pub fn wrap(&self, body_inner: &str) -> String {
        let mut out = String::with_capacity(self.head.len() + body_inner.len() + self.tail.len());
        out.push_str(&self.head);
        out.push_str(body_inner);
        out.push_str(&self.tail);
        out
    }
}

fn write_body(body: ElementRef<'_>, syntax: Syntax, body_inner: &str, out: &mut String) {
    out.push_str(&open_tag(body.value(), syntax));
    out.push_str(body_inner);
    out.push_str(&close_tag(body.value()));
}

/// Rewrites `<name .../>` as `<name ...></name>` for non-void elements.
fn expand_self_closing(source: &str) -> String {
    SELF_CLOSING_REGEX
        .replace_all(source, |caps: &regex::Captures<'_>| match caps.get(1) {
            Some(name) if !is_void(&name.as_str().to_ascii_lowercase()) => {
                let attrs = caps.get(2).map_or("", |m| m.as_str());
                format!("<{}{}></{}>", name.as_str(), attrs, name.as_str())
            }
            _ => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_without_body() {
        let doc = SourceDocument::parse("<div><p>Hello</p></div>");
        assert_eq!(doc.kind(), DocumentKind::Fragment);
        assert_eq!(doc.body().inner_html(), "<div><p>Hello</p></div>");
        assert_eq!(doc.render("<div><p>Bonjour</p></div>"), "<div><p>Bonjour</p></div>");
    }

    #[test]
    fn test_full_document_replaces_body_children_only() {
        let source = "<!DOCTYPE html><html lang=\"en\"><head><title>Chapter 1</title>\
                      <meta charset=\"utf-8\"></head><body class=\"chapter\"><p>Hello</p></body></html>";
        let doc = SourceDocument::parse(source);
        assert_eq!(doc.kind(), DocumentKind::Full);
        assert_eq!(doc.body().value().name(), "body");
        assert_eq!(
            doc.render("<p>Bonjour</p>"),
            "<!DOCTYPE html><html lang=\"en\"><head><title>Chapter 1</title>\
             <meta charset=\"utf-8\"></head><body class=\"chapter\"><p>Bonjour</p></body></html>"
        );
    }

    #[test]
    fn test_render_with_source_body_is_identity() {
        let source = "<!DOCTYPE html><html><head><title>T</title></head>\
                      <body id=\"b\"><h1>Title</h1><p>a &amp; b</p></body></html>";
        let doc = SourceDocument::parse(source);
        let inner = doc.body().inner_html();
        assert_eq!(doc.render(&inner), source);
    }

    #[test]
    fn test_xml_declaration_is_preserved() {
        let source = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n\
                      <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>T</title></head>\
                      <body><p>x</p></body></html>";
        let doc = SourceDocument::parse(source);
        assert_eq!(
            doc.prolog(),
            Some("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n")
        );
        let rendered = doc.render("<p>y</p>");
        assert!(rendered.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>"));
        assert!(rendered.ends_with("<body><p>y</p></body></html>"));
        assert!(!rendered.contains("<!--?xml"));
    }

    #[test]
    fn test_shell_matches_render() {
        let source = "<html><head><title>T</title></head><body lang=\"fr\"><p>x</p></body></html>";
        let doc = SourceDocument::parse(source);
        let shell = doc.shell();
        assert_eq!(shell.wrap("<p>y</p>"), doc.render("<p>y</p>"));

        let fragment = SourceDocument::parse("<p>x</p>");
        assert_eq!(fragment.shell().wrap("<p>y</p>"), "<p>y</p>");
    }

    #[test]
    fn test_body_detection_is_case_insensitive() {
        let doc = SourceDocument::parse("<HTML><BODY><P>x</P></BODY></HTML>");
        assert_eq!(doc.kind(), DocumentKind::Full);
        assert_eq!(doc.render(""), "<html><head></head><body></body></html>");
    }

    #[test]
    fn test_word_starting_with_body_is_not_a_body_tag() {
        let doc = SourceDocument::parse("<bodyguard>x</bodyguard>");
        assert_eq!(doc.kind(), DocumentKind::Fragment);
    }

    #[test]
    fn test_xhtml_detected_from_namespace_or_prolog() {
        let namespaced = SourceDocument::parse(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head></head><body><p>x</p></body></html>",
        );
        assert_eq!(namespaced.syntax(), Syntax::Xhtml);

        let declared = SourceDocument::parse("<?xml version=\"1.0\"?>\n<p>x</p>");
        assert_eq!(declared.syntax(), Syntax::Xhtml);

        let plain = SourceDocument::parse("<html><head></head><body><p>x</p></body></html>");
        assert_eq!(plain.syntax(), Syntax::Html);
    }

    #[test]
    fn test_xhtml_self_closed_anchor_keeps_following_text() {
        let doc = SourceDocument::parse(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><link rel=\"stylesheet\" href=\"s.css\"/></head>\
             <body><p><a id=\"p1\"/>Start</p></body></html>",
        );
        let body = doc.body();
        let p = body.children().find_map(ElementRef::wrap).unwrap();
        assert_eq!(p.inner_html(), "<a id=\"p1\"></a>Start");
        assert_eq!(
            doc.render("<p>y<br/></p>"),
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><link rel=\"stylesheet\" href=\"s.css\"/></head>\
             <body><p>y<br/></p></body></html>"
        );
    }

    #[test]
    fn test_expand_self_closing_leaves_void_and_scripts_alone() {
        assert_eq!(
            expand_self_closing("<p><a id='x' class=\"k\" /><br/><img src=\"a.png\"/></p>"),
            "<p><a id='x' class=\"k\"></a><br/><img src=\"a.png\"/></p>"
        );
        assert_eq!(
            expand_self_closing("<script>if (a<b/>c) {}</script><!-- <span/> --><div/>"),
            "<script>if (a<b/>c) {}</script><!-- <span/> --><div></div>"
        );
    }

    #[test]
    fn test_html_source_is_not_rewritten() {
        let doc = SourceDocument::parse("<p>a<br/>b</p>");
        assert_eq!(doc.syntax(), Syntax::Html);
        let inner = ElementNode::from_parsed(doc.body(), doc.syntax(), &mut |_| None).inner_html();
        assert_eq!(inner, "<p>a<br>b</p>");
    }
}
