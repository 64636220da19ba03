//! Removal of untranslatable subtrees.
//!
//! Every element whose tag is in the [`SkipTagSet`] is serialized, stored in
//! the [`PlaceholderVault`] and replaced by the vault's token before anything
//! is measured or sent to a backend.

use crate::markup::{ElementNode, MarkupNode, Syntax, serialize_element};
use crate::vault::PlaceholderVault;
use scraper::ElementRef;
use std::collections::BTreeSet;

/// Tags that are never sent to translation.
pub const DEFAULT_SKIP_TAGS: &[&str] = &[
    // Scripts and styles
    "script",
    "style",
    // Code
    "code",
    "pre",
    "kbd",
    "var",
    "samp",
    // Special content
    "svg",
    "math",
    "canvas",
    "address",
    "applet",
    // Media
    "img",
    "audio",
    "video",
    "track",
    "source",
    // Forms
    "input",
    "button",
    "select",
    "option",
    "textarea",
    "form",
    // Metadata and links
    "meta",
    "link",
    // Embedded content
    "iframe",
    "embed",
    "object",
    "param",
    // Machine-readable values
    "time",
    "data",
    "meter",
    "progress",
    // XML
    "xml",
    "xmlns",
    // EPUB switches
    "epub:switch",
    "epub:case",
    "epub:default",
    // Annotations
    "annotation",
    "note",
];

/// Closed set of tag names excluded from translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipTagSet {
    tags: BTreeSet<String>,
}

impl Default for SkipTagSet {
    fn default() -> Self {
        Self::from_tags(DEFAULT_SKIP_TAGS.iter().copied())
    }
}

impl SkipTagSet {
    /// Builds a set from exactly the given tag names.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|tag| tag.as_ref().trim().to_ascii_lowercase())
                .filter(|tag| !tag.is_empty())
                .collect(),
        }
    }

    /// The default set extended with `extra` tag names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.tags.extend(
            extra
                .into_iter()
                .map(|tag| tag.as_ref().trim().to_ascii_lowercase())
                .filter(|tag| !tag.is_empty()),
        );
        set
    }

    /// Returns true if elements named `tag` must not be translated.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

/// Replaces skip-tagged subtrees with vault tokens.
pub struct SkipTagFilter<'a> {
    skip_tags: &'a SkipTagSet,
    vault: &'a mut PlaceholderVault,
    syntax: Syntax,
}

impl<'a> SkipTagFilter<'a> {
    pub fn new(skip_tags: &'a SkipTagSet, vault: &'a mut PlaceholderVault) -> Self {
        Self {
            skip_tags,
            vault,
            syntax: Syntax::Html,
        }
    }

    /// Sets the serialization used for the copied tree and the vault.
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Copies `root` into an owned tree with every skip-tagged descendant
    /// replaced by a placeholder token.
    ///
    /// The vault stores each removed subtree serialized in the filter's
    /// syntax, so restoring a token reproduces the original element. `root` itself is
    /// kept even if its own tag is in the set.
    pub fn filter(&mut self, root: ElementRef<'_>) -> ElementNode {
        let skip_tags = self.skip_tags;
        let syntax = self.syntax;
        let vault = &mut *self.vault;
        let before = vault.len();

        let filtered = ElementNode::from_parsed(root, syntax, &mut |element| {
            skip_tags.contains(element.value().name()).then(|| {
                MarkupNode::Placeholder(vault.create(serialize_element(element, syntax)))
            })
        });

        tracing::debug!(
            root = root.value().name(),
            placeholders = vault.len() - before,
            "filtered untranslatable subtrees"
        );

        filtered
    }
}
