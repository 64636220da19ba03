//! Translation unit tree.
//!
//! The filtered body is split into units that each fit one backend call.
//! The body itself is tried first; if its content fits the budget it is one
//! leaf. Otherwise a subtree that fits is translated whole and a subtree
//! that does not becomes a branch whose children are split further. Free
//! text is a leaf like any element. Adjacent leaves are merged while their
//! combined cost still fits.

use crate::cost::CostCounter;
use crate::markup::{ElementNode, MarkupNode};
use crate::translator::has_translatable_text;

/// A unit small enough to translate in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafUnit {
    /// Markup sent to the backend.
    pub content: String,
    /// Cost of `content` as measured by the builder's counter.
    pub cost: usize,
    /// Cleaned backend response, set once by the translator.
    pub translated: Option<String>,
}

impl LeafUnit {
    fn new(content: String, cost: usize) -> Self {
        Self {
            content,
            cost,
            translated: None,
        }
    }
}

/// An element too large to translate whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchUnit {
    pub open_tag: String,
    pub close_tag: String,
    pub children: Vec<UnitNode>,
}

/// A node of the unit tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitNode {
    Leaf(LeafUnit),
    Branch(BranchUnit),
    /// Whitespace, comments or placeholders directly inside a branch.
    /// Carried through to the output untranslated.
    Verbatim(String),
}

/// Root unit: the ordered units that replace the body's children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTree {
    pub children: Vec<UnitNode>,
}

impl UnitTree {
    /// All leaves in document order.
    pub fn leaves(&self) -> Vec<&LeafUnit> {
        let mut out = Vec::new();
        collect_leaves(&self.children, &mut out);
        out
    }

    /// Mutable access to all leaves in document order.
    pub fn leaves_mut(&mut self) -> Vec<&mut LeafUnit> {
        let mut out = Vec::new();
        collect_leaves_mut(&mut self.children, &mut out);
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Number of branch units at any depth.
    pub fn branch_count(&self) -> usize {
        fn count(nodes: &[UnitNode]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    UnitNode::Branch(branch) => 1 + count(&branch.children),
                    _ => 0,
                })
                .sum()
        }
        count(&self.children)
    }
}

fn collect_leaves<'a>(nodes: &'a [UnitNode], out: &mut Vec<&'a LeafUnit>) {
    for node in nodes {
        match node {
            UnitNode::Leaf(leaf) => out.push(leaf),
            UnitNode::Branch(branch) => collect_leaves(&branch.children, out),
            UnitNode::Verbatim(_) => {}
        }
    }
}

fn collect_leaves_mut<'a>(nodes: &'a mut [UnitNode], out: &mut Vec<&'a mut LeafUnit>) {
    for node in nodes {
        match node {
            UnitNode::Leaf(leaf) => out.push(leaf),
            UnitNode::Branch(branch) => collect_leaves_mut(&mut branch.children, out),
            UnitNode::Verbatim(_) => {}
        }
    }
}

/// Builds a [`UnitTree`] from a filtered body.
///
/// Recursion depth follows the element nesting of the input.
pub struct UnitTreeBuilder<'a> {
    counter: &'a dyn CostCounter,
    budget: usize,
}

impl<'a> UnitTreeBuilder<'a> {
    pub fn new(counter: &'a dyn CostCounter, budget: usize) -> Self {
        Self { counter, budget }
    }

    /// Classifies the children of `body` into units.
    pub fn build(&self, body: &ElementNode) -> UnitTree {
        let inner = body.inner_html();
        if inner.is_empty() {
            return UnitTree::default();
        }
        if !has_translatable_text(&inner) {
            return UnitTree {
                children: vec![UnitNode::Verbatim(inner)],
            };
        }

        let cost = self.counter.count(&inner);
        if cost <= self.budget {
            return UnitTree {
                children: vec![UnitNode::Leaf(LeafUnit::new(inner, cost))],
            };
        }

        let mut children = Vec::new();
        for child in &body.children {
            self.visit(child, &mut children);
        }
        UnitTree { children }
    }

    fn visit(&self, node: &MarkupNode, siblings: &mut Vec<UnitNode>) {
        match node {
            MarkupNode::Element(element) => {
                let html = element.outer_html();
                let cost = self.counter.count(&html);

                if cost > self.budget && element.has_element_children() {
                    let mut children = Vec::new();
                    for child in &element.children {
                        self.visit(child, &mut children);
                    }
                    siblings.push(UnitNode::Branch(BranchUnit {
                        open_tag: element.open_tag.clone(),
                        close_tag: element.close_tag.clone(),
                        children,
                    }));
                } else {
                    // Fits, or cannot be split further: an oversized atomic
                    // leaf is left for the backend to accept or reject.
                    self.push_leaf(siblings, html, cost);
                }
            }
            MarkupNode::Raw(markup) if has_translatable_text(markup) => {
                self.push_leaf(siblings, markup.clone(), self.counter.count(markup));
            }
            MarkupNode::Raw(markup) | MarkupNode::Placeholder(markup) => {
                siblings.push(UnitNode::Verbatim(markup.clone()));
            }
        }
    }

    /// Appends a leaf, merging it into the previous leaf when the combined
    /// markup fits the budget. Whitespace between the two leaves is folded
    /// into the merged content.
    fn push_leaf(&self, siblings: &mut Vec<UnitNode>, content: String, cost: usize) {
        let gap_start = siblings
            .iter()
            .rposition(|node| !is_whitespace_gap(node))
            .map_or(0, |i| i + 1);

        if let Some(UnitNode::Leaf(previous)) = gap_start.checked_sub(1).map(|i| &siblings[i]) {
            let mut merged = previous.content.clone();
            for node in &siblings[gap_start..] {
                if let UnitNode::Verbatim(gap) = node {
                    merged.push_str(gap);
                }
            }
            merged.push_str(&content);

            let merged_cost = self.counter.count(&merged);
            if merged_cost <= self.budget {
                siblings.truncate(gap_start);
                if let Some(UnitNode::Leaf(previous)) = siblings.last_mut() {
                    previous.content = merged;
                    previous.cost = merged_cost;
                }
                return;
            }
        }

        siblings.push(UnitNode::Leaf(LeafUnit::new(content, cost)));
    }
}

fn is_whitespace_gap(node: &UnitNode) -> bool {
    matches!(node, UnitNode::Verbatim(text) if text.trim().is_empty())
}

/// Builds the unit tree for `body` with the given counter and budget.
pub fn build_unit_tree(body: &ElementNode, counter: &dyn CostCounter, budget: usize) -> UnitTree {
    UnitTreeBuilder::new(counter, budget).build(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CharCounter;
    use crate::markup::Syntax;
    use scraper::Html;

    fn body_of(html: &str) -> ElementNode {
        let fragment = Html::parse_fragment(html);
        ElementNode::from_parsed(fragment.root_element(), Syntax::Html, &mut |_| None)
    }

    fn build(html: &str, budget: usize) -> UnitTree {
        build_unit_tree(&body_of(html), &CharCounter, budget)
    }

    fn leaf_contents(tree: &UnitTree) -> Vec<String> {
        tree.leaves().iter().map(|leaf| leaf.content.clone()).collect()
    }

    #[test]
    fn test_whole_subtree_fits_as_one_leaf() {
        let tree = build("<div><p>Hello</p><p>World</p></div>", 1000);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(leaf_contents(&tree), vec!["<div><p>Hello</p><p>World</p></div>"]);
        assert_eq!(tree.branch_count(), 0);
    }

    #[test]
    fn test_adjacent_leaves_merge() {
        let tree = build("<span>A</span><span>B</span>", 100);
        assert_eq!(leaf_contents(&tree), vec!["<span>A</span><span>B</span>"]);
        assert_eq!(tree.leaves()[0].cost, 28);
    }

    #[test]
    fn test_merge_stops_at_budget() {
        // Each span is 14 characters; two fit in 30, three do not.
        let tree = build("<span>A</span><span>B</span><span>C</span>", 30);
        assert_eq!(
            leaf_contents(&tree),
            vec!["<span>A</span><span>B</span>", "<span>C</span>"]
        );
    }

    #[test]
    fn test_whitespace_between_leaves_is_folded_into_merge() {
        let tree = build("<p>A</p>\n  <p>B</p>", 100);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(leaf_contents(&tree), vec!["<p>A</p>\n  <p>B</p>"]);
    }

    #[test]
    fn test_whitespace_kept_when_merge_fails() {
        let tree = build("<p>AAAA</p>\n<p>BBBB</p>", 12);
        assert_eq!(tree.children.len(), 3);
        assert_eq!(tree.children[1], UnitNode::Verbatim("\n".to_string()));
    }

    #[test]
    fn test_oversized_parent_becomes_branch() {
        let html = "<div class=\"c\"><p>first paragraph</p><p>second paragraph</p></div>";
        let tree = build(html, 30);
        assert_eq!(tree.children.len(), 1);
        let UnitNode::Branch(branch) = &tree.children[0] else {
            panic!("expected branch, got {:?}", tree.children[0]);
        };
        assert_eq!(branch.open_tag, "<div class=\"c\">");
        assert_eq!(branch.close_tag, "</div>");
        assert_eq!(
            leaf_contents(&tree),
            vec!["<p>first paragraph</p>", "<p>second paragraph</p>"]
        );
    }

    #[test]
    fn test_free_text_in_branch_is_a_leaf() {
        let tree = build("<div>lead <b>bold text here</b> tail</div>", 20);
        let UnitNode::Branch(branch) = &tree.children[0] else {
            panic!("expected branch");
        };
        assert_eq!(
            branch.children,
            vec![
                UnitNode::Leaf(LeafUnit::new("lead ".to_string(), 5)),
                UnitNode::Leaf(LeafUnit::new("<b>bold text here</b>".to_string(), 21)),
                UnitNode::Leaf(LeafUnit::new(" tail".to_string(), 5)),
            ]
        );
    }

    #[test]
    fn test_free_text_merges_with_neighbours() {
        let tree = build("<div>lead <b>bold</b> tail and more</div>", 30);
        let UnitNode::Branch(branch) = &tree.children[0] else {
            panic!("expected branch");
        };
        assert_eq!(
            leaf_contents(&tree),
            vec!["lead <b>bold</b> tail and more"]
        );
        assert_eq!(branch.children.len(), 1);
    }

    #[test]
    fn test_body_content_that_fits_is_one_leaf() {
        let tree = build("Chapter one begins here.<p>para</p>", 100);
        assert_eq!(
            tree.children,
            vec![UnitNode::Leaf(LeafUnit::new(
                "Chapter one begins here.<p>para</p>".to_string(),
                35
            ))]
        );

        let text_only = build("Hello <b>world</b>", 100);
        assert_eq!(leaf_contents(&text_only), vec!["Hello <b>world</b>"]);
    }

    #[test]
    fn test_oversized_body_keeps_leading_text() {
        let tree = build("Chapter one begins here.<p>first paragraph</p>", 30);
        assert_eq!(
            leaf_contents(&tree),
            vec!["Chapter one begins here.", "<p>first paragraph</p>"]
        );
        assert_eq!(tree.branch_count(), 0);
    }

    #[test]
    fn test_body_without_text_is_verbatim() {
        let tree = build("<!-- note -->\n<br>", 100);
        assert_eq!(
            tree.children,
            vec![UnitNode::Verbatim("<!-- note -->\n<br>".to_string())]
        );
        assert!(build("", 100).children.is_empty());
    }

    #[test]
    fn test_oversized_atomic_leaf_is_not_split() {
        let word = "x".repeat(100_000);
        let html = format!("<p>{word}</p>");
        let tree = build(&html, 100);
        assert_eq!(tree.leaf_count(), 1);
        let leaf = tree.leaves()[0];
        assert_eq!(leaf.content, html);
        assert_eq!(leaf.cost, 100_007);
    }

    #[test]
    fn test_leaves_fit_budget_or_are_atomic() {
        let html = "<article><h1>Title</h1><section><p>one two three</p><p>four <em>five</em> six</p>\
                    <ul><li>alpha</li><li>beta</li><li>gamma delta epsilon zeta</li></ul></section>\
                    <p>closing words of the chapter</p></article>";
        for budget in [10, 25, 40, 80, 500] {
            let tree = build(html, budget);
            for leaf in tree.leaves() {
                let parsed = body_of(&leaf.content);
                let elements: Vec<&ElementNode> = parsed
                    .children
                    .iter()
                    .filter_map(|child| match child {
                        MarkupNode::Element(element) => Some(element),
                        _ => None,
                    })
                    .collect();
                let atomic = elements.is_empty()
                    || (elements.len() == 1 && !elements[0].has_element_children());
                assert!(
                    leaf.cost <= budget || atomic,
                    "leaf {:?} exceeds budget {budget}",
                    leaf.content
                );
                assert_eq!(leaf.cost, CharCounter.count(&leaf.content));
            }
        }
    }

    #[test]
    fn test_branches_keep_source_nesting() {
        let html = "<article><section><p>aaaaaaaaaa</p><p>bbbbbbbbbb</p></section>\
                    <section><p>cccccccccc</p></section></article>";
        let tree = build(html, 30);
        fn shape(nodes: &[UnitNode]) -> Vec<String> {
            nodes
                .iter()
                .filter_map(|node| match node {
                    UnitNode::Branch(branch) => Some(format!(
                        "{}[{}]",
                        branch.open_tag,
                        shape(&branch.children).join(",")
                    )),
                    _ => None,
                })
                .collect()
        }
        assert_eq!(
            shape(&tree.children),
            vec!["<article>[<section>[],<section>[]]".to_string()]
        );
        assert_eq!(tree.branch_count(), 3);
    }

    #[test]
    fn test_placeholders_are_verbatim_inside_branches() {
        let html = "<div><p>some words here</p>†1†<p>more words here</p></div>";
        let tree = build(html, 30);
        let UnitNode::Branch(branch) = &tree.children[0] else {
            panic!("expected branch");
        };
        assert_eq!(branch.children.len(), 3);
        assert_eq!(branch.children[1], UnitNode::Verbatim("†1†".to_string()));
    }
}
