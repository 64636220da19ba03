//! Reassembly of translated units into markup.

use crate::unit_tree::{UnitNode, UnitTree};
use crate::vault::PlaceholderVault;

/// Rebuilds the body content from a translated unit tree.
///
/// Leaves contribute their translation (or their source when untranslated),
/// branches wrap their children in the original tag pair, and every
/// placeholder is restored from `vault`. Units that come out empty are still
/// emitted in place.
pub fn restore(tree: &UnitTree, vault: &PlaceholderVault) -> String {
    let mut out = String::new();
    for node in &tree.children {
        restore_node(node, vault, &mut out);
    }
    out
}

fn restore_node(node: &UnitNode, vault: &PlaceholderVault, out: &mut String) {
    match node {
        UnitNode::Leaf(leaf) => {
            let text = leaf.translated.as_deref().unwrap_or(&leaf.content);
            out.push_str(&vault.resolve(text));
        }
        UnitNode::Branch(branch) => {
            out.push_str(&branch.open_tag);
            for child in &branch.children {
                restore_node(child, vault, out);
            }
            out.push_str(&branch.close_tag);
        }
        UnitNode::Verbatim(markup) => out.push_str(&vault.resolve(markup)),
    }
}
