//! Translation capability and leaf translation.
//!
//! The engine does not know which backend it talks to. Anything that
//! implements [`Translate`] can be plugged in; retry and rate-limit policy
//! belong to the implementation, not to the engine.

use crate::cleanup::clean_translation;
use crate::error::TranslationError;
use crate::unit_tree::UnitTree;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use std::sync::LazyLock;

/// Tags and placeholder tokens, removed when checking for translatable text.
static MARKUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|†\d+†|&nbsp;|&#160;").expect("Invalid MARKUP_REGEX"));

/// A translation backend.
#[async_trait]
pub trait Translate: Send + Sync {
    /// Translates `text` (HTML markup) from `source_lang` to `target_lang`.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

/// Counts of work done by [`translate_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    /// Leaves sent to the backend.
    pub requests: usize,
    /// Leaves kept as-is because they hold no translatable text.
    pub skipped: usize,
}

/// Translates every leaf of `tree`, storing the cleaned response on the leaf.
///
/// Leading and trailing whitespace of a leaf is not sent; it is put back
/// around the cleaned response, which is trimmed.
///
/// Up to `concurrency` requests are in flight at once (`0` is treated as 1).
/// The first failure is returned and the remaining requests are dropped; the
/// tree must then be considered incomplete.
pub async fn translate_tree(
    tree: &mut UnitTree,
    translator: &dyn Translate,
    source_lang: &str,
    target_lang: &str,
    concurrency: usize,
) -> Result<TranslationStats, TranslationError> {
    let mut stats = TranslationStats::default();
    let mut pending = Vec::new();

    for leaf in tree.leaves_mut() {
        if has_translatable_text(&leaf.content) {
            pending.push(leaf);
        } else {
            leaf.translated = Some(leaf.content.clone());
            stats.skipped += 1;
        }
    }
    stats.requests = pending.len();

    tracing::debug!(
        requests = stats.requests,
        skipped = stats.skipped,
        concurrency,
        "translating leaves"
    );

    stream::iter(pending)
        .map(Ok::<_, TranslationError>)
        .try_for_each_concurrent(concurrency.max(1), |leaf| async move {
            let response = translator
                .translate(leaf.content.trim(), source_lang, target_lang)
                .await?;
            leaf.translated = Some(keep_edges(&leaf.content, &clean_translation(&response)));
            Ok::<(), TranslationError>(())
        })
        .await?;

    Ok(stats)
}

/// Surrounds `translated` with the whitespace `source` starts and ends with.
fn keep_edges(source: &str, translated: &str) -> String {
    let lead = &source[..source.len() - source.trim_start().len()];
    let trail = &source[source.trim_end().len()..];
    format!("{lead}{translated}{trail}")
}

/// Returns true if `markup` has text outside tags and placeholder tokens.
pub fn has_translatable_text(markup: &str) -> bool {
    MARKUP_REGEX
        .replace_all(markup, "")
        .chars()
        .any(|c| !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_tree::{LeafUnit, UnitNode};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Uppercase {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translate for Uppercase {
        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("```html\n{}\n```", text.to_uppercase()))
        }
    }

    struct FailOn {
        needle: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Translate for FailOn {
        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            self.seen.lock().unwrap().push(text.to_string());
            if text.contains(self.needle) {
                Err(TranslationError::RateLimitExceeded("slow down".to_string()))
            } else {
                Ok(text.to_string())
            }
        }
    }

    fn leaf(content: &str) -> UnitNode {
        UnitNode::Leaf(LeafUnit {
            content: content.to_string(),
            cost: content.len(),
            translated: None,
        })
    }

    #[test]
    fn test_has_translatable_text() {
        assert!(has_translatable_text("<p>Hello</p>"));
        assert!(!has_translatable_text("<p> †1† </p>"));
        assert!(!has_translatable_text("<div><br></div>\n"));
        assert!(!has_translatable_text("<p>&nbsp;</p>"));
        assert!(has_translatable_text("†1† caption"));
    }

    #[tokio::test]
    async fn test_every_leaf_is_translated_and_cleaned() {
        let mut tree = UnitTree {
            children: vec![
                leaf("<p>one</p>"),
                UnitNode::Verbatim("\n".to_string()),
                UnitNode::Branch(crate::unit_tree::BranchUnit {
                    open_tag: "<div>".to_string(),
                    close_tag: "</div>".to_string(),
                    children: vec![leaf("<p>two</p>"), leaf("<p>three</p>")],
                }),
            ],
        };
        let translator = Uppercase {
            calls: AtomicUsize::new(0),
        };

        let stats = translate_tree(&mut tree, &translator, "en", "fr", 4)
            .await
            .unwrap();

        assert_eq!(stats.requests, 3);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 3);
        let translated: Vec<_> = tree
            .leaves()
            .iter()
            .map(|leaf| leaf.translated.clone().unwrap())
            .collect();
        assert_eq!(translated, vec!["<P>ONE</P>", "<P>TWO</P>", "<P>THREE</P>"]);
    }

    #[tokio::test]
    async fn test_leaves_without_text_are_not_sent() {
        let mut tree = UnitTree {
            children: vec![leaf("<figure>†1†</figure>"), leaf("<p>caption</p>")],
        };
        let translator = Uppercase {
            calls: AtomicUsize::new(0),
        };

        let stats = translate_tree(&mut tree, &translator, "en", "fr", 1)
            .await
            .unwrap();

        assert_eq!(stats, TranslationStats { requests: 1, skipped: 1 });
        assert_eq!(
            tree.leaves()[0].translated.as_deref(),
            Some("<figure>†1†</figure>")
        );
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let mut tree = UnitTree {
            children: vec![leaf("<p>fine</p>"), leaf("<p>boom</p>"), leaf("<p>later</p>")],
        };
        let translator = FailOn {
            needle: "boom",
            seen: Mutex::new(Vec::new()),
        };

        let err = translate_tree(&mut tree, &translator, "en", "de", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::RateLimitExceeded(_)));
        assert_eq!(tree.leaves()[0].translated.as_deref(), Some("<p>fine</p>"));
        assert_eq!(tree.leaves()[1].translated, None);
        // Sequential mode stops at the first failure.
        assert_eq!(translator.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_sequential() {
        let mut tree = UnitTree {
            children: vec![leaf("<p>a</p>"), leaf("<p>b</p>")],
        };
        let translator = Uppercase {
            calls: AtomicUsize::new(0),
        };
        let stats = translate_tree(&mut tree, &translator, "en", "fr", 0)
            .await
            .unwrap();
        assert_eq!(stats.requests, 2);
    }

    #[tokio::test]
    async fn test_edge_whitespace_survives_cleanup() {
        let mut tree = UnitTree {
            children: vec![leaf("\n  Opening words "), leaf("<p>x</p>")],
        };
        let translator = FailOn {
            needle: "never",
            seen: Mutex::new(Vec::new()),
        };

        translate_tree(&mut tree, &translator, "en", "fr", 1)
            .await
            .unwrap();

        assert_eq!(translator.seen.lock().unwrap()[0], "Opening words");
        assert_eq!(
            tree.leaves()[0].translated.as_deref(),
            Some("\n  Opening words ")
        );
    }

    #[test]
    fn test_numeric_nbsp_is_not_text() {
        assert!(!has_translatable_text("<p>&#160;</p>"));
    }
}
