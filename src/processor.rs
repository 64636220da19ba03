//! Document translation pipeline.
//!
//! `html -> SourceDocument -> SkipTagFilter -> UnitTreeBuilder ->
//! translate_tree -> restore -> html`
//!
//! A document either translates completely or the call fails; partially
//! translated output is never returned.

use crate::cost::{CostCounter, LimitType};
use crate::document::{DocumentKind, SourceDocument};
use crate::error::ProcessError;
use crate::filter::{SkipTagFilter, SkipTagSet};
use crate::reassemble::restore;
use crate::translator::{Translate, translate_tree};
use crate::unit_tree::build_unit_tree;
use crate::vault::PlaceholderVault;

/// Settings for [`DocumentProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Maximum cost of a single translation request.
    pub budget: usize,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
    pub skip_tags: SkipTagSet,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            budget: 4000,
            concurrency: 1,
            skip_tags: SkipTagSet::default(),
        }
    }
}

impl ProcessOptions {
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }
}

/// Result of translating one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    /// The translated document.
    pub html: String,
    pub kind: DocumentKind,
    /// Leaves the body was divided into.
    pub leaf_count: usize,
    /// Elements that were split into their children.
    pub branch_count: usize,
    /// Leaves sent to the backend.
    pub requests: usize,
    /// Skip-tagged subtrees protected from translation.
    pub placeholder_count: usize,
    /// Placeholder tokens present in the output that the vault could not
    /// resolve.
    pub unresolved_placeholders: Vec<String>,
}

/// Translates whole documents with a fixed budget and counter.
pub struct DocumentProcessor {
    options: ProcessOptions,
    counter: Box<dyn CostCounter>,
}

impl DocumentProcessor {
    pub fn new(options: ProcessOptions, counter: impl CostCounter + 'static) -> Self {
        Self {
            options,
            counter: Box::new(counter),
        }
    }

    /// Creates a processor that measures cost in `limit_type` units.
    pub fn with_limit_type(options: ProcessOptions, limit_type: LimitType) -> Self {
        Self {
            options,
            counter: limit_type.counter(),
        }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Translates `html` from `source_lang` to `target_lang`.
    pub async fn process(
        &self,
        html: &str,
        source_lang: &str,
        target_lang: &str,
        translator: &dyn Translate,
    ) -> Result<ProcessedDocument, ProcessError> {
        run(
            html,
            source_lang,
            target_lang,
            &self.options,
            self.counter.as_ref(),
            translator,
        )
        .await
    }
}

/// Translates `html` with the default skip tags and sequential requests.
pub async fn process_document(
    html: &str,
    source_lang: &str,
    target_lang: &str,
    budget: usize,
    counter: &dyn CostCounter,
    translator: &dyn Translate,
) -> Result<String, ProcessError> {
    let options = ProcessOptions::with_budget(budget);
    let processed = run(html, source_lang, target_lang, &options, counter, translator).await?;
    Ok(processed.html)
}

async fn run(
    html: &str,
    source_lang: &str,
    target_lang: &str,
    options: &ProcessOptions,
    counter: &dyn CostCounter,
    translator: &dyn Translate,
) -> Result<ProcessedDocument, ProcessError> {
    if options.budget == 0 {
        return Err(ProcessError::InvalidOptions(
            "budget must be greater than 0".to_string(),
        ));
    }

    // The parse is not Send; keep it out of the await below.
    let (mut tree, shell, kind, vault) = {
        let document = SourceDocument::parse(html);
        let mut vault = PlaceholderVault::new();
        let body = SkipTagFilter::new(&options.skip_tags, &mut vault)
            .with_syntax(document.syntax())
            .filter(document.body());
        let tree = build_unit_tree(&body, counter, options.budget);
        (tree, document.shell(), document.kind(), vault)
    };

    let leaf_count = tree.leaf_count();
    let branch_count = tree.branch_count();
    tracing::debug!(
        ?kind,
        leaves = leaf_count,
        branches = branch_count,
        placeholders = vault.len(),
        budget = options.budget,
        "document divided"
    );

    let stats = translate_tree(
        &mut tree,
        translator,
        source_lang,
        target_lang,
        options.concurrency,
    )
    .await?;

    let html = shell.wrap(&restore(&tree, &vault));
    let unresolved_placeholders = vault.find_unresolved(&html);
    if !unresolved_placeholders.is_empty() {
        tracing::warn!(
            tokens = ?unresolved_placeholders,
            "translated document still contains placeholder tokens"
        );
    }

    Ok(ProcessedDocument {
        html,
        kind,
        leaf_count,
        branch_count,
        requests: stats.requests,
        placeholder_count: vault.len(),
        unresolved_placeholders,
    })
}
