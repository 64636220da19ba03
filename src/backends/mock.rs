//! Deterministic offline translator.
//!
//! Used by the test suite and by `--dry-run`. It never touches the network
//! and only ever rewrites text between tags, so markup and placeholder tokens
//! come back exactly as they were sent.

use crate::error::TranslationError;
use crate::translator::Translate;
use async_trait::async_trait;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;

/// Tags and placeholder tokens, which the mock leaves alone.
static PROTECTED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|†\d+†|&[a-zA-Z#0-9]+;").expect("Invalid PROTECTED_REGEX"));

/// How the mock answers a request.
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Return the input unchanged.
    Identity,

    /// Uppercase every text run.
    Uppercase,

    /// Replace known phrases; uppercase the text when none of them occur.
    Glossary(Vec<(String, String)>),

    /// Fail every request.
    Failing,

    /// Fail requests whose text contains the needle, echo the rest.
    FailOn(String),
}

/// Offline implementation of [`Translate`].
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn identity() -> Self {
        Self::new(MockMode::Identity)
    }

    /// Creates a glossary translator from `(source, target)` phrase pairs.
    pub fn glossary<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(source, target)| (source.into(), target.into()))
            .collect();
        Self::new(MockMode::Glossary(entries))
    }

    pub fn failing() -> Self {
        Self::new(MockMode::Failing)
    }

    /// Simulates network latency on every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn answer(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String, TranslationError> {
        match &self.mode {
            MockMode::Identity => Ok(text.to_string()),
            MockMode::Uppercase => Ok(map_text(text, |run| run.to_uppercase())),
            MockMode::Glossary(entries) => {
                let matched = entries
                    .iter()
                    .any(|(source, _)| !source.is_empty() && text.contains(source.as_str()));
                if matched {
                    Ok(map_text(text, |run| {
                        entries.iter().fold(run.to_string(), |acc, (source, target)| {
                            if source.is_empty() {
                                acc
                            } else {
                                acc.replace(source.as_str(), target)
                            }
                        })
                    }))
                } else {
                    Ok(map_text(text, |run| run.to_uppercase()))
                }
            }
            MockMode::Failing => Err(TranslationError::BackendUnavailable(format!(
                "mock backend refuses {source_lang} -> {target_lang}"
            ))),
            MockMode::FailOn(needle) if text.contains(needle.as_str()) => Err(
                TranslationError::BackendUnavailable(format!("mock backend failed on '{needle}'")),
            ),
            MockMode::FailOn(_) => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl Translate for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(text.to_string());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer(text, source_lang, target_lang)
    }
}

/// Applies `f` to every run of text outside tags, entities and tokens.
fn map_text<F>(markup: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for m in PROTECTED_REGEX.find_iter(markup) {
        if m.start() > last {
            out.push_str(&f(&markup[last..m.start()]));
        }
        out.push_str(m.as_str());
        last = m.end();
    }
    if last < markup.len() {
        out.push_str(&f(&markup[last..]));
    }
    out
}
