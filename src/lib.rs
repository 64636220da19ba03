//! epubox - HTML-aware translation of EPUB chapter documents.
//!
//! This library provides functionality for:
//! - Protecting code, media and other untranslatable subtrees behind placeholder tokens
//! - Dividing a chapter body into units that fit a translation budget
//! - Translating the units through a pluggable backend and reassembling the markup

pub mod backends;
pub mod cleanup;
pub mod config;
pub mod console;
pub mod cost;
pub mod document;
pub mod error;
pub mod filter;
pub mod markup;
pub mod processor;
pub mod reassemble;
pub mod translator;
pub mod unit_tree;
pub mod utils;
pub mod vault;

// Re-export commonly used types
pub use backends::{MockMode, MockTranslator, OpenAiTranslator};
pub use config::Config;
pub use console::Console;
pub use cost::{CharCounter, CostCounter, LimitType, TokenEstimator};
pub use error::{ConfigError, ProcessError, TranslationError};
pub use filter::SkipTagSet;
pub use processor::{DocumentProcessor, ProcessOptions, ProcessedDocument, process_document};
pub use translator::Translate;
pub use vault::PlaceholderVault;
