//! Translation backends.
//!
//! Each backend implements [`Translate`]; the engine never depends on a
//! concrete one.

pub mod mock;
pub mod openai;

pub use mock::{MockMode, MockTranslator};
pub use openai::OpenAiTranslator;

use crate::config::Config;
use crate::error::TranslationError;
use crate::translator::Translate;

/// Selects the backend for a run: the offline identity mock for dry runs,
/// the configured API otherwise.
pub fn from_config(config: &Config, dry_run: bool) -> Result<Box<dyn Translate>, TranslationError> {
    if dry_run {
        return Ok(Box::new(MockTranslator::identity()));
    }
    Ok(Box::new(OpenAiTranslator::from_config(config)?))
}
