//! Budget cost counting.
//!
//! The engine measures markup with a caller-supplied [`CostCounter`]; the
//! counters here cover the two limit types translation backends use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Converts a markup string into the cost checked against the budget.
///
/// Counters should be monotonic (appending text never lowers the cost) and
/// deterministic enough for packing decisions.
pub trait CostCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

impl<F> CostCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Counts Unicode scalar values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCounter;

impl CostCounter for CharCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Estimates model tokens without a tokenizer.
///
/// ASCII runs average about four characters per token; other characters
/// (CJK in particular) are counted as one token each.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl CostCounter for TokenEstimator {
    fn count(&self, text: &str) -> usize {
        let (ascii, other) = text.chars().fold((0usize, 0usize), |(a, o), c| {
            if c.is_ascii() { (a + 1, o) } else { (a, o + 1) }
        });
        ascii.div_ceil(4) + other
    }
}

/// Unit in which a backend expresses its request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitType {
    #[default]
    Chars,
    Tokens,
}

impl LimitType {
    /// Returns the counter measuring in this unit.
    pub fn counter(self) -> Box<dyn CostCounter> {
        match self {
            LimitType::Chars => Box::new(CharCounter),
            LimitType::Tokens => Box::new(TokenEstimator),
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitType::Chars => write!(f, "chars"),
            LimitType::Tokens => write!(f, "tokens"),
        }
    }
}

impl FromStr for LimitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chars" | "characters" => Ok(LimitType::Chars),
            "tokens" => Ok(LimitType::Tokens),
            other => Err(format!("unknown limit type '{other}' (expected chars or tokens)")),
        }
    }
}
