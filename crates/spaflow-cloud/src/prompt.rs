//! Operator confirmation capability

use crate::error::Result;

/// Asks the operator a yes/no question.
///
/// Reconcilers that might modify something they do not clearly own (an
/// untagged bucket, a DNS record pointing elsewhere) go through this trait so
/// the CLI can answer interactively and tests can answer deterministically.
pub trait Confirm: Send + Sync {
    /// `default` is the answer assumed when the operator just hits enter.
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;
}

/// Answers every question with a fixed value. Used for non-interactive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoConfirm {
    pub answer: bool,
}

impl AutoConfirm {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Confirm for AutoConfirm {
    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        tracing::info!(
            "{} -> {}",
            question,
            if self.answer { "yes" } else { "no" }
        );
        Ok(self.answer)
    }
}
