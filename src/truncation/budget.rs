//! Token budget left for the document once the completion reserve, fixed
//! prompt overhead and [`SAFETY_MARGIN`] are taken out of the context window.

use super::TruncationError;
use super::profile::ModelProfile;
use super::tokenizer::{Encoding, tokenizer_for};

/// Tokens held back for estimation error and request scaffolding that the
/// overhead text does not include.
pub const SAFETY_MARGIN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetBreakdown {
    pub max_context_tokens: usize,
    pub reserved_completion_tokens: usize,
    pub overhead_tokens: usize,
    pub safety_margin: usize,
    pub available: usize,
}

impl BudgetBreakdown {
    pub fn from_overhead_tokens(profile: &ModelProfile, overhead_tokens: usize) -> Self {
        let available = profile
            .max_context_tokens
            .saturating_sub(profile.reserved_completion_tokens)
            .saturating_sub(overhead_tokens)
            .saturating_sub(SAFETY_MARGIN);
        Self {
            max_context_tokens: profile.max_context_tokens,
            reserved_completion_tokens: profile.reserved_completion_tokens,
            overhead_tokens,
            safety_margin: SAFETY_MARGIN,
            available,
        }
    }
}

pub fn breakdown(
    profile: &ModelProfile,
    fixed_overhead_text: &str,
    encoding: Encoding,
) -> Result<BudgetBreakdown, TruncationError> {
    let overhead_tokens = tokenizer_for(encoding)?.count_tokens(fixed_overhead_text);
    Ok(BudgetBreakdown::from_overhead_tokens(profile, overhead_tokens))
}

/// Tokens left for the document body once completion space, overhead and the
/// safety margin are taken out. Never negative.
pub fn available_document_budget(
    profile: &ModelProfile,
    fixed_overhead_text: &str,
    encoding: Encoding,
) -> Result<usize, TruncationError> {
    Ok(breakdown(profile, fixed_overhead_text, encoding)?.available)
}
