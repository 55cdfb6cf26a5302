//! Prefix selection for documents that exceed their token budget.
//!
//! Only the head of the document is kept: titles, headers and early sections
//! tend to carry the context a question needs. This is a heuristic, not an
//! optimum; head-and-tail windows are not implemented.

use super::TruncationError;
use super::tokenizer::{Encoding, tokenizer_for};

/// Appended to a cut document so the reader can tell content is missing.
pub const TRUNCATION_MARKER: &str =
    "\n\n[... document truncated to fit the model context window ...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationDecision {
    pub truncated: bool,
    pub kept_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub decision: TruncationDecision,
    /// Document text to place in the prompt, ending with [`TRUNCATION_MARKER`]
    /// when cut.
    pub segment: String,
}

pub fn select(
    document_text: &str,
    available_budget: usize,
    encoding: Encoding,
) -> Result<Selection, TruncationError> {
    let tokenizer = tokenizer_for(encoding)?;
    let ids = tokenizer.encode(document_text);
    let total = ids.len();

    if total <= available_budget {
        return Ok(Selection {
            decision: TruncationDecision {
                truncated: false,
                kept_tokens: total,
                total_tokens: total,
            },
            segment: document_text.to_string(),
        });
    }

    let mut segment = tokenizer.decode(&ids[..available_budget])?;
    segment.push_str(TRUNCATION_MARKER);
    tracing::debug!(
        encoding = %encoding,
        kept = available_budget,
        total,
        "document truncated to token budget"
    );
    Ok(Selection {
        decision: TruncationDecision {
            truncated: true,
            kept_tokens: available_budget,
            total_tokens: total,
        },
        segment,
    })
}
