//! Token-budgeted truncation of a document so it fits a model's context window.
//!
//! Leaf-first: [`tokenizer`] turns text into token ids, [`budget`] works out how
//! many ids the document may use, [`selector`] keeps a prefix of that size and
//! [`prompt`] renders the final user prompt.

pub mod budget;
pub mod profile;
pub mod prompt;
pub mod selector;
pub mod tokenizer;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TruncationError {
    #[error("encoding unavailable: {0}")]
    EncodingUnavailable(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("template: {0}")]
    Template(String),
}
