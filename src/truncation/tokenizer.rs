//! Named encodings and the process-wide tokenizer cache.
//!
//! BPE tables come from `tiktoken-rs` and are loaded on first use, once per
//! encoding. The `chars` encoding counts one token per Unicode scalar value and
//! is exact in both directions.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tiktoken_rs::CoreBPE;

use super::TruncationError;

pub type TokenId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Cl100kBase,
    O200kBase,
    P50kBase,
    R50kBase,
    Chars,
}

impl Encoding {
    pub const ALL: [Encoding; 5] = [
        Encoding::Cl100kBase,
        Encoding::O200kBase,
        Encoding::P50kBase,
        Encoding::R50kBase,
        Encoding::Chars,
    ];

    pub fn from_name(name: &str) -> Result<Self, TruncationError> {
        match name.trim() {
            "cl100k_base" => Ok(Encoding::Cl100kBase),
            "o200k_base" => Ok(Encoding::O200kBase),
            "p50k_base" => Ok(Encoding::P50kBase),
            "r50k_base" => Ok(Encoding::R50kBase),
            "chars" => Ok(Encoding::Chars),
            other => Err(TruncationError::EncodingUnavailable(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::O200kBase => "o200k_base",
            Encoding::P50kBase => "p50k_base",
            Encoding::R50kBase => "r50k_base",
            Encoding::Chars => "chars",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &str;
    fn encode(&self, text: &str) -> Vec<TokenId>;
    /// Decodes `ids` into text. A prefix of a valid sequence decodes to a
    /// prefix of the original text.
    fn decode(&self, ids: &[TokenId]) -> Result<String, TruncationError>;

    fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn name(&self) -> &str {
        Encoding::Chars.name()
    }

    fn encode(&self, text: &str) -> Vec<TokenId> {
        text.chars().map(|c| c as TokenId).collect()
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TruncationError> {
        ids.iter()
            .map(|&id| {
                char::from_u32(id)
                    .ok_or_else(|| TruncationError::Decode(format!("invalid char token {id}")))
            })
            .collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count()
    }
}

pub struct BpeTokenizer {
    encoding: Encoding,
    bpe: CoreBPE,
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> &str {
        self.encoding.name()
    }

    // Special-token strings inside a document are plain text here.
    fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|id| id as TokenId)
            .collect()
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TruncationError> {
        let err = match self.decode_raw(ids) {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        // A cut prefix may end inside a multi-byte character; drop the trailing
        // ids that hold the incomplete bytes.
        let floor = ids.len().saturating_sub(MAX_SPLIT_CHAR_IDS);
        for end in (floor..ids.len()).rev() {
            if let Ok(text) = self.decode_raw(&ids[..end]) {
                self.check_known(&ids[end..])?;
                tracing::trace!(
                    encoding = %self.encoding,
                    dropped = ids.len() - end,
                    "dropped ids of a split character"
                );
                return Ok(text);
            }
        }
        self.check_known(ids)?;
        Err(TruncationError::Decode(err.to_string()))
    }
}

/// Most ids a single split character can span at the end of a prefix.
const MAX_SPLIT_CHAR_IDS: usize = 3;

impl BpeTokenizer {
    fn decode_raw(&self, ids: &[TokenId]) -> anyhow::Result<String> {
        self.bpe.decode(ids.iter().map(|&id| id as _).collect())
    }

    fn check_known(&self, ids: &[TokenId]) -> Result<(), TruncationError> {
        // tiktoken-rs reports a missing rank as "Invalid token for decoding: <id>";
        // any other single-id failure is a partial UTF-8 sequence.
        for &id in ids {
            if let Err(e) = self.decode_raw(&[id])
                && e.to_string().starts_with("Invalid token")
            {
                return Err(TruncationError::Decode(format!(
                    "unknown token id {id} for {}",
                    self.encoding
                )));
            }
        }
        Ok(())
    }
}

static CL100K_BASE: OnceCell<Arc<BpeTokenizer>> = OnceCell::new();
static O200K_BASE: OnceCell<Arc<BpeTokenizer>> = OnceCell::new();
static P50K_BASE: OnceCell<Arc<BpeTokenizer>> = OnceCell::new();
static R50K_BASE: OnceCell<Arc<BpeTokenizer>> = OnceCell::new();

fn load_bpe<E: fmt::Display>(
    cell: &'static OnceCell<Arc<BpeTokenizer>>,
    encoding: Encoding,
    load: impl FnOnce() -> Result<CoreBPE, E>,
) -> Result<Arc<dyn Tokenizer>, TruncationError> {
    let tokenizer = cell.get_or_try_init(|| {
        tracing::debug!(encoding = %encoding, "loading BPE table");
        load()
            .map(|bpe| Arc::new(BpeTokenizer { encoding, bpe }))
            .map_err(|e| TruncationError::EncodingUnavailable(format!("{encoding}: {e}")))
    })?;
    Ok(tokenizer.clone())
}

/// Returns the shared tokenizer for `encoding`, loading its table on first use.
pub fn tokenizer_for(encoding: Encoding) -> Result<Arc<dyn Tokenizer>, TruncationError> {
    match encoding {
        Encoding::Cl100kBase => load_bpe(&CL100K_BASE, encoding, tiktoken_rs::cl100k_base),
        Encoding::O200kBase => load_bpe(&O200K_BASE, encoding, tiktoken_rs::o200k_base),
        Encoding::P50kBase => load_bpe(&P50K_BASE, encoding, tiktoken_rs::p50k_base),
        Encoding::R50kBase => load_bpe(&R50K_BASE, encoding, tiktoken_rs::r50k_base),
        Encoding::Chars => Ok(Arc::new(CharTokenizer)),
    }
}

pub fn token_count(text: &str, encoding_name: &str) -> Result<usize, TruncationError> {
    let tokenizer = tokenizer_for(Encoding::from_name(encoding_name)?)?;
    Ok(tokenizer.count_tokens(text))
}

pub fn encode(text: &str, encoding_name: &str) -> Result<Vec<TokenId>, TruncationError> {
    let tokenizer = tokenizer_for(Encoding::from_name(encoding_name)?)?;
    Ok(tokenizer.encode(text))
}

pub fn decode(ids: &[TokenId], encoding_name: &str) -> Result<String, TruncationError> {
    let tokenizer = tokenizer_for(Encoding::from_name(encoding_name)?)?;
    tokenizer.decode(ids)
}
