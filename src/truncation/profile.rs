//! Model profiles: context size, completion reserve and encoding per model.
//!
//! Built-in entries can be overridden or extended from `[models.<name>]` in the
//! config file. Lookups never fall back to a default profile.

use std::collections::{BTreeMap, HashMap};

use super::TruncationError;
use super::tokenizer::Encoding;
use crate::config::ModelProfileConfig;

/// Reserved completion size for config entries that name a model with no
/// built-in profile and leave the field out.
pub const DEFAULT_RESERVED_COMPLETION_TOKENS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub name: String,
    pub max_context_tokens: usize,
    pub reserved_completion_tokens: usize,
    pub encoding: Encoding,
}

impl ModelProfile {
    pub fn new(
        name: impl Into<String>,
        max_context_tokens: usize,
        reserved_completion_tokens: usize,
        encoding: Encoding,
    ) -> Self {
        Self {
            name: name.into(),
            max_context_tokens,
            reserved_completion_tokens,
            encoding,
        }
    }
}

const BUILTIN: &[(&str, usize, usize, Encoding)] = &[
    ("gpt-3.5-turbo", 16_385, 500, Encoding::Cl100kBase),
    ("gpt-4", 8_192, 500, Encoding::Cl100kBase),
    ("gpt-4-turbo", 128_000, 1_024, Encoding::Cl100kBase),
    ("gpt-4o", 128_000, 1_024, Encoding::O200kBase),
    ("gpt-4o-mini", 128_000, 1_024, Encoding::O200kBase),
    ("llama3.1", 8_192, 512, Encoding::Chars),
];

/// Static lookup of model profiles by name. Built once at startup and only
/// read afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModelTable {
    profiles: BTreeMap<String, ModelProfile>,
}

impl ModelTable {
    pub fn builtin() -> Self {
        let profiles = BUILTIN
            .iter()
            .map(|&(name, ctx, reserved, encoding)| {
                (name.to_string(), ModelProfile::new(name, ctx, reserved, encoding))
            })
            .collect();
        Self { profiles }
    }

    /// Built-in profiles with `[models.<name>]` entries from the config laid on
    /// top. Fields an entry leaves out keep the built-in value.
    pub fn from_config(
        overrides: Option<&HashMap<String, ModelProfileConfig>>,
    ) -> Result<Self, TruncationError> {
        let mut table = Self::builtin();
        let Some(overrides) = overrides else {
            return Ok(table);
        };
        for (name, entry) in overrides {
            let base = table.profiles.get(name);
            let encoding = match (&entry.encoding, base) {
                (Some(enc), _) => Encoding::from_name(enc)?,
                (None, Some(b)) => b.encoding,
                (None, None) => Encoding::Cl100kBase,
            };
            let reserved = entry
                .reserved_completion_tokens
                .or(base.map(|b| b.reserved_completion_tokens))
                .unwrap_or(DEFAULT_RESERVED_COMPLETION_TOKENS);
            let profile = ModelProfile::new(name.clone(), entry.max_context_tokens, reserved, encoding);
            tracing::debug!(?profile, "model profile from config");
            table.insert(profile);
        }
        Ok(table)
    }

    pub fn insert(&mut self, profile: ModelProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Result<&ModelProfile, TruncationError> {
        self.profiles
            .get(name)
            .ok_or_else(|| TruncationError::UnknownModel(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelProfile> {
        self.profiles.values()
    }
}
