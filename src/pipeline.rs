//! One document analysis, from raw text to the prompt sent to a backend.
//!
//! Everything a run needs arrives through [`PipelineConfig`] and
//! [`AnalysisRequest`]; the only shared state underneath is the read-only
//! tokenizer cache.

use crate::truncation::TruncationError;
use crate::truncation::budget::{self, BudgetBreakdown};
use crate::truncation::profile::ModelTable;
use crate::truncation::prompt;
use crate::truncation::selector::{self, TRUNCATION_MARKER, TruncationDecision};
use crate::truncation::tokenizer::Encoding;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig<'a> {
    pub models: &'a ModelTable,
    pub system_prompt: &'a str,
    pub template: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub model: &'a str,
    pub document: &'a str,
    pub query: &'a str,
    /// Overrides the model profile's encoding.
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrompt {
    pub model: String,
    pub encoding: Encoding,
    pub system: String,
    pub prompt: String,
    pub budget: BudgetBreakdown,
    pub decision: TruncationDecision,
    pub max_completion_tokens: usize,
}

/// Text that is sent whatever the document is: the system prompt plus the
/// template rendered with the marker in place of the document and the
/// truncation notice on.
fn fixed_overhead(cfg: &PipelineConfig<'_>, query: &str) -> Result<String, TruncationError> {
    let skeleton = prompt::assemble(cfg.template, TRUNCATION_MARKER, query, true)?;
    Ok(format!("{}\n{}", cfg.system_prompt, skeleton))
}

pub fn prepare(
    req: &AnalysisRequest<'_>,
    cfg: &PipelineConfig<'_>,
) -> Result<PreparedPrompt, TruncationError> {
    let profile = cfg.models.get(req.model)?;
    let encoding = req.encoding.unwrap_or(profile.encoding);

    let overhead = fixed_overhead(cfg, req.query)?;
    let budget = budget::breakdown(profile, &overhead, encoding)?;
    let selection = selector::select(req.document, budget.available, encoding)?;
    let prompt = prompt::assemble(
        cfg.template,
        &selection.segment,
        req.query,
        selection.decision.truncated,
    )?;

    tracing::info!(
        model = %profile.name,
        encoding = %encoding,
        available = budget.available,
        overhead = budget.overhead_tokens,
        total = selection.decision.total_tokens,
        kept = selection.decision.kept_tokens,
        truncated = selection.decision.truncated,
        "prompt prepared"
    );

    Ok(PreparedPrompt {
        model: profile.name.clone(),
        encoding,
        system: cfg.system_prompt.to_string(),
        prompt,
        budget,
        decision: selection.decision,
        max_completion_tokens: profile.reserved_completion_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truncation::profile::ModelProfile;
    use crate::truncation::prompt::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPLATE, TRUNCATION_NOTICE};
    use crate::truncation::tokenizer::tokenizer_for;

    fn table_with(profile: ModelProfile) -> ModelTable {
        let mut table = ModelTable::builtin();
        table.insert(profile);
        table
    }

    fn config(models: &ModelTable) -> PipelineConfig<'_> {
        PipelineConfig {
            models,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
            template: DEFAULT_TEMPLATE,
        }
    }

    fn prompt_tokens(p: &PreparedPrompt) -> usize {
        let tokenizer = tokenizer_for(p.encoding).unwrap();
        tokenizer.count_tokens(&p.system) + tokenizer.count_tokens(&p.prompt)
    }

    #[test]
    fn unknown_model_stops_before_any_prompt() {
        let models = ModelTable::builtin();
        let req = AnalysisRequest { model: "gpt-9", document: "doc", query: "q", encoding: None };
        assert_eq!(
            prepare(&req, &config(&models)).unwrap_err(),
            TruncationError::UnknownModel("gpt-9".into())
        );
    }

    #[test]
    fn small_document_passes_through() {
        let models = ModelTable::builtin();
        let req = AnalysisRequest {
            model: "gpt-3.5-turbo",
            document: "GET /v1/users lists users.",
            query: "Which endpoints exist?",
            encoding: None,
        };
        let p = prepare(&req, &config(&models)).unwrap();
        assert!(!p.decision.truncated);
        assert!(p.prompt.contains("GET /v1/users lists users."));
        assert!(!p.prompt.contains(TRUNCATION_NOTICE));
        assert_eq!(p.max_completion_tokens, 500);
        assert_eq!(p.encoding, Encoding::Cl100kBase);
    }

    #[test]
    fn large_document_is_cut_and_still_fits() {
        let models = table_with(ModelProfile::new("tiny", 1_000, 100, Encoding::Chars));
        let doc = "endpoint ".repeat(500);
        let req = AnalysisRequest { model: "tiny", document: &doc, query: "auth?", encoding: None };
        let p = prepare(&req, &config(&models)).unwrap();

        assert!(p.decision.truncated);
        assert_eq!(p.decision.total_tokens, doc.chars().count());
        assert_eq!(p.decision.kept_tokens, p.budget.available);
        assert!(p.prompt.contains(TRUNCATION_MARKER));
        assert!(p.prompt.ends_with(TRUNCATION_NOTICE));
        assert!(prompt_tokens(&p) + p.max_completion_tokens + budget::SAFETY_MARGIN <= 1_000);
    }

    #[test]
    fn bpe_prompt_fits_context() {
        let models = table_with(ModelProfile::new("small", 2_048, 256, Encoding::Cl100kBase));
        let doc = "The `POST /tokens` endpoint issues bearer tokens. ".repeat(400);
        let req = AnalysisRequest { model: "small", document: &doc, query: "How do I authenticate?", encoding: None };
        let p = prepare(&req, &config(&models)).unwrap();
        assert!(p.decision.truncated);
        assert!(prompt_tokens(&p) + p.max_completion_tokens <= 2_048);
    }

    #[test]
    fn overhead_beyond_context_keeps_nothing() {
        let models = table_with(ModelProfile::new("cramped", 300, 100, Encoding::Chars));
        let req = AnalysisRequest {
            model: "cramped",
            document: "some text that will not fit",
            query: "anything?",
            encoding: None,
        };
        let p = prepare(&req, &config(&models)).unwrap();
        assert_eq!(p.budget.available, 0);
        assert!(p.decision.truncated);
        assert_eq!(p.decision.kept_tokens, 0);
        let expected = prompt::assemble(DEFAULT_TEMPLATE, TRUNCATION_MARKER, "anything?", true).unwrap();
        assert_eq!(p.prompt, expected);
    }

    #[test]
    fn empty_document_is_a_zero_token_document() {
        let models = ModelTable::builtin();
        let req = AnalysisRequest { model: "gpt-4", document: "", query: "q", encoding: None };
        let p = prepare(&req, &config(&models)).unwrap();
        assert_eq!(p.decision, TruncationDecision { truncated: false, kept_tokens: 0, total_tokens: 0 });
        assert_eq!(p.prompt, prompt::assemble(DEFAULT_TEMPLATE, "", "q", false).unwrap());
    }

    #[test]
    fn encoding_override_wins() {
        let models = ModelTable::builtin();
        let req = AnalysisRequest {
            model: "gpt-4",
            document: "abc",
            query: "q",
            encoding: Some(Encoding::Chars),
        };
        let p = prepare(&req, &config(&models)).unwrap();
        assert_eq!(p.encoding, Encoding::Chars);
        assert_eq!(p.decision.total_tokens, 3);
    }

    #[test]
    fn repeated_runs_agree() {
        let models = table_with(ModelProfile::new("tiny", 800, 100, Encoding::Cl100kBase));
        let doc = "lorem ipsum dolor sit amet ".repeat(200);
        let req = AnalysisRequest { model: "tiny", document: &doc, query: "q", encoding: None };
        let cfg = config(&models);
        assert_eq!(prepare(&req, &cfg).unwrap(), prepare(&req, &cfg).unwrap());
    }
}
