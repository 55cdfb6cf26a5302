//! Prompt assembly. Pure: no I/O, same inputs give the same prompt.

use serde::Serialize;
use tinytemplate::TinyTemplate;

use super::TruncationError;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an AI assistant that helps analyze API documentation.";

/// Placeholders are `{document}` and `{query}`. Literal braces must be
/// escaped as `\{`.
pub const DEFAULT_TEMPLATE: &str = "You are an assistant skilled at analyzing API documentation.
Based on the following document:

---
{document}
---

Answer the following question about the API documentation: \"{query}\"";

pub const TRUNCATION_NOTICE: &str = "\n\nNote: the document above was cut to fit the model's context window, so this analysis may be incomplete.";

#[derive(Serialize)]
struct PromptContext<'a> {
    document: &'a str,
    query: &'a str,
}

/// Renders the user prompt. Values are inserted verbatim; no escaping is
/// applied to document text.
pub fn assemble(
    instruction_template: &str,
    document_segment: &str,
    user_query: &str,
    truncated: bool,
) -> Result<String, TruncationError> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("prompt", instruction_template)
        .map_err(|e| TruncationError::Template(e.to_string()))?;
    let ctx = PromptContext {
        document: document_segment,
        query: user_query,
    };
    let mut prompt = tt
        .render("prompt", &ctx)
        .map_err(|e| TruncationError::Template(e.to_string()))?;
    if truncated {
        prompt.push_str(TRUNCATION_NOTICE);
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_document_and_query() {
        let out = assemble("Doc: {document}\nQ: {query}", "body", "what?", false).unwrap();
        assert_eq!(out, "Doc: body\nQ: what?");
    }

    #[test]
    fn appends_notice_only_when_truncated() {
        let kept = assemble(DEFAULT_TEMPLATE, "body", "q", false).unwrap();
        assert!(!kept.contains(TRUNCATION_NOTICE));
        let cut = assemble(DEFAULT_TEMPLATE, "body", "q", true).unwrap();
        assert!(cut.ends_with(TRUNCATION_NOTICE));
        assert!(cut.starts_with(&kept));
    }

    #[test]
    fn document_text_is_not_escaped_or_interpreted() {
        let doc = "fn main() { println!(\"<b>&</b>\"); } {query}";
        let out = assemble("[{document}]", doc, "ignored", false).unwrap();
        assert_eq!(out, format!("[{doc}]"));
    }

    #[test]
    fn default_template_quotes_the_question() {
        let out = assemble(DEFAULT_TEMPLATE, "GET /users", "Which endpoints exist?", false).unwrap();
        assert!(out.contains("---\nGET /users\n---"));
        assert!(out.ends_with("\"Which endpoints exist?\""));
    }

    #[test]
    fn malformed_template_is_an_error() {
        let err = assemble("Doc: {document", "body", "q", false).unwrap_err();
        assert!(matches!(err, TruncationError::Template(_)));
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let err = assemble("{missing}", "body", "q", false).unwrap_err();
        assert!(matches!(err, TruncationError::Template(_)));
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = assemble(DEFAULT_TEMPLATE, "x", "y", true).unwrap();
        let b = assemble(DEFAULT_TEMPLATE, "x", "y", true).unwrap();
        assert_eq!(a, b);
    }
}
