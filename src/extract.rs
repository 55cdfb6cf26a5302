use std::path::Path;

/// Best-effort text for `path`. PDFs go through `pdf-extract`, anything else is
/// read as UTF-8. Any failure yields an empty document so the pipeline treats
/// it as zero tokens.
pub fn read_document(path: &Path) -> String {
    let result = if is_pdf(path) {
        extract_pdf(path)
    } else {
        std::fs::read_to_string(path).map_err(|e| e.to_string())
    };
    match result {
        Ok(text) => {
            tracing::debug!(path = %path.display(), bytes = text.len(), "document loaded");
            text
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "failed to extract document text");
            String::new()
        }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn extract_pdf(path: &Path) -> Result<String, String> {
    // pdf-extract panics on some malformed files
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf parser panicked".into()),
    }
}
