//! Normalization of raw payload strings into parseable JSON text.

/// Normalizes an arbitrary scalar string into JSON-parseable text.
///
/// Strips a leading byte-order mark, removes embedded NULs, and trims
/// surrounding whitespace. Text that does not already look structured —
/// i.e. does not start with `{`, `[`, or `"` — is wrapped as a JSON string
/// literal with internal quotes escaped; already-structured text is returned
/// untouched (even when it is not actually valid JSON, which the parse step
/// will surface). Bare numbers therefore come back quoted. Idempotent.
pub fn sanitize(raw: &str) -> String {
    let stripped: String = raw
        .strip_prefix('\u{feff}')
        .unwrap_or(raw)
        .chars()
        .filter(|c| *c != '\0')
        .collect();
    let trimmed = stripped.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"') {
        return trimmed.to_string();
    }

    format!("\"{}\"", trimmed.replace('"', "\\\""))
}
