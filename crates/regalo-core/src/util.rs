//! Text helpers for config values, guest input and error bodies.

const ERROR_EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` when nothing but whitespace remains.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Whether `value` is an absolute `http`/`https` URL with something after the scheme.
pub fn has_http_scheme(value: &str) -> bool {
    value.split_once("://").is_some_and(|(scheme, rest)| {
        (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
            && !rest.trim().is_empty()
    })
}

/// Single-line excerpt of a response body, for error messages.
pub fn error_excerpt(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(ERROR_EXCERPT_CHARS)
        .collect()
}
