//! Small text helpers shared by the config layer, the remote client and front ends.

/// Trimmed value, or `None` when missing or blank
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Whether `value` uses an `http` or `https` scheme
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Single-line form of `value`: runs of whitespace become one space
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bound a remote response body before it lands in an error message
pub fn compact_text(value: &str) -> String {
    collapse_whitespace(value).chars().take(180).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_normalize_to_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t\n".to_string())), None);
        assert_eq!(
            normalize_text_option(Some("  entries ".to_string())),
            Some("entries".to_string())
        );
    }

    #[test]
    fn only_http_schemes_are_urls() {
        assert!(is_http_url("https://sync.example.com"));
        assert!(is_http_url("http://127.0.0.1:8080"));
        assert!(!is_http_url("sync.example.com"));
        assert!(!is_http_url("file:///tmp/tally"));
    }

    #[test]
    fn error_bodies_are_flattened_and_bounded() {
        assert_eq!(compact_text("  upstream\n  unavailable "), "upstream unavailable");
        let body = "e ".repeat(200);
        assert_eq!(compact_text(&body).chars().count(), 180);
    }
}
