//! Short human-readable invoice labels derived from form or parsed fields.

const FALLBACK_NAME: &str = "Invoice";
const MAX_NAME_TOKENS: usize = 5;

/// Build a concise label: comma-joined item descriptions, recipient name,
/// and date, in that order, skipping absent parts, capped at five
/// whitespace-delimited tokens.
pub fn generate(descriptions: &[String], recipient: Option<&str>, date: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    let described: Vec<&str> = descriptions
        .iter()
        .map(String::as_str)
        .filter(|d| !d.trim().is_empty())
        .collect();
    if !described.is_empty() {
        parts.push(described.join(", "));
    }

    if let Some(name) = recipient.filter(|n| !n.trim().is_empty()) {
        parts.push(name.to_string());
    }
    if let Some(date) = date.filter(|d| !d.trim().is_empty()) {
        parts.push(date.to_string());
    }

    let joined = parts.join(" ");
    let tokens: Vec<&str> = joined.split_whitespace().take(MAX_NAME_TOKENS).collect();

    if tokens.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        tokens.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_in_order() {
        let name = generate(
            &["Consulting".to_string()],
            Some("Acme Corp"),
            Some("2026-08-01"),
        );
        assert_eq!(name, "Consulting Acme Corp 2026-08-01");
    }

    #[test]
    fn caps_at_five_tokens() {
        let name = generate(
            &["Design".to_string(), "Development".to_string()],
            Some("Very Long Client Name Inc"),
            Some("2026-08-01"),
        );
        assert_eq!(name.split_whitespace().count(), 5);
        assert_eq!(name, "Design, Development Very Long Client");
    }

    #[test]
    fn skips_absent_parts() {
        assert_eq!(generate(&[], Some("Acme"), None), "Acme");
        assert_eq!(generate(&["Hosting".to_string()], None, None), "Hosting");
    }

    #[test]
    fn falls_back_when_nothing_is_available() {
        assert_eq!(generate(&[], None, None), "Invoice");
        assert_eq!(generate(&["   ".to_string()], Some(""), Some(" ")), "Invoice");
    }
}
