//! Credential helpers
//!
//! API keys arrive from environment variables and TOML files, often with
//! stray whitespace or quotes. Keys are never logged in full.

/// Minimum length below which a key is reported as suspicious at startup
pub const MIN_KEY_LENGTH: usize = 10;

/// Strip surrounding whitespace and one layer of matching quotes
pub fn sanitize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Whether a key looks long enough to be a real credential
pub fn looks_complete(key: &str) -> bool {
    key.chars().count() >= MIN_KEY_LENGTH
}

/// Render a key for logs: first and last four characters only
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_whitespace_and_quotes() {
        assert_eq!(sanitize_key("  sk-abc123  "), "sk-abc123");
        assert_eq!(sanitize_key("\"sk-abc123\""), "sk-abc123");
        assert_eq!(sanitize_key("'sk-abc123'\n"), "sk-abc123");
    }

    #[test]
    fn test_sanitize_leaves_unbalanced_quotes() {
        assert_eq!(sanitize_key("\"sk-abc123"), "\"sk-abc123");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key(""), "***");
    }

    #[test]
    fn test_key_length_check() {
        assert!(looks_complete("0123456789"));
        assert!(!looks_complete("012345678"));
    }
}
