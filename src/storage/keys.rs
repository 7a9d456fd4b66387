//! Content-addressed key derivation for the embedding cache.
//!
//! Keys are `blake3(model_id, normalize(text))`, so the same text under the
//! same encoder model always maps to the same cached vector, and entries
//! never cross incompatible models.

/// Normalize input text for keying: trim, collapse internal whitespace runs
/// to a single space. Case is preserved because encoders are case-sensitive.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

/// Derive the 32-byte cache key for `(model_id, text)`.
pub fn cache_key(model_id: &str, text: &str) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model_id.as_bytes());
    // Separator keeps (model, text) unambiguous
    hasher.update(&[0x1f]);
    hasher.update(normalize(text).as_bytes());
    hasher.finalize().as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  how  do\tI\n connect  "), "how do I connect");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn test_key_stable_under_whitespace() {
        let a = cache_key("minilm-384", "how do I connect");
        let b = cache_key("minilm-384", "  how   do I\tconnect ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_key_separates_models() {
        let a = cache_key("minilm-384", "same text");
        let b = cache_key("mpnet-768", "same text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_separates_texts() {
        let a = cache_key("minilm-384", "first");
        let b = cache_key("minilm-384", "second");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_case_sensitive() {
        let a = cache_key("minilm-384", "Sensor");
        let b = cache_key("minilm-384", "sensor");
        assert_ne!(a, b);
    }
}
