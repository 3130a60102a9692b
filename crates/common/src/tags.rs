//! Audit tags attached to every write

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Tag holding the hex SHA-256 digest of the written value.
pub const FINGERPRINT_TAG: &str = "Sha256";

/// Tag holding the principal that performed the write.
pub const CHANGED_BY_TAG: &str = "ChangedBy";

/// Deterministic digest of a value, safe to store as metadata.
pub fn content_fingerprint(value: &[u8]) -> String {
    hex::encode(Sha256::digest(value))
}

/// Returns `tags` (or an empty map) with the fingerprint and changed-by tags set.
///
/// Caller-supplied tags with the same keys are overwritten.
pub fn with_audit_tags(
    tags: Option<HashMap<String, String>>,
    value: &[u8],
    changed_by: &str,
) -> HashMap<String, String> {
    let mut tags = tags.unwrap_or_default();
    tags.insert(FINGERPRINT_TAG.to_string(), content_fingerprint(value));
    tags.insert(CHANGED_BY_TAG.to_string(), changed_by.to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(content_fingerprint(b"hunter2"), content_fingerprint(b"hunter2"));
        assert_ne!(content_fingerprint(b"hunter2"), content_fingerprint(b"hunter3"));
    }

    #[test]
    fn test_fingerprint_known_value() {
        assert_eq!(
            content_fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_audit_tags_keep_caller_tags() {
        let mut caller = HashMap::new();
        caller.insert("owner".to_string(), "payments".to_string());
        caller.insert(CHANGED_BY_TAG.to_string(), "spoofed".to_string());

        let tags = with_audit_tags(Some(caller), b"value", "alice@contoso.com");

        assert_eq!(tags.get("owner").map(String::as_str), Some("payments"));
        assert_eq!(
            tags.get(CHANGED_BY_TAG).map(String::as_str),
            Some("alice@contoso.com")
        );
        assert_eq!(tags.get(FINGERPRINT_TAG), Some(&content_fingerprint(b"value")));
    }

    #[test]
    fn test_audit_tags_without_caller_tags() {
        let tags = with_audit_tags(None, b"value", "svc");
        assert_eq!(tags.len(), 2);
    }
}
