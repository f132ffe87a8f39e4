//! # Shared Utility Functions
//!
//! Helpers for keeping identifiers out of logs in full.
//!
//! ```rust
//! use shared::utils::mask_identifier;
//!
//! let user_id = "4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21";
//! assert_eq!(mask_identifier(user_id, 4, 4), "4f1c...8a21");
//! ```

/// Shorten an identifier to its first `prefix_len` and last `suffix_len` characters.
///
/// Identifiers too short to shorten meaningfully are returned as-is.
/// Works on characters, so non-ASCII emails never split a code point.
///
/// # Examples
///
/// ```rust
/// use shared::utils::mask_identifier;
///
/// assert_eq!(mask_identifier("eyJhbGciOiJIUzI1NiJ9.payload.sig", 6, 3), "eyJhbG...sig");
/// assert_eq!(mask_identifier("short", 4, 4), "short");
/// ```
pub fn mask_identifier(identifier: &str, prefix_len: usize, suffix_len: usize) -> String {
    let len = identifier.chars().count();
    if len <= prefix_len + suffix_len {
        return identifier.to_string();
    }

    let prefix: String = identifier.chars().take(prefix_len).collect();
    let suffix: String = identifier.chars().skip(len - suffix_len).collect();

    format!("{}...{}", prefix, suffix)
}

/// Mask with the default 4-character prefix and suffix.
pub fn mask_id(identifier: &str) -> String {
    mask_identifier(identifier, 4, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_identifier() {
        let id = "4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21";
        assert_eq!(mask_identifier(id, 4, 4), "4f1c...8a21");
        assert_eq!(mask_identifier(id, 2, 2), "4f...21");
    }

    #[test]
    fn test_mask_identifier_short() {
        assert_eq!(mask_identifier("short", 4, 4), "short");
        assert_eq!(mask_identifier("abcdefgh", 4, 4), "abcdefgh");
    }

    #[test]
    fn test_mask_identifier_non_ascii() {
        assert_eq!(mask_identifier("joão.silva@exemplo.com", 3, 3), "joã...com");
    }

    #[test]
    fn test_mask_id() {
        assert_eq!(mask_id("4f1c2a9e-77b0-4c1e-9a51-0d5e3b6f8a21"), "4f1c...8a21");
    }
}
