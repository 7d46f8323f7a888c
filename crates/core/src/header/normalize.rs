//! Header name normalization.

/// Reduce a header (or any user-supplied field name) to its lookup key.
///
/// Every character that is not an ASCII word character (`[A-Za-z0-9_]`) or
/// a hyphen is dropped and the remainder is lower-cased. An empty result
/// means the name cannot be mapped.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// `true` if `name` normalizes to a non-empty key.
pub fn is_mappable(name: &str) -> bool {
    name.chars()
        .any(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("Full Name"), "fullname");
        assert_eq!(normalize("e-mail"), "e-mail");
        assert_eq!(normalize("E-Mail Address"), "e-mailaddress");
        assert_eq!(normalize("FULL_NAME"), "full_name");
        assert_eq!(normalize("Price ($)"), "price");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize("Größe"), "gre");
        assert_eq!(normalize("名前"), "");
        assert_eq!(normalize("  \t\n"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Full Name",
            "e-mail",
            "",
            "ÄBC def_-!?",
            "already-normal_1",
            "  spaced   OUT  ",
            "%%%",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_is_mappable() {
        assert!(is_mappable("Name"));
        assert!(is_mappable("-"));
        assert!(!is_mappable(""));
        assert!(!is_mappable("   "));
        assert!(!is_mappable("(?)"));
    }
}
