//! Entry identity hashing.
//!
//! Every adapter derives the dedup key the same way: SHA-256 of the first
//! non-empty candidate in stability order (native GUID/id, then URL, then a
//! title+description composite). A tracking parameter stripped from a URL
//! must not change an entry's identity when the feed carries a GUID.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a single identity value.
pub fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    format!("{:x}", digest)
}

/// Hashes the first non-empty candidate; empty string when none qualifies.
pub fn entry_hash<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    for candidate in candidates {
        if !candidate.is_empty() {
            return hash_value(candidate);
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let from_guid = entry_hash(["guid-1", "https://example.org/a"]);
        let from_guid_again = entry_hash(["guid-1", "https://example.org/a?utm_source=x"]);
        assert_eq!(from_guid, from_guid_again);
    }

    #[test]
    fn test_skips_empty_candidates() {
        assert_eq!(
            entry_hash(["", "https://example.org/a"]),
            hash_value("https://example.org/a")
        );
    }

    #[test]
    fn test_no_candidates_yields_empty() {
        assert_eq!(entry_hash(["", ""]), "");
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = hash_value("x");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
