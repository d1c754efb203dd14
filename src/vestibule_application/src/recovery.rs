//! Recovery-code generation and hashing. Codes are shown to the user once
//! at enrollment; only SHA-256 hashes are stored, and each code is consumed
//! on first successful use.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

const CODE_HALF_LENGTH: usize = 5;

/// A fresh set of human-enterable codes, `xxxxx-xxxxx`, lowercase
/// alphanumeric.
pub fn generate_codes(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| format!("{}-{}", random_half(), random_half()))
        .collect()
}

fn random_half() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CODE_HALF_LENGTH)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// SHA-256 hex of the normalized code. Normalization strips whitespace,
/// hyphens, and case so user re-formatting still matches.
pub fn hash_code(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_the_documented_shape() {
        let codes = generate_codes(10);
        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 2 * CODE_HALF_LENGTH + 1);
            assert!(code.chars().nth(CODE_HALF_LENGTH) == Some('-'));
            assert!(
                code.chars()
                    .filter(|c| *c != '-')
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn codes_are_distinct() {
        let codes = generate_codes(10);
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn hash_tolerates_reformatting() {
        assert_eq!(hash_code("ab1cd-ef2gh"), hash_code("AB1CD EF2GH"));
        assert_eq!(hash_code("ab1cd-ef2gh"), hash_code(" ab1cdef2gh "));
    }

    #[test]
    fn different_codes_hash_differently() {
        assert_ne!(hash_code("aaaaa-aaaaa"), hash_code("aaaaa-aaaab"));
    }
}
