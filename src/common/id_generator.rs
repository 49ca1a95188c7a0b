// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., R_K7NP3X for donation requests)
//!
//! The alphabet excludes I, L, O and U, so IDs can be read out over the phone
//! to a hospital desk without ambiguity.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User account (U_)
    User,
    /// Donation request (R_)
    Request,
    /// Funding record (F_)
    Funding,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Request => "R",
            EntityPrefix::Funding => "F",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID in the format "PREFIX_XXXXXXXX"
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(8))
}

/// Generate a User ID (U_XXXXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Donation Request ID (R_XXXXXXXX)
pub fn generate_request_id() -> String {
    generate_id(EntityPrefix::Request)
}

/// Generate a Funding ID (F_XXXXXXXX)
pub fn generate_funding_id() -> String {
    generate_id(EntityPrefix::Funding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let request_id = generate_request_id();
        assert!(request_id.starts_with("R_"));
        assert_eq!(request_id.len(), 10);

        assert!(generate_user_id().starts_with("U_"));
        assert!(generate_funding_id().starts_with("F_"));
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_funding_id();
        for c in id[2..].chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
            assert!(!matches!(c, 'I' | 'L' | 'O' | 'U'));
        }
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            assert!(ids.insert(generate_request_id()), "Duplicate ID generated");
        }
    }
}
