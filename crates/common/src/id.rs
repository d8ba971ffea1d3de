//! ID generation utilities.

use rand::Rng;
use ulid::Ulid;
use uuid::Uuid;

/// Alphabet for poll slugs: lowercase letters and digits.
const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a freshly generated poll slug.
pub const SLUG_LEN: usize = 5;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a new random UUID v4.
    #[must_use]
    pub fn generate_uuid_v4(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a cryptographically secure random token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // No time component for bearer tokens
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a short random poll slug.
    #[must_use]
    pub fn generate_slug(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..SLUG_LEN)
            .map(|_| char::from(SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())]))
            .collect()
    }

    /// Generate a creator key, the one-time ownership secret of an anonymous poll.
    #[must_use]
    pub fn generate_creator_key(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32); // Simple UUID without hyphens
    }

    #[test]
    fn test_generate_slug_uses_alphabet() {
        let id_gen = IdGenerator::new();
        for _ in 0..50 {
            let slug = id_gen.generate_slug();
            assert_eq!(slug.len(), SLUG_LEN);
            assert!(slug.bytes().all(|b| SLUG_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_creator_key_is_uuid() {
        let key = IdGenerator::new().generate_creator_key();
        assert!(Uuid::parse_str(&key).is_ok());
    }
}
