//! Short code generation.
//!
//! Codes are drawn uniformly from the base62 alphabet using the thread-local
//! CSPRNG. Uniqueness is not decided here: the caller inserts with
//! insert-if-absent semantics and asks for a new code on conflict.

use rand::Rng;

/// Alphabet used for generated codes.
pub const BASE62_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const MIN_CODE_LENGTH: usize = 6;
pub const MAX_CODE_LENGTH: usize = 8;
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Path segments routed to API endpoints; a code equal to one of these would
/// be unreachable.
const RESERVED_CODES: &[&str] = &["links", "admin", "analysis", "auth", "health"];

/// Generates random base62 short codes of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Creates a generator, clamping `length` into
    /// [`MIN_CODE_LENGTH`]..=[`MAX_CODE_LENGTH`].
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Produces one candidate code.
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| BASE62_ALPHABET[rng.random_range(0..BASE62_ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

/// Returns true if `code` shadows an API route.
pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES.iter().any(|r| r.eq_ignore_ascii_case(code))
}
