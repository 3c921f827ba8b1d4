//! Correlation identifiers for requests and client instances.

use rand::Rng;

/// Length used when no explicit length is requested.
pub const DEFAULT_ID_LENGTH: usize = 8;

const ID_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Generate an identifier of `length` uppercase hexadecimal characters.
///
/// Each character is drawn independently. Nothing here checks for collisions
/// with previously generated identifiers.
pub fn generate_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate an identifier of [`DEFAULT_ID_LENGTH`] characters.
pub fn new_message_id() -> String {
    generate_id(DEFAULT_ID_LENGTH)
}
