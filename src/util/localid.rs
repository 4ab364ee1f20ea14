//! Temporary-id generation for records created offline.
//!
//! Ids are the reserved `T` prefix followed by a random lowercase base-36
//! token from an OS-seeded generator. Collision resistance comes from the
//! token space plus an existence check against the current corpus; no
//! counter is persisted anywhere.

use crate::model::{IssueId, LOCAL_ID_PREFIX};
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LENGTH: usize = 6;

/// Generate one random temporary id.
#[must_use]
pub fn generate() -> IssueId {
    let mut rng = rand::rng();
    let token: String = (0..TOKEN_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    IssueId::new(format!("{LOCAL_ID_PREFIX}{token}"))
}

/// Generate a temporary id not present in the current corpus.
///
/// Retries are vanishingly rare at 36^6 tokens.
pub fn generate_unique<F>(exists: F) -> IssueId
where
    F: Fn(&IssueId) -> bool,
{
    loop {
        let id = generate();
        if !exists(&id) {
            return id;
        }
    }
}
