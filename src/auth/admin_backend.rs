//! The built-in `admin` account, verified against a configured SHA-256 digest
//! instead of a row in `users`.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const ADMIN_USERNAME: &str = "admin";

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when `username` is the built-in admin and `password` hashes to the
/// configured digest. Always false when no digest is configured.
pub fn authenticate(username: &str, password: &str, configured_hash: Option<&str>) -> bool {
    if username != ADMIN_USERNAME {
        return false;
    }
    let Some(expected) = configured_hash else {
        return false;
    };
    let actual = sha256_hex(password);
    actual.as_bytes().ct_eq(expected.to_lowercase().as_bytes()).into()
}
