//! One-way password hashing with Argon2.
//!
//! Digests are stored in the encoded form, which carries the variant, cost
//! parameters and salt alongside the hash, so verification needs nothing else.

use crate::{error::HashingFailure, types::HashedPassword};

const SALT_LEN: usize = 16;

// Argon2id, 19 MiB, 2 passes, 1 lane.
fn hashing_config() -> argon2::Config<'static> {
    argon2::Config {
        variant: argon2::Variant::Argon2id,
        mem_cost: 19 * 1024,
        time_cost: 2,
        lanes: 1,
        ..argon2::Config::default()
    }
}

/// Hash a password with a fresh random salt.
///
/// This is deliberately slow; async callers should run it on the blocking pool.
pub fn hash_password(password: &str) -> Result<HashedPassword, HashingFailure> {
    let salt: [u8; SALT_LEN] = rand::random();

    let encoded = argon2::hash_encoded(password.as_bytes(), &salt, &hashing_config())?;

    Ok(HashedPassword(encoded))
}

/// Check a password against a stored digest. A malformed digest never matches.
pub fn verify_password(password: &str, hash: &HashedPassword) -> bool {
    argon2::verify_encoded(&hash.0, password.as_bytes()).unwrap_or(false)
}
