use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    /// Checked in place of a real hash for unknown or disabled accounts.
    static ref DECOY_HASH: Option<String> = hash("decoy password for timing").ok();
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// A stored hash that cannot be parsed never matches.
pub fn matches(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// Spend one verification on the decoy hash; always a mismatch.
pub fn decoy_verify(plain: &str) {
    if let Some(decoy) = DECOY_HASH.as_deref() {
        let _ = matches(plain, decoy);
    }
}
