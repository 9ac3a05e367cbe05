use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::users::error::UserError;

/// Hash a plaintext password with Argon2 and a fresh random salt. The salt is
/// embedded in the returned PHC string, so two calls with the same input
/// normally produce different strings; use [`verify_password`] to compare,
/// never string equality.
pub fn hash_password(plain: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            UserError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Check a plaintext against a stored hash. A wrong password is `Ok(false)`;
/// only a malformed hash string is an error.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, UserError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        UserError::Hashing(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
