//! Credential verifier: Argon2id password derivation with a per-user salt.
//!
//! The hash and salt are stored in separate columns. Both are B64 strings
//! (the PHC alphabet), so the stored hash carries no parameters; changing
//! the constants below invalidates every existing password.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Output, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Memory cost in KiB.
const MEMORY_KIB: u32 = 64 * 1024;
/// Number of passes.
const ITERATIONS: u32 = 3;
/// Degree of parallelism.
const PARALLELISM: u32 = 2;
/// Derived key length in bytes.
const KEY_LEN: usize = 32;

/// Argon2 failures. The wrapped errors are not `source()`s: argon2 is built
/// without `std`, so they do not implement `std::error::Error`.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Argon2(argon2::Error),

    #[error("malformed password hash: {0}")]
    Encoding(argon2::password_hash::Error),
}

impl From<argon2::Error> for PasswordError {
    fn from(err: argon2::Error) -> Self {
        PasswordError::Argon2(err)
    }
}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(err: argon2::password_hash::Error) -> Self {
        PasswordError::Encoding(err)
    }
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LEN))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive_raw(password: &str, salt: &str) -> Result<Output, PasswordError> {
    let mut out = [0u8; KEY_LEN];
    hasher()?.hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)?;
    Ok(Output::new(&out)?)
}

/// Generate a fresh random salt for a new user.
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).as_str().to_string()
}

/// Derive the stored hash for `password` under `salt`.
pub fn derive_password_hash(password: &str, salt: &str) -> Result<String, PasswordError> {
    Ok(derive_raw(password, salt)?.to_string())
}

/// Verify `password` against a stored `(salt, hash)` pair.
///
/// The final comparison is constant-time (`Output`'s `PartialEq`). Returns
/// `Ok(false)` on mismatch and `Err` only when the stored hash is not valid
/// B64 or hashing fails.
pub fn verify_password(password: &str, salt: &str, hash: &str) -> Result<bool, PasswordError> {
    let expected = Output::b64_decode(hash)?;
    if expected.len() != KEY_LEN {
        return Ok(false);
    }
    let computed = derive_raw(password, salt)?;
    Ok(computed == expected)
}
