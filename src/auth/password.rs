use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const PUNCTUATION: &[u8] = b"!#$%&*+-=?@_";

/// Hashes a password with Argon2id into a PHC-format string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Config(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a candidate password against a stored hash.
pub fn verify_password(candidate: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Config(format!("failed to verify password: {e}"))),
    }
}

/// Generates a random password guaranteed to contain at least one letter,
/// one digit, and one punctuation character. Lengths below 3 are bumped up
/// to fit the guarantee.
pub fn generate_random_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let pool: Vec<u8> = [LETTERS, DIGITS, PUNCTUATION].concat();

    let mut bytes = vec![
        LETTERS[rng.gen_range(0..LETTERS.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        PUNCTUATION[rng.gen_range(0..PUNCTUATION.len())],
    ];
    while bytes.len() < length.max(3) {
        bytes.push(pool[rng.gen_range(0..pool.len())]);
    }
    bytes.shuffle(&mut rng);

    bytes.into_iter().map(char::from).collect()
}
