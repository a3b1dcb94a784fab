//! Salted password hashing
//!
//! Every hashing event draws a fresh salt from the OS random source, appends
//! its base64 encoding to the plaintext and runs the result through a slow,
//! tunable-cost hash. The salt is returned alongside the hash because
//! verification needs both.

use std::fmt::Debug;
use std::sync::Arc;

use argon2::{
    password_hash::{
        rand_core::OsRng as PhcRng, PasswordHash, PasswordHasher as _, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};

use crate::config::{AuthConfig, HashAlgorithm};
use crate::domain::user::HashedPassword;
use crate::domain::DomainError;

/// bcrypt ignores everything past this many input bytes
const BCRYPT_MAX_INPUT_BYTES: usize = 72;

const ARGON2_PREFIX: &[u8] = b"$argon2";

/// Error text for unparseable stored hashes; never echoes the hash
const MALFORMED_HASH: &str = "stored password hash is malformed";

/// Fill `byte_length` bytes from the OS random source and base64-encode them
pub fn generate_salt(byte_length: usize) -> Result<String, DomainError> {
    if byte_length == 0 {
        return Err(DomainError::hashing("salt length must be greater than zero"));
    }

    let mut key = vec![0u8; byte_length];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| DomainError::entropy(format!("Failed to read random bytes: {}", e)))?;

    Ok(STANDARD.encode(key))
}

/// Hash `plaintext` with bcrypt under a freshly generated salt
pub fn hash_password(
    plaintext: &str,
    byte_length: usize,
    cost: u32,
) -> Result<HashedPassword, DomainError> {
    let salt = generate_salt(byte_length)?;
    let salted = salted_input(plaintext, &salt);

    if salted.len() > BCRYPT_MAX_INPUT_BYTES {
        return Err(DomainError::hashing(format!(
            "password and salt exceed the {} byte bcrypt input limit",
            BCRYPT_MAX_INPUT_BYTES
        )));
    }

    let hash = bcrypt::hash(salted.as_bytes(), cost)
        .map_err(|e| DomainError::hashing(format!("Failed to hash password: {}", e)))?;

    Ok(HashedPassword::new(hash.into_bytes(), salt))
}

/// Check `plaintext` against a bcrypt hash produced with `salt`.
///
/// Comparison is done by bcrypt itself. A malformed stored hash is an error,
/// a mismatch is `Ok(false)`.
pub fn verify_password(
    plaintext: &str,
    salt: &str,
    stored_hash: &[u8],
) -> Result<bool, DomainError> {
    let stored = stored_hash_str(stored_hash)?;
    stored
        .parse::<bcrypt::HashParts>()
        .map_err(|_| DomainError::hashing(MALFORMED_HASH))?;

    let salted = salted_input(plaintext, salt);

    // Never produced by hash_password, so it cannot match.
    if salted.len() > BCRYPT_MAX_INPUT_BYTES {
        return Ok(false);
    }

    bcrypt::verify(salted.as_bytes(), stored).map_err(|e| match e {
        bcrypt::BcryptError::InvalidHash(_) => DomainError::hashing(MALFORMED_HASH),
        _ => DomainError::hashing("Failed to verify bcrypt password"),
    })
}

/// Check `plaintext` against an Argon2 PHC string produced with `salt`.
///
/// Parameters come from the stored hash, so records hashed at an older cost
/// keep verifying.
pub fn verify_argon2_password(
    plaintext: &str,
    salt: &str,
    stored_hash: &[u8],
) -> Result<bool, DomainError> {
    let parsed_hash = PasswordHash::new(stored_hash_str(stored_hash)?)
        .map_err(|_| DomainError::hashing(MALFORMED_HASH))?;

    match Argon2::default().verify_password(salted_input(plaintext, salt).as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(DomainError::hashing("Failed to verify argon2 password")),
    }
}

/// Verify against whichever algorithm produced `stored_hash`
pub fn verify_stored_password(
    plaintext: &str,
    salt: &str,
    stored_hash: &[u8],
) -> Result<bool, DomainError> {
    if stored_hash.starts_with(ARGON2_PREFIX) {
        verify_argon2_password(plaintext, salt, stored_hash)
    } else {
        verify_password(plaintext, salt, stored_hash)
    }
}

fn salted_input(plaintext: &str, salt: &str) -> String {
    let mut salted = String::with_capacity(plaintext.len() + salt.len());
    salted.push_str(plaintext);
    salted.push_str(salt);
    salted
}

fn stored_hash_str(stored_hash: &[u8]) -> Result<&str, DomainError> {
    std::str::from_utf8(stored_hash)
        .map_err(|_| DomainError::hashing("stored password hash is not valid UTF-8"))
}

/// Trait for password hashing operations
pub trait PasswordHasher: Send + Sync + Debug {
    /// Hash a password under a new salt
    fn hash(&self, plaintext: &str) -> Result<HashedPassword, DomainError>;

    /// Verify a password against a stored hash and its salt
    fn verify(&self, plaintext: &str, salt: &str, stored_hash: &[u8]) -> Result<bool, DomainError>;
}

/// bcrypt-based password hasher
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    salt_key_size: usize,
    cost: u32,
}

impl BcryptHasher {
    pub fn new(salt_key_size: usize, cost: u32) -> Self {
        Self {
            salt_key_size,
            cost,
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<HashedPassword, DomainError> {
        hash_password(plaintext, self.salt_key_size, self.cost)
    }

    fn verify(&self, plaintext: &str, salt: &str, stored_hash: &[u8]) -> Result<bool, DomainError> {
        verify_stored_password(plaintext, salt, stored_hash)
    }
}

/// Argon2id-based password hasher; `cost` is the iteration count
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    salt_key_size: usize,
    cost: u32,
}

impl Argon2Hasher {
    pub fn new(salt_key_size: usize, cost: u32) -> Self {
        Self {
            salt_key_size,
            cost,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, DomainError> {
        let params = Params::new(Params::DEFAULT_M_COST, self.cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| DomainError::hashing(format!("Invalid argon2 parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<HashedPassword, DomainError> {
        let argon2 = self.argon2()?;
        let salt = generate_salt(self.salt_key_size)?;
        let phc_salt = SaltString::generate(&mut PhcRng);

        let hash = argon2
            .hash_password(salted_input(plaintext, &salt).as_bytes(), &phc_salt)
            .map_err(|e| DomainError::hashing(format!("Failed to hash password: {}", e)))?;

        Ok(HashedPassword::new(hash.to_string().into_bytes(), salt))
    }

    fn verify(&self, plaintext: &str, salt: &str, stored_hash: &[u8]) -> Result<bool, DomainError> {
        verify_stored_password(plaintext, salt, stored_hash)
    }
}

/// Build the hasher selected in configuration. The algorithm only decides how
/// new hashes are made; verification follows the stored hash.
pub fn hasher_from_config(config: &AuthConfig) -> Arc<dyn PasswordHasher> {
    match config.algorithm {
        HashAlgorithm::Bcrypt => Arc::new(BcryptHasher::new(config.salt_key_size, config.hash_cost)),
        HashAlgorithm::Argon2 => Arc::new(Argon2Hasher::new(config.salt_key_size, config.hash_cost)),
    }
}
