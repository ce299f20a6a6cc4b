//! Password hashing and verification.
//!
//! New hashes are always Argon2id. Verification also accepts bcrypt hashes (`$2a$`, `$2b$`,
//! `$2y$`), which is what accounts imported from older deployments carry.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::prelude::RngExt;
use rand::rng;

use crate::config::PasswordConfig;
use crate::errors::Error;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Hash a string using Argon2.
///
/// Uses the provided parameters or secure defaults if None.
pub fn hash_string_with_params(input: &str, params: Option<Argon2Params>) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.unwrap_or_default().to_argon2()?;

    let hash = argon2.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash string: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Random 32 character hex password, for accounts bootstrapped without one.
pub fn generate_password() -> String {
    let mut bytes = [0u8; 16];
    rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}

/// Verify a string against a hash.
///
/// Note: Verification uses the parameters embedded in the hash itself.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    if is_bcrypt_hash(hash) {
        return bcrypt::verify(input, hash).map_err(|e| Error::Internal {
            operation: format!("verify bcrypt hash: {e}"),
        });
    }

    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse hash: {e}"),
    })?;

    // Verification always uses params from the hash
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(input.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters so the suite stays fast
    fn test_params() -> Option<Argon2Params> {
        Some(Argon2Params {
            memory_kib: 128,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_string_hashing() {
        let input = "test_password_123";
        let hash = hash_string_with_params(input, test_params()).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_string(input, &hash).unwrap());
        assert!(!verify_string("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_input_different_hashes() {
        let input = "same_password";

        let hash1 = hash_string_with_params(input, test_params()).unwrap();
        let hash2 = hash_string_with_params(input, test_params()).unwrap();

        // Salted
        assert_ne!(hash1, hash2);
        assert!(verify_string(input, &hash1).unwrap());
        assert!(verify_string(input, &hash2).unwrap());
    }

    #[test]
    fn test_bcrypt_hashes_verify() {
        let hash = bcrypt::hash("password", 4).unwrap();
        assert!(hash.starts_with("$2b$"));

        assert!(verify_string("password", &hash).unwrap());
        assert!(!verify_string("hunter2", &hash).unwrap());

        // Same hash under the legacy $2a$ prefix
        let legacy = hash.replacen("$2b$", "$2a$", 1);
        assert!(verify_string("password", &legacy).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(matches!(verify_string("password", "not-a-hash"), Err(Error::Internal { .. })));
    }

    #[test]
    fn test_generated_passwords() {
        let first = generate_password();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, generate_password());
    }

    #[test]
    fn test_params_from_config() {
        let params = Argon2Params::from(&PasswordConfig::default());
        assert_eq!(params.memory_kib, 19456);
        assert_eq!(params.iterations, 2);
        assert_eq!(params.parallelism, 1);
    }
}
