//! Argon2id password hashing

use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::{Error, Result};

/// Hashes new passwords with the configured cost and verifies stored PHC strings
///
/// Verification reads the cost parameters from the stored hash, so raising
/// the configured cost does not invalidate existing passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| Error::Config(format!("Invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Internal(format!("Salt encoding failed: {}", e)))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
    }

    /// `Ok(false)` on mismatch; `Err` only for a corrupt stored hash
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::Internal(format!("Corrupt password hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("Password verification failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(Params::MIN_M_COST, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("secret1", &hash).unwrap());
        assert!(!hasher.verify("secret2", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = cheap_hasher();
        assert_ne!(hasher.hash("secret1").unwrap(), hasher.hash("secret1").unwrap());
    }

    #[test]
    fn test_verify_uses_stored_cost() {
        let hash = cheap_hasher().hash("secret1").unwrap();
        let stronger = PasswordHasher::new(64, 2).unwrap();
        assert!(stronger.verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_error() {
        assert!(cheap_hasher().verify("secret1", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(PasswordHasher::new(1, 1), Err(Error::Config(_))));
    }
}
