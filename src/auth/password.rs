//! Salted password hashing for admin accounts
//!
//! Stored form is `hex(sha256(salt || password))` alongside a 16-byte
//! hex salt, matching the rows already in production databases.

use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::core::error::{AppError, Result};

pub fn generate_salt(rng: &SystemRandom) -> Result<String> {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal("Random generator failure".into()))?;
    Ok(hex::encode(bytes))
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    hash_password(salt, password) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_per_salt() {
        let a = hash_password("aabbccdd", "hunter2");
        let b = hash_password("aabbccdd", "hunter2");
        let c = hash_password("eeff0011", "hunter2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn verify_round_trip() {
        let rng = SystemRandom::new();
        let salt = generate_salt(&rng).unwrap();
        assert_eq!(salt.len(), 32);
        let hash = hash_password(&salt, "correct horse");
        assert!(verify_password(&salt, "correct horse", &hash));
        assert!(!verify_password(&salt, "wrong", &hash));
    }
}
