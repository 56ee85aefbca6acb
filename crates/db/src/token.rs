//! Opaque token generation and hashing.
//!
//! Refresh tokens and device fingerprints are random, URL-safe opaque
//! strings. Refresh tokens are stored only as SHA-256 hex digests; the
//! raw value exists exactly once, on its way to the client.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Byte length of generated refresh tokens (256 bits).
const TOKEN_BYTES: usize = 32;

/// Byte length of generated device fingerprints.
const FINGERPRINT_BYTES: usize = 18;

/// Generates a new opaque refresh token.
#[must_use]
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}

/// Generates a new opaque device fingerprint.
#[must_use]
pub fn device_fingerprint() -> String {
    let mut bytes = [0u8; FINGERPRINT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("dev_{}", base64_url::encode(&bytes))
}

/// Hashes a token for storage.
#[must_use]
pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash("some_token"), hash("some_token"));
        assert_ne!(hash("some_token"), hash("other_token"));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(hash("x").len(), 64);
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn test_fingerprint_prefix() {
        assert!(device_fingerprint().starts_with("dev_"));
    }
}
