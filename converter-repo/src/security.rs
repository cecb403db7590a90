//! API key generation and hashing.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

/// Prefix every issued key carries.
pub const API_KEY_PREFIX: &str = "sk_";

const API_KEY_RANDOM_LEN: usize = 32;

/// Generates a fresh random API key of the form `sk_<32 alphanumerics>`.
pub fn generate_api_key() -> String {
    let raw_key: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{raw_key}")
}

/// Hashes an API key using SHA-256.
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}
