//! Signing credentials: a key plus the algorithm to sign with

use crate::key::SecurityKey;

/// Key and algorithm used to sign a token
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    key: SecurityKey,
    algorithm: String,
}

impl SigningCredentials {
    /// Pair a key with an algorithm identifier
    #[must_use]
    pub fn new(key: SecurityKey, algorithm: impl Into<String>) -> Self {
        Self {
            key,
            algorithm: algorithm.into(),
        }
    }

    /// Signing key
    #[must_use]
    pub fn key(&self) -> &SecurityKey {
        &self.key
    }

    /// Algorithm identifier, written to the header `alg`
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Key id written to the header `kid`
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.key.key_id()
    }
}
