//! Keyed-hash (HMAC) signature provider

use super::{check_sign_input, check_verify_input, parse_algorithm};
use crate::algorithm::{AlgorithmFamily, HashAlgorithm, SignatureAlgorithm};
use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::key::SymmetricKey;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Keyed hash initialized with the secret; cloned per operation so the
/// prepared state is never consumed.
#[derive(Clone)]
enum KeyedHash {
    Sha256(HmacSha256),
    Sha384(HmacSha384),
    Sha512(HmacSha512),
}

impl KeyedHash {
    fn new(hash: HashAlgorithm, secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(match hash {
            HashAlgorithm::Sha256 => KeyedHash::Sha256(HmacSha256::new_from_slice(secret)?),
            HashAlgorithm::Sha384 => KeyedHash::Sha384(HmacSha384::new_from_slice(secret)?),
            HashAlgorithm::Sha512 => KeyedHash::Sha512(HmacSha512::new_from_slice(secret)?),
        })
    }

    fn compute(&self, input: &[u8]) -> Vec<u8> {
        match self.clone() {
            KeyedHash::Sha256(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            KeyedHash::Sha384(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            KeyedHash::Sha512(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }
}

/// HMAC provider; one context serves both signing and verifying
pub struct SymmetricSignatureProvider {
    algorithm: SignatureAlgorithm,
    keyed_hash: Option<KeyedHash>,
}

impl SymmetricSignatureProvider {
    /// Prepare a keyed hash for `algorithm`. Key-size policy is the factory's
    /// job and is not checked here.
    ///
    /// # Errors
    /// - `Argument` (`TOK100`) for an empty algorithm
    /// - `InvalidState` (`TOK122`) if the algorithm is not a keyed hash
    pub fn new(key: &SymmetricKey, algorithm: &str) -> TokenResult<Self> {
        let alg = parse_algorithm(algorithm)?
            .filter(|a| a.family() == AlgorithmFamily::Symmetric)
            .ok_or_else(|| {
                TokenError::invalid_state(
                    ErrorCode::KeyedHashUnavailable,
                    &format!("cannot construct a keyed hash for algorithm '{algorithm}'"),
                )
            })?;
        let hash = alg.hash().ok_or_else(|| {
            TokenError::invalid_state(
                ErrorCode::KeyedHashUnavailable,
                &format!("algorithm '{algorithm}' has no digest"),
            )
        })?;
        let keyed_hash = KeyedHash::new(hash, key.secret()).map_err(|e| {
            TokenError::invalid_state(
                ErrorCode::KeyedHashUnavailable,
                &format!("cannot key the hash for '{algorithm}': {e}"),
            )
        })?;

        Ok(Self {
            algorithm: alg,
            keyed_hash: Some(keyed_hash),
        })
    }

    /// Compute the keyed hash of `input`
    ///
    /// # Errors
    /// `Disposed` after dispose, `Argument` (`TOK130`) for empty input
    pub fn sign(&self, input: &[u8]) -> TokenResult<Vec<u8>> {
        let keyed_hash = self.context()?;
        check_sign_input(input)?;
        Ok(keyed_hash.compute(input))
    }

    /// Recompute and compare in constant time
    ///
    /// # Errors
    /// `Disposed` after dispose, `Argument` (`TOK131`/`TOK132`) for empty buffers
    pub fn verify(&self, input: &[u8], signature: &[u8]) -> TokenResult<bool> {
        let keyed_hash = self.context()?;
        check_verify_input(input, signature)?;
        let expected = keyed_hash.compute(input);
        Ok(expected.ct_eq(signature).into())
    }

    /// Drop the keyed hash; idempotent
    pub fn dispose(&mut self) {
        if self.keyed_hash.take().is_some() {
            tracing::trace!(algorithm = %self.algorithm, "symmetric signature provider disposed");
        }
    }

    /// Whether the context has been released
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.keyed_hash.is_none()
    }

    /// Algorithm bound at construction
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn context(&self) -> TokenResult<&KeyedHash> {
        self.keyed_hash
            .as_ref()
            .ok_or_else(|| TokenError::disposed("SymmetricSignatureProvider"))
    }
}

impl fmt::Debug for SymmetricSignatureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricSignatureProvider")
            .field("algorithm", &self.algorithm)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
