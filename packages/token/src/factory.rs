//! Signature provider factory
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. algorithm present
//! 2. key class supported
//! 3. private half present (signing only)
//! 4. key size against the current [`KeySizePolicy`]
//! 5. cryptographic context construction

use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::key::{KeyClass, SecurityKey};
use crate::policy::{KeySizeLimits, KeySizePolicy};
use crate::provider::{AsymmetricSignatureProvider, SignatureProvider, SymmetricSignatureProvider};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Signing,
    Verifying,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Signing => "signing",
            Direction::Verifying => "verifying",
        }
    }
}

/// Builds providers after checking key, algorithm and size policy
#[derive(Debug, Clone)]
pub struct SignatureProviderFactory {
    limits: Arc<KeySizeLimits>,
}

impl Default for SignatureProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureProviderFactory {
    /// Factory with its own limits, seeded with the default floors
    #[must_use]
    pub fn new() -> Self {
        Self {
            limits: Arc::new(KeySizeLimits::default()),
        }
    }

    /// Factory with its own limits, seeded with `policy`
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` if `policy` is below a floor
    pub fn with_policy(policy: KeySizePolicy) -> TokenResult<Self> {
        Ok(Self {
            limits: Arc::new(KeySizeLimits::new(policy)?),
        })
    }

    /// Factory reading from an existing limits handle
    #[must_use]
    pub fn with_limits(limits: Arc<KeySizeLimits>) -> Self {
        Self { limits }
    }

    /// Factory bound to the process-wide limits
    #[must_use]
    pub fn shared() -> Self {
        Self::with_limits(KeySizeLimits::shared())
    }

    /// Limits this factory checks against; updates apply to later calls
    #[must_use]
    pub fn key_size_limits(&self) -> &KeySizeLimits {
        &self.limits
    }

    /// Provider able to sign and verify
    ///
    /// # Errors
    /// - `Argument` (`TOK100`, `TOK101`) for an empty algorithm or unsupported key
    /// - `InvalidState` (`TOK102`) for a key without a private half
    /// - `ArgumentOutOfRange` (`TOK110`, `TOK112`) for an undersized key
    /// - `InvalidState` (`TOK120`, `TOK122`) if no context fits the algorithm and key
    pub fn create_for_signing(
        &self,
        key: &SecurityKey,
        algorithm: &str,
    ) -> TokenResult<SignatureProvider> {
        self.create(key, algorithm, Direction::Signing)
    }

    /// Provider able to verify; a public-only key is accepted
    ///
    /// # Errors
    /// - `Argument` (`TOK100`, `TOK101`) for an empty algorithm or unsupported key
    /// - `ArgumentOutOfRange` (`TOK111`, `TOK112`) for an undersized key
    /// - `InvalidState` (`TOK121`, `TOK122`) if no context fits the algorithm and key
    pub fn create_for_verifying(
        &self,
        key: &SecurityKey,
        algorithm: &str,
    ) -> TokenResult<SignatureProvider> {
        self.create(key, algorithm, Direction::Verifying)
    }

    /// Run `f` with a verifying provider that is disposed on every exit path
    ///
    /// # Errors
    /// Returns any factory error, or whatever `f` returns
    pub fn with_verifying<T, F>(&self, key: &SecurityKey, algorithm: &str, f: F) -> TokenResult<T>
    where
        F: FnOnce(&SignatureProvider) -> TokenResult<T>,
    {
        let mut provider = self.create_for_verifying(key, algorithm)?;
        let result = f(&provider);
        provider.dispose();
        result
    }

    fn create(
        &self,
        key: &SecurityKey,
        algorithm: &str,
        direction: Direction,
    ) -> TokenResult<SignatureProvider> {
        if algorithm.trim().is_empty() {
            return Err(TokenError::argument(
                ErrorCode::EmptyAlgorithm,
                "algorithm cannot be empty or whitespace",
            ));
        }

        let class = key.class();
        if class == KeyClass::Unsupported {
            return Err(TokenError::argument(
                ErrorCode::UnsupportedKeyType,
                "key must be a symmetric secret or an asymmetric key pair",
            ));
        }

        if direction == Direction::Signing && !key.has_private_key() {
            return Err(TokenError::invalid_state(
                ErrorCode::MissingPrivateKey,
                "a signing provider needs a key with a private half",
            ));
        }

        let bits = key.size_bits();
        check_key_size(class, bits, direction, &self.limits.snapshot())?;

        let provider = match key {
            SecurityKey::Symmetric(k) => {
                SignatureProvider::Symmetric(SymmetricSignatureProvider::new(k, algorithm)?)
            }
            SecurityKey::Rsa(k) => SignatureProvider::Asymmetric(AsymmetricSignatureProvider::new(
                k,
                algorithm,
                direction == Direction::Signing,
            )?),
            SecurityKey::Handle(_) => {
                return Err(TokenError::argument(
                    ErrorCode::UnsupportedKeyType,
                    "key must be a symmetric secret or an asymmetric key pair",
                ))
            }
        };

        tracing::debug!(
            algorithm = %provider.algorithm(),
            bits,
            direction = direction.as_str(),
            "signature provider created"
        );
        Ok(provider)
    }
}

fn check_key_size(
    class: KeyClass,
    bits: usize,
    direction: Direction,
    policy: &KeySizePolicy,
) -> TokenResult<()> {
    let (minimum, code, what) = match (class, direction) {
        (KeyClass::Symmetric, _) => (
            policy.minimum_symmetric_bits,
            ErrorCode::SymmetricKeyTooSmall,
            "symmetric key is smaller than the minimum",
        ),
        (_, Direction::Signing) => (
            policy.minimum_asymmetric_bits_for_signing,
            ErrorCode::SigningKeyTooSmall,
            "asymmetric key is smaller than the minimum for signing",
        ),
        (_, Direction::Verifying) => (
            policy.minimum_asymmetric_bits_for_verifying,
            ErrorCode::VerifyingKeyTooSmall,
            "asymmetric key is smaller than the minimum for verifying",
        ),
    };
    if bits < minimum {
        return Err(TokenError::out_of_range(code, what, bits, minimum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_check_reports_the_direction() {
        let policy = KeySizePolicy::default();
        let err = check_key_size(KeyClass::Asymmetric, 1024, Direction::Signing, &policy).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SigningKeyTooSmall);
        assert!(check_key_size(KeyClass::Asymmetric, 1024, Direction::Verifying, &policy).is_ok());

        let err = check_key_size(KeyClass::Symmetric, 64, Direction::Verifying, &policy).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SymmetricKeyTooSmall);
    }

    #[test]
    fn with_verifying_disposes_after_an_early_error() {
        let factory = SignatureProviderFactory::new();
        let key = SecurityKey::symmetric(vec![3u8; 32]);
        let result: TokenResult<()> = factory.with_verifying(&key, "HS256", |p| {
            assert!(!p.is_disposed());
            Err(TokenError::invalid_state(ErrorCode::SignatureMismatch, "stop"))
        });
        assert_eq!(result.unwrap_err().code(), ErrorCode::SignatureMismatch);
    }
}
