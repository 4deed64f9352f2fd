//! Signature providers
//!
//! A provider owns one prepared cryptographic context bound to one key and one
//! algorithm. The set of variants is closed; the factory picks the variant
//! from the key class.
//!
//! Providers are not meant to be shared between threads mid-operation:
//! `dispose` takes `&mut self`, so it can never overlap an in-flight
//! `sign`/`verify` on the same instance.

mod asymmetric;
mod symmetric;

pub use asymmetric::AsymmetricSignatureProvider;
pub use symmetric::SymmetricSignatureProvider;

use crate::algorithm::SignatureAlgorithm;
use crate::error::{ErrorCode, TokenError, TokenResult};

/// Signer/verifier for one key and one algorithm
#[derive(Debug)]
pub enum SignatureProvider {
    /// Keyed hash over a shared secret
    Symmetric(SymmetricSignatureProvider),
    /// RSA signature over a key pair
    Asymmetric(AsymmetricSignatureProvider),
}

impl SignatureProvider {
    /// Sign `input`, returning raw signature bytes
    ///
    /// # Errors
    /// - `Disposed` after [`dispose`](Self::dispose)
    /// - `Argument` (`TOK130`) for zero-length input
    /// - `InvalidState` (`TOK133`) on a verify-only provider
    pub fn sign(&self, input: &[u8]) -> TokenResult<Vec<u8>> {
        match self {
            SignatureProvider::Symmetric(p) => p.sign(input),
            SignatureProvider::Asymmetric(p) => p.sign(input),
        }
    }

    /// Check `signature` over `input`. A mismatch is `Ok(false)`, not an error.
    ///
    /// # Errors
    /// - `Disposed` after [`dispose`](Self::dispose)
    /// - `Argument` (`TOK131`) for zero-length input
    /// - `Argument` (`TOK132`) for a zero-length signature
    pub fn verify(&self, input: &[u8], signature: &[u8]) -> TokenResult<bool> {
        match self {
            SignatureProvider::Symmetric(p) => p.verify(input, signature),
            SignatureProvider::Asymmetric(p) => p.verify(input, signature),
        }
    }

    /// Release the cryptographic context. Calling it again does nothing.
    pub fn dispose(&mut self) {
        match self {
            SignatureProvider::Symmetric(p) => p.dispose(),
            SignatureProvider::Asymmetric(p) => p.dispose(),
        }
    }

    /// Whether [`dispose`](Self::dispose) has run
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        match self {
            SignatureProvider::Symmetric(p) => p.is_disposed(),
            SignatureProvider::Asymmetric(p) => p.is_disposed(),
        }
    }

    /// Algorithm this provider was built for
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            SignatureProvider::Symmetric(p) => p.algorithm(),
            SignatureProvider::Asymmetric(p) => p.algorithm(),
        }
    }
}

/// Resolve and sanity-check an algorithm id at provider construction
pub(crate) fn parse_algorithm(algorithm: &str) -> TokenResult<Option<SignatureAlgorithm>> {
    if algorithm.trim().is_empty() {
        return Err(TokenError::argument(
            ErrorCode::EmptyAlgorithm,
            "algorithm cannot be empty or whitespace",
        ));
    }
    Ok(SignatureAlgorithm::from_id(algorithm))
}

pub(crate) fn check_sign_input(input: &[u8]) -> TokenResult<()> {
    if input.is_empty() {
        return Err(TokenError::argument(
            ErrorCode::SignEmptyInput,
            "cannot sign zero-length input",
        ));
    }
    Ok(())
}

pub(crate) fn check_verify_input(input: &[u8], signature: &[u8]) -> TokenResult<()> {
    if input.is_empty() {
        return Err(TokenError::argument(
            ErrorCode::VerifyEmptyInput,
            "cannot verify zero-length input",
        ));
    }
    if signature.is_empty() {
        return Err(TokenError::argument(
            ErrorCode::VerifyEmptySignature,
            "cannot verify a zero-length signature",
        ));
    }
    Ok(())
}
