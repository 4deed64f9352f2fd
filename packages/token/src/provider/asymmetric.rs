//! RSA signature provider (PKCS#1 v1.5 and PSS)

use super::{check_sign_input, check_verify_input, parse_algorithm};
use crate::algorithm::{AlgorithmFamily, HashAlgorithm, RsaPadding, SignatureAlgorithm};
use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::key::RsaKey;
use rsa::rand_core::OsRng;
use rsa::sha2::{Sha256, Sha384, Sha512};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{pkcs1v15, pss, RsaPrivateKey, RsaPublicKey};
use std::fmt;

enum RsaSigner {
    Pkcs1Sha256(pkcs1v15::SigningKey<Sha256>),
    Pkcs1Sha384(pkcs1v15::SigningKey<Sha384>),
    Pkcs1Sha512(pkcs1v15::SigningKey<Sha512>),
    PssSha256(pss::BlindedSigningKey<Sha256>),
    PssSha384(pss::BlindedSigningKey<Sha384>),
    PssSha512(pss::BlindedSigningKey<Sha512>),
}

impl RsaSigner {
    fn new(padding: RsaPadding, hash: HashAlgorithm, key: RsaPrivateKey) -> Self {
        match (padding, hash) {
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha256) => {
                RsaSigner::Pkcs1Sha256(pkcs1v15::SigningKey::new(key))
            }
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha384) => {
                RsaSigner::Pkcs1Sha384(pkcs1v15::SigningKey::new(key))
            }
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha512) => {
                RsaSigner::Pkcs1Sha512(pkcs1v15::SigningKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha256) => {
                RsaSigner::PssSha256(pss::BlindedSigningKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha384) => {
                RsaSigner::PssSha384(pss::BlindedSigningKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha512) => {
                RsaSigner::PssSha512(pss::BlindedSigningKey::new(key))
            }
        }
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, rsa::signature::Error> {
        let bytes = match self {
            RsaSigner::Pkcs1Sha256(k) => k.try_sign(input)?.to_vec(),
            RsaSigner::Pkcs1Sha384(k) => k.try_sign(input)?.to_vec(),
            RsaSigner::Pkcs1Sha512(k) => k.try_sign(input)?.to_vec(),
            RsaSigner::PssSha256(k) => k.try_sign_with_rng(&mut OsRng, input)?.to_vec(),
            RsaSigner::PssSha384(k) => k.try_sign_with_rng(&mut OsRng, input)?.to_vec(),
            RsaSigner::PssSha512(k) => k.try_sign_with_rng(&mut OsRng, input)?.to_vec(),
        };
        Ok(bytes)
    }
}

enum RsaVerifier {
    Pkcs1Sha256(pkcs1v15::VerifyingKey<Sha256>),
    Pkcs1Sha384(pkcs1v15::VerifyingKey<Sha384>),
    Pkcs1Sha512(pkcs1v15::VerifyingKey<Sha512>),
    PssSha256(pss::VerifyingKey<Sha256>),
    PssSha384(pss::VerifyingKey<Sha384>),
    PssSha512(pss::VerifyingKey<Sha512>),
}

impl RsaVerifier {
    fn new(padding: RsaPadding, hash: HashAlgorithm, key: RsaPublicKey) -> Self {
        match (padding, hash) {
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha256) => {
                RsaVerifier::Pkcs1Sha256(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha384) => {
                RsaVerifier::Pkcs1Sha384(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaPadding::Pkcs1v15, HashAlgorithm::Sha512) => {
                RsaVerifier::Pkcs1Sha512(pkcs1v15::VerifyingKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha256) => {
                RsaVerifier::PssSha256(pss::VerifyingKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha384) => {
                RsaVerifier::PssSha384(pss::VerifyingKey::new(key))
            }
            (RsaPadding::Pss, HashAlgorithm::Sha512) => {
                RsaVerifier::PssSha512(pss::VerifyingKey::new(key))
            }
        }
    }

    /// Malformed signature bytes are a mismatch, not an error
    fn verify(&self, input: &[u8], signature: &[u8]) -> bool {
        match self {
            RsaVerifier::Pkcs1Sha256(k) => pkcs1v15::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
            RsaVerifier::Pkcs1Sha384(k) => pkcs1v15::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
            RsaVerifier::Pkcs1Sha512(k) => pkcs1v15::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
            RsaVerifier::PssSha256(k) => pss::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
            RsaVerifier::PssSha384(k) => pss::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
            RsaVerifier::PssSha512(k) => pss::Signature::try_from(signature)
                .is_ok_and(|s| k.verify(input, &s).is_ok()),
        }
    }
}

struct RsaContexts {
    signer: Option<RsaSigner>,
    verifier: RsaVerifier,
}

/// RSA provider
///
/// Built for signing it holds a signer and a verifier; built for verifying it
/// holds only the verifier and rejects `sign`.
pub struct AsymmetricSignatureProvider {
    algorithm: SignatureAlgorithm,
    contexts: Option<RsaContexts>,
}

impl AsymmetricSignatureProvider {
    /// Prepare RSA contexts for `algorithm`. Key-size policy is the factory's
    /// job and is not checked here.
    ///
    /// # Errors
    /// - `Argument` (`TOK100`) for an empty algorithm
    /// - `InvalidState` (`TOK102`) for signing without a private key
    /// - `InvalidState` (`TOK120`/`TOK121`) if the algorithm is not an RSA algorithm
    pub fn new(key: &RsaKey, algorithm: &str, will_be_used_for_signing: bool) -> TokenResult<Self> {
        let parsed = parse_algorithm(algorithm)?;

        let private = match (will_be_used_for_signing, key.private_key()) {
            (true, None) => {
                return Err(TokenError::invalid_state(
                    ErrorCode::MissingPrivateKey,
                    "a signing provider needs a key with a private half",
                ))
            }
            (true, Some(private)) => Some(private),
            (false, _) => None,
        };

        let unavailable = || {
            let (code, direction) = if will_be_used_for_signing {
                (ErrorCode::SigningContextUnavailable, "signing")
            } else {
                (ErrorCode::VerifyingContextUnavailable, "verifying")
            };
            TokenError::invalid_state(
                code,
                &format!("cannot construct a {direction} context for algorithm '{algorithm}'"),
            )
        };

        let alg = parsed
            .filter(|a| a.family() == AlgorithmFamily::Asymmetric)
            .ok_or_else(unavailable)?;
        let (padding, hash) = match (alg.padding(), alg.hash()) {
            (Some(padding), Some(hash)) => (padding, hash),
            _ => return Err(unavailable()),
        };

        let contexts = RsaContexts {
            signer: private.map(|k| RsaSigner::new(padding, hash, k.clone())),
            verifier: RsaVerifier::new(padding, hash, key.public_key().clone()),
        };

        Ok(Self {
            algorithm: alg,
            contexts: Some(contexts),
        })
    }

    /// Sign `input` with the private key
    ///
    /// # Errors
    /// - `Disposed` after dispose
    /// - `Argument` (`TOK130`) for empty input
    /// - `InvalidState` (`TOK133`) when built for verifying only
    /// - `InvalidState` (`TOK134`) if the RSA primitive fails
    pub fn sign(&self, input: &[u8]) -> TokenResult<Vec<u8>> {
        let contexts = self.contexts()?;
        check_sign_input(input)?;
        let signer = contexts.signer.as_ref().ok_or_else(|| {
            TokenError::invalid_state(
                ErrorCode::NotASigningProvider,
                "provider was created for verifying and cannot sign",
            )
        })?;
        signer.sign(input).map_err(|e| {
            TokenError::invalid_state(
                ErrorCode::SigningFailed,
                &format!("{} signing failed: {e}", self.algorithm),
            )
        })
    }

    /// Verify `signature` over `input` with the public key
    ///
    /// # Errors
    /// `Disposed` after dispose, `Argument` (`TOK131`/`TOK132`) for empty buffers
    pub fn verify(&self, input: &[u8], signature: &[u8]) -> TokenResult<bool> {
        let contexts = self.contexts()?;
        check_verify_input(input, signature)?;
        Ok(contexts.verifier.verify(input, signature))
    }

    /// Drop both contexts; idempotent
    pub fn dispose(&mut self) {
        if self.contexts.take().is_some() {
            tracing::trace!(algorithm = %self.algorithm, "asymmetric signature provider disposed");
        }
    }

    /// Whether the contexts have been released
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.contexts.is_none()
    }

    /// Whether this provider can sign
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.contexts.as_ref().is_some_and(|c| c.signer.is_some())
    }

    /// Algorithm bound at construction
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn contexts(&self) -> TokenResult<&RsaContexts> {
        self.contexts
            .as_ref()
            .ok_or_else(|| TokenError::disposed("AsymmetricSignatureProvider"))
    }
}

impl fmt::Debug for AsymmetricSignatureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricSignatureProvider")
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.can_sign())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SecurityKey;

    fn rsa_1024() -> RsaKey {
        match SecurityKey::rsa_private_pem(include_str!("../../tests/fixtures/rsa_1024.pem")) {
            Ok(SecurityKey::Rsa(k)) => k,
            other => panic!("fixture did not load: {other:?}"),
        }
    }

    #[test]
    fn pkcs1_signatures_are_deterministic() {
        let provider = AsymmetricSignatureProvider::new(&rsa_1024(), "RS256", true).unwrap();
        let a = provider.sign(b"header.payload").unwrap();
        let b = provider.sign(b"header.payload").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn pss_signatures_are_salted_but_verify() {
        let provider = AsymmetricSignatureProvider::new(&rsa_1024(), "PS256", true).unwrap();
        let a = provider.sign(b"header.payload").unwrap();
        let b = provider.sign(b"header.payload").unwrap();
        assert_ne!(a, b);
        assert!(provider.verify(b"header.payload", &a).unwrap());
        assert!(provider.verify(b"header.payload", &b).unwrap());
    }

    #[test]
    fn padding_schemes_do_not_cross_verify() {
        let key = rsa_1024();
        let rs = AsymmetricSignatureProvider::new(&key, "RS256", true).unwrap();
        let ps = AsymmetricSignatureProvider::new(&key, "PS256", false).unwrap();
        let sig = rs.sign(b"data").unwrap();
        assert!(!ps.verify(b"data", &sig).unwrap());
    }

    #[test]
    fn wrong_length_signature_is_a_mismatch() {
        let provider = AsymmetricSignatureProvider::new(&rsa_1024(), "RS512", false).unwrap();
        assert!(!provider.verify(b"data", &[0u8; 3]).unwrap());
    }

    #[test]
    fn keyed_hash_algorithm_is_unavailable() {
        let key = rsa_1024();
        let err = AsymmetricSignatureProvider::new(&key, "HS256", true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SigningContextUnavailable);
        let err = AsymmetricSignatureProvider::new(&key, "HS256", false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VerifyingContextUnavailable);
    }
}
