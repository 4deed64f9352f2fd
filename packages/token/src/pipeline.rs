//! Token validation pipeline
//!
//! `Received -> Decoded -> KeyResolved -> SignatureVerified -> ClaimsValidated
//! -> Trusted`. Every transition either advances or rejects; a rejection ends
//! the run with the error of the stage that failed.

use crate::algorithm::{AlgorithmFamily, SignatureAlgorithm};
use crate::codec;
use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::factory::SignatureProviderFactory;
use crate::key::{KeyClass, SecurityKey};
use crate::token::{SecurityToken, ValidatedToken};
use crate::validation::{CertificateValidation, KeyResolution, ValidationPolicy};
use chrono::{DateTime, Utc};

/// Stage a token has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    /// Compact string accepted for processing
    Received,
    /// Header and payload parsed
    Decoded,
    /// Candidate verifying keys found
    KeyResolved,
    /// Signature checked
    SignatureVerified,
    /// Time, issuer and audience checks passed
    ClaimsValidated,
    /// Claims handed to the caller
    Trusted,
}

enum Candidates {
    /// `alg = none` accepted by policy; nothing to verify
    Unsigned,
    Keys(Vec<SecurityKey>),
}

enum State<'a> {
    Received(&'a str),
    Decoded(SecurityToken),
    KeyResolved {
        token: SecurityToken,
        candidates: Candidates,
    },
    SignatureVerified {
        token: SecurityToken,
        key_id: Option<String>,
    },
    ClaimsValidated {
        token: SecurityToken,
        key_id: Option<String>,
    },
}

impl State<'_> {
    fn stage(&self) -> ValidationStage {
        match self {
            State::Received(_) => ValidationStage::Received,
            State::Decoded(_) => ValidationStage::Decoded,
            State::KeyResolved { .. } => ValidationStage::KeyResolved,
            State::SignatureVerified { .. } => ValidationStage::SignatureVerified,
            State::ClaimsValidated { .. } => ValidationStage::ClaimsValidated,
        }
    }
}

/// Turns a compact token into a [`ValidatedToken`] or a precise rejection
#[derive(Debug, Clone, Default)]
pub struct TokenValidationPipeline {
    factory: SignatureProviderFactory,
}

impl TokenValidationPipeline {
    /// Pipeline verifying through `factory`
    #[must_use]
    pub fn new(factory: SignatureProviderFactory) -> Self {
        Self { factory }
    }

    /// Factory used for verifying providers
    #[must_use]
    pub fn factory(&self) -> &SignatureProviderFactory {
        &self.factory
    }

    /// Validate against the current time
    ///
    /// # Errors
    /// The error of the first stage that rejects the token
    pub fn validate(&self, compact: &str, policy: &ValidationPolicy) -> TokenResult<ValidatedToken> {
        self.validate_at(compact, policy, Utc::now())
    }

    /// Validate as of `now`
    ///
    /// # Errors
    /// The error of the first stage that rejects the token
    pub fn validate_at(
        &self,
        compact: &str,
        policy: &ValidationPolicy,
        now: DateTime<Utc>,
    ) -> TokenResult<ValidatedToken> {
        let mut state = State::Received(compact);
        loop {
            let stage = state.stage();
            let next = match state {
                State::Received(compact) => {
                    codec::parse(compact, policy.max_token_size()).map(State::Decoded)
                }
                State::Decoded(token) => resolve_keys(token, policy),
                State::KeyResolved { token, candidates } => {
                    self.verify_signature(token, candidates, policy)
                }
                State::SignatureVerified { token, key_id } => {
                    validate_claims(&token, policy, now.timestamp())
                        .map(|()| State::ClaimsValidated { token, key_id })
                }
                State::ClaimsValidated { token, key_id } => {
                    tracing::debug!(
                        algorithm = token.signature_algorithm(),
                        key_id = key_id.as_deref(),
                        "token trusted"
                    );
                    return Ok(ValidatedToken::new(token, key_id));
                }
            };
            match next {
                Ok(next) => {
                    tracing::trace!(from = ?stage, to = ?next.stage(), "validation stage passed");
                    state = next;
                }
                Err(err) => {
                    tracing::debug!(stage = ?stage, code = %err.code(), "token rejected");
                    return Err(err);
                }
            }
        }
    }

    fn verify_signature<'a>(
        &self,
        token: SecurityToken,
        candidates: Candidates,
        policy: &ValidationPolicy,
    ) -> TokenResult<State<'a>> {
        let keys = match candidates {
            Candidates::Unsigned => return Ok(State::SignatureVerified { token, key_id: None }),
            Candidates::Keys(keys) => keys,
        };

        let algorithm = token.signature_algorithm().to_string();
        if token.signature().is_empty() {
            return Err(TokenError::SignatureInvalid { algorithm });
        }

        let input = codec::signing_input(&token.encoded_header(), &token.encoded_payload());

        for key in &keys {
            check_certificate(key, policy)?;
            let verified = self.factory.with_verifying(key, &algorithm, |provider| {
                provider.verify(&input, token.signature())
            })?;
            if verified {
                let key_id = key.key_id().map(str::to_string);
                return Ok(State::SignatureVerified { token, key_id });
            }
        }
        Err(TokenError::SignatureInvalid { algorithm })
    }
}

fn resolve_keys<'a>(token: SecurityToken, policy: &ValidationPolicy) -> TokenResult<State<'a>> {
    let algorithm = SignatureAlgorithm::from_id(token.signature_algorithm());

    if algorithm == Some(SignatureAlgorithm::None) {
        if policy.require_signed_tokens() {
            return Err(TokenError::invalid_state(
                ErrorCode::UnsignedTokenRejected,
                "unsigned token not permitted",
            ));
        }
        return Ok(State::KeyResolved {
            token,
            candidates: Candidates::Unsigned,
        });
    }

    let kid = token.header().key_id();
    let keys: Vec<SecurityKey> = match policy.key_resolution() {
        KeyResolution::None => Vec::new(),
        KeyResolution::Static(key) => vec![key.clone()],
        KeyResolution::Set(keys) => match kid {
            Some(kid) => {
                let matched: Vec<SecurityKey> = keys
                    .iter()
                    .filter(|k| k.key_id() == Some(kid))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    // unlabelled keys still get a chance
                    keys.iter()
                        .filter(|k| k.key_id().is_none() && fits_family(k, algorithm))
                        .cloned()
                        .collect()
                } else {
                    matched
                }
            }
            None => keys
                .iter()
                .filter(|k| fits_family(k, algorithm))
                .cloned()
                .collect(),
        },
        KeyResolution::Custom(resolver) => resolver(token.header()),
    };

    if keys.is_empty() {
        return Err(TokenError::SignatureKeyNotFound {
            key_id: kid.map(str::to_string),
        });
    }
    Ok(State::KeyResolved {
        token,
        candidates: Candidates::Keys(keys),
    })
}

/// Unknown algorithms keep every key so the factory reports the real failure
fn fits_family(key: &SecurityKey, algorithm: Option<SignatureAlgorithm>) -> bool {
    match algorithm.map(SignatureAlgorithm::family) {
        Some(AlgorithmFamily::Symmetric) => key.class() == KeyClass::Symmetric,
        Some(AlgorithmFamily::Asymmetric) => key.class() == KeyClass::Asymmetric,
        Some(AlgorithmFamily::Unsecured) => false,
        None => true,
    }
}

fn check_certificate(key: &SecurityKey, policy: &ValidationPolicy) -> TokenResult<()> {
    let Some(certificate) = key.certificate() else {
        return Ok(());
    };
    let mode = policy.certificate_validation();
    if mode == CertificateValidation::None {
        return Ok(());
    }
    let validator = policy.certificate_validator().ok_or_else(|| TokenError::UntrustedCertificate {
        code: ErrorCode::CertificateValidatorMissing,
        message: format!("key is certificate-backed but no validator is configured for {mode:?}"),
    })?;
    validator
        .validate(certificate, mode)
        .map_err(|message| TokenError::UntrustedCertificate {
            code: ErrorCode::UntrustedCertificate,
            message,
        })
}

fn validate_claims(token: &SecurityToken, policy: &ValidationPolicy, now: i64) -> TokenResult<()> {
    let payload = token.payload();
    let skew = policy.clock_skew_seconds();

    match payload.expiration() {
        None if policy.require_expiration_time() => {
            return Err(TokenError::MissingClaim { claim: "exp" });
        }
        Some(exp) if now > exp.saturating_add(skew) => {
            return Err(TokenError::Expired {
                expires: exp,
                now,
                clock_skew: skew,
            });
        }
        _ => {}
    }

    if let Some(nbf) = payload.not_before() {
        if now < nbf.saturating_sub(skew) {
            return Err(TokenError::NotYetValid {
                not_before: nbf,
                now,
                clock_skew: skew,
            });
        }
    }

    if policy.validate_issuer() {
        if !policy.has_issuers() {
            return Err(TokenError::InvalidIssuer {
                code: ErrorCode::IssuersNotConfigured,
                issuer: payload.issuer().map(str::to_string),
            });
        }
        match payload.issuer() {
            Some(iss) if policy.accepts_issuer(iss) => {}
            other => {
                return Err(TokenError::InvalidIssuer {
                    code: ErrorCode::InvalidIssuer,
                    issuer: other.map(str::to_string),
                });
            }
        }
    }

    if policy.restricts_audience() {
        let audiences = payload.audiences();
        if !audiences.iter().any(|aud| policy.accepts_audience(aud)) {
            return Err(TokenError::InvalidAudience {
                audiences: audiences.into_iter().map(str::to_string).collect(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Payload;
    use serde_json::json;

    fn token_with(claims: serde_json::Value) -> SecurityToken {
        let map = claims.as_object().cloned().unwrap_or_default();
        SecurityToken::from_parts(Default::default(), Payload::from_map(map))
    }

    #[test]
    fn skew_applies_to_both_ends() {
        let policy = ValidationPolicy::default()
            .with_validate_issuer(false)
            .with_clock_skew(std::time::Duration::from_secs(10));

        let token = token_with(json!({"exp": 100, "nbf": 50}));
        assert!(validate_claims(&token, &policy, 110).is_ok());
        assert!(validate_claims(&token, &policy, 40).is_ok());
        assert!(matches!(
            validate_claims(&token, &policy, 111),
            Err(TokenError::Expired { .. })
        ));
        assert!(matches!(
            validate_claims(&token, &policy, 39),
            Err(TokenError::NotYetValid { .. })
        ));
    }

    #[test]
    fn issuer_validation_needs_configured_issuers() {
        let token = token_with(json!({"exp": 100, "iss": "a"}));
        let err = validate_claims(&token, &ValidationPolicy::default(), 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IssuersNotConfigured);

        let policy = ValidationPolicy::default().with_valid_issuer("b");
        let err = validate_claims(&token, &policy, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIssuer);
    }

    #[test]
    fn audience_restriction_needs_overlap() {
        let base = ValidationPolicy::default().with_validate_issuer(false);
        let token = token_with(json!({"exp": 100, "aud": ["x", "y"]}));
        assert!(validate_claims(&token, &base, 0).is_ok());
        assert!(validate_claims(&token, &base.clone().with_valid_audiences(["y"]), 0).is_ok());
        let err = validate_claims(&token, &base.with_valid_audience("z"), 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAudience);
    }

    #[test]
    fn key_set_filters_by_kid() {
        let keys = vec![
            SecurityKey::symmetric(vec![1u8; 32]).with_key_id("a"),
            SecurityKey::symmetric(vec![2u8; 32]).with_key_id("b"),
        ];
        let policy = ValidationPolicy::default().with_signing_keys(keys);

        let mut token = token_with(json!({}));
        if let Some(h) = token.header_mut() {
            h.set_algorithm("HS256");
            h.set_key_id("c");
        }
        match resolve_keys(token, &policy) {
            Err(TokenError::SignatureKeyNotFound { key_id }) => {
                assert_eq!(key_id.as_deref(), Some("c"));
            }
            _ => panic!("expected SignatureKeyNotFound"),
        }
    }

    #[test]
    fn unmatched_kid_falls_back_to_unlabelled_keys() {
        let keys = vec![
            SecurityKey::symmetric(vec![1u8; 32]).with_key_id("a"),
            SecurityKey::symmetric(vec![2u8; 32]),
            SecurityKey::handle("keyring"),
        ];
        let policy = ValidationPolicy::default().with_signing_keys(keys);

        let mut token = token_with(json!({}));
        if let Some(h) = token.header_mut() {
            h.set_algorithm("HS256");
            h.set_key_id("rotated");
        }
        match resolve_keys(token, &policy) {
            Ok(State::KeyResolved {
                candidates: Candidates::Keys(keys),
                ..
            }) => {
                assert_eq!(keys.len(), 1);
                assert!(keys[0].key_id().is_none());
                assert_eq!(keys[0].class(), KeyClass::Symmetric);
            }
            _ => panic!("expected the unlabelled symmetric key"),
        }
    }
}
