//! Error taxonomy for token signing and validation
//!
//! Every failure carries a stable [`ErrorCode`] so callers can log, audit or
//! map it to a transport status without parsing messages. Codes are grouped:
//! - TOK1XX: signature providers, the provider factory and key-size policy
//! - TOK2XX: compact serialization
//! - TOK3XX: key resolution and signature verification
//! - TOK4XX: claim validation
//! - TOK5XX: configuration

use std::fmt;
use thiserror::Error;

/// Token operation result type
pub type TokenResult<T> = Result<T, TokenError>;

/// Stable identifiers for every distinct failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// TOK100: algorithm identifier empty or whitespace
    EmptyAlgorithm,
    /// TOK101: key is neither symmetric nor asymmetric
    UnsupportedKeyType,
    /// TOK102: signing requested with a key that has no private half
    MissingPrivateKey,
    /// TOK103: key material could not be decoded
    InvalidKeyMaterial,
    /// TOK110: asymmetric key below the signing minimum
    SigningKeyTooSmall,
    /// TOK111: asymmetric key below the verifying minimum
    VerifyingKeyTooSmall,
    /// TOK112: symmetric key below the symmetric minimum
    SymmetricKeyTooSmall,
    /// TOK113: signing minimum set below its absolute floor
    SigningMinimumBelowFloor,
    /// TOK114: verifying minimum set below its absolute floor
    VerifyingMinimumBelowFloor,
    /// TOK115: symmetric minimum set below its absolute floor
    SymmetricMinimumBelowFloor,
    /// TOK120: no signing context for this algorithm and key
    SigningContextUnavailable,
    /// TOK121: no verifying context for this algorithm and key
    VerifyingContextUnavailable,
    /// TOK122: no keyed-hash context for this algorithm and secret
    KeyedHashUnavailable,
    /// TOK130: sign called with zero-length input
    SignEmptyInput,
    /// TOK131: verify called with zero-length input
    VerifyEmptyInput,
    /// TOK132: verify called with a zero-length signature
    VerifyEmptySignature,
    /// TOK133: sign called on a verify-only provider
    NotASigningProvider,
    /// TOK134: the primitive failed while producing a signature
    SigningFailed,
    /// TOK140: provider used after dispose
    ProviderDisposed,
    /// TOK200: compact token exceeds the configured byte limit
    TokenTooLarge,
    /// TOK201: compact token does not have exactly three segments
    SegmentCount,
    /// TOK202: header segment is not base64url
    HeaderEncoding,
    /// TOK203: payload segment is not base64url
    PayloadEncoding,
    /// TOK204: signature segment is not base64url
    SignatureEncoding,
    /// TOK205: header is not a JSON object
    HeaderStructure,
    /// TOK206: payload is not a JSON object
    PayloadStructure,
    /// TOK207: unsigned token carries a signature segment
    UnsignedWithSignature,
    /// TOK208: header has no `alg`
    MissingAlgorithm,
    /// TOK209: header or payload could not be serialized
    Serialization,
    /// TOK210: a reserved claim has the wrong JSON type
    MalformedClaim,
    /// TOK300: unsigned token while signed tokens are required
    UnsignedTokenRejected,
    /// TOK301: no key matched the token
    SigningKeyNotFound,
    /// TOK302: signature did not verify
    SignatureMismatch,
    /// TOK303: token has a signing algorithm but no credentials
    MissingCredentials,
    /// TOK304: certificate-backed key rejected by the trust validator
    UntrustedCertificate,
    /// TOK305: certificate validation required but no validator configured
    CertificateValidatorMissing,
    /// TOK400: `exp` required but absent
    MissingExpiration,
    /// TOK401: token expired
    Expired,
    /// TOK402: token not yet valid
    NotYetValid,
    /// TOK403: issuer not accepted
    InvalidIssuer,
    /// TOK404: issuer validation on but no accepted issuers configured
    IssuersNotConfigured,
    /// TOK405: no audience overlap
    InvalidAudience,
    /// TOK406: expiration not after not-before when issuing
    InvalidLifetime,
    /// TOK500: configuration rejected
    InvalidConfiguration,
}

impl ErrorCode {
    /// Stable string form, e.g. `TOK130`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::EmptyAlgorithm => "TOK100",
            ErrorCode::UnsupportedKeyType => "TOK101",
            ErrorCode::MissingPrivateKey => "TOK102",
            ErrorCode::InvalidKeyMaterial => "TOK103",
            ErrorCode::SigningKeyTooSmall => "TOK110",
            ErrorCode::VerifyingKeyTooSmall => "TOK111",
            ErrorCode::SymmetricKeyTooSmall => "TOK112",
            ErrorCode::SigningMinimumBelowFloor => "TOK113",
            ErrorCode::VerifyingMinimumBelowFloor => "TOK114",
            ErrorCode::SymmetricMinimumBelowFloor => "TOK115",
            ErrorCode::SigningContextUnavailable => "TOK120",
            ErrorCode::VerifyingContextUnavailable => "TOK121",
            ErrorCode::KeyedHashUnavailable => "TOK122",
            ErrorCode::SignEmptyInput => "TOK130",
            ErrorCode::VerifyEmptyInput => "TOK131",
            ErrorCode::VerifyEmptySignature => "TOK132",
            ErrorCode::NotASigningProvider => "TOK133",
            ErrorCode::SigningFailed => "TOK134",
            ErrorCode::ProviderDisposed => "TOK140",
            ErrorCode::TokenTooLarge => "TOK200",
            ErrorCode::SegmentCount => "TOK201",
            ErrorCode::HeaderEncoding => "TOK202",
            ErrorCode::PayloadEncoding => "TOK203",
            ErrorCode::SignatureEncoding => "TOK204",
            ErrorCode::HeaderStructure => "TOK205",
            ErrorCode::PayloadStructure => "TOK206",
            ErrorCode::UnsignedWithSignature => "TOK207",
            ErrorCode::MissingAlgorithm => "TOK208",
            ErrorCode::Serialization => "TOK209",
            ErrorCode::MalformedClaim => "TOK210",
            ErrorCode::UnsignedTokenRejected => "TOK300",
            ErrorCode::SigningKeyNotFound => "TOK301",
            ErrorCode::SignatureMismatch => "TOK302",
            ErrorCode::MissingCredentials => "TOK303",
            ErrorCode::UntrustedCertificate => "TOK304",
            ErrorCode::CertificateValidatorMissing => "TOK305",
            ErrorCode::MissingExpiration => "TOK400",
            ErrorCode::Expired => "TOK401",
            ErrorCode::NotYetValid => "TOK402",
            ErrorCode::InvalidIssuer => "TOK403",
            ErrorCode::IssuersNotConfigured => "TOK404",
            ErrorCode::InvalidAudience => "TOK405",
            ErrorCode::InvalidLifetime => "TOK406",
            ErrorCode::InvalidConfiguration => "TOK500",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check failed, independent of the specific code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent
    ArgumentNull,
    /// An argument was present but invalid (empty string, zero-length buffer)
    Argument,
    /// A numeric policy or key-size violation
    ArgumentOutOfRange,
    /// Operation not valid for the current provider or key configuration
    InvalidState,
    /// Resource used after disposal
    Disposed,
    /// Malformed or oversized compact token
    Format,
    /// No key could be resolved for the token
    SignatureKeyNotFound,
    /// The signature did not verify
    SignatureInvalid,
    /// A required claim is absent
    MissingClaim,
    /// The token has expired
    Expired,
    /// The token is not yet valid
    NotYetValid,
    /// The issuer is not accepted
    InvalidIssuer,
    /// No audience overlap
    InvalidAudience,
    /// The verifying key's certificate is not trusted
    UntrustedCertificate,
}

/// Coarse grouping for callers that map failures to transport status or audit trails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The input could not be understood
    Malformed,
    /// The input parsed but is cryptographically untrustworthy
    Untrusted,
    /// The input is authentic but rejected by policy
    PolicyRejected,
    /// Programmer or configuration error on the calling side
    Fault,
}

/// Token signing and validation errors
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// A required argument was not supplied
    #[error("[{code}] required argument '{name}' was not supplied")]
    ArgumentNull {
        /// Stable identifier
        code: ErrorCode,
        /// Argument name
        name: &'static str,
    },

    /// An argument was present but invalid
    #[error("[{code}] {message}")]
    Argument {
        /// Stable identifier
        code: ErrorCode,
        /// What was wrong
        message: String,
    },

    /// A numeric value is outside the permitted range
    #[error("[{code}] {message}: got {actual}, minimum is {minimum}")]
    ArgumentOutOfRange {
        /// Stable identifier
        code: ErrorCode,
        /// What was checked
        message: String,
        /// Offending value
        actual: usize,
        /// Smallest permitted value
        minimum: usize,
    },

    /// Operation not valid in the current configuration
    #[error("[{code}] {message}")]
    InvalidState {
        /// Stable identifier
        code: ErrorCode,
        /// What was wrong
        message: String,
    },

    /// Resource used after `dispose()`
    #[error("[{}] {resource} has been disposed", ErrorCode::ProviderDisposed)]
    Disposed {
        /// Name of the disposed resource
        resource: &'static str,
    },

    /// Malformed or oversized compact token
    #[error("[{code}] {message}")]
    Format {
        /// Stable identifier
        code: ErrorCode,
        /// What was wrong
        message: String,
    },

    /// No key could be resolved to verify the token
    #[error("[{}] no signing key found{}", ErrorCode::SigningKeyNotFound, match key_id {
        Some(kid) => format!(" for key id '{kid}'"),
        None => String::new(),
    })]
    SignatureKeyNotFound {
        /// The `kid` the token asked for, if any
        key_id: Option<String>,
    },

    /// The signature did not verify
    #[error("[{}] signature verification failed for algorithm {algorithm}", ErrorCode::SignatureMismatch)]
    SignatureInvalid {
        /// Header algorithm of the rejected token
        algorithm: String,
    },

    /// A required claim is absent
    #[error("[{}] required claim '{claim}' is missing", ErrorCode::MissingExpiration)]
    MissingClaim {
        /// Claim name
        claim: &'static str,
    },

    /// The token has expired
    #[error("[{}] token expired at {expires}, current time is {now} (clock skew {clock_skew}s)", ErrorCode::Expired)]
    Expired {
        /// `exp` (unix seconds)
        expires: i64,
        /// Validation time (unix seconds)
        now: i64,
        /// Tolerance applied (seconds)
        clock_skew: i64,
    },

    /// The token is not yet valid
    #[error("[{}] token not valid before {not_before}, current time is {now} (clock skew {clock_skew}s)", ErrorCode::NotYetValid)]
    NotYetValid {
        /// `nbf` (unix seconds)
        not_before: i64,
        /// Validation time (unix seconds)
        now: i64,
        /// Tolerance applied (seconds)
        clock_skew: i64,
    },

    /// The issuer is not accepted
    #[error("[{code}] issuer {} is not accepted", match issuer {
        Some(iss) => format!("'{iss}'"),
        None => "(none)".to_string(),
    })]
    InvalidIssuer {
        /// Stable identifier
        code: ErrorCode,
        /// The token's issuer
        issuer: Option<String>,
    },

    /// None of the token's audiences is accepted
    #[error("[{}] audience {audiences:?} is not accepted", ErrorCode::InvalidAudience)]
    InvalidAudience {
        /// The token's audiences
        audiences: Vec<String>,
    },

    /// The certificate backing the verifying key is not trusted
    #[error("[{code}] {message}")]
    UntrustedCertificate {
        /// Stable identifier
        code: ErrorCode,
        /// Validator output
        message: String,
    },
}

impl TokenError {
    /// Create an argument error
    #[inline]
    #[must_use]
    pub fn argument(code: ErrorCode, msg: &str) -> Self {
        TokenError::Argument {
            code,
            message: msg.to_string(),
        }
    }

    /// Create an out-of-range error
    #[inline]
    #[must_use]
    pub fn out_of_range(code: ErrorCode, msg: &str, actual: usize, minimum: usize) -> Self {
        TokenError::ArgumentOutOfRange {
            code,
            message: msg.to_string(),
            actual,
            minimum,
        }
    }

    /// Create an invalid state error
    #[inline]
    #[must_use]
    pub fn invalid_state(code: ErrorCode, msg: &str) -> Self {
        TokenError::InvalidState {
            code,
            message: msg.to_string(),
        }
    }

    /// Create a format error
    #[inline]
    #[must_use]
    pub fn format(code: ErrorCode, msg: &str) -> Self {
        TokenError::Format {
            code,
            message: msg.to_string(),
        }
    }

    /// Create a disposed-resource error
    #[inline]
    #[must_use]
    pub fn disposed(resource: &'static str) -> Self {
        TokenError::Disposed { resource }
    }

    /// Stable identifier of this failure
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            TokenError::ArgumentNull { code, .. }
            | TokenError::Argument { code, .. }
            | TokenError::ArgumentOutOfRange { code, .. }
            | TokenError::InvalidState { code, .. }
            | TokenError::Format { code, .. }
            | TokenError::InvalidIssuer { code, .. }
            | TokenError::UntrustedCertificate { code, .. } => *code,
            TokenError::Disposed { .. } => ErrorCode::ProviderDisposed,
            TokenError::SignatureKeyNotFound { .. } => ErrorCode::SigningKeyNotFound,
            TokenError::SignatureInvalid { .. } => ErrorCode::SignatureMismatch,
            TokenError::MissingClaim { .. } => ErrorCode::MissingExpiration,
            TokenError::Expired { .. } => ErrorCode::Expired,
            TokenError::NotYetValid { .. } => ErrorCode::NotYetValid,
            TokenError::InvalidAudience { .. } => ErrorCode::InvalidAudience,
        }
    }

    /// Which check failed
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::ArgumentNull { .. } => ErrorKind::ArgumentNull,
            TokenError::Argument { .. } => ErrorKind::Argument,
            TokenError::ArgumentOutOfRange { .. } => ErrorKind::ArgumentOutOfRange,
            TokenError::InvalidState { .. } => ErrorKind::InvalidState,
            TokenError::Disposed { .. } => ErrorKind::Disposed,
            TokenError::Format { .. } => ErrorKind::Format,
            TokenError::SignatureKeyNotFound { .. } => ErrorKind::SignatureKeyNotFound,
            TokenError::SignatureInvalid { .. } => ErrorKind::SignatureInvalid,
            TokenError::MissingClaim { .. } => ErrorKind::MissingClaim,
            TokenError::Expired { .. } => ErrorKind::Expired,
            TokenError::NotYetValid { .. } => ErrorKind::NotYetValid,
            TokenError::InvalidIssuer { .. } => ErrorKind::InvalidIssuer,
            TokenError::InvalidAudience { .. } => ErrorKind::InvalidAudience,
            TokenError::UntrustedCertificate { .. } => ErrorKind::UntrustedCertificate,
        }
    }

    /// Coarse grouping of this failure
    ///
    /// Key-size violations count as policy rejections: the key is authentic
    /// but too weak to be trusted. An unsigned token rejected by policy is
    /// likewise a policy rejection rather than a fault.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::Format => ErrorCategory::Malformed,
            ErrorKind::SignatureKeyNotFound
            | ErrorKind::SignatureInvalid
            | ErrorKind::UntrustedCertificate => ErrorCategory::Untrusted,
            ErrorKind::MissingClaim
            | ErrorKind::Expired
            | ErrorKind::NotYetValid
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::ArgumentOutOfRange => ErrorCategory::PolicyRejected,
            ErrorKind::InvalidState if self.code() == ErrorCode::UnsignedTokenRejected => {
                ErrorCategory::PolicyRejected
            }
            ErrorKind::ArgumentNull
            | ErrorKind::Argument
            | ErrorKind::InvalidState
            | ErrorKind::Disposed => ErrorCategory::Fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let codes = [
            ErrorCode::SignEmptyInput,
            ErrorCode::VerifyEmptyInput,
            ErrorCode::VerifyEmptySignature,
            ErrorCode::SigningKeyTooSmall,
            ErrorCode::VerifyingKeyTooSmall,
            ErrorCode::SymmetricKeyTooSmall,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn display_carries_code() {
        let err = TokenError::argument(ErrorCode::SignEmptyInput, "input is empty");
        assert_eq!(err.to_string(), "[TOK130] input is empty");

        let err = TokenError::SignatureKeyNotFound {
            key_id: Some("k1".to_string()),
        };
        assert_eq!(err.to_string(), "[TOK301] no signing key found for key id 'k1'");
    }

    #[test]
    fn categories_separate_malformed_untrusted_and_policy() {
        assert_eq!(
            TokenError::format(ErrorCode::SegmentCount, "bad").category(),
            ErrorCategory::Malformed
        );
        assert_eq!(
            TokenError::SignatureInvalid {
                algorithm: "HS256".to_string()
            }
            .category(),
            ErrorCategory::Untrusted
        );
        assert_eq!(
            TokenError::Expired {
                expires: 1,
                now: 2,
                clock_skew: 0
            }
            .category(),
            ErrorCategory::PolicyRejected
        );
        assert_eq!(
            TokenError::invalid_state(ErrorCode::UnsignedTokenRejected, "unsigned").category(),
            ErrorCategory::PolicyRejected
        );
        assert_eq!(
            TokenError::invalid_state(ErrorCode::MissingPrivateKey, "no private key").category(),
            ErrorCategory::Fault
        );
    }
}
