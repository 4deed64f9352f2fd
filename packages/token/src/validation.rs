//! Validation policy
//!
//! Immutable for the duration of one `validate` call. Start from
//! [`ValidationPolicy::default`] or [`ValidationPolicy::from_config`] and
//! override per call with the `with_*` builders.

use crate::claims::Header;
use crate::config::TokenHandlerConfig;
use crate::key::SecurityKey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default tolerance applied to `exp` and `nbf`
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);
/// Default limit on the compact token length, in bytes
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 2 * 1024 * 1024;

/// Callback that picks candidate keys for a header
pub type KeyResolver = dyn Fn(&Header) -> Vec<SecurityKey> + Send + Sync;

/// Where verifying keys come from
#[derive(Clone, Default)]
pub enum KeyResolution {
    /// No keys; only unsigned tokens can pass, and only when allowed
    #[default]
    None,
    /// One key, used whatever `kid` says
    Static(SecurityKey),
    /// Keys matched by `kid`. When no key carries that id, or the token has
    /// no `kid`, keys of the right family are tried; with a `kid` only the
    /// unlabelled ones
    Set(Vec<SecurityKey>),
    /// Caller-supplied lookup
    Custom(Arc<KeyResolver>),
}

impl fmt::Debug for KeyResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyResolution::None => f.write_str("None"),
            KeyResolution::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeyResolution::Set(keys) => f.debug_tuple("Set").field(&keys.len()).finish(),
            KeyResolution::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Trust model for certificate-backed verifying keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateValidation {
    /// Certificates are not checked
    None,
    /// Certificate must be explicitly trusted
    PeerTrust,
    /// Certificate must chain to a trusted root
    ChainTrust,
    /// Either of the above
    #[default]
    PeerOrChainTrust,
}

/// External trust decision for a certificate-backed key
pub trait CertificateValidator: Send + Sync {
    /// Accept or reject a DER certificate under `mode`; the error text is
    /// reported back to the caller
    fn validate(&self, certificate: &[u8], mode: CertificateValidation) -> Result<(), String>;
}

/// Per-call validation settings
#[derive(Clone)]
pub struct ValidationPolicy {
    valid_issuer: Option<String>,
    valid_issuers: Vec<String>,
    valid_audience: Option<String>,
    valid_audiences: Vec<String>,
    validate_issuer: bool,
    clock_skew: Duration,
    max_token_size: usize,
    require_expiration_time: bool,
    require_signed_tokens: bool,
    key_resolution: KeyResolution,
    certificate_validation: CertificateValidation,
    certificate_validator: Option<Arc<dyn CertificateValidator>>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            valid_issuer: None,
            valid_issuers: Vec::new(),
            valid_audience: None,
            valid_audiences: Vec::new(),
            validate_issuer: true,
            clock_skew: DEFAULT_CLOCK_SKEW,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
            require_expiration_time: true,
            require_signed_tokens: true,
            key_resolution: KeyResolution::None,
            certificate_validation: CertificateValidation::default(),
            certificate_validator: None,
        }
    }
}

impl fmt::Debug for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPolicy")
            .field("valid_issuer", &self.valid_issuer)
            .field("valid_issuers", &self.valid_issuers)
            .field("valid_audience", &self.valid_audience)
            .field("valid_audiences", &self.valid_audiences)
            .field("validate_issuer", &self.validate_issuer)
            .field("clock_skew", &self.clock_skew)
            .field("max_token_size", &self.max_token_size)
            .field("require_expiration_time", &self.require_expiration_time)
            .field("require_signed_tokens", &self.require_signed_tokens)
            .field("key_resolution", &self.key_resolution)
            .field("certificate_validation", &self.certificate_validation)
            .field("has_certificate_validator", &self.certificate_validator.is_some())
            .finish()
    }
}

impl ValidationPolicy {
    /// Defaults taken from handler configuration
    #[must_use]
    pub fn from_config(config: &TokenHandlerConfig) -> Self {
        Self {
            validate_issuer: config.validate_issuer,
            clock_skew: Duration::from_secs(config.max_clock_skew_seconds),
            max_token_size: config.max_token_size_bytes,
            require_expiration_time: config.require_expiration_time,
            require_signed_tokens: config.require_signed_tokens,
            ..Self::default()
        }
    }

    /// Accept a single issuer
    #[must_use]
    pub fn with_valid_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.valid_issuer = Some(issuer.into());
        self
    }

    /// Accept any of `issuers`, in addition to the single issuer
    #[must_use]
    pub fn with_valid_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to a single audience
    #[must_use]
    pub fn with_valid_audience(mut self, audience: impl Into<String>) -> Self {
        self.valid_audience = Some(audience.into());
        self
    }

    /// Restrict to any of `audiences`, in addition to the single audience
    #[must_use]
    pub fn with_valid_audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_audiences = audiences.into_iter().map(Into::into).collect();
        self
    }

    /// Turn issuer validation on or off
    #[must_use]
    pub fn with_validate_issuer(mut self, validate: bool) -> Self {
        self.validate_issuer = validate;
        self
    }

    /// Tolerance for `exp` and `nbf`
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Largest compact token accepted, in bytes
    #[must_use]
    pub fn with_max_token_size(mut self, bytes: usize) -> Self {
        self.max_token_size = bytes;
        self
    }

    /// Require an `exp` claim
    #[must_use]
    pub fn with_require_expiration_time(mut self, require: bool) -> Self {
        self.require_expiration_time = require;
        self
    }

    /// Reject `alg = none`
    #[must_use]
    pub fn with_require_signed_tokens(mut self, require: bool) -> Self {
        self.require_signed_tokens = require;
        self
    }

    /// Verify with exactly this key
    #[must_use]
    pub fn with_signing_key(mut self, key: SecurityKey) -> Self {
        self.key_resolution = KeyResolution::Static(key);
        self
    }

    /// Verify with a key chosen from `keys`
    #[must_use]
    pub fn with_signing_keys(mut self, keys: Vec<SecurityKey>) -> Self {
        self.key_resolution = KeyResolution::Set(keys);
        self
    }

    /// Verify with keys returned by `resolver`
    #[must_use]
    pub fn with_key_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Header) -> Vec<SecurityKey> + Send + Sync + 'static,
    {
        self.key_resolution = KeyResolution::Custom(Arc::new(resolver));
        self
    }

    /// Trust model for certificate-backed keys
    #[must_use]
    pub fn with_certificate_validation(mut self, mode: CertificateValidation) -> Self {
        self.certificate_validation = mode;
        self
    }

    /// Validator consulted for certificate-backed keys
    #[must_use]
    pub fn with_certificate_validator(mut self, validator: Arc<dyn CertificateValidator>) -> Self {
        self.certificate_validator = Some(validator);
        self
    }

    /// Single accepted issuer
    #[must_use]
    pub fn valid_issuer(&self) -> Option<&str> {
        self.valid_issuer.as_deref()
    }

    /// Additional accepted issuers
    #[must_use]
    pub fn valid_issuers(&self) -> &[String] {
        &self.valid_issuers
    }

    /// Single accepted audience
    #[must_use]
    pub fn valid_audience(&self) -> Option<&str> {
        self.valid_audience.as_deref()
    }

    /// Additional accepted audiences
    #[must_use]
    pub fn valid_audiences(&self) -> &[String] {
        &self.valid_audiences
    }

    /// Whether `iss` is checked
    #[must_use]
    pub fn validate_issuer(&self) -> bool {
        self.validate_issuer
    }

    /// Tolerance for `exp` and `nbf`
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Byte limit on the compact form
    #[must_use]
    pub fn max_token_size(&self) -> usize {
        self.max_token_size
    }

    /// Whether `exp` must be present
    #[must_use]
    pub fn require_expiration_time(&self) -> bool {
        self.require_expiration_time
    }

    /// Whether `alg = none` is rejected
    #[must_use]
    pub fn require_signed_tokens(&self) -> bool {
        self.require_signed_tokens
    }

    /// How verifying keys are found
    #[must_use]
    pub fn key_resolution(&self) -> &KeyResolution {
        &self.key_resolution
    }

    /// Trust model applied to certificate-backed keys
    #[must_use]
    pub fn certificate_validation(&self) -> CertificateValidation {
        self.certificate_validation
    }

    /// Configured certificate validator
    #[must_use]
    pub fn certificate_validator(&self) -> Option<&Arc<dyn CertificateValidator>> {
        self.certificate_validator.as_ref()
    }

    /// Whether an audience restriction is configured
    pub(crate) fn restricts_audience(&self) -> bool {
        self.valid_audience.is_some() || !self.valid_audiences.is_empty()
    }

    /// Exact, case-sensitive membership in the accepted issuers
    pub(crate) fn accepts_issuer(&self, issuer: &str) -> bool {
        self.valid_issuer.as_deref() == Some(issuer) || self.valid_issuers.iter().any(|i| i == issuer)
    }

    /// Whether any configured issuer exists at all
    pub(crate) fn has_issuers(&self) -> bool {
        self.valid_issuer.is_some() || !self.valid_issuers.is_empty()
    }

    /// Exact, case-sensitive membership in the accepted audiences
    pub(crate) fn accepts_audience(&self, audience: &str) -> bool {
        self.valid_audience.as_deref() == Some(audience)
            || self.valid_audiences.iter().any(|a| a == audience)
    }

    /// Clock skew in whole seconds, saturating
    pub(crate) fn clock_skew_seconds(&self) -> i64 {
        i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let policy = ValidationPolicy::default();
        assert!(policy.validate_issuer());
        assert!(policy.require_expiration_time());
        assert!(policy.require_signed_tokens());
        assert_eq!(policy.clock_skew(), Duration::from_secs(300));
        assert_eq!(policy.max_token_size(), 2 * 1024 * 1024);
        assert_eq!(
            policy.certificate_validation(),
            CertificateValidation::PeerOrChainTrust
        );
        assert!(policy.certificate_validator().is_none());
        assert!(!policy.restricts_audience());
    }

    #[test]
    fn issuer_matching_is_exact() {
        let policy = ValidationPolicy::default()
            .with_valid_issuer("https://a")
            .with_valid_issuers(["https://b"]);
        assert!(policy.accepts_issuer("https://a"));
        assert!(policy.accepts_issuer("https://b"));
        assert!(!policy.accepts_issuer("https://A"));
        assert!(!policy.accepts_issuer("https://a/"));
    }

    #[test]
    fn from_config_carries_handler_settings() {
        let config = TokenHandlerConfig {
            max_clock_skew_seconds: 30,
            require_signed_tokens: false,
            ..TokenHandlerConfig::default()
        };
        let policy = ValidationPolicy::from_config(&config);
        assert_eq!(policy.clock_skew_seconds(), 30);
        assert!(!policy.require_signed_tokens());
    }
}
