//! Token handler: the entry points callers depend on
//!
//! Signing goes header/payload -> codec -> factory -> provider. Reading and
//! validating go through the codec and the validation pipeline.

use crate::algorithm::SignatureAlgorithm;
use crate::claims::{Audience, Header, Payload};
use crate::codec;
use crate::config::TokenHandlerConfig;
use crate::credentials::SigningCredentials;
use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::factory::SignatureProviderFactory;
use crate::pipeline::TokenValidationPipeline;
use crate::policy::KeySizeLimits;
use crate::token::{SecurityToken, ValidatedToken};
use crate::validation::ValidationPolicy;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Token type identifiers this handler reads and writes
pub const TOKEN_TYPE_IDENTIFIERS: [&str; 2] = ["urn:ietf:params:oauth:token-type:jwt", "JWT"];

/// Signs, reads and validates compact tokens
#[derive(Debug, Clone)]
pub struct TokenHandler {
    config: TokenHandlerConfig,
    pipeline: TokenValidationPipeline,
}

impl Default for TokenHandler {
    fn default() -> Self {
        Self {
            config: TokenHandlerConfig::default(),
            pipeline: TokenValidationPipeline::default(),
        }
    }
}

impl TokenHandler {
    /// Handler with default settings and its own key-size limits
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler built from validated configuration
    ///
    /// # Errors
    /// Whatever [`TokenHandlerConfig::validate`] rejects
    pub fn from_config(config: TokenHandlerConfig) -> TokenResult<Self> {
        config.validate()?;
        let factory = SignatureProviderFactory::with_policy(config.key_sizes)?;
        tracing::debug!(
            max_token_size = config.max_token_size_bytes,
            require_signed_tokens = config.require_signed_tokens,
            "token handler configured"
        );
        Ok(Self {
            config,
            pipeline: TokenValidationPipeline::new(factory),
        })
    }

    /// Handler that signs and verifies through `factory`
    #[must_use]
    pub fn with_factory(mut self, factory: SignatureProviderFactory) -> Self {
        self.pipeline = TokenValidationPipeline::new(factory);
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TokenHandlerConfig {
        &self.config
    }

    /// Provider factory shared by signing and validation
    #[must_use]
    pub fn factory(&self) -> &SignatureProviderFactory {
        self.pipeline.factory()
    }

    /// Key-size limits the factory enforces
    #[must_use]
    pub fn key_size_limits(&self) -> &KeySizeLimits {
        self.factory().key_size_limits()
    }

    /// Token type identifiers handled
    #[must_use]
    pub fn token_type_identifiers(&self) -> &'static [&'static str] {
        &TOKEN_TYPE_IDENTIFIERS
    }

    /// Lifetime given to tokens created without an expiry
    #[must_use]
    pub fn default_token_lifetime(&self) -> Duration {
        let minutes = i64::try_from(self.config.default_token_lifetime_minutes).unwrap_or(i64::MAX);
        Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
    }

    /// Largest compact token read
    #[must_use]
    pub fn max_token_size(&self) -> usize {
        self.config.max_token_size_bytes
    }

    /// Validation defaults from this handler's configuration
    #[must_use]
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy::from_config(&self.config)
    }

    /// Whether `compact` looks like a token this handler can read
    #[must_use]
    pub fn can_read_token(&self, compact: &str) -> bool {
        codec::is_well_formed(compact, self.config.max_token_size_bytes)
    }

    /// Sign `payload` under `header` with `credentials`
    ///
    /// The header's `alg` is set from the credentials, and `kid` too when the
    /// key has one and the header does not.
    ///
    /// # Errors
    /// Any factory or provider error, or `Format` (`TOK209`) on serialization
    pub fn sign(
        &self,
        header: &Header,
        payload: &Payload,
        credentials: &SigningCredentials,
    ) -> TokenResult<String> {
        let mut header = header.clone();
        header.set_algorithm(credentials.algorithm());
        if header.key_id().is_none() {
            if let Some(kid) = credentials.key_id() {
                header.set_key_id(kid);
            }
        }

        let parts = codec::encode(&header, payload)?;
        let mut provider = self
            .factory()
            .create_for_signing(credentials.key(), credentials.algorithm())?;
        let signature = provider.sign(&parts.signing_input);
        provider.dispose();
        Ok(parts.join(&signature?))
    }

    /// Compact form of `token`
    ///
    /// # Errors
    /// - `ArgumentNull` (`TOK303`) when the header names a signing algorithm
    ///   but the token has no credentials
    /// - any error from [`sign`](Self::sign)
    pub fn write_token(&self, token: &SecurityToken) -> TokenResult<String> {
        if let Some(credentials) = token.signing_credentials() {
            return self.sign(token.header(), token.payload(), credentials);
        }
        if token.signature_algorithm() != SignatureAlgorithm::None.as_str() {
            return Err(TokenError::ArgumentNull {
                code: ErrorCode::MissingCredentials,
                name: "signing_credentials",
            });
        }
        let mut header = token.header().clone();
        if header.algorithm().is_none() {
            header.set_algorithm(SignatureAlgorithm::None.as_str());
        }
        Ok(codec::encode(&header, token.payload())?.join(&[]))
    }

    /// Parse without validating
    ///
    /// # Errors
    /// `Format` errors from the codec
    pub fn read_token(&self, compact: &str) -> TokenResult<SecurityToken> {
        codec::parse(compact, self.config.max_token_size_bytes)
    }

    /// Run the validation pipeline
    ///
    /// # Errors
    /// The error of the first stage that rejects the token
    pub fn validate_token(
        &self,
        compact: &str,
        policy: &ValidationPolicy,
    ) -> TokenResult<ValidatedToken> {
        self.pipeline.validate(compact, policy)
    }

    /// Run the validation pipeline as of `now`
    ///
    /// # Errors
    /// The error of the first stage that rejects the token
    pub fn validate_token_at(
        &self,
        compact: &str,
        policy: &ValidationPolicy,
        now: DateTime<Utc>,
    ) -> TokenResult<ValidatedToken> {
        self.pipeline.validate_at(compact, policy, now)
    }

    /// Token valid from now for the default lifetime
    ///
    /// # Errors
    /// See [`SecurityToken::issue`]
    pub fn create_token<I>(
        &self,
        issuer: Option<&str>,
        audience: Option<Audience>,
        claims: I,
        credentials: Option<SigningCredentials>,
    ) -> TokenResult<SecurityToken>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.default_token_lifetime())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        SecurityToken::issue(issuer, audience, claims, Some(now), Some(expires), credentials)
    }
}
