//! Token handler configuration

use crate::error::{ErrorCode, TokenError, TokenResult};
use crate::policy::KeySizePolicy;
use serde::{Deserialize, Serialize};

/// Handler settings, deserializable from JSON
///
/// Every field has a default, so `{}` is a complete configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHandlerConfig {
    /// Lifetime given to created tokens that have no explicit expiry
    #[serde(default = "default_token_lifetime_minutes")]
    pub default_token_lifetime_minutes: u64,
    /// Largest compact token accepted
    #[serde(default = "default_max_token_size_bytes")]
    pub max_token_size_bytes: usize,
    /// Tolerance for `exp` and `nbf`
    #[serde(default = "default_max_clock_skew_seconds")]
    pub max_clock_skew_seconds: u64,
    /// Reject tokens without `exp`
    #[serde(default = "default_true")]
    pub require_expiration_time: bool,
    /// Reject `alg = none`
    #[serde(default = "default_true")]
    pub require_signed_tokens: bool,
    /// Check `iss` against the accepted issuers
    #[serde(default = "default_true")]
    pub validate_issuer: bool,
    /// Minimum key sizes for the handler's provider factory
    #[serde(default)]
    pub key_sizes: KeySizePolicy,
}

fn default_token_lifetime_minutes() -> u64 {
    600
}

fn default_max_token_size_bytes() -> usize {
    2 * 1024 * 1024 // 2 MiB
}

fn default_max_clock_skew_seconds() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for TokenHandlerConfig {
    fn default() -> Self {
        Self {
            default_token_lifetime_minutes: default_token_lifetime_minutes(),
            max_token_size_bytes: default_max_token_size_bytes(),
            max_clock_skew_seconds: default_max_clock_skew_seconds(),
            require_expiration_time: true,
            require_signed_tokens: true,
            validate_issuer: true,
            key_sizes: KeySizePolicy::default(),
        }
    }
}

impl TokenHandlerConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    /// `Argument` (`TOK500`) for malformed JSON or zero limits,
    /// `ArgumentOutOfRange` for key sizes below their floors
    pub fn from_json(json: &str) -> TokenResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            TokenError::argument(
                ErrorCode::InvalidConfiguration,
                &format!("invalid token handler configuration: {e}"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no handler can work with
    ///
    /// # Errors
    /// `Argument` (`TOK500`) for zero limits, `ArgumentOutOfRange` for key
    /// sizes below their floors
    pub fn validate(&self) -> TokenResult<()> {
        if self.max_token_size_bytes == 0 {
            return Err(TokenError::argument(
                ErrorCode::InvalidConfiguration,
                "max_token_size_bytes must be greater than zero",
            ));
        }
        if self.default_token_lifetime_minutes == 0 {
            return Err(TokenError::argument(
                ErrorCode::InvalidConfiguration,
                "default_token_lifetime_minutes must be greater than zero",
            ));
        }
        self.key_sizes.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_json_is_the_default() {
        let config = TokenHandlerConfig::from_json("{}").unwrap();
        assert_eq!(config, TokenHandlerConfig::default());
        assert_eq!(config.default_token_lifetime_minutes, 600);
        assert_eq!(config.max_token_size_bytes, 2_097_152);
        assert_eq!(config.max_clock_skew_seconds, 300);
    }

    #[test]
    fn partial_key_sizes_keep_other_defaults() {
        let config = TokenHandlerConfig::from_json(
            r#"{"require_signed_tokens": false, "key_sizes": {"minimum_symmetric_bits": 256}}"#,
        )
        .unwrap();
        assert!(!config.require_signed_tokens);
        assert_eq!(config.key_sizes.minimum_symmetric_bits, 256);
        assert_eq!(config.key_sizes.minimum_asymmetric_bits_for_signing, 2048);
    }

    #[test]
    fn rejects_unusable_values() {
        let err = TokenHandlerConfig::from_json(r#"{"max_token_size_bytes": 0}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfiguration);

        let err = TokenHandlerConfig::from_json(
            r#"{"key_sizes": {"minimum_asymmetric_bits_for_signing": 1024}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);

        let err = TokenHandlerConfig::from_json("not json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
    }
}
