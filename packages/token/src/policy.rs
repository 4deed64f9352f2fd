//! Key-size policy
//!
//! Thresholds are bounded below by absolute floors. [`KeySizePolicy`] is a
//! plain value; [`KeySizeLimits`] is the synchronized handle a factory reads
//! from, so a size check always sees one consistent snapshot.

use crate::error::{ErrorCode, TokenError, TokenResult};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Floor for the asymmetric signing minimum
pub const ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING: usize = 2048;
/// Floor for the asymmetric verifying minimum
pub const ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING: usize = 1024;
/// Floor for the symmetric minimum
pub const ABSOLUTE_MINIMUM_SYMMETRIC_BITS: usize = 128;

static SHARED_LIMITS: Lazy<Arc<KeySizeLimits>> = Lazy::new(|| Arc::new(KeySizeLimits::default()));

/// Minimum key sizes, in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySizePolicy {
    /// Smallest RSA modulus accepted for signing
    #[serde(default = "default_signing_bits")]
    pub minimum_asymmetric_bits_for_signing: usize,
    /// Smallest RSA modulus accepted for verifying
    #[serde(default = "default_verifying_bits")]
    pub minimum_asymmetric_bits_for_verifying: usize,
    /// Smallest shared secret accepted
    #[serde(default = "default_symmetric_bits")]
    pub minimum_symmetric_bits: usize,
}

fn default_signing_bits() -> usize {
    ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING
}

fn default_verifying_bits() -> usize {
    ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING
}

fn default_symmetric_bits() -> usize {
    ABSOLUTE_MINIMUM_SYMMETRIC_BITS
}

impl Default for KeySizePolicy {
    fn default() -> Self {
        Self {
            minimum_asymmetric_bits_for_signing: default_signing_bits(),
            minimum_asymmetric_bits_for_verifying: default_verifying_bits(),
            minimum_symmetric_bits: default_symmetric_bits(),
        }
    }
}

fn check_floor(bits: usize, floor: usize, code: ErrorCode, what: &str) -> TokenResult<()> {
    if bits < floor {
        return Err(TokenError::out_of_range(
            code,
            &format!("{what} cannot be set below its absolute floor"),
            bits,
            floor,
        ));
    }
    Ok(())
}

impl KeySizePolicy {
    /// Raise or lower the signing minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK113`) below the floor
    pub fn with_minimum_asymmetric_bits_for_signing(mut self, bits: usize) -> TokenResult<Self> {
        check_floor(
            bits,
            ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING,
            ErrorCode::SigningMinimumBelowFloor,
            "minimum asymmetric key size for signing",
        )?;
        self.minimum_asymmetric_bits_for_signing = bits;
        Ok(self)
    }

    /// Raise or lower the verifying minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK114`) below the floor
    pub fn with_minimum_asymmetric_bits_for_verifying(mut self, bits: usize) -> TokenResult<Self> {
        check_floor(
            bits,
            ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING,
            ErrorCode::VerifyingMinimumBelowFloor,
            "minimum asymmetric key size for verifying",
        )?;
        self.minimum_asymmetric_bits_for_verifying = bits;
        Ok(self)
    }

    /// Raise or lower the symmetric minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK115`) below the floor
    pub fn with_minimum_symmetric_bits(mut self, bits: usize) -> TokenResult<Self> {
        check_floor(
            bits,
            ABSOLUTE_MINIMUM_SYMMETRIC_BITS,
            ErrorCode::SymmetricMinimumBelowFloor,
            "minimum symmetric key size",
        )?;
        self.minimum_symmetric_bits = bits;
        Ok(self)
    }

    /// Check every field against its floor; needed for deserialized values
    ///
    /// # Errors
    /// Returns the first floor violation found
    pub fn validate(&self) -> TokenResult<()> {
        Self::default()
            .with_minimum_asymmetric_bits_for_signing(self.minimum_asymmetric_bits_for_signing)?
            .with_minimum_asymmetric_bits_for_verifying(self.minimum_asymmetric_bits_for_verifying)?
            .with_minimum_symmetric_bits(self.minimum_symmetric_bits)?;
        Ok(())
    }
}

/// Synchronized handle over a [`KeySizePolicy`]
///
/// Updates are atomic read-copy-update swaps; a rejected update leaves the
/// current value untouched.
#[derive(Debug)]
pub struct KeySizeLimits {
    current: ArcSwap<KeySizePolicy>,
}

impl Default for KeySizeLimits {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(KeySizePolicy::default()),
        }
    }
}

impl KeySizeLimits {
    /// Handle seeded with `policy`
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` if any field is below its floor
    pub fn new(policy: KeySizePolicy) -> TokenResult<Self> {
        policy.validate()?;
        Ok(Self {
            current: ArcSwap::from_pointee(policy),
        })
    }

    /// Process-wide default handle
    #[must_use]
    pub fn shared() -> Arc<KeySizeLimits> {
        Arc::clone(&SHARED_LIMITS)
    }

    /// Consistent copy of the current thresholds
    #[must_use]
    pub fn snapshot(&self) -> KeySizePolicy {
        **self.current.load()
    }

    /// Replace all thresholds at once
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` if any field is below its floor
    pub fn replace(&self, policy: KeySizePolicy) -> TokenResult<()> {
        policy.validate()?;
        self.current.store(Arc::new(policy));
        Ok(())
    }

    /// Set the signing minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK113`) below the floor
    pub fn set_minimum_asymmetric_bits_for_signing(&self, bits: usize) -> TokenResult<()> {
        self.update(|p| p.with_minimum_asymmetric_bits_for_signing(bits))
    }

    /// Set the verifying minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK114`) below the floor
    pub fn set_minimum_asymmetric_bits_for_verifying(&self, bits: usize) -> TokenResult<()> {
        self.update(|p| p.with_minimum_asymmetric_bits_for_verifying(bits))
    }

    /// Set the symmetric minimum
    ///
    /// # Errors
    /// Returns `ArgumentOutOfRange` (`TOK115`) below the floor
    pub fn set_minimum_symmetric_bits(&self, bits: usize) -> TokenResult<()> {
        self.update(|p| p.with_minimum_symmetric_bits(bits))
    }

    fn update<F>(&self, apply: F) -> TokenResult<()>
    where
        F: Fn(KeySizePolicy) -> TokenResult<KeySizePolicy>,
    {
        // Floors do not depend on the current value, so a probe against the
        // default decides acceptance before anything is swapped.
        apply(KeySizePolicy::default())?;
        self.current.rcu(|cur| match apply(**cur) {
            Ok(next) => next,
            Err(_) => **cur,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_sit_on_the_floors() {
        let p = KeySizePolicy::default();
        assert_eq!(p.minimum_asymmetric_bits_for_signing, 2048);
        assert_eq!(p.minimum_asymmetric_bits_for_verifying, 1024);
        assert_eq!(p.minimum_symmetric_bits, 128);
    }

    #[test]
    fn below_floor_leaves_value_unchanged() {
        let limits = KeySizeLimits::default();
        limits.set_minimum_symmetric_bits(512).unwrap();

        let err = limits
            .set_minimum_symmetric_bits(ABSOLUTE_MINIMUM_SYMMETRIC_BITS - 10)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
        assert_eq!(err.code(), ErrorCode::SymmetricMinimumBelowFloor);
        assert_eq!(limits.snapshot().minimum_symmetric_bits, 512);
    }

    #[test]
    fn each_field_has_its_own_floor_code() {
        let limits = KeySizeLimits::default();
        assert_eq!(
            limits
                .set_minimum_asymmetric_bits_for_signing(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING - 10)
                .unwrap_err()
                .code(),
            ErrorCode::SigningMinimumBelowFloor
        );
        assert_eq!(
            limits
                .set_minimum_asymmetric_bits_for_verifying(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING - 10)
                .unwrap_err()
                .code(),
            ErrorCode::VerifyingMinimumBelowFloor
        );
        assert_eq!(limits.snapshot(), KeySizePolicy::default());
    }

    #[test]
    fn deserialized_policy_is_validated() {
        let p: KeySizePolicy = serde_json::from_str(r#"{"minimum_symmetric_bits": 64}"#).unwrap();
        assert_eq!(p.minimum_asymmetric_bits_for_signing, 2048);
        assert!(p.validate().is_err());
        assert!(KeySizeLimits::new(p).is_err());
    }
}
