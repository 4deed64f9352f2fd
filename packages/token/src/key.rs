//! Security keys consumed by the provider factory
//!
//! Keys are caller-owned; providers clone the material they need into their
//! own context, so a key can be dropped as soon as the provider exists.

use crate::error::{ErrorCode, TokenError, TokenResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use zeroize::Zeroizing;

/// Capability class of a key, the first thing the factory checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Shared secret
    Symmetric,
    /// Key pair, public half always present
    Asymmetric,
    /// Anything the factory cannot build a provider for
    Unsupported,
}

/// Shared secret for keyed-hash algorithms
#[derive(Clone)]
pub struct SymmetricKey {
    secret: Zeroizing<Vec<u8>>,
    key_id: Option<String>,
}

impl SymmetricKey {
    /// Raw secret bytes
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Secret length in bits
    #[must_use]
    pub fn size_bits(&self) -> usize {
        self.secret.len() * 8
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.size_bits())
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// RSA key with an optional private half
#[derive(Clone)]
pub struct RsaKey {
    private: Option<RsaPrivateKey>,
    public: RsaPublicKey,
    key_id: Option<String>,
    certificate: Option<Vec<u8>>,
}

impl RsaKey {
    /// Private half, present only for signing-capable keys
    #[must_use]
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    /// Public half
    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus length in bits
    #[must_use]
    pub fn size_bits(&self) -> usize {
        self.public.size() * 8
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.size_bits())
            .field("has_private_key", &self.private.is_some())
            .field("key_id", &self.key_id)
            .field("certificate", &self.certificate.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Reference to key material held outside the process (keyring entry, HSM slot)
///
/// Carries no usable material, so the factory refuses it.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    /// Where the material lives, e.g. `"keyring"`
    pub store: String,
    key_id: Option<String>,
}

/// Key reference handed to the factory and to key resolution
#[derive(Debug, Clone)]
pub enum SecurityKey {
    /// Shared secret
    Symmetric(SymmetricKey),
    /// RSA key pair or public key
    Rsa(RsaKey),
    /// External key reference
    Handle(KeyHandle),
}

impl SecurityKey {
    /// Wrap a shared secret
    #[must_use]
    pub fn symmetric(secret: impl Into<Vec<u8>>) -> Self {
        SecurityKey::Symmetric(SymmetricKey {
            secret: Zeroizing::new(secret.into()),
            key_id: None,
        })
    }

    /// Wrap an RSA private key; the public half is derived
    #[must_use]
    pub fn from_rsa_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        SecurityKey::Rsa(RsaKey {
            private: Some(private),
            public,
            key_id: None,
            certificate: None,
        })
    }

    /// Wrap an RSA public key (verify-only)
    #[must_use]
    pub fn from_rsa_public(public: RsaPublicKey) -> Self {
        SecurityKey::Rsa(RsaKey {
            private: None,
            public,
            key_id: None,
            certificate: None,
        })
    }

    /// Parse a PKCS#8 or PKCS#1 PEM private key
    ///
    /// # Errors
    /// Returns `InvalidState` (`TOK103`) if the PEM holds no RSA private key
    pub fn rsa_private_pem(pem: &str) -> TokenResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| {
                TokenError::invalid_state(
                    ErrorCode::InvalidKeyMaterial,
                    &format!("Invalid RSA private key: {e}"),
                )
            })?;
        Ok(Self::from_rsa_private(private))
    }

    /// Parse an SPKI or PKCS#1 PEM public key
    ///
    /// # Errors
    /// Returns `InvalidState` (`TOK103`) if the PEM holds no RSA public key
    pub fn rsa_public_pem(pem: &str) -> TokenResult<Self> {
        let public = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| {
                TokenError::invalid_state(
                    ErrorCode::InvalidKeyMaterial,
                    &format!("Invalid RSA public key: {e}"),
                )
            })?;
        Ok(Self::from_rsa_public(public))
    }

    /// Parse a PKCS#8 DER private key
    ///
    /// # Errors
    /// Returns `InvalidState` (`TOK103`) if the DER holds no RSA private key
    pub fn rsa_private_der(der: &[u8]) -> TokenResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| {
            TokenError::invalid_state(
                ErrorCode::InvalidKeyMaterial,
                &format!("Invalid RSA private key: {e}"),
            )
        })?;
        Ok(Self::from_rsa_private(private))
    }

    /// Parse an SPKI DER public key
    ///
    /// # Errors
    /// Returns `InvalidState` (`TOK103`) if the DER holds no RSA public key
    pub fn rsa_public_der(der: &[u8]) -> TokenResult<Self> {
        let public = RsaPublicKey::from_public_key_der(der).map_err(|e| {
            TokenError::invalid_state(
                ErrorCode::InvalidKeyMaterial,
                &format!("Invalid RSA public key: {e}"),
            )
        })?;
        Ok(Self::from_rsa_public(public))
    }

    /// Reference to material in an external store
    #[must_use]
    pub fn handle(store: impl Into<String>) -> Self {
        SecurityKey::Handle(KeyHandle {
            store: store.into(),
            key_id: None,
        })
    }

    /// Attach a key id, matched against the header `kid`
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        let kid = Some(kid.into());
        match &mut self {
            SecurityKey::Symmetric(k) => k.key_id = kid,
            SecurityKey::Rsa(k) => k.key_id = kid,
            SecurityKey::Handle(k) => k.key_id = kid,
        }
        self
    }

    /// Attach the DER certificate the public key was taken from.
    /// Only RSA keys carry certificates; other keys are returned unchanged.
    #[must_use]
    pub fn with_certificate(mut self, der: impl Into<Vec<u8>>) -> Self {
        if let SecurityKey::Rsa(k) = &mut self {
            k.certificate = Some(der.into());
        }
        self
    }

    /// Key id, if any
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        match self {
            SecurityKey::Symmetric(k) => k.key_id.as_deref(),
            SecurityKey::Rsa(k) => k.key_id.as_deref(),
            SecurityKey::Handle(k) => k.key_id.as_deref(),
        }
    }

    /// Capability class
    #[must_use]
    pub fn class(&self) -> KeyClass {
        match self {
            SecurityKey::Symmetric(_) => KeyClass::Symmetric,
            SecurityKey::Rsa(_) => KeyClass::Asymmetric,
            SecurityKey::Handle(_) => KeyClass::Unsupported,
        }
    }

    /// Whether signing is possible with this key
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        match self {
            SecurityKey::Symmetric(_) => true,
            SecurityKey::Rsa(k) => k.private.is_some(),
            SecurityKey::Handle(_) => false,
        }
    }

    /// Key strength in bits, 0 for handles
    #[must_use]
    pub fn size_bits(&self) -> usize {
        match self {
            SecurityKey::Symmetric(k) => k.size_bits(),
            SecurityKey::Rsa(k) => k.size_bits(),
            SecurityKey::Handle(_) => 0,
        }
    }

    /// DER certificate backing the key, if any
    #[must_use]
    pub fn certificate(&self) -> Option<&[u8]> {
        match self {
            SecurityKey::Rsa(k) => k.certificate.as_deref(),
            _ => None,
        }
    }

    /// Verify-only copy; symmetric keys and handles are returned as-is
    #[must_use]
    pub fn to_public(&self) -> Self {
        match self {
            SecurityKey::Rsa(k) => SecurityKey::Rsa(RsaKey {
                private: None,
                public: k.public.clone(),
                key_id: k.key_id.clone(),
                certificate: k.certificate.clone(),
            }),
            other => other.clone(),
        }
    }
}
