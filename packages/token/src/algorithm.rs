//! Signature algorithm identifiers
//!
//! Each identifier maps to exactly one {family, hash} pair. Unknown identifiers
//! are not an error here: the factory reports them when it fails to build a
//! context for the key.

use std::fmt;

/// Long-form identifier for HMAC-SHA256
pub const HMAC_SHA256_URI: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256";
/// Long-form identifier for RSA-SHA256
pub const RSA_SHA256_URI: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Algorithm family, selects the provider variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    /// Keyed hash over a shared secret
    Symmetric,
    /// RSA signature over a key pair
    Asymmetric,
    /// `"none"`: no signature at all
    Unsecured,
}

/// Digest used by the algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// RSA padding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// RSASSA-PKCS1-v1_5, deterministic
    Pkcs1v15,
    /// RSASSA-PSS, randomized salt
    Pss,
}

/// Known signature algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// Unsigned token
    None,
    /// HMAC using SHA-256
    Hs256,
    /// HMAC using SHA-384
    Hs384,
    /// HMAC using SHA-512
    Hs512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    Rs512,
    /// RSASSA-PSS using SHA-256
    Ps256,
    /// RSASSA-PSS using SHA-384
    Ps384,
    /// RSASSA-PSS using SHA-512
    Ps512,
}

impl SignatureAlgorithm {
    /// Resolve an identifier. Matching is ordinal and case-sensitive.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let alg = match id {
            "none" => SignatureAlgorithm::None,
            "HS256" | HMAC_SHA256_URI => SignatureAlgorithm::Hs256,
            "HS384" => SignatureAlgorithm::Hs384,
            "HS512" => SignatureAlgorithm::Hs512,
            "RS256" | RSA_SHA256_URI => SignatureAlgorithm::Rs256,
            "RS384" => SignatureAlgorithm::Rs384,
            "RS512" => SignatureAlgorithm::Rs512,
            "PS256" => SignatureAlgorithm::Ps256,
            "PS384" => SignatureAlgorithm::Ps384,
            "PS512" => SignatureAlgorithm::Ps512,
            _ => return None,
        };
        Some(alg)
    }

    /// Compact `alg` header value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureAlgorithm::None => "none",
            SignatureAlgorithm::Hs256 => "HS256",
            SignatureAlgorithm::Hs384 => "HS384",
            SignatureAlgorithm::Hs512 => "HS512",
            SignatureAlgorithm::Rs256 => "RS256",
            SignatureAlgorithm::Rs384 => "RS384",
            SignatureAlgorithm::Rs512 => "RS512",
            SignatureAlgorithm::Ps256 => "PS256",
            SignatureAlgorithm::Ps384 => "PS384",
            SignatureAlgorithm::Ps512 => "PS512",
        }
    }

    /// Provider family for this algorithm
    #[must_use]
    pub fn family(self) -> AlgorithmFamily {
        match self {
            SignatureAlgorithm::None => AlgorithmFamily::Unsecured,
            SignatureAlgorithm::Hs256 | SignatureAlgorithm::Hs384 | SignatureAlgorithm::Hs512 => {
                AlgorithmFamily::Symmetric
            }
            _ => AlgorithmFamily::Asymmetric,
        }
    }

    /// Digest, `None` for the unsecured algorithm
    #[must_use]
    pub fn hash(self) -> Option<HashAlgorithm> {
        match self {
            SignatureAlgorithm::None => None,
            SignatureAlgorithm::Hs256 | SignatureAlgorithm::Rs256 | SignatureAlgorithm::Ps256 => {
                Some(HashAlgorithm::Sha256)
            }
            SignatureAlgorithm::Hs384 | SignatureAlgorithm::Rs384 | SignatureAlgorithm::Ps384 => {
                Some(HashAlgorithm::Sha384)
            }
            SignatureAlgorithm::Hs512 | SignatureAlgorithm::Rs512 | SignatureAlgorithm::Ps512 => {
                Some(HashAlgorithm::Sha512)
            }
        }
    }

    /// RSA padding, `None` outside the asymmetric family
    #[must_use]
    pub fn padding(self) -> Option<RsaPadding> {
        match self {
            SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384 | SignatureAlgorithm::Rs512 => {
                Some(RsaPadding::Pkcs1v15)
            }
            SignatureAlgorithm::Ps256 | SignatureAlgorithm::Ps384 | SignatureAlgorithm::Ps512 => {
                Some(RsaPadding::Pss)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_case_sensitive() {
        assert_eq!(SignatureAlgorithm::from_id("HS256"), Some(SignatureAlgorithm::Hs256));
        assert_eq!(SignatureAlgorithm::from_id("hs256"), None);
        assert_eq!(SignatureAlgorithm::from_id("None"), None);
        assert_eq!(SignatureAlgorithm::from_id("SecurityAlgorithms.RsaSha256Signature"), None);
    }

    #[test]
    fn uri_aliases_resolve() {
        assert_eq!(
            SignatureAlgorithm::from_id(HMAC_SHA256_URI),
            Some(SignatureAlgorithm::Hs256)
        );
        assert_eq!(
            SignatureAlgorithm::from_id(RSA_SHA256_URI),
            Some(SignatureAlgorithm::Rs256)
        );
    }

    #[test]
    fn every_signing_algorithm_has_one_hash() {
        for id in ["HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512"] {
            let alg = SignatureAlgorithm::from_id(id).unwrap();
            assert!(alg.hash().is_some(), "{id}");
            assert_ne!(alg.family(), AlgorithmFamily::Unsecured);
            assert_eq!(alg.as_str(), id);
        }
        assert_eq!(SignatureAlgorithm::None.hash(), None);
    }
}
