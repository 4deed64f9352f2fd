//! Signed compact security tokens
//!
//! This crate provides:
//! - HMAC (HS256/384/512) and RSA (RS* PKCS#1 v1.5, PS* PSS) signature providers
//! - A provider factory enforcing key-size and algorithm policy
//! - Compact serialization with ordered header and claim maps
//! - A validation pipeline from compact string to trusted claim set

pub mod algorithm;
pub mod claims;
pub mod codec;
mod config;
mod credentials;
mod error;
mod factory;
mod handler;
mod key;
pub mod pipeline;
mod policy;
pub mod provider;
mod token;
pub mod validation;

pub use algorithm::{
    AlgorithmFamily, HashAlgorithm, RsaPadding, SignatureAlgorithm, HMAC_SHA256_URI, RSA_SHA256_URI,
};
pub use claims::{Audience, Claim, Header, Payload};
pub use config::TokenHandlerConfig;
pub use credentials::SigningCredentials;
pub use error::*;
pub use factory::SignatureProviderFactory;
pub use handler::{TokenHandler, TOKEN_TYPE_IDENTIFIERS};
pub use key::{KeyClass, KeyHandle, RsaKey, SecurityKey, SymmetricKey};
pub use pipeline::{TokenValidationPipeline, ValidationStage};
pub use policy::{
    KeySizeLimits, KeySizePolicy, ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING,
    ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING, ABSOLUTE_MINIMUM_SYMMETRIC_BITS,
};
pub use provider::{AsymmetricSignatureProvider, SignatureProvider, SymmetricSignatureProvider};
pub use token::{SecurityToken, ValidatedToken};
pub use validation::{
    CertificateValidation, CertificateValidator, KeyResolution, ValidationPolicy,
};
