//! Factory checks and provider contract

use cryypt_token::*;

const RSA_2048: &str = include_str!("fixtures/rsa_2048.pem");
const RSA_2048_PUB: &str = include_str!("fixtures/rsa_2048.pub.pem");
const RSA_1024: &str = include_str!("fixtures/rsa_1024.pem");
const RSA_1024_PUB: &str = include_str!("fixtures/rsa_1024.pub.pem");

fn rsa_2048() -> SecurityKey {
    SecurityKey::rsa_private_pem(RSA_2048).expect("2048-bit fixture")
}

fn rsa_1024() -> SecurityKey {
    SecurityKey::rsa_private_pem(RSA_1024).expect("1024-bit fixture")
}

fn secret_256() -> SecurityKey {
    SecurityKey::symmetric(vec![0x5a; 32])
}

#[test]
fn test_fixtures_have_expected_sizes() {
    assert_eq!(rsa_2048().size_bits(), 2048);
    assert_eq!(rsa_1024().size_bits(), 1024);
    let public = SecurityKey::rsa_public_pem(RSA_2048_PUB).unwrap();
    assert!(!public.has_private_key());
    assert_eq!(public.size_bits(), 2048);
}

#[test]
fn test_empty_algorithm_is_an_argument_error() {
    let factory = SignatureProviderFactory::new();
    for alg in ["", "   "] {
        let err = factory.create_for_signing(&rsa_2048(), alg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.code(), ErrorCode::EmptyAlgorithm);

        let err = factory.create_for_verifying(&secret_256(), alg).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyAlgorithm);
    }
}

#[test]
fn test_unsupported_key_type() {
    let factory = SignatureProviderFactory::new();
    let handle = SecurityKey::handle("keyring");
    let err = factory.create_for_signing(&handle, "RS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(err.code(), ErrorCode::UnsupportedKeyType);
    let err = factory.create_for_verifying(&handle, "RS256").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedKeyType);
}

#[test]
fn test_public_only_key_verifies_but_cannot_sign() {
    let factory = SignatureProviderFactory::new();
    let public = SecurityKey::rsa_public_pem(RSA_2048_PUB).unwrap();

    let err = factory.create_for_signing(&public, "RS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), ErrorCode::MissingPrivateKey);

    let provider = factory.create_for_verifying(&public, "RS256").unwrap();
    assert_eq!(provider.algorithm(), SignatureAlgorithm::Rs256);
}

#[test]
fn test_signing_key_below_minimum() {
    let factory = SignatureProviderFactory::new();
    let err = factory.create_for_signing(&rsa_1024(), "RS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
    assert_eq!(err.code(), ErrorCode::SigningKeyTooSmall);

    // 1024 bits is still enough to verify by default
    assert!(factory.create_for_verifying(&rsa_1024(), "RS256").is_ok());
}

#[test]
fn test_raised_verifying_minimum_holds_until_restored() {
    let factory = SignatureProviderFactory::new();
    let public = SecurityKey::rsa_public_pem(RSA_1024_PUB).unwrap();

    factory
        .key_size_limits()
        .set_minimum_asymmetric_bits_for_verifying(2048)
        .unwrap();
    for _ in 0..3 {
        let err = factory.create_for_verifying(&public, "RS256").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
        assert_eq!(err.code(), ErrorCode::VerifyingKeyTooSmall);
    }

    factory
        .key_size_limits()
        .set_minimum_asymmetric_bits_for_verifying(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING)
        .unwrap();
    assert!(factory.create_for_verifying(&public, "RS256").is_ok());
}

#[test]
fn test_raised_signing_minimum_holds_until_restored() {
    let factory = SignatureProviderFactory::new();
    let key = rsa_2048();

    factory
        .key_size_limits()
        .set_minimum_asymmetric_bits_for_signing(4096)
        .unwrap();
    for _ in 0..3 {
        let err = factory.create_for_signing(&key, "RS256").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
        assert_eq!(err.code(), ErrorCode::SigningKeyTooSmall);
    }
    // the verifying minimum is independent
    assert!(factory.create_for_verifying(&key, "RS256").is_ok());

    factory
        .key_size_limits()
        .set_minimum_asymmetric_bits_for_signing(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING)
        .unwrap();
    assert!(factory.create_for_signing(&key, "RS256").is_ok());
}

#[test]
fn test_concurrent_updates_never_tear_a_snapshot() {
    let limits = KeySizeLimits::default();
    let low = KeySizePolicy::default();
    let high = KeySizePolicy {
        minimum_asymmetric_bits_for_signing: 4096,
        minimum_asymmetric_bits_for_verifying: 2048,
        minimum_symmetric_bits: 256,
    };

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..2_000 {
                let next = if i % 2 == 0 { high } else { low };
                limits.replace(next).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..2_000 {
                let seen = limits.snapshot();
                assert!(seen == low || seen == high, "torn snapshot: {seen:?}");
            }
        });
    });
}

#[test]
fn test_symmetric_key_below_minimum() {
    let factory = SignatureProviderFactory::with_policy(
        KeySizePolicy::default().with_minimum_symmetric_bits(512).unwrap(),
    )
    .unwrap();

    let err = factory.create_for_signing(&secret_256(), "HS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
    assert_eq!(err.code(), ErrorCode::SymmetricKeyTooSmall);

    let err = factory.create_for_verifying(&secret_256(), "HS256").unwrap_err();
    assert_eq!(err.code(), ErrorCode::SymmetricKeyTooSmall);
}

#[test]
fn test_minimums_cannot_go_below_floors() {
    let factory = SignatureProviderFactory::new();
    let limits = factory.key_size_limits();
    let before = limits.snapshot();

    let cases = [
        (
            limits.set_minimum_asymmetric_bits_for_signing(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_SIGNING - 10),
            ErrorCode::SigningMinimumBelowFloor,
        ),
        (
            limits.set_minimum_asymmetric_bits_for_verifying(ABSOLUTE_MINIMUM_ASYMMETRIC_BITS_FOR_VERIFYING - 10),
            ErrorCode::VerifyingMinimumBelowFloor,
        ),
        (
            limits.set_minimum_symmetric_bits(ABSOLUTE_MINIMUM_SYMMETRIC_BITS - 10),
            ErrorCode::SymmetricMinimumBelowFloor,
        ),
    ];
    for (result, code) in cases {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentOutOfRange);
        assert_eq!(err.code(), code);
    }
    assert_eq!(limits.snapshot(), before);
}

#[test]
fn test_unknown_algorithm_has_no_context() {
    let factory = SignatureProviderFactory::new();
    let err = factory
        .create_for_signing(&rsa_2048(), "SecurityAlgorithms.RsaSha256Signature")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), ErrorCode::SigningContextUnavailable);

    let err = factory
        .create_for_verifying(&rsa_2048(), "SecurityAlgorithms.RsaSha256Signature")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::VerifyingContextUnavailable);
}

#[test]
fn test_algorithm_family_must_match_key() {
    let factory = SignatureProviderFactory::new();

    let err = factory.create_for_signing(&rsa_2048(), "HS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), ErrorCode::SigningContextUnavailable);

    let err = factory.create_for_signing(&secret_256(), "RS256").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), ErrorCode::KeyedHashUnavailable);
}

#[test]
fn test_long_form_algorithm_ids() {
    let factory = SignatureProviderFactory::new();
    let hs = factory.create_for_signing(&secret_256(), HMAC_SHA256_URI).unwrap();
    assert_eq!(hs.algorithm(), SignatureAlgorithm::Hs256);
    let rs = factory.create_for_signing(&rsa_2048(), RSA_SHA256_URI).unwrap();
    assert_eq!(rs.algorithm(), SignatureAlgorithm::Rs256);
}

#[test]
fn test_verify_only_provider_cannot_sign() {
    let factory = SignatureProviderFactory::new();
    let provider = factory.create_for_verifying(&rsa_2048(), "RS256").unwrap();
    let err = provider.sign(b"data").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.code(), ErrorCode::NotASigningProvider);
}

#[test]
fn test_empty_buffers_have_distinct_codes() {
    let factory = SignatureProviderFactory::new();
    let providers = [
        factory.create_for_signing(&secret_256(), "HS256").unwrap(),
        factory.create_for_signing(&rsa_2048(), "RS256").unwrap(),
    ];
    for provider in &providers {
        let err = provider.sign(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.code(), ErrorCode::SignEmptyInput);

        let err = provider.verify(&[], &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.code(), ErrorCode::VerifyEmptyInput);

        let err = provider.verify(&[1], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.code(), ErrorCode::VerifyEmptySignature);
    }
}

#[test]
fn test_mismatch_is_false_not_an_error() {
    let factory = SignatureProviderFactory::new();
    let hs = factory.create_for_verifying(&secret_256(), "HS256").unwrap();
    assert!(!hs.verify(&[1], &[1]).unwrap());

    let rs = factory.create_for_verifying(&rsa_2048(), "RS256").unwrap();
    assert!(!rs.verify(b"data", &[0u8; 256]).unwrap());
}

#[test]
fn test_dispose_is_idempotent_and_final() {
    let factory = SignatureProviderFactory::new();
    let mut providers = [
        factory.create_for_signing(&secret_256(), "HS384").unwrap(),
        factory.create_for_signing(&rsa_2048(), "PS256").unwrap(),
    ];
    for provider in &mut providers {
        let signature = provider.sign(b"data").unwrap();
        provider.dispose();
        provider.dispose();
        assert!(provider.is_disposed());

        let err = provider.sign(b"data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disposed);
        assert_eq!(err.code(), ErrorCode::ProviderDisposed);
        let err = provider.verify(b"data", &signature).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disposed);
    }
}

#[test]
fn test_sign_then_verify_every_algorithm() {
    let factory = SignatureProviderFactory::new();
    let cases = [
        (secret_256(), "HS256", 32),
        (SecurityKey::symmetric(vec![7u8; 48]), "HS384", 48),
        (SecurityKey::symmetric(vec![9u8; 64]), "HS512", 64),
        (rsa_2048(), "RS256", 256),
        (rsa_2048(), "RS384", 256),
        (rsa_2048(), "RS512", 256),
        (rsa_2048(), "PS256", 256),
        (rsa_2048(), "PS384", 256),
        (rsa_2048(), "PS512", 256),
    ];
    for (key, alg, len) in cases {
        let signer = factory.create_for_signing(&key, alg).unwrap();
        let signature = signer.sign(b"header.payload").unwrap();
        assert_eq!(signature.len(), len, "{alg}");

        let verified = factory
            .with_verifying(&key.to_public(), alg, |p| p.verify(b"header.payload", &signature))
            .unwrap();
        assert!(verified, "{alg}");
    }
}

#[test]
fn test_shared_factory_reads_process_limits() {
    let shared = SignatureProviderFactory::shared();
    assert_eq!(
        shared.key_size_limits().snapshot().minimum_symmetric_bits,
        KeySizeLimits::shared().snapshot().minimum_symmetric_bits
    );
}
