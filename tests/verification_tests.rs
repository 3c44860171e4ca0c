/// End-to-end verification tests
/// Exercise the full issue -> pack -> unpack -> verify pipeline against a
/// caller-seeded trust layer. No test touches the network: every endpoint
/// points at an unroutable local port and resolution degrades to not-found.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::collections::HashMap;
use shc_verifier::sign::sign;
use shc_verifier::{
    build_payload, token, Es256Signer, Jwk, JwkSet, KeyProvenance, ShcError, TrustResolver,
    TrustResolverConfig, TrustStatus, VerificationStatus, Verifier,
};

const ISSUER: &str = "https://spec.smarthealth.cards/examples/issuer";
const KID: &str = "test-key-1";

fn offline_config() -> TrustResolverConfig {
    TrustResolverConfig {
        registry_url: "http://127.0.0.1:9/registry.json".to_string(),
        http_timeout: std::time::Duration::from_secs(1),
        ..TrustResolverConfig::default()
    }
}

fn signing_jwk() -> Jwk {
    let signer = Es256Signer::new(&[42u8; 32]).unwrap();
    let mut jwk = signer.public_jwk(Some(KID.to_string())).unwrap();
    jwk.d = Some(URL_SAFE_NO_PAD.encode([42u8; 32]));
    jwk
}

fn immunization_claims() -> serde_json::Value {
    serde_json::json!({
        "type": [
            "https://smarthealth.cards#health-card",
            "https://smarthealth.cards#immunization"
        ],
        "credentialSubject": {
            "fhirVersion": "4.0.1",
            "fhirBundle": {
                "resourceType": "Bundle",
                "type": "collection",
                "entry": [{
                    "resource": {
                        "resourceType": "Immunization",
                        "status": "completed",
                        "vaccineCode": {"coding": [{"code": "207"}]}
                    }
                }]
            }
        }
    })
}

/// Verifier whose trust layer has been seeded with the test issuer key
async fn seeded_verifier() -> Verifier {
    let resolver = TrustResolver::new(offline_config()).unwrap();

    let mut jwk = signing_jwk();
    jwk.d = None;
    let mut sets = HashMap::new();
    sets.insert(ISSUER.to_string(), JwkSet { keys: vec![jwk] });
    resolver.add_cached_keys(&sets).await;

    Verifier::new(resolver)
}

#[tokio::test]
async fn test_end_to_end_sign_pack_unpack_verify() {
    let claims = immunization_claims();
    let payload = build_payload(claims.clone(), ISSUER, 12, None);
    let uri = shc_verifier::sign_and_pack(&payload, &signing_jwk()).unwrap();

    assert!(uri.starts_with("shc:/"));
    assert!(uri["shc:/".len()..].chars().all(|c| c.is_ascii_digit()));

    let verifier = seeded_verifier().await;
    let result = verifier.unpack_and_verify(&uri).await.unwrap();

    assert_eq!(result.status, VerificationStatus::Verified);

    let body = result.claims.expect("verified result carries claims");
    assert_eq!(body["vc"], claims);
    assert_eq!(body["iss"], ISSUER);

    let issuer = result.issuer.expect("verified result carries issuer record");
    assert_eq!(issuer.status, TrustStatus::Untrusted);
    assert_eq!(issuer.provenance, KeyProvenance::CallerSupplied);
}

#[tokio::test]
async fn test_flipped_signature_byte_is_invalid_signature() {
    let payload = build_payload(immunization_claims(), ISSUER, 12, None);
    let jws = sign(&payload, &signing_jwk()).unwrap();

    // Re-encode the signature segment with one byte flipped.
    let (prefix, sig_b64) = jws.rsplit_once('.').unwrap();
    let mut sig = URL_SAFE_NO_PAD.decode(sig_b64).unwrap();
    sig[0] ^= 0x01;
    let tampered = format!("{}.{}", prefix, URL_SAFE_NO_PAD.encode(sig));

    let verifier = seeded_verifier().await;
    let result = verifier.verify(&tampered).await;

    assert_eq!(result.status, VerificationStatus::InvalidSignature);
    assert!(result.claims.is_some());
    assert!(result.issuer.is_some());
}

#[tokio::test]
async fn test_unknown_issuer_is_not_trusted() {
    let payload = build_payload(immunization_claims(), "http://127.0.0.1:9", 12, None);
    let jws = sign(&payload, &signing_jwk()).unwrap();

    let verifier = Verifier::new(TrustResolver::new(offline_config()).unwrap());
    let result = verifier.verify(&jws).await;

    assert_eq!(result.status, VerificationStatus::IssuerNotTrusted);
    assert!(result.claims.is_some());
    assert!(result.issuer.is_none());
}

#[tokio::test]
async fn test_disqualified_statuses_win_over_signature_check() {
    for (status, expected) in [
        (TrustStatus::Revoked, VerificationStatus::Revoked),
        (TrustStatus::Terminated, VerificationStatus::Terminated),
        (TrustStatus::Expired, VerificationStatus::Expired),
    ] {
        let verifier = seeded_verifier().await;

        let mut record = verifier
            .resolver()
            .resolve_key(ISSUER, KID)
            .await
            .unwrap();
        record.status = status;
        verifier.resolver().insert_record(ISSUER, record).await;

        // A correctly signed token still fails on key standing.
        let payload = build_payload(immunization_claims(), ISSUER, 12, None);
        let jws = sign(&payload, &signing_jwk()).unwrap();
        let result = verifier.verify(&jws).await;

        assert_eq!(result.status, expected);
        assert!(result.issuer.is_some());
    }
}

#[tokio::test]
async fn test_malformed_token_is_invalid_signing_format() {
    let verifier = seeded_verifier().await;

    let result = verifier.verify("not-even-a-token").await;
    assert_eq!(result.status, VerificationStatus::InvalidSigningFormat);

    let result = verifier.verify("a.b").await;
    assert_eq!(result.status, VerificationStatus::InvalidSigningFormat);
}

#[tokio::test]
async fn test_undecodable_compression_is_invalid_compression() {
    let header = serde_json::json!({"alg": "ES256", "zip": "DEF", "kid": KID});
    let jws = format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
        URL_SAFE_NO_PAD.encode(b"not deflate data"),
        URL_SAFE_NO_PAD.encode(b"signature")
    );

    let verifier = seeded_verifier().await;
    let result = verifier.verify(&jws).await;
    assert_eq!(result.status, VerificationStatus::InvalidCompression);
    assert!(result.token.is_some());
}

#[tokio::test]
async fn test_missing_kid_or_issuer_is_key_id_not_included() {
    let verifier = seeded_verifier().await;

    // Header without kid.
    let header = serde_json::json!({"alg": "ES256"});
    let jws = format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
        URL_SAFE_NO_PAD.encode(format!(r#"{{"iss":"{}"}}"#, ISSUER)),
        URL_SAFE_NO_PAD.encode(b"signature")
    );
    let result = verifier.verify(&jws).await;
    assert_eq!(result.status, VerificationStatus::KeyIdNotIncluded);

    // Payload without iss.
    let header = serde_json::json!({"alg": "ES256", "kid": KID});
    let jws = format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap()),
        URL_SAFE_NO_PAD.encode(b"{}"),
        URL_SAFE_NO_PAD.encode(b"signature")
    );
    let result = verifier.verify(&jws).await;
    assert_eq!(result.status, VerificationStatus::KeyIdNotIncluded);
}

#[tokio::test]
async fn test_malformed_qr_digits_surface_as_typed_error() {
    let verifier = seeded_verifier().await;
    let err = verifier.unpack_and_verify("shc:/12345").await.unwrap_err();
    assert!(matches!(err, ShcError::QrEncoding(_)));
}

#[tokio::test]
async fn test_debug_qr_decodes_without_verification() {
    let payload = build_payload(immunization_claims(), ISSUER, 12, None);
    let uri = shc_verifier::sign_and_pack(&payload, &signing_jwk()).unwrap();

    let decoded = shc_verifier::debug_qr(&uri).unwrap();
    assert_eq!(decoded.header.kid.as_deref(), Some(KID));
    assert_eq!(
        decoded.header.zip.as_deref(),
        Some(token::COMPRESSION_DEFLATE)
    );
    assert_eq!(decoded.body["iss"], ISSUER);
}
