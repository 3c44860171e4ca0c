/// Token issuance - payload building, compact JWS signing, QR packing
///
/// The issue side of the pipeline: build a JWT payload around nested
/// credential claims, compress it with raw DEFLATE, sign with ES256, and
/// optionally pack the result for a QR code.
use crate::crypto::{Es256Signer, Jwk, ALG_ES256};
use crate::error::{ShcError, ShcResult};
use crate::qr;
use crate::token::{self, TokenHeader, TokenPayload, COMPRESSION_DEFLATE};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Months, Utc};

/// Build a credential payload issued now and expiring after a number of
/// months, with an optional not-before bound
pub fn build_payload(
    vc: serde_json::Value,
    issuer: &str,
    months_to_expire: u32,
    not_before: Option<DateTime<Utc>>,
) -> TokenPayload {
    let issued = Utc::now();
    let expires = issued
        .checked_add_months(Months::new(months_to_expire))
        .unwrap_or(issued);

    TokenPayload {
        iss: issuer.to_string(),
        iat: issued.timestamp(),
        nbf: not_before.map(|t| t.timestamp()),
        exp: Some(expires.timestamp()),
        vc,
    }
}

/// Sign a payload as a compact token with a DEFLATE-compressed body
///
/// The header carries the signing key's kid, falling back to its RFC 7638
/// thumbprint when the JWK has none.
pub fn sign(payload: &TokenPayload, signing_jwk: &Jwk) -> ShcResult<String> {
    let signer = Es256Signer::from_jwk(signing_jwk)?;

    let kid = match &signing_jwk.kid {
        Some(kid) => kid.clone(),
        None => signing_jwk.thumbprint()?,
    };

    let header = TokenHeader {
        alg: ALG_ES256.to_string(),
        kid: Some(kid),
        zip: Some(COMPRESSION_DEFLATE.to_string()),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| ShcError::Signing(format!("Header encode failed: {}", e)))?;
    let body_json = serde_json::to_vec(payload)
        .map_err(|e| ShcError::Signing(format!("Payload encode failed: {}", e)))?;

    let header_b64 = URL_SAFE_NO_PAD.encode(header_json);
    let payload_b64 = URL_SAFE_NO_PAD.encode(token::deflate_raw(&body_json)?);

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let signature = signer.sign(signing_input.as_bytes());

    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Sign a payload and pack the token as a QR digit string
pub fn sign_and_pack(payload: &TokenPayload, signing_jwk: &Jwk) -> ShcResult<String> {
    qr::pack(&sign(payload, signing_jwk)?)
}
