/// Compact token codec
///
/// Splits and reassembles the three-segment compact JWS carried by health
/// card QR codes, and reverses the raw-DEFLATE payload compression the
/// header may declare.
use crate::error::{ShcError, ShcResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Header marker for raw-DEFLATE payload compression
pub const COMPRESSION_DEFLATE: &str = "DEF";

/// Protected JWS header of a compact token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm identifier
    pub alg: String,

    /// Issuer key id the signature was produced with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Payload compression marker ("DEF" for raw DEFLATE)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

/// Signed JWT payload of a health credential token
///
/// Used when issuing tokens. Verification keeps the payload as an opaque
/// `serde_json::Value` so unknown claims survive untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Issuer URL
    pub iss: String,

    /// Issued-at, Unix seconds
    pub iat: i64,

    /// Not-before, Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Expiry, Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Nested credential claims
    pub vc: serde_json::Value,
}

/// The three decoded segments of a compact token, immutable once parsed
#[derive(Debug, Clone)]
pub struct TokenParts {
    /// First segment as transmitted (base64url header)
    pub header_b64: String,

    /// Second segment as transmitted (base64url payload)
    pub payload_b64: String,

    /// Decoded header bytes (JSON)
    pub header_raw: Vec<u8>,

    /// Decoded payload bytes (possibly compressed)
    pub payload_raw: Vec<u8>,

    /// Decoded signature bytes
    pub signature: Vec<u8>,
}

impl TokenParts {
    /// The ASCII content the signature covers
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header_b64, self.payload_b64)
    }
}

/// A token with its header decoded and payload decompressed
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub body: serde_json::Value,
}

/// Split a compact token into its three segments
///
/// Requires exactly three period-separated segments, each valid URL-safe
/// base64 without padding.
pub fn parse(token: &str) -> ShcResult<TokenParts> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(ShcError::InvalidSigningFormat(format!(
            "Expected 3 token segments, got {}",
            segments.len()
        )));
    }

    let header_raw = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| ShcError::InvalidSigningFormat(format!("Header segment: {}", e)))?;
    let payload_raw = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| ShcError::InvalidSigningFormat(format!("Payload segment: {}", e)))?;
    let signature = URL_SAFE_NO_PAD
        .decode(segments[2])
        .map_err(|e| ShcError::InvalidSigningFormat(format!("Signature segment: {}", e)))?;

    Ok(TokenParts {
        header_b64: segments[0].to_string(),
        payload_b64: segments[1].to_string(),
        header_raw,
        payload_raw,
        signature,
    })
}

/// Decode the header and decompress the payload of a parsed token
pub fn inflate(parts: &TokenParts) -> ShcResult<DecodedToken> {
    let header: TokenHeader = serde_json::from_slice(&parts.header_raw)
        .map_err(|e| ShcError::InvalidSigningFormat(format!("Header JSON: {}", e)))?;

    let body_raw = if header.zip.as_deref() == Some(COMPRESSION_DEFLATE) {
        inflate_raw(&parts.payload_raw)?
    } else {
        parts.payload_raw.clone()
    };

    let body = serde_json::from_slice(&body_raw)
        .map_err(|e| ShcError::InvalidSigningFormat(format!("Payload JSON: {}", e)))?;

    Ok(DecodedToken { header, body })
}

/// Compress bytes with raw DEFLATE (no zlib wrapper)
pub fn deflate_raw(data: &[u8]) -> ShcResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ShcError::InvalidCompression(format!("Deflate failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ShcError::InvalidCompression(format!("Deflate failed: {}", e)))
}

/// Decompress raw DEFLATE bytes
pub fn inflate_raw(data: &[u8]) -> ShcResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ShcError::InvalidCompression(format!("Inflate failed: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_token(header: &serde_json::Value, body: &[u8], sig: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap()),
            URL_SAFE_NO_PAD.encode(body),
            URL_SAFE_NO_PAD.encode(sig)
        )
    }

    #[test]
    fn test_parse_requires_three_segments() {
        let err = parse("only.two").unwrap_err();
        assert!(matches!(err, ShcError::InvalidSigningFormat(_)));

        let err = parse("a.b.c.d").unwrap_err();
        assert!(matches!(err, ShcError::InvalidSigningFormat(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_base64() {
        let err = parse("!!!.e30.c2ln").unwrap_err();
        assert!(matches!(err, ShcError::InvalidSigningFormat(_)));
    }

    #[test]
    fn test_inflate_uncompressed_payload() {
        let header = serde_json::json!({"alg": "ES256", "kid": "key-1"});
        let token = encode_token(&header, br#"{"iss":"https://example.com"}"#, b"sig");

        let parts = parse(&token).unwrap();
        let decoded = inflate(&parts).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
        assert!(decoded.header.zip.is_none());
        assert_eq!(decoded.body["iss"], "https://example.com");
    }

    #[test]
    fn test_inflate_deflated_payload() {
        let body = br#"{"iss":"https://example.com","vc":{"type":[]}}"#;
        let compressed = deflate_raw(body).unwrap();
        let header = serde_json::json!({"alg": "ES256", "zip": "DEF", "kid": "key-1"});
        let token = encode_token(&header, &compressed, b"sig");

        let decoded = inflate(&parse(&token).unwrap()).unwrap();
        assert_eq!(decoded.header.zip.as_deref(), Some(COMPRESSION_DEFLATE));
        assert_eq!(decoded.body["iss"], "https://example.com");
    }

    #[test]
    fn test_inflate_bad_compression_is_typed_error() {
        let header = serde_json::json!({"alg": "ES256", "zip": "DEF"});
        let token = encode_token(&header, b"this is not deflate data", b"sig");

        let err = inflate(&parse(&token).unwrap()).unwrap_err();
        assert!(matches!(err, ShcError::InvalidCompression(_)));
    }

    #[test]
    fn test_inflate_bad_payload_json_is_format_error() {
        let header = serde_json::json!({"alg": "ES256"});
        let token = encode_token(&header, b"not json", b"sig");

        let err = inflate(&parse(&token).unwrap()).unwrap_err();
        assert!(matches!(err, ShcError::InvalidSigningFormat(_)));
    }

    #[test]
    fn test_deflate_inflate_roundtrip() {
        let data = br#"{"vc":{"credentialSubject":{"fhirVersion":"4.0.1"}}}"#;
        assert_eq!(inflate_raw(&deflate_raw(data).unwrap()).unwrap(), data);
    }

    #[test]
    fn test_signing_input_joins_first_two_segments() {
        let header = serde_json::json!({"alg": "ES256"});
        let token = encode_token(&header, b"{}", b"sig");
        let parts = parse(&token).unwrap();
        assert_eq!(
            parts.signing_input(),
            format!("{}.{}", parts.header_b64, parts.payload_b64)
        );
    }
}
