/// JSON Web Key types for issuer key material
///
/// Covers the P-256 subset health card issuers publish: public keys carry
/// base64url x/y coordinates, private keys additionally carry d. Unknown
/// members (x5c chains and the like) are ignored on decode.
use crate::error::{ShcError, ShcResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single JSON Web Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (always "EC" for health card keys)
    pub kty: String,

    /// Key id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Intended key use ("sig")
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    /// Algorithm ("ES256")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Curve name ("P-256")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// Public x coordinate, base64url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Public y coordinate, base64url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private scalar, base64url (signing keys only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// A JSON Web Key Set, the document shape of `.well-known/jwks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl Jwk {
    /// Compute the RFC 7638 thumbprint of an EC key
    ///
    /// Health card key ids are defined as this thumbprint, so issuance
    /// falls back to it when a signing key carries no kid.
    pub fn thumbprint(&self) -> ShcResult<String> {
        let crv = self
            .crv
            .as_deref()
            .ok_or_else(|| ShcError::Key("Thumbprint requires crv".to_string()))?;
        let x = self
            .x
            .as_deref()
            .ok_or_else(|| ShcError::Key("Thumbprint requires x coordinate".to_string()))?;
        let y = self
            .y
            .as_deref()
            .ok_or_else(|| ShcError::Key("Thumbprint requires y coordinate".to_string()))?;

        // Required members in lexicographic order, no whitespace.
        let canonical = format!(
            r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
            crv, self.kty, x, y
        );

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }
}

/// Decode a base64url JWK field into a fixed-length coordinate
pub(crate) fn decode_coordinate(value: &str, name: &str) -> ShcResult<[u8; 32]> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| ShcError::Key(format!("Invalid {} coordinate: {}", name, e)))?;

    let mut out = [0u8; 32];
    if bytes.len() != out.len() {
        return Err(ShcError::Key(format!(
            "{} coordinate must be 32 bytes, got {}",
            name,
            bytes.len()
        )));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}
