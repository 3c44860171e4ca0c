/// ES256 signing and verification over P-256
///
/// The verification pipeline treats this as an opaque primitive: given
/// signature bytes, signed content, and public key material, it answers
/// yes or no. Signatures are the raw 64-byte r||s form compact tokens
/// carry, not DER.
use crate::crypto::jwk::{decode_coordinate, Jwk};
use crate::error::{ShcError, ShcResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes, SecretKey};

/// Signature algorithm identifier carried in token headers
pub const ALG_ES256: &str = "ES256";

/// ES256 signer built from a private JWK or raw scalar
pub struct Es256Signer {
    signing_key: SigningKey,
}

impl Es256Signer {
    /// Create a signer from a raw private scalar (32 bytes)
    pub fn new(private_key: &[u8]) -> ShcResult<Self> {
        if private_key.len() != 32 {
            return Err(ShcError::Key(
                "Private key must be exactly 32 bytes".to_string(),
            ));
        }

        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|e| ShcError::Key(format!("Invalid private key: {}", e)))?;

        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }

    /// Create a signer from a private JWK (requires the d member)
    pub fn from_jwk(jwk: &Jwk) -> ShcResult<Self> {
        let d = jwk
            .d
            .as_deref()
            .ok_or_else(|| ShcError::Key("JWK has no private scalar".to_string()))?;

        let scalar = URL_SAFE_NO_PAD
            .decode(d)
            .map_err(|e| ShcError::Key(format!("Invalid private scalar: {}", e)))?;

        Self::new(&scalar)
    }

    /// Sign raw bytes, returning the 64-byte r||s signature
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_bytes().to_vec()
    }

    /// Get the verifying key (public key)
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    /// Export the public half as a JWK
    pub fn public_jwk(&self, kid: Option<String>) -> ShcResult<Jwk> {
        let point = self.verifying_key().to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| ShcError::Key("Public point has no x coordinate".to_string()))?;
        let y = point
            .y()
            .ok_or_else(|| ShcError::Key("Public point has no y coordinate".to_string()))?;

        Ok(Jwk {
            kty: "EC".to_string(),
            kid,
            use_: Some("sig".to_string()),
            alg: Some(ALG_ES256.to_string()),
            crv: Some("P-256".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(x)),
            y: Some(URL_SAFE_NO_PAD.encode(y)),
            d: None,
        })
    }
}

/// ES256 verifier built from a public JWK
pub struct Es256Verifier {
    verifying_key: VerifyingKey,
}

impl Es256Verifier {
    /// Create a verifier from a public JWK
    pub fn from_jwk(jwk: &Jwk) -> ShcResult<Self> {
        if jwk.kty != "EC" {
            return Err(ShcError::Key(format!("Unsupported key type: {}", jwk.kty)));
        }
        if let Some(crv) = jwk.crv.as_deref() {
            if crv != "P-256" {
                return Err(ShcError::Key(format!("Unsupported curve: {}", crv)));
            }
        }

        let x = jwk
            .x
            .as_deref()
            .ok_or_else(|| ShcError::Key("JWK has no x coordinate".to_string()))?;
        let y = jwk
            .y
            .as_deref()
            .ok_or_else(|| ShcError::Key("JWK has no y coordinate".to_string()))?;

        let x = decode_coordinate(x, "x")?;
        let y = decode_coordinate(y, "y")?;

        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&x),
            FieldBytes::from_slice(&y),
            false,
        );

        let verifying_key = VerifyingKey::from_encoded_point(&point)
            .map_err(|e| ShcError::Key(format!("Invalid public key point: {}", e)))?;

        Ok(Self { verifying_key })
    }

    /// Check a raw r||s signature over the given content
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify(data, &sig).is_ok(),
            Err(_) => false,
        }
    }
}
