/// Verification pipeline for compact health card tokens
///
/// Orchestrates parse -> decompress -> key resolution -> status policy ->
/// cryptographic check, classifying every token into exactly one outcome.
use crate::crypto::Es256Verifier;
use crate::error::{ShcError, ShcResult};
use crate::qr;
use crate::token::{self, TokenParts};
use crate::trust::{IssuerKeyRecord, TrustResolver, TrustStatus};
use serde_json::Value;
use tracing::debug;

/// Outcome of verifying a single token
///
/// Variants are listed in evaluation priority order: the first condition
/// that matches wins, and the outcomes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Token does not split into three well-formed segments
    InvalidSigningFormat,
    /// Declared payload compression could not be reversed
    InvalidCompression,
    /// Header lacks a key id or payload lacks an issuer
    KeyIdNotIncluded,
    /// No trust source knows the (issuer, key id) pair
    IssuerNotTrusted,
    /// Resolved key is revoked by the registry
    Revoked,
    /// Resolved key belongs to a terminated issuer
    Terminated,
    /// Resolved key's registry listing has expired
    Expired,
    /// Cryptographic check against the resolved key failed
    InvalidSignature,
    /// Signature valid; claims are the exact signed payload
    Verified,
}

/// Full verification outcome with diagnostics
///
/// `status == Verified` guarantees `claims` is the exact signed payload
/// and signature validity has been cryptographically confirmed. For any
/// other status, claims (when present) are best-effort and unverified.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    /// Outcome classification
    pub status: VerificationStatus,
    /// Decoded claims, best-effort
    pub claims: Option<Value>,
    /// Key record the trust layer resolved, if resolution was reached
    pub issuer: Option<IssuerKeyRecord>,
    /// Raw parsed token for diagnostics
    pub token: Option<TokenParts>,
}

impl VerificationResult {
    fn rejected(status: VerificationStatus) -> Self {
        Self {
            status,
            claims: None,
            issuer: None,
            token: None,
        }
    }
}

/// Verifies compact tokens against the trust layer
pub struct Verifier {
    resolver: TrustResolver,
}

impl Verifier {
    /// Create a verifier around a trust resolver
    pub fn new(resolver: TrustResolver) -> Self {
        Self { resolver }
    }

    /// Access the underlying resolver, e.g. to seed cached keys
    pub fn resolver(&self) -> &TrustResolver {
        &self.resolver
    }

    /// Verify a compact token and classify the outcome
    ///
    /// Never fails: every recoverable condition maps to a status.
    pub async fn verify(&self, jws: &str) -> VerificationResult {
        let parts = match token::parse(jws) {
            Ok(parts) => parts,
            Err(e) => {
                debug!("Token failed to parse: {}", e);
                return VerificationResult::rejected(VerificationStatus::InvalidSigningFormat);
            }
        };

        let decoded = match token::inflate(&parts) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Token failed to decode: {}", e);
                let status = match e {
                    ShcError::InvalidCompression(_) => VerificationStatus::InvalidCompression,
                    _ => VerificationStatus::InvalidSigningFormat,
                };
                return VerificationResult {
                    status,
                    claims: None,
                    issuer: None,
                    token: Some(parts),
                };
            }
        };

        let kid = decoded.header.kid.as_deref();
        let iss = decoded.body.get("iss").and_then(Value::as_str);
        let (kid, iss) = match (kid, iss) {
            (Some(kid), Some(iss)) => (kid, iss),
            _ => {
                return VerificationResult {
                    status: VerificationStatus::KeyIdNotIncluded,
                    claims: Some(decoded.body),
                    issuer: None,
                    token: Some(parts),
                };
            }
        };

        let record = match self.resolver.resolve_key(iss, kid).await {
            Some(record) => record,
            None => {
                return VerificationResult {
                    status: VerificationStatus::IssuerNotTrusted,
                    claims: Some(decoded.body),
                    issuer: None,
                    token: Some(parts),
                };
            }
        };

        // Disqualifying statuses, checked in strict priority order.
        let disqualified = match record.status {
            TrustStatus::Revoked => Some(VerificationStatus::Revoked),
            TrustStatus::Terminated => Some(VerificationStatus::Terminated),
            TrustStatus::Expired => Some(VerificationStatus::Expired),
            TrustStatus::Active | TrustStatus::Untrusted => None,
        };
        if let Some(status) = disqualified {
            return VerificationResult {
                status,
                claims: Some(decoded.body),
                issuer: Some(record),
                token: Some(parts),
            };
        }

        let signature_valid = match Es256Verifier::from_jwk(&record.public_key) {
            Ok(verifier) => verifier.verify(parts.signing_input().as_bytes(), &parts.signature),
            Err(e) => {
                debug!("Resolved key material unusable: {}", e);
                false
            }
        };
        if !signature_valid {
            return VerificationResult {
                status: VerificationStatus::InvalidSignature,
                claims: Some(decoded.body),
                issuer: Some(record),
                token: Some(parts),
            };
        }

        VerificationResult {
            status: VerificationStatus::Verified,
            claims: Some(decoded.body),
            issuer: Some(record),
            token: Some(parts),
        }
    }

    /// Unpack a QR digit string and verify the token it carries
    ///
    /// QR-level decoding failures are the only error path; everything
    /// after unpacking is reported through the result status.
    pub async fn unpack_and_verify(&self, uri: &str) -> ShcResult<VerificationResult> {
        let token = qr::unpack(uri)?;
        Ok(self.verify(&token).await)
    }
}
