//! SMART Health Card verification and packing
//!
//! Verifies compact ES256-signed health credential tokens distributed as
//! QR codes, resolves issuer keys through a cached trust registry with
//! per-issuer JWKS discovery, and transcodes tokens to and from the QR
//! numeric digit form.
//!
//! The typical read path is [`Verifier::unpack_and_verify`]; the issue
//! path is [`sign::sign_and_pack`]. Trust can be pre-seeded offline with
//! [`TrustResolver::add_cached_keys`].

pub mod crypto;
pub mod error;
pub mod qr;
pub mod sign;
pub mod token;
pub mod trust;
pub mod verifier;

pub use crypto::{Es256Signer, Es256Verifier, Jwk, JwkSet};
pub use error::{ShcError, ShcResult};
pub use qr::{pack, unpack};
pub use sign::{build_payload, sign_and_pack};
pub use token::{DecodedToken, TokenHeader, TokenParts, TokenPayload};
pub use trust::{IssuerKeyRecord, KeyProvenance, TrustResolver, TrustResolverConfig, TrustStatus};
pub use verifier::{VerificationResult, VerificationStatus, Verifier};

/// Decode a QR digit string down to its header and claims without any
/// verification, for diagnostics
pub fn debug_qr(uri: &str) -> ShcResult<DecodedToken> {
    let compact = qr::unpack(uri)?;
    let parts = token::parse(&compact)?;
    token::inflate(&parts)
}
