/// Cryptography module for token signing and key material
///
/// Wraps the p256 ECDSA primitive behind ES256 signer/verifier types
/// keyed by JWK documents

pub mod es256;
pub mod jwk;

pub use es256::{Es256Signer, Es256Verifier, ALG_ES256};
pub use jwk::{Jwk, JwkSet};
