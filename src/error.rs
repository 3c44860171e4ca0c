/// Unified error types for the health card verification library
use thiserror::Error;

/// Main error type for packing, parsing, and key handling
///
/// Recoverable verification outcomes (bad signature, unknown issuer,
/// disqualified key) are reported through `VerificationStatus`, not through
/// this type. Errors here mean the caller handed us input we could not even
/// decode.
#[derive(Error, Debug)]
pub enum ShcError {
    /// QR digit string errors (odd length, non-digit characters)
    #[error("QR encoding error: {0}")]
    QrEncoding(String),

    /// Token structure errors (segment count, base64, JSON)
    #[error("Invalid signing format: {0}")]
    InvalidSigningFormat(String),

    /// Declared payload compression could not be reversed
    #[error("Invalid compression: {0}")]
    InvalidCompression(String),

    /// Key material errors (malformed JWK, bad coordinates)
    #[error("Key error: {0}")]
    Key(String),

    /// Token issuance errors
    #[error("Signing error: {0}")]
    Signing(String),

    /// Trust registry and JWKS fetch errors
    #[error("Trust resolution error: {0}")]
    Resolution(String),
}

/// Result type alias for library operations
pub type ShcResult<T> = Result<T, ShcError>;
