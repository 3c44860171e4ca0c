/// Trust Resolution System
///
/// Resolves an (issuer, key id) pair to accepted key material through a
/// layered strategy: a cached snapshot of the shared trust registry,
/// per-issuer JWKS discovery, and caller-supplied key sets.

pub mod resolver;

pub use resolver::{TrustResolver, TrustResolverConfig};

use crate::crypto::Jwk;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trust standing of an issuer key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    /// Curated by the registry and currently accepted
    #[serde(alias = "current")]
    Active,
    /// Key material known but not vouched for by the registry
    Untrusted,
    /// Registry listing has lapsed
    Expired,
    /// Actively revoked by the registry
    Revoked,
    /// Issuer no longer operates
    Terminated,
}

/// Where an issuer key record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyProvenance {
    /// Curated trust registry document
    #[default]
    Registry,
    /// The issuer's own JWKS discovery endpoint
    SelfAsserted,
    /// Injected by the caller through `add_cached_keys`
    CallerSupplied,
}

/// An issuer key as known to the trust layer, keyed by "{iss}#{kid}"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerKeyRecord {
    /// Language-tagged display names, e.g. {"en": "Example Health"}
    pub display_name: HashMap<String, String>,

    /// Entity kind ("issuer")
    pub entity_type: String,

    /// Trust standing of this key
    pub status: TrustStatus,

    /// When the registry listing became valid
    #[serde(rename = "validFromDT")]
    pub valid_from: DateTime<Utc>,

    /// Public key material
    #[serde(rename = "didDocument")]
    pub public_key: Jwk,

    /// Credential types this key may sign
    #[serde(rename = "credentialType", default)]
    pub credential_types: Vec<String>,

    /// Local bookkeeping, never part of the wire document
    #[serde(skip)]
    pub provenance: KeyProvenance,
}

/// Snapshot index key for an (issuer, key id) pair
pub(crate) fn key_index(iss: &str, kid: &str) -> String {
    format!("{}#{}", iss, kid)
}

/// Listing date stamped onto synthesized (non-registry) records
pub(crate) fn synthesized_valid_from() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 1, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
