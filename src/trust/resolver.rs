/// Trust resolver - layered key lookup over a cached registry snapshot
///
/// Resolution order, short-circuiting on first hit:
/// 1. Exact match in the current snapshot (caller-supplied keys first)
/// 2. Bulk trust registry refresh when the snapshot is stale or empty
/// 3. Per-issuer JWKS discovery at {iss}/.well-known/jwks.json
use crate::crypto::{Jwk, JwkSet};
use crate::error::{ShcError, ShcResult};
use crate::trust::{
    key_index, synthesized_valid_from, IssuerKeyRecord, KeyProvenance, TrustStatus,
};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Credential type stamped onto synthesized records
const IMMUNIZATION_CREDENTIAL: &str = "https://smarthealth.cards#immunization";

/// Trust resolver configuration
#[derive(Debug, Clone)]
pub struct TrustResolverConfig {
    /// Location of the shared trust registry document
    pub registry_url: String,
    /// How long a registry snapshot stays fresh
    pub refresh_ttl: Duration,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
    /// Timeout applied to every fetch
    pub http_timeout: std::time::Duration,
}

impl Default for TrustResolverConfig {
    fn default() -> Self {
        Self {
            registry_url:
                "https://raw.githubusercontent.com/Path-Check/trust-registry/main/registry.json"
                    .to_string(),
            refresh_ttl: Duration::hours(24),
            user_agent: "shc-verifier/0.1".to_string(),
            http_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Process-scoped registry state, replaced wholesale on refresh
///
/// `entries` holds registry and JWKS-discovered records and is swapped as a
/// unit. `pinned` holds caller-supplied records; a TTL refresh never
/// touches it.
#[derive(Debug, Default)]
struct RegistrySnapshot {
    entries: HashMap<String, IssuerKeyRecord>,
    pinned: HashMap<String, IssuerKeyRecord>,
    last_fetch: Option<DateTime<Utc>>,
}

/// Wire shape of the bulk trust registry document
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(rename = "SmartHealthCards", default)]
    smart_health_cards: HashMap<String, IssuerKeyRecord>,
}

/// Resolves issuer keys through the snapshot cache and network fallbacks
pub struct TrustResolver {
    http_client: Client,
    snapshot: Arc<RwLock<RegistrySnapshot>>,
    config: TrustResolverConfig,
}

impl TrustResolver {
    /// Create a new trust resolver
    pub fn new(config: TrustResolverConfig) -> ShcResult<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ShcError::Resolution(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            snapshot: Arc::new(RwLock::new(RegistrySnapshot::default())),
            config,
        })
    }

    /// Resolve an (issuer, key id) pair to a key record
    ///
    /// Returns `None` when no trust source knows the key; the caller must
    /// treat that as an untrusted issuer. Network failures degrade to
    /// `None` rather than propagating.
    pub async fn resolve_key(&self, iss: &str, kid: &str) -> Option<IssuerKeyRecord> {
        let index = key_index(iss, kid);

        if let Some(record) = self.lookup(&index).await {
            return Some(record);
        }

        if self.needs_refresh().await {
            debug!("Key {} not in snapshot, refreshing trust registry", index);
            self.refresh_registry().await;

            if let Some(record) = self.lookup(&index).await {
                return Some(record);
            }
        }

        self.discover_issuer_keys(iss, kid).await
    }

    /// Merge caller-supplied key sets into the snapshot
    ///
    /// Entries land tagged untrusted / caller-supplied and survive TTL
    /// refreshes until explicitly re-seeded. Lets a caller pre-seed or
    /// override trust without any network access.
    pub async fn add_cached_keys(&self, issuer_sets: &HashMap<String, JwkSet>) {
        let mut snapshot = self.snapshot.write().await;

        for (iss, keyset) in issuer_sets {
            for key in &keyset.keys {
                let kid = match &key.kid {
                    Some(kid) => kid.clone(),
                    None => continue,
                };
                snapshot.pinned.insert(
                    key_index(iss, &kid),
                    synthesized_record(
                        iss,
                        key.clone(),
                        KeyProvenance::CallerSupplied,
                        "Untrusted URL",
                    ),
                );
            }
        }
    }

    /// Insert a fully-specified record under the caller-supplied layer
    ///
    /// Unlike `add_cached_keys` this keeps the record's own status, so an
    /// embedding application can mirror registry entries it trusts.
    pub async fn insert_record(&self, iss: &str, record: IssuerKeyRecord) {
        let kid = match &record.public_key.kid {
            Some(kid) => kid.clone(),
            None => {
                warn!("Dropping injected record for {} with no key id", iss);
                return;
            }
        };

        let mut snapshot = self.snapshot.write().await;
        snapshot.pinned.insert(key_index(iss, &kid), record);
    }

    /// When the registry snapshot was last refreshed, if ever
    pub async fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.last_fetch
    }

    /// Number of keys currently known across both snapshot layers
    pub async fn known_key_count(&self) -> usize {
        let snapshot = self.snapshot.read().await;
        snapshot.entries.len() + snapshot.pinned.len()
    }

    /// Look up an index across both snapshot layers
    async fn lookup(&self, index: &str) -> Option<IssuerKeyRecord> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .pinned
            .get(index)
            .or_else(|| snapshot.entries.get(index))
            .cloned()
    }

    /// Whether the snapshot has never been populated or its TTL elapsed
    async fn needs_refresh(&self) -> bool {
        let snapshot = self.snapshot.read().await;
        match snapshot.last_fetch {
            Some(last) => Utc::now() - last > self.config.refresh_ttl,
            None => true,
        }
    }

    /// Fetch the bulk registry and replace the snapshot wholesale
    ///
    /// The refresh timestamp is recorded even when the fetch fails, so a
    /// flaky registry is retried at most once per TTL window.
    async fn refresh_registry(&self) {
        let fetched = self.fetch_registry().await;

        let mut snapshot = self.snapshot.write().await;
        match fetched {
            Ok(entries) => {
                info!("Trust registry refreshed: {} keys", entries.len());
                snapshot.entries = entries;
            }
            Err(e) => {
                warn!("Trust registry fetch failed: {}", e);
            }
        }
        snapshot.last_fetch = Some(Utc::now());
    }

    /// Download and decode the bulk trust registry document
    async fn fetch_registry(&self) -> ShcResult<HashMap<String, IssuerKeyRecord>> {
        debug!("Fetching trust registry from {}", self.config.registry_url);

        let response = self
            .http_client
            .get(&self.config.registry_url)
            .send()
            .await
            .map_err(|e| ShcError::Resolution(format!("Registry fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ShcError::Resolution(format!(
                "Registry returned error: {}",
                response.status()
            )));
        }

        let document: RegistryDocument = response
            .json()
            .await
            .map_err(|e| ShcError::Resolution(format!("Invalid registry document: {}", e)))?;

        let mut entries = document.smart_health_cards;
        for record in entries.values_mut() {
            record.provenance = KeyProvenance::Registry;
        }

        Ok(entries)
    }

    /// Fetch an issuer's JWKS and fold its keys into the snapshot
    ///
    /// Discovered keys are tagged untrusted / self-asserted: the issuer
    /// vouches for itself, nobody else does.
    async fn discover_issuer_keys(&self, iss: &str, kid: &str) -> Option<IssuerKeyRecord> {
        let url = format!("{}/.well-known/jwks.json", iss);
        debug!("Discovering issuer keys via {}", url);

        let keyset = match self.fetch_jwks(&url).await {
            Ok(keyset) => keyset,
            Err(e) => {
                warn!("JWKS discovery failed for {}: {}", iss, e);
                return None;
            }
        };

        let mut snapshot = self.snapshot.write().await;
        for key in keyset.keys {
            let key_kid = match &key.kid {
                Some(kid) => kid.clone(),
                None => continue,
            };
            snapshot.entries.insert(
                key_index(iss, &key_kid),
                synthesized_record(iss, key, KeyProvenance::SelfAsserted, "Untrusted Issuer"),
            );
        }

        snapshot.entries.get(&key_index(iss, kid)).cloned()
    }

    /// Download and decode a JWKS document
    async fn fetch_jwks(&self, url: &str) -> ShcResult<JwkSet> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ShcError::Resolution(format!("JWKS fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ShcError::Resolution(format!(
                "JWKS endpoint returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ShcError::Resolution(format!("Invalid JWKS document: {}", e)))
    }
}

/// Build a record for a key no registry has vouched for
fn synthesized_record(
    iss: &str,
    key: Jwk,
    provenance: KeyProvenance,
    label: &str,
) -> IssuerKeyRecord {
    let mut display_name = HashMap::new();
    display_name.insert(
        "en".to_string(),
        format!("{}: {}", label, iss.trim_start_matches("https://")),
    );

    IssuerKeyRecord {
        display_name,
        entity_type: "issuer".to_string(),
        status: TrustStatus::Untrusted,
        valid_from: synthesized_valid_from(),
        public_key: key,
        credential_types: vec![IMMUNIZATION_CREDENTIAL.to_string()],
        provenance,
    }
}
