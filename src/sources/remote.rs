//! HTTP repository synchronization and the persisted repository registry.
//!
//! The registry file (`repos.toml`) is the persisted enable/disable toggle
//! state; this module consumes it read-only. Each enabled repository serves
//! a JSON index of its modules; indexes are fetched in registry order,
//! deduplicated by module id (first repository wins), and folded into one
//! remote snapshot with fractional progress reported per repository.

use std::collections::HashSet;
use std::net::ToSocketAddrs;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{ProgressFn, RemoteSync, SyncError};
use crate::state::{ModuleOrigin, ModuleRecord};

/// How long a connectivity probe result stays valid.
const CONNECTIVITY_TTL: Duration = Duration::from_secs(30);
/// Timeout for the TCP connectivity probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Per-request timeout for index fetches.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One repository in the registry.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RepoEntry {
    /// Stable repository identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// URL of the repository's JSON module index.
    pub index_url: String,
    /// Persisted toggle state; disabled repositories do not participate.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// Serde default for [`RepoEntry::enabled`].
fn enabled_default() -> bool {
    true
}

/// The persisted repository registry, in declaration (priority) order.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct RepoRegistry {
    /// Repositories in priority order.
    #[serde(default, rename = "repo")]
    pub repos: Vec<RepoEntry>,
}

impl RepoRegistry {
    /// What: Parse a registry from TOML text.
    ///
    /// Output:
    /// - The registry, or a parse error message.
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Enabled repositories in priority order.
    pub fn enabled(&self) -> impl Iterator<Item = &RepoEntry> {
        self.repos.iter().filter(|r| r.enabled)
    }
}

/// JSON shape of a repository's module index.
#[derive(Debug, serde::Deserialize)]
struct RepoIndex {
    #[serde(default)]
    modules: Vec<RepoIndexModule>,
}

/// One module entry inside a repository index.
#[derive(Debug, serde::Deserialize)]
struct RepoIndexModule {
    id: String,
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default, alias = "versionCode")]
    version_code: i64,
    #[serde(default)]
    author: String,
    #[serde(default)]
    description: String,
}

/// Cached result of the last connectivity probe.
#[derive(Debug, Default)]
struct ConnectivityCache {
    checked_at: Option<Instant>,
    ok: bool,
}

/// Repository synchronization over HTTP.
pub struct HttpRepoSync {
    /// Path of the persisted registry (`repos.toml`).
    registry_path: PathBuf,
    /// Shared HTTP client; `None` when the stack could not be built.
    client: Option<reqwest::Client>,
    /// Hard offline switch; capability is absent while set.
    offline: bool,
    /// Last loaded registry state.
    registry: RwLock<RepoRegistry>,
    /// TTL-cached connectivity probe.
    connectivity: Mutex<ConnectivityCache>,
}

impl HttpRepoSync {
    /// What: Build a sync source over the registry at `registry_path`.
    ///
    /// Inputs:
    /// - `registry_path`: Location of `repos.toml`
    /// - `offline`: Force capability off (no network use at all)
    ///
    /// Details:
    /// - The registry is loaded eagerly; call
    ///   [`RemoteSync::refresh_enabled_state`] to pick up toggle edits.
    #[must_use]
    pub fn new(registry_path: impl Into<PathBuf>, offline: bool) -> Self {
        let client = if offline {
            None
        } else {
            reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .user_agent(concat!("modcat/", env!("CARGO_PKG_VERSION")))
                .build()
                .ok()
        };
        let sync = Self {
            registry_path: registry_path.into(),
            client,
            offline,
            registry: RwLock::new(RepoRegistry::default()),
            connectivity: Mutex::new(ConnectivityCache::default()),
        };
        sync.refresh_enabled_state();
        sync
    }

    /// Reload the registry file, keeping the previous state on failure.
    fn reload_registry(&self) {
        let loaded = match std::fs::read_to_string(&self.registry_path) {
            Ok(text) => match RepoRegistry::parse(&text) {
                Ok(reg) => reg,
                Err(e) => {
                    tracing::warn!(path = %self.registry_path.display(), error = %e,
                        "malformed repository registry; keeping previous state");
                    return;
                }
            },
            Err(e) => {
                tracing::warn!(path = %self.registry_path.display(), error = %e,
                    "repository registry unreadable; keeping previous state");
                return;
            }
        };
        if let Ok(mut guard) = self.registry.write() {
            *guard = loaded;
        }
    }

    /// Fetch and parse one repository index.
    async fn fetch_index(
        client: &reqwest::Client,
        repo: &RepoEntry,
    ) -> Result<Vec<ModuleRecord>, SyncError> {
        let resp = client
            .get(&repo.index_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let index: RepoIndex = resp.json().await.map_err(|e| {
            if e.is_decode() {
                SyncError::Parse(e.to_string())
            } else {
                SyncError::Network(e.to_string())
            }
        })?;
        Ok(index
            .modules
            .into_iter()
            .map(|m| ModuleRecord {
                id: m.id,
                name: m.name,
                version: m.version,
                version_code: m.version_code,
                author: m.author,
                description: m.description,
                origin: ModuleOrigin::Remote,
                remote_sourced: false,
                enabled: true,
                // Remote entries are validated by their repository; they
                // never carry a self-declared descriptor.
                update_url: None,
            })
            .collect())
    }

    /// TCP-probe the first enabled repository host.
    fn probe_connectivity(&self) -> bool {
        let target = match self.registry.read() {
            Ok(reg) => reg
                .enabled()
                .next()
                .and_then(|r| reqwest::Url::parse(&r.index_url).ok())
                .and_then(|u| {
                    let host = u.host_str()?.to_owned();
                    let port = u.port_or_known_default()?;
                    Some((host, port))
                }),
            Err(_) => None,
        };
        let Some((host, port)) = target else {
            return false;
        };
        let Ok(mut addrs) = (host.as_str(), port).to_socket_addrs() else {
            return false;
        };
        addrs.any(|addr| std::net::TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
    }
}

/// Fold per-repository batches into one snapshot, first id wins.
fn merge_indexes(batches: Vec<Vec<ModuleRecord>>) -> Vec<ModuleRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        for record in batch {
            if seen.insert(record.id.clone()) {
                merged.push(record);
            }
        }
    }
    merged
}

#[async_trait]
impl RemoteSync for HttpRepoSync {
    fn has_capability(&self) -> bool {
        !self.offline && self.client.is_some()
    }

    fn has_connectivity(&self) -> bool {
        if !self.has_capability() {
            return false;
        }
        if let Ok(mut cache) = self.connectivity.lock() {
            if let Some(at) = cache.checked_at
                && at.elapsed() < CONNECTIVITY_TTL
            {
                return cache.ok;
            }
            let ok = self.probe_connectivity();
            cache.checked_at = Some(Instant::now());
            cache.ok = ok;
            ok
        } else {
            false
        }
    }

    fn refresh_enabled_state(&self) {
        self.reload_registry();
    }

    /// What: Fetch every enabled repository index and fold the results.
    ///
    /// Inputs:
    /// - `on_progress`: Receives `fetched/total` after each repository
    ///
    /// Output:
    /// - Merged snapshot in registry priority order. Partial failures are
    ///   tolerated; the sync fails only when every repository fails.
    async fn sync(&self, on_progress: ProgressFn) -> Result<Vec<ModuleRecord>, SyncError> {
        let Some(client) = self.client.as_ref() else {
            return Err(SyncError::Network("network stack unavailable".into()));
        };
        let repos: Vec<RepoEntry> = match self.registry.read() {
            Ok(reg) => reg.enabled().cloned().collect(),
            Err(_) => Vec::new(),
        };
        if repos.is_empty() {
            tracing::info!("no enabled repositories; empty catalog");
            on_progress(1.0);
            return Ok(Vec::new());
        }

        let total = repos.len();
        let mut batches = Vec::with_capacity(total);
        let mut last_error = None;
        for (fetched, repo) in repos.iter().enumerate() {
            match Self::fetch_index(client, repo).await {
                Ok(batch) => {
                    tracing::info!(repo = %repo.id, modules = batch.len(), "repository synced");
                    batches.push(batch);
                }
                Err(e) => {
                    tracing::warn!(repo = %repo.id, error = %e, "repository sync failed");
                    last_error = Some(e);
                }
            }
            on_progress((fetched + 1) as f64 / total as f64);
        }
        if batches.is_empty()
            && let Some(e) = last_error
        {
            return Err(e);
        }
        Ok(merge_indexes(batches))
    }
}
