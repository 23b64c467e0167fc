//! Collaborator contracts consumed by the refresh engine, plus the
//! production implementations backing the binary.
//!
//! The engine only ever talks to these traits; tests inject mocks and the
//! binary wires the HTTP/filesystem implementations from the submodules.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::state::{DisplayList, ListKind, ModuleRecord, UpdateInfo};

pub mod check;
pub mod local;
pub mod platform;
pub mod remote;

pub use check::HttpUpdateChecker;
pub use local::DirInventory;
pub use platform::InstallerLocator;
pub use remote::{HttpRepoSync, RepoEntry, RepoRegistry};

/// Installer resolution failure.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No installer binary was found on the search path.
    #[error("installer binary not found")]
    NotFound,
    /// The binary was found but probing it failed.
    #[error("installer probe failed: {0}")]
    Probe(String),
}

/// Local inventory scan failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Filesystem access failed.
    #[error("inventory io: {0}")]
    Io(#[from] std::io::Error),
    /// A module manifest could not be parsed.
    #[error("inventory parse: {0}")]
    Parse(String),
}

/// Repository synchronization failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure reaching the repositories.
    #[error("repository network error: {0}")]
    Network(String),
    /// A repository index could not be parsed.
    #[error("repository parse error: {0}")]
    Parse(String),
}

/// Per-record update check failure. Individual failures are logged and
/// isolated; they never abort the batch or surface as a banner.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Transport-level failure fetching the descriptor.
    #[error("update check network error: {0}")]
    Network(String),
    /// The descriptor payload could not be parsed.
    #[error("update descriptor parse error: {0}")]
    Parse(String),
}

/// Resolved installer facts.
#[derive(Clone, Debug)]
pub struct InstallerInfo {
    /// Absolute path of the installer binary.
    pub path: PathBuf,
    /// Version code reported by the binary; 0 when unknown.
    pub version_code: i64,
}

/// Progress callback handed to [`RemoteSync::sync`]; receives fractions in
/// `[0, 1]`.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Platform readiness: one-shot installer path resolution.
#[async_trait]
pub trait PlatformInit: Send + Sync {
    /// Resolve the installer binary and probe its version.
    async fn resolve_installer(&self) -> Result<InstallerInfo, PlatformError>;
}

/// Local filesystem-backed module inventory.
#[async_trait]
pub trait LocalInventory: Send + Sync {
    /// Scan the inventory and return a fresh snapshot of local records.
    async fn scan(&self) -> Result<Vec<ModuleRecord>, ScanError>;
}

/// Network-backed repository metadata source.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Whether the network stack is usable at all. When `false`, the online
    /// list is served a capability banner and no sync is attempted.
    fn has_capability(&self) -> bool;

    /// Whether a recent connectivity probe succeeded.
    fn has_connectivity(&self) -> bool;

    /// Re-read the persisted repository enable/disable toggle state.
    fn refresh_enabled_state(&self);

    /// Synchronize all enabled repositories, reporting fractional progress,
    /// and return the fresh remote snapshot.
    async fn sync(&self, on_progress: ProgressFn) -> Result<Vec<ModuleRecord>, SyncError>;
}

/// Per-record update checking against a trusted descriptor.
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    /// Fetch `record`'s update descriptor and compare versions. `Ok(None)`
    /// means up to date or no descriptor.
    async fn check(&self, record: &ModuleRecord) -> Result<Option<UpdateInfo>, CheckError>;

    /// Whether a newer build of the host application is available.
    async fn app_update_available(&self) -> bool {
        false
    }
}

/// External display sink. Receives finished lists; owns any diffing,
/// animation, and marshaling onto the rendering context, so callers may
/// invoke it from any worker.
pub trait DisplaySink: Send + Sync {
    /// Hand over a freshly assembled list.
    fn publish(&self, kind: ListKind, list: DisplayList);
}
