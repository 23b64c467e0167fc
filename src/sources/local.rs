//! Filesystem-backed local module inventory.
//!
//! Layout: one directory per module under a root, each carrying a
//! `module.json` manifest. Two marker files mirror installer conventions:
//! `remove` excludes the module from the scan entirely (it is gone on next
//! boot) and `disable` keeps it listed but flags it disabled. A module
//! installed from a repository carries `"installed_from"` in its manifest
//! and is never trusted for automatic update checks.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{LocalInventory, ScanError};
use crate::state::{ModuleOrigin, ModuleRecord};

/// On-disk manifest shape for one installed module.
#[derive(Debug, serde::Deserialize)]
struct ModuleManifest {
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
    /// Repository id this module was installed from, when applicable.
    #[serde(default, alias = "installedFrom")]
    installed_from: Option<String>,
    /// Update-descriptor URL, when the module self-declares one.
    #[serde(default, alias = "updateJson")]
    update_url: Option<String>,
}

/// Scans a modules directory into local records.
pub struct DirInventory {
    /// Root directory holding one subdirectory per module.
    root: PathBuf,
}

impl DirInventory {
    /// Create an inventory over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl LocalInventory for DirInventory {
    /// What: Scan the modules directory into a fresh snapshot.
    ///
    /// Output:
    /// - Records sorted by id for a stable display order. A missing root is
    ///   an empty inventory, not an error.
    ///
    /// Details:
    /// - Entries without a readable manifest are skipped with a warning; one
    ///   malformed module must not hide the rest of the inventory.
    async fn scan(&self) -> Result<Vec<ModuleRecord>, ScanError> {
        if !self.root.exists() {
            tracing::info!(root = %self.root.display(), "modules directory absent; empty inventory");
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            if dir.join("remove").exists() {
                tracing::debug!(dir = %dir.display(), "skipping module marked for removal");
                continue;
            }
            let manifest_path = dir.join("module.json");
            let raw = match std::fs::read_to_string(&manifest_path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "unreadable module manifest");
                    continue;
                }
            };
            let manifest: ModuleManifest = match serde_json::from_str(&raw) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "malformed module manifest");
                    continue;
                }
            };
            records.push(ModuleRecord {
                id: manifest.id,
                name: manifest.name,
                version: manifest.version,
                version_code: manifest.version_code,
                author: manifest.author,
                description: manifest.description,
                origin: ModuleOrigin::Local,
                remote_sourced: manifest.installed_from.is_some(),
                enabled: !dir.join("disable").exists(),
                update_url: manifest.update_url,
            });
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!(count = records.len(), "local inventory scanned");
        Ok(records)
    }
}
