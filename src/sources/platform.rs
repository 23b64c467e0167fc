//! Installer discovery on the local system.

use async_trait::async_trait;

use super::{InstallerInfo, PlatformError, PlatformInit};
use crate::util::parse_version_code;

/// Locates the installer binary on `$PATH` and probes its version code.
pub struct InstallerLocator {
    /// Binary name to look up (e.g. `magisk`).
    binary: String,
    /// Flag passed to the binary to print its version.
    version_flag: String,
}

impl InstallerLocator {
    /// Create a locator for `binary`, probing versions with `-V`.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            version_flag: "-V".into(),
        }
    }

    /// Override the version probe flag.
    #[must_use]
    pub fn with_version_flag(mut self, flag: impl Into<String>) -> Self {
        self.version_flag = flag.into();
        self
    }
}

#[async_trait]
impl PlatformInit for InstallerLocator {
    /// What: Resolve the installer binary and read its version code.
    ///
    /// Output:
    /// - `InstallerInfo` with the absolute path and the last digit run of
    ///   the probe output as version code (0 when the probe yields none).
    ///
    /// Details:
    /// - A missing binary is `PlatformError::NotFound`; a binary that fails
    ///   to execute is `Probe`. A binary that runs but prints no digits is
    ///   not an error (version gating simply will not trigger).
    async fn resolve_installer(&self) -> Result<InstallerInfo, PlatformError> {
        let path = which::which(&self.binary).map_err(|_| PlatformError::NotFound)?;
        let out = std::process::Command::new(&path)
            .arg(&self.version_flag)
            .output()
            .map_err(|e| PlatformError::Probe(e.to_string()))?;
        let text = String::from_utf8_lossy(&out.stdout);
        let version_code = parse_version_code(text.trim()).unwrap_or(0);
        tracing::info!(path = %path.display(), version_code, "installer resolved");
        Ok(InstallerInfo { path, version_code })
    }
}
