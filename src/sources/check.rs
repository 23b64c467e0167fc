//! Per-record update checks against trusted update descriptors.

use async_trait::async_trait;

use super::{CheckError, UpdateChecker};
use crate::state::{ModuleRecord, UpdateInfo};

/// Per-request timeout for descriptor fetches.
const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// JSON shape of an update descriptor.
#[derive(Debug, serde::Deserialize)]
struct UpdateDescriptor {
    #[serde(default)]
    version: String,
    #[serde(alias = "versionCode")]
    version_code: i64,
    #[serde(default, alias = "zipUrl")]
    zip_url: String,
}

/// JSON shape of the optional application release endpoint.
#[derive(Debug, serde::Deserialize)]
struct ReleaseDescriptor {
    #[serde(alias = "versionCode")]
    version_code: i64,
}

/// Fetches update descriptors over HTTP and compares version codes.
pub struct HttpUpdateChecker {
    client: Option<reqwest::Client>,
    /// Release endpoint for host-application self-updates, when configured.
    release_url: Option<String>,
    /// Version code of the running application build.
    own_version_code: i64,
}

impl HttpUpdateChecker {
    /// Create a checker; `release_url` enables the self-update probe.
    #[must_use]
    pub fn new(release_url: Option<String>, own_version_code: i64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .user_agent(concat!("modcat/", env!("CARGO_PKG_VERSION")))
                .build()
                .ok(),
            release_url,
            own_version_code,
        }
    }

    /// Map a reqwest failure onto the check taxonomy.
    fn map_err(e: &reqwest::Error) -> CheckError {
        if e.is_decode() {
            CheckError::Parse(e.to_string())
        } else {
            CheckError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl UpdateChecker for HttpUpdateChecker {
    /// What: Fetch `record`'s descriptor and compare version codes.
    ///
    /// Output:
    /// - `Ok(Some(UpdateInfo))` when the descriptor advertises a strictly
    ///   newer version code; `Ok(None)` when up to date or descriptor-less.
    ///
    /// Details:
    /// - Trust filtering happens in the engine; this implementation checks
    ///   whatever record it is handed.
    async fn check(&self, record: &ModuleRecord) -> Result<Option<UpdateInfo>, CheckError> {
        let Some(url) = record.update_url.as_deref() else {
            return Ok(None);
        };
        let Some(client) = self.client.as_ref() else {
            return Err(CheckError::Network("network stack unavailable".into()));
        };
        let descriptor: UpdateDescriptor = client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Self::map_err(&e))?
            .json()
            .await
            .map_err(|e| Self::map_err(&e))?;
        if descriptor.version_code > record.version_code {
            tracing::info!(
                id = %record.id,
                from = record.version_code,
                to = descriptor.version_code,
                "module update available"
            );
            Ok(Some(UpdateInfo {
                version: descriptor.version,
                version_code: descriptor.version_code,
                zip_url: descriptor.zip_url,
            }))
        } else {
            Ok(None)
        }
    }

    /// What: Probe the release endpoint for a newer application build.
    ///
    /// Output:
    /// - `false` when unconfigured, unreachable, or up to date; probing
    ///   failures are logged, never escalated.
    async fn app_update_available(&self) -> bool {
        let (Some(url), Some(client)) = (self.release_url.as_deref(), self.client.as_ref()) else {
            return false;
        };
        let release = client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        let release: ReleaseDescriptor = match release {
            Ok(resp) => match resp.json().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "release descriptor unreadable");
                    return false;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "release endpoint unreachable");
                return false;
            }
        };
        release.version_code > self.own_version_code
    }
}
