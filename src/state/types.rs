//! Core value types shared by the refresh pipeline, list assembly, and the
//! collaborator implementations.

/// Origin of a [`ModuleRecord`].
///
/// Indicates whether a record describes a module installed on the local
/// system or an entry advertised by a remote repository catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ModuleOrigin {
    /// Module present in the local inventory.
    Local,
    /// Module advertised by a remote repository.
    Remote,
}

/// One catalog entry, local or remote-sourced.
///
/// Records are replaced wholesale on every scan or sync; nothing mutates a
/// published collection in place.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ModuleRecord {
    /// Identifier, unique within its origin.
    pub id: String,
    /// Human-readable module name.
    pub name: String,
    /// Version string as reported by the module.
    #[serde(default)]
    pub version: String,
    /// Monotonic version code used for update comparisons.
    #[serde(default)]
    pub version_code: i64,
    /// Module author.
    #[serde(default)]
    pub author: String,
    /// One-line description suitable for list display.
    #[serde(default)]
    pub description: String,
    /// Whether this is a local or remote record.
    pub origin: ModuleOrigin,
    /// For local records: whether the module was originally installed from a
    /// remote repository.
    #[serde(default)]
    pub remote_sourced: bool,
    /// For local records: whether the module is currently enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional update-descriptor URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
}

/// Serde default helper for [`ModuleRecord::enabled`].
fn default_true() -> bool {
    true
}

impl ModuleRecord {
    /// What: Decide whether this record's update descriptor may be checked
    /// automatically.
    ///
    /// Inputs:
    /// - None (inspects `origin`, `remote_sourced`, `update_url`)
    ///
    /// Output:
    /// - `true` only for a local record carrying a descriptor that did not
    ///   originate from a remote repository.
    ///
    /// Details:
    /// - Remote-sourced modules are validated by their repository; honoring a
    ///   self-declared descriptor on them would let a hijacked module point
    ///   update checks at an arbitrary host.
    #[must_use]
    pub fn trusts_update_descriptor(&self) -> bool {
        self.origin == ModuleOrigin::Local && !self.remote_sourced && self.update_url.is_some()
    }

    /// What: Case-insensitive substring match against the searchable fields.
    ///
    /// Inputs:
    /// - `needle`: Already-normalized (lowercased, trimmed) query text
    ///
    /// Output:
    /// - `true` when `needle` occurs in the id, name, author, or description.
    #[must_use]
    pub fn matches_query(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.id.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Result of a successful per-record update check.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateInfo {
    /// Version string advertised by the descriptor.
    pub version: String,
    /// Version code advertised by the descriptor.
    pub version_code: i64,
    /// Download URL for the updated package.
    #[serde(default)]
    pub zip_url: String,
}

/// Snapshot of ambient system facts consumed by notification predicates.
///
/// The engine owns one instance behind a lock and refreshes the volatile
/// fields (connectivity, captcha, self-update) during each run; every list
/// rebuild re-derives the predicate-driven banners from the current snapshot.
#[derive(Clone, Debug)]
pub struct SystemState {
    /// Whether the network stack is usable at all.
    pub net_capable: bool,
    /// Whether a connectivity probe succeeded recently.
    pub has_connectivity: bool,
    /// Whether this is a debug build of the host application.
    pub debug_build: bool,
    /// Whether a repository demands captcha validation.
    pub captcha_required: bool,
    /// Whether first-run setup has completed.
    pub setup_complete: bool,
    /// Whether the resolved installer is below the supported version.
    pub installer_outdated: bool,
    /// Whether a newer build of the host application is available.
    pub self_update_available: bool,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            net_capable: true,
            has_connectivity: true,
            debug_build: false,
            captcha_required: false,
            setup_complete: true,
            installer_outdated: false,
            self_update_available: false,
        }
    }
}

/// Which of the two logical lists a component belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Locally installed modules.
    Installed,
    /// Online catalog of modules available from repositories.
    Online,
}

/// Opaque header/footer spacing forwarded to the display sink.
///
/// The core never interprets these values; they exist so layout metadata can
/// travel with the list it belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Insets {
    /// Leading spacing in pixels.
    pub header_px: u32,
    /// Trailing spacing in pixels.
    pub footer_px: u32,
}

/// One row of a published [`DisplayList`].
#[derive(Clone, Debug)]
pub enum DisplayRow {
    /// Advisory banner row.
    Notification(crate::logic::NotificationType),
    /// Data entry row.
    Module(ModuleRecord),
}

/// Ordered, immutable-once-published sequence handed to the display sink:
/// active notifications first (declaration order), then the query-filtered
/// data entries in their original relative order.
#[derive(Clone, Debug)]
pub struct DisplayList {
    /// Rows in display order.
    pub rows: Vec<DisplayRow>,
    /// Layout spacing attached to this list.
    pub insets: Insets,
}

impl DisplayList {
    /// Number of leading notification rows.
    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.rows
            .iter()
            .take_while(|r| matches!(r, DisplayRow::Notification(_)))
            .count()
    }
}

/// What caused a refresh run to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// First load after startup; bypasses the cooldown gate.
    Initial,
    /// Host view resumed.
    Resume,
    /// Manual pull-to-refresh.
    Manual,
}

impl RefreshTrigger {
    /// Whether this trigger may bypass the cooldown gate.
    #[must_use]
    pub fn is_forced(self) -> bool {
        matches!(self, RefreshTrigger::Initial)
    }
}

/// Terminal state of one refresh run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Full pipeline ran through badge computation and publishing.
    Completed {
        /// Number of installed modules with a newer version available.
        upgradable: usize,
    },
    /// Network capability was absent; the run ended after the local stages.
    NoNetwork,
    /// The trigger was rejected by the run guard or the cooldown gate.
    Ignored,
}
