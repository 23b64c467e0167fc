//! Advisory banner membership tracking.
//!
//! A [`NotificationSet`] holds the banners currently active for one list.
//! Banner types come in two membership flavors: *manual* types are added and
//! removed explicitly by the refresh pipeline and persist until the set is
//! reset for a new run, while *auto* types are owned entirely by their
//! activation predicate and re-derived on every assembly pass. Predicate
//! evaluation is centralized in [`NotificationSet::auto_sync_all`] so the
//! policy lives in exactly one place.

use std::collections::BTreeSet;

use crate::state::{ListKind, SystemState};

/// Advisory banner tags. Declaration order is display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationType {
    /// The installer binary could not be resolved.
    InstallerError,
    /// The installer was found but is below the supported version.
    OutdatedInstaller,
    /// The network stack is unusable; online features are disabled.
    NoNetworkCapability,
    /// A connectivity probe failed.
    NoInternet,
    /// Repository synchronization failed this run.
    RepoUpdateFailed,
    /// A repository demands captcha validation before serving requests.
    CaptchaRequired,
    /// A newer build of the host application is available.
    UpdateAvailable,
    /// First-run setup has not completed yet.
    FirstRunSetupHint,
    /// Running a debug build.
    DebugMode,
}

impl NotificationType {
    /// All variants in declaration order.
    pub const ALL: [NotificationType; 9] = [
        NotificationType::InstallerError,
        NotificationType::OutdatedInstaller,
        NotificationType::NoNetworkCapability,
        NotificationType::NoInternet,
        NotificationType::RepoUpdateFailed,
        NotificationType::CaptchaRequired,
        NotificationType::UpdateAvailable,
        NotificationType::FirstRunSetupHint,
        NotificationType::DebugMode,
    ];

    /// What: Whether this type's membership is owned by its predicate.
    ///
    /// Output:
    /// - `true` for predicate-driven ("auto") types that are re-derived on
    ///   every assembly pass; `false` for manually managed types.
    #[must_use]
    pub fn is_auto(self) -> bool {
        matches!(
            self,
            NotificationType::NoInternet
                | NotificationType::CaptchaRequired
                | NotificationType::FirstRunSetupHint
                | NotificationType::DebugMode
        )
    }

    /// What: Which list(s) this banner belongs on.
    ///
    /// Details:
    /// - The two sets may diverge: connectivity banners only make sense on
    ///   the online list, setup and self-update hints on the installed one.
    #[must_use]
    pub fn applies_to(self, kind: ListKind) -> bool {
        match self {
            NotificationType::NoNetworkCapability | NotificationType::NoInternet => {
                kind == ListKind::Online
            }
            NotificationType::OutdatedInstaller
            | NotificationType::RepoUpdateFailed
            | NotificationType::UpdateAvailable
            | NotificationType::FirstRunSetupHint => kind == ListKind::Installed,
            NotificationType::InstallerError
            | NotificationType::CaptchaRequired
            | NotificationType::DebugMode => true,
        }
    }

    /// What: Activation predicate evaluated against the current system state.
    ///
    /// Inputs:
    /// - `sys`: Current ambient snapshot
    ///
    /// Output:
    /// - `true` when the banner's condition holds right now.
    ///
    /// Details:
    /// - Defined for every type; for manual types it only matters when the
    ///   pipeline consults it before an explicit add.
    #[must_use]
    pub fn is_active(self, sys: &SystemState) -> bool {
        match self {
            NotificationType::InstallerError => false,
            NotificationType::OutdatedInstaller => sys.installer_outdated,
            NotificationType::NoNetworkCapability => !sys.net_capable,
            NotificationType::NoInternet => sys.net_capable && !sys.has_connectivity,
            NotificationType::RepoUpdateFailed => false,
            NotificationType::CaptchaRequired => sys.captcha_required,
            NotificationType::UpdateAvailable => sys.self_update_available,
            NotificationType::FirstRunSetupHint => !sys.setup_complete,
            NotificationType::DebugMode => sys.debug_build,
        }
    }
}

/// Active-banner membership for one list.
///
/// Membership is idempotent and iteration follows declaration order.
#[derive(Debug, Default)]
pub struct NotificationSet {
    /// Currently active tags, ordered by declaration order.
    active: BTreeSet<NotificationType>,
}

impl NotificationSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Activate a banner. Adding an already-present tag is a no-op.
    pub fn add(&mut self, ty: NotificationType) {
        self.active.insert(ty);
    }

    /// What: Deactivate a banner. Removing an absent tag is a no-op.
    pub fn remove(&mut self, ty: NotificationType) {
        self.active.remove(&ty);
    }

    /// What: Derive one tag's membership from its predicate.
    ///
    /// Inputs:
    /// - `ty`: Tag to synchronize
    /// - `sys`: Current ambient snapshot
    ///
    /// Output:
    /// - Tag present afterwards iff its predicate holds.
    pub fn auto_sync(&mut self, ty: NotificationType, sys: &SystemState) {
        if ty.is_active(sys) {
            self.add(ty);
        } else {
            self.remove(ty);
        }
    }

    /// What: Re-derive every predicate-owned tag applicable to `kind` from
    /// the current snapshot.
    ///
    /// Inputs:
    /// - `sys`: Current ambient snapshot
    /// - `kind`: The list this set belongs to
    ///
    /// Details:
    /// - Called on every assembly pass; manual tags are left untouched.
    pub fn auto_sync_all(&mut self, sys: &SystemState, kind: ListKind) {
        for ty in NotificationType::ALL {
            if ty.is_auto() && ty.applies_to(kind) {
                self.auto_sync(ty, sys);
            }
        }
    }

    /// Whether a tag is currently active.
    #[must_use]
    pub fn contains(&self, ty: NotificationType) -> bool {
        self.active.contains(&ty)
    }

    /// Active tags in declaration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NotificationType> {
        self.active.iter().copied().collect()
    }

    /// Drop all membership at the start of a new run.
    pub fn reset(&mut self) {
        self.active.clear();
    }
}
