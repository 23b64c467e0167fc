//! The refresh orchestration engine.
//!
//! One [`RefreshEngine`] owns both list assemblers and drives the full
//! refresh sequence: installer readiness, local inventory scan, repository
//! synchronization, per-item update checks, badge computation, and the final
//! rebuild/publish of both lists. Every step failure degrades into an
//! advisory banner; nothing here aborts a run with an error.
//!
//! The pipeline is a flat sequence of explicit stages. Shared run state
//! (banner sets, the progress aggregator, the ambient snapshot) is scoped to
//! the engine instance, reset at stage 0, and joined explicitly before
//! badges are computed, so the final assembly pass always observes the
//! terminal state of every prior stage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::logic::{
    CHECK_WEIGHT, ListAssembler, NotificationType, ProgressAggregator, RefreshDebouncer,
    SYNC_WEIGHT_SPLIT,
};
use crate::sources::{
    CheckError, DisplaySink, LocalInventory, PlatformInit, ProgressFn, RemoteSync, UpdateChecker,
};
use crate::state::{
    Insets, ListKind, ModuleRecord, RefreshOutcome, RefreshTrigger, SystemState,
};

mod setup;
pub use setup::SetupGate;

/// Tunables for the refresh engine.
#[derive(Clone, Debug)]
pub struct RefreshConfig {
    /// Cooldown window applied by the re-entrancy gate.
    pub cooldown: Duration,
    /// Optional deadline for each per-item update check. `None` preserves
    /// the unbounded behavior; an elapsed deadline counts as an isolated
    /// per-item failure.
    pub per_check_timeout: Option<Duration>,
    /// Whether this is a debug build (drives the debug banner).
    pub debug_build: bool,
    /// Minimum supported installer version code; 0 disables the gate.
    pub min_installer_version: i64,
    /// Whether first-run setup still has to happen.
    pub first_run: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(5),
            per_check_timeout: None,
            debug_build: false,
            min_installer_version: 0,
            first_run: false,
        }
    }
}

/// Clears the run-active flag when a pipeline stage unwinds or completes.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Top-level refresh orchestrator; owns all run-scoped state.
pub struct RefreshEngine {
    platform: Arc<dyn PlatformInit>,
    inventory: Arc<dyn LocalInventory>,
    remote: Arc<dyn RemoteSync>,
    checker: Arc<dyn UpdateChecker>,
    sink: Arc<dyn DisplaySink>,
    installed: ListAssembler,
    online: ListAssembler,
    sys: Arc<RwLock<SystemState>>,
    progress: ProgressAggregator,
    debouncer: RefreshDebouncer,
    run_active: AtomicBool,
    badge: AtomicUsize,
    setup: SetupGate,
    cfg: RefreshConfig,
}

impl RefreshEngine {
    /// What: Assemble an engine from its collaborators.
    ///
    /// Inputs:
    /// - The five collaborator contracts plus the engine tunables
    ///
    /// Output:
    /// - An `Arc`-wrapped engine ready for the `on_*` entry points.
    #[must_use]
    pub fn new(
        platform: Arc<dyn PlatformInit>,
        inventory: Arc<dyn LocalInventory>,
        remote: Arc<dyn RemoteSync>,
        checker: Arc<dyn UpdateChecker>,
        sink: Arc<dyn DisplaySink>,
        cfg: RefreshConfig,
    ) -> Arc<Self> {
        let sys = Arc::new(RwLock::new(SystemState {
            debug_build: cfg.debug_build,
            setup_complete: !cfg.first_run,
            ..SystemState::default()
        }));
        Arc::new(Self {
            platform,
            inventory,
            remote,
            checker,
            sink,
            installed: ListAssembler::new(ListKind::Installed, Arc::clone(&sys)),
            online: ListAssembler::new(ListKind::Online, Arc::clone(&sys)),
            sys,
            progress: ProgressAggregator::new(),
            debouncer: RefreshDebouncer::new(),
            run_active: AtomicBool::new(false),
            badge: AtomicUsize::new(0),
            setup: SetupGate::new(!cfg.first_run),
            cfg,
        })
    }

    /// Assembler feeding the installed list.
    #[must_use]
    pub fn installed(&self) -> &ListAssembler {
        &self.installed
    }

    /// Assembler feeding the online list.
    #[must_use]
    pub fn online(&self) -> &ListAssembler {
        &self.online
    }

    /// Latest committed progress in `[0, SCALE]`.
    #[must_use]
    pub fn current_progress(&self) -> u32 {
        self.progress.value()
    }

    /// Number of installed modules with a newer version available.
    #[must_use]
    pub fn current_badge_count(&self) -> usize {
        self.badge.load(Ordering::SeqCst)
    }

    /// Whether the needs-upgrade badge should show on `kind`.
    #[must_use]
    pub fn badge_on(&self, kind: ListKind) -> bool {
        kind == ListKind::Online && self.current_badge_count() > 0
    }

    /// Forward layout spacing to both assemblers.
    pub fn set_insets(&self, installed: Insets, online: Insets) {
        self.installed.set_insets(installed);
        self.online.set_insets(online);
    }

    /// Flag or clear a pending captcha demand (host-driven).
    pub fn set_captcha_required(&self, required: bool) {
        if let Ok(mut sys) = self.sys.write() {
            sys.captcha_required = required;
        }
    }

    /// Mark first-run setup finished, releasing any waiting run.
    pub fn mark_setup_complete(&self) {
        if let Ok(mut sys) = self.sys.write() {
            sys.setup_complete = true;
        }
        self.setup.mark_ready();
    }

    /// What: Initial load; dispatches a forced run and returns immediately.
    pub fn on_initial_load(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let _ = engine.run_once(RefreshTrigger::Initial).await;
        });
    }

    /// What: Host view resumed.
    ///
    /// Details:
    /// - Purely-local state is refreshed synchronously from already-known
    ///   data (banner re-derivation, filter re-application) even when the
    ///   gate rejects the full run; the run itself is dispatched.
    pub fn on_resume(self: &Arc<Self>) {
        self.publish_all();
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let _ = engine.run_once(RefreshTrigger::Resume).await;
        });
    }

    /// What: Manual pull-to-refresh.
    ///
    /// Output:
    /// - `true` when the run was accepted and dispatched; `false` when the
    ///   gate or an in-flight run rejected it (dropped, not queued).
    pub fn on_manual_refresh(self: &Arc<Self>) -> bool {
        if !self.try_begin(RefreshTrigger::Manual) {
            return false;
        }
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let _ = engine.run_pipeline(RefreshTrigger::Manual).await;
        });
        true
    }

    /// What: Search text edited.
    ///
    /// Inputs:
    /// - `text`: Raw query text; `None` clears the filter
    ///
    /// Output:
    /// - `true` when the effective query changed for at least one list;
    ///   rebuilds for changed lists are dispatched off the caller.
    pub fn on_query_changed(self: &Arc<Self>, text: Option<&str>) -> bool {
        let installed_changed = self.installed.set_query(text);
        let online_changed = self.online.set_query(text);
        if installed_changed {
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                engine.installed.publish(engine.sink.as_ref());
            });
        }
        if online_changed {
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                engine.online.publish(engine.sink.as_ref());
            });
        }
        installed_changed || online_changed
    }

    /// What: Run the full pipeline once, honoring the re-entrancy guard.
    ///
    /// Output:
    /// - The run outcome; `Ignored` when another run is active or the
    ///   cooldown rejected the trigger.
    pub async fn run_once(self: &Arc<Self>, trigger: RefreshTrigger) -> RefreshOutcome {
        if !self.try_begin(trigger) {
            return RefreshOutcome::Ignored;
        }
        self.run_pipeline(trigger).await
    }

    /// Acquire the run slot: single active run, then the cooldown gate.
    fn try_begin(&self, trigger: RefreshTrigger) -> bool {
        if self.run_active.swap(true, Ordering::SeqCst) {
            tracing::info!(?trigger, "refresh ignored; run in progress");
            return false;
        }
        if !self
            .debouncer
            .try_enter(self.cfg.cooldown, trigger.is_forced())
        {
            self.run_active.store(false, Ordering::SeqCst);
            tracing::info!(?trigger, "refresh ignored; cooldown");
            return false;
        }
        true
    }

    /// The staged pipeline. Callers must have passed `try_begin`.
    async fn run_pipeline(self: &Arc<Self>, trigger: RefreshTrigger) -> RefreshOutcome {
        let _guard = RunGuard(&self.run_active);
        tracing::info!(?trigger, "refresh run starting");

        // Stage 0: run-scoped reset, then wait for first-run setup.
        self.progress.reset();
        self.installed.reset_notifications();
        self.online.reset_notifications();
        self.setup.wait_ready().await;

        // Stage 1: installer readiness.
        let platform_ok = match self.platform.resolve_installer().await {
            Ok(info) => {
                let outdated = self.cfg.min_installer_version > 0
                    && info.version_code < self.cfg.min_installer_version;
                if let Ok(mut sys) = self.sys.write() {
                    sys.installer_outdated = outdated;
                }
                if outdated {
                    self.installed
                        .add_notification(NotificationType::OutdatedInstaller);
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "installer resolution failed");
                self.installed
                    .add_notification(NotificationType::InstallerError);
                self.online
                    .add_notification(NotificationType::InstallerError);
                false
            }
        };

        if !platform_ok {
            // Dependent stages are skipped; the run still publishes.
            self.badge.store(0, Ordering::SeqCst);
            return self.finish_run(0, RefreshOutcome::Completed { upgradable: 0 });
        }

        // Stage 2: local inventory snapshot.
        match self.inventory.scan().await {
            Ok(records) => self.installed.set_records(records),
            Err(e) => {
                tracing::warn!(error = %e, "inventory scan failed; keeping previous snapshot");
            }
        }

        // Refresh the ambient snapshot feeding banner predicates.
        let capable = self.remote.has_capability();
        let connected = self.remote.has_connectivity();
        if let Ok(mut sys) = self.sys.write() {
            sys.net_capable = capable;
            sys.has_connectivity = connected;
        }

        // Stage 3: repository synchronization.
        if !capable {
            tracing::info!("network capability absent; ending run after local stages");
            self.online
                .add_notification(NotificationType::NoNetworkCapability);
            let sole = self.progress.register_source(1.0);
            self.progress.report(sole, 1.0);
            return self.finish_run(0, RefreshOutcome::NoNetwork);
        }

        let eligible: Vec<ModuleRecord> = self
            .installed
            .records_snapshot()
            .iter()
            .filter(|r| r.trusts_update_descriptor())
            .cloned()
            .collect();
        let sync_weight = if eligible.is_empty() {
            1.0
        } else {
            SYNC_WEIGHT_SPLIT
        };
        let sync_handle = self.progress.register_source(sync_weight);

        self.remote.refresh_enabled_state();
        let progress_cb: ProgressFn = {
            let engine = Arc::clone(self);
            Box::new(move |fraction| engine.progress.report(sync_handle, fraction))
        };
        match self.remote.sync(progress_cb).await {
            Ok(records) => self.online.set_records(records),
            Err(e) => {
                tracing::warn!(error = %e, "repository sync failed");
                self.installed
                    .add_notification(NotificationType::RepoUpdateFailed);
            }
        }
        self.progress.report(sync_handle, 1.0);

        // Stage 4: per-item update checks, isolated, joined before badges.
        let mut upgradable = 0usize;
        if !eligible.is_empty() {
            let check_handle = self.progress.register_source(CHECK_WEIGHT);
            let total = eligible.len();
            let done = Arc::new(AtomicUsize::new(0));
            let results = futures::future::join_all(eligible.iter().map(|record| {
                let engine = Arc::clone(self);
                let done = Arc::clone(&done);
                async move {
                    let check = engine.checker.check(record);
                    let result = match engine.cfg.per_check_timeout {
                        Some(deadline) => match tokio::time::timeout(deadline, check).await {
                            Ok(r) => r,
                            Err(_) => Err(CheckError::Network("check deadline elapsed".into())),
                        },
                        None => check.await,
                    };
                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    engine
                        .progress
                        .report(check_handle, finished as f64 / total as f64);
                    match result {
                        Ok(update) => update.is_some(),
                        Err(e) => {
                            // One bad descriptor must not stop the batch.
                            tracing::warn!(id = %record.id, error = %e, "update check failed");
                            false
                        }
                    }
                }
            }))
            .await;
            upgradable = results.into_iter().filter(|newer| *newer).count();
        }

        // Stage 5: badge and self-update state, observed by the final pass.
        self.badge.store(upgradable, Ordering::SeqCst);
        let self_update = self.checker.app_update_available().await;
        if let Ok(mut sys) = self.sys.write() {
            sys.self_update_available = self_update;
            sys.has_connectivity = self.remote.has_connectivity();
        }
        if self_update {
            self.installed
                .add_notification(NotificationType::UpdateAvailable);
        }

        self.finish_run(upgradable, RefreshOutcome::Completed { upgradable })
    }

    /// Stages 6–7: publish both lists, complete progress, re-arm the gate.
    fn finish_run(&self, upgradable: usize, outcome: RefreshOutcome) -> RefreshOutcome {
        self.publish_all();
        self.progress.finish();
        self.debouncer.rearm(self.cfg.cooldown);
        tracing::info!(?outcome, upgradable, "refresh run finished");
        outcome
    }

    /// Rebuild and publish both lists from current state.
    fn publish_all(&self) {
        self.installed.publish(self.sink.as_ref());
        self.online.publish(self.sink.as_ref());
    }
}
