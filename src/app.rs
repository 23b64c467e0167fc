//! Binary runtime: argument parsing, collaborator wiring, and one
//! end-to-end refresh that prints both lists.

use std::sync::Arc;

use clap::Parser;

use crate::logic::SCALE;
use crate::refresh::{RefreshConfig, RefreshEngine};
use crate::sources::{
    DirInventory, DisplaySink, HttpRepoSync, HttpUpdateChecker, InstallerLocator,
};
use crate::state::{DisplayList, DisplayRow, ListKind, RefreshOutcome, RefreshTrigger};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// modcat - refresh and browse a catalog of installed and online modules
#[derive(Parser, Debug)]
#[command(name = "modcat")]
#[command(version)]
#[command(about = "Refresh and browse a catalog of installed and online modules", long_about = None)]
pub struct Args {
    /// Directory holding one subdirectory per installed module
    #[arg(long, default_value = "modules")]
    pub modules_dir: String,

    /// Repository registry file (persisted enable/disable toggles)
    #[arg(long, default_value = "repos.toml")]
    pub repos: String,

    /// Installer binary resolved on $PATH
    #[arg(long, default_value = "magisk")]
    pub installer: String,

    /// Minimum supported installer version code (0 disables the gate)
    #[arg(long, default_value_t = 0)]
    pub min_installer_version: i64,

    /// Release endpoint probed for self-updates
    #[arg(long)]
    pub release_url: Option<String>,

    /// Run without any network use
    #[arg(long)]
    pub offline: bool,

    /// Filter both lists with this query
    #[arg(short, long)]
    pub query: Option<String>,

    /// Show the debug banner
    #[arg(long)]
    pub debug_banner: bool,
}

/// Prints published lists to stdout.
///
/// Stdout writes need no marshaling, so publishing directly from worker
/// tasks is fine here; a real UI sink would forward to its render thread.
struct StdoutSink;

impl DisplaySink for StdoutSink {
    fn publish(&self, kind: ListKind, list: DisplayList) {
        let heading = match kind {
            ListKind::Installed => "Installed modules",
            ListKind::Online => "Online catalog",
        };
        println!("== {heading} ({} rows) ==", list.rows.len());
        for row in &list.rows {
            match row {
                DisplayRow::Notification(ty) => println!("  [!] {ty:?}"),
                DisplayRow::Module(m) => {
                    let state = if m.enabled { "" } else { " (disabled)" };
                    println!("  {} {} {}{state}", m.id, m.version, m.author);
                }
            }
        }
    }
}

/// What: Wire the production collaborators and run one refresh end-to-end.
///
/// Inputs:
/// - `args`: Parsed command line
///
/// Output:
/// - `Ok(())` after the run finishes and the summary is logged; the run
///   itself never fails (failures degrade into banners).
pub async fn run(args: Args) -> Result<()> {
    let own_version_code =
        crate::util::parse_version_code(env!("CARGO_PKG_VERSION")).unwrap_or(0);

    let engine = RefreshEngine::new(
        Arc::new(InstallerLocator::new(args.installer.clone())),
        Arc::new(DirInventory::new(&args.modules_dir)),
        Arc::new(HttpRepoSync::new(&args.repos, args.offline)),
        Arc::new(HttpUpdateChecker::new(
            args.release_url.clone(),
            own_version_code,
        )),
        Arc::new(StdoutSink),
        RefreshConfig {
            debug_build: args.debug_banner,
            min_installer_version: args.min_installer_version,
            ..RefreshConfig::default()
        },
    );

    if let Some(q) = args.query.as_deref() {
        engine.on_query_changed(Some(q));
    }

    let outcome = engine.run_once(RefreshTrigger::Initial).await;
    match outcome {
        RefreshOutcome::Completed { upgradable } => {
            tracing::info!(
                upgradable,
                badge = engine.current_badge_count(),
                progress = engine.current_progress(),
                "refresh completed"
            );
            if upgradable > 0 {
                println!("{upgradable} module(s) can be upgraded");
            }
        }
        RefreshOutcome::NoNetwork => {
            tracing::info!("refresh finished offline; online catalog unavailable");
        }
        RefreshOutcome::Ignored => {
            tracing::warn!("refresh ignored; another run was active");
        }
    }
    debug_assert_eq!(engine.current_progress(), SCALE);
    Ok(())
}
