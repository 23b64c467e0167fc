//! Integration tests for list assembly through the public API.
//!
//! Tests cover:
//! - Banner-before-data ordering with declaration-order banners
//! - Stable query filtering across searchable fields
//! - Inset propagation into published lists
//! - Query normalization edge cases

#![cfg(test)]

use std::sync::{Arc, Mutex, RwLock};

use modcat::logic::{ListAssembler, NotificationType};
use modcat::sources::DisplaySink;
use modcat::state::{
    DisplayList, DisplayRow, Insets, ListKind, ModuleOrigin, ModuleRecord, SystemState,
};

fn record(id: &str, author: &str, description: &str) -> ModuleRecord {
    ModuleRecord {
        id: id.into(),
        name: id.to_uppercase(),
        version: "1.0".into(),
        version_code: 1,
        author: author.into(),
        description: description.into(),
        origin: ModuleOrigin::Remote,
        remote_sourced: false,
        enabled: true,
        update_url: None,
    }
}

fn online_assembler() -> ListAssembler {
    ListAssembler::new(
        ListKind::Online,
        Arc::new(RwLock::new(SystemState::default())),
    )
}

#[derive(Default)]
struct CaptureSink {
    lists: Mutex<Vec<(ListKind, DisplayList)>>,
}

impl DisplaySink for CaptureSink {
    fn publish(&self, kind: ListKind, list: DisplayList) {
        if let Ok(mut lists) = self.lists.lock() {
            lists.push((kind, list));
        }
    }
}

#[test]
/// What: Banners precede data and keep declaration order regardless of the
/// order they were raised in.
///
/// - Input: Three banners added in reverse declaration order, two records
/// - Output: Rows are banner, banner, banner, module, module
fn banners_precede_data_in_declaration_order() {
    let asm = online_assembler();
    asm.add_notification(NotificationType::DebugMode);
    asm.add_notification(NotificationType::RepoUpdateFailed);
    asm.add_notification(NotificationType::InstallerError);
    asm.set_records(vec![
        record("a.mod", "alice", "first"),
        record("b.mod", "bob", "second"),
    ]);

    let list = asm.rebuild();
    let banners: Vec<NotificationType> = list
        .rows
        .iter()
        .take(3)
        .filter_map(|row| match row {
            DisplayRow::Notification(ty) => Some(*ty),
            DisplayRow::Module(_) => None,
        })
        .collect();
    assert_eq!(
        banners,
        vec![
            NotificationType::InstallerError,
            NotificationType::RepoUpdateFailed,
            NotificationType::DebugMode,
        ]
    );
    assert!(matches!(list.rows[3], DisplayRow::Module(_)));
    assert_eq!(list.rows.len(), 5);
}

#[test]
/// What: Filtering is a stable subsequence of the record snapshot.
///
/// - Input: Four records; query hitting id, author, or description
/// - Output: Matching records in original relative order
fn filtering_is_stable_and_field_wide() {
    let asm = online_assembler();
    asm.set_records(vec![
        record("alpha.mod", "carol", "systemless hosts"),
        record("beta.mod", "hosts-team", "theming"),
        record("gamma.mod", "carol", "font pack"),
        record("delta.mod", "dave", "hosts rewrite"),
    ]);

    assert!(asm.set_query(Some("hosts")));
    let ids: Vec<String> = asm
        .rebuild()
        .rows
        .iter()
        .filter_map(|row| match row {
            DisplayRow::Module(m) => Some(m.id.clone()),
            DisplayRow::Notification(_) => None,
        })
        .collect();
    assert_eq!(ids, vec!["alpha.mod", "beta.mod", "delta.mod"]);

    assert!(asm.set_query(Some("CAROL")));
    let ids: Vec<String> = asm
        .rebuild()
        .rows
        .iter()
        .filter_map(|row| match row {
            DisplayRow::Module(m) => Some(m.id.clone()),
            DisplayRow::Notification(_) => None,
        })
        .collect();
    assert_eq!(ids, vec!["alpha.mod", "gamma.mod"]);
}

#[test]
/// What: Published lists carry the configured insets untouched.
///
/// - Input: Header/footer spacing set before publishing
/// - Output: Sink receives the same opaque values
fn insets_travel_with_published_lists() {
    let asm = online_assembler();
    asm.set_records(vec![record("a.mod", "alice", "first")]);
    asm.set_insets(Insets {
        header_px: 64,
        footer_px: 112,
    });
    let sink = CaptureSink::default();
    assert!(asm.publish(&sink));
    let lists = sink.lists.lock().map(|l| l.clone()).unwrap_or_default();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].0, ListKind::Online);
    assert_eq!(
        lists[0].1.insets,
        Insets {
            header_px: 64,
            footer_px: 112,
        }
    );
}

#[test]
/// What: Query normalization folds case and whitespace; clearing twice is
/// a no-op.
///
/// - Input: Case/whitespace variants, blank strings, explicit clears
/// - Output: Only effective changes report true
fn query_normalization_reports_effective_changes() {
    let asm = online_assembler();
    assert!(!asm.set_query(None), "clearing an empty query changes nothing");
    assert!(asm.set_query(Some("Magisk")));
    assert!(!asm.set_query(Some("magisk")));
    assert!(!asm.set_query(Some("  MAGISK  ")));
    assert!(asm.set_query(Some("magisk hide")));
    assert!(asm.set_query(Some("")), "blank clears the active query");
    assert!(!asm.set_query(None));
}
