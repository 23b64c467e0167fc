//! Shared state types for the refresh core.
//!
//! Everything here is a plain value type: records, display rows, triggers,
//! and the ambient [`SystemState`] snapshot that notification predicates
//! read. Mutable run-scoped state lives in `crate::refresh`, not here.

pub mod types;

pub use types::{
    DisplayList, DisplayRow, Insets, ListKind, ModuleOrigin, ModuleRecord, RefreshOutcome,
    RefreshTrigger, SystemState, UpdateInfo,
};
