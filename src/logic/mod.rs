//! Core non-UI logic split into modular submodules.

pub mod assemble;
pub mod debounce;
pub mod notify;
pub mod progress;

// Re-export public APIs to keep import paths short (crate::logic::...)
pub use assemble::ListAssembler;
pub use debounce::RefreshDebouncer;
pub use notify::{NotificationSet, NotificationType};
pub use progress::{CHECK_WEIGHT, ProgressAggregator, SCALE, SYNC_WEIGHT_SPLIT, SourceHandle};
