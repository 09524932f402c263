//! Actions on scan results.
//!
//! This module provides functionality for:
//! - Applying a selection as a removal against the group structure
//! - Deferred removals that are committed exactly once
//!
//! Removal only updates the in-memory model; files on disk are left alone.
//!
//! ```
//! use dupelens::actions::begin_removal;
//! use dupelens::duplicates::ScanResult;
//! use dupelens::selection::Selection;
//! use std::time::Duration;
//!
//! let pending = begin_removal(&ScanResult::default(), Selection::new());
//! let outcome = pending.commit_after(Duration::ZERO);
//! assert!(outcome.selection.is_empty());
//! ```

pub mod removal;

pub use removal::{begin_removal, reconcile, PendingRemoval, ReconcileOutcome};
