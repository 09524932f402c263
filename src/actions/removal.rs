//! Removal reconciliation against the in-memory group structure.
//!
//! # Overview
//!
//! [`reconcile`] applies a selection as a removal transaction and returns a new
//! [`ScanResult`]; the input is never modified, so callers can diff before and
//! after. Nothing is deleted from disk.
//!
//! Per group, members split into removed (selected) and remaining, both in
//! their original order:
//!
//! - fewer than two remaining: the group dissolves, even when the removed
//!   member was the original
//! - otherwise a new group is emitted whose original is `remaining[0]` and
//!   whose wasted size is recomputed
//!
//! [`begin_removal`] snapshots a result and selection for a deferred commit.
//! [`PendingRemoval::commit`] consumes the snapshot, so the transaction can only
//! be applied once regardless of what the caller does during the delay.
//!
//! # Example
//!
//! ```
//! use dupelens::actions::reconcile;
//! use dupelens::duplicates::ScanResult;
//! use dupelens::selection::Selection;
//!
//! let result = ScanResult::default();
//! let outcome = reconcile(&result, &Selection::new());
//! assert_eq!(outcome.result, result);
//! assert_eq!(outcome.recovered_size, 0);
//! ```

use std::thread;
use std::time::Duration;

use crate::duplicates::{DuplicateGroup, ScanResult};
use crate::scanner::Item;
use crate::selection::Selection;

/// Result of applying a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Result after removal
    pub result: ScanResult,
    /// Removed members, in group order then member order
    pub removed: Vec<Item>,
    /// Sum of sizes of removed members
    pub recovered_size: u64,
    /// Selection after removal; always empty
    pub selection: Selection,
}

impl ReconcileOutcome {
    /// Number of removed members.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Apply `selection` to `result` as a removal.
///
/// Selected ids that are not members of any group are ignored. Totals and the
/// unique count describe the scanned set and are carried over unchanged.
#[must_use]
pub fn reconcile(result: &ScanResult, selection: &Selection) -> ReconcileOutcome {
    let mut removed = Vec::new();
    let mut groups = Vec::with_capacity(result.groups.len());
    let mut dissolved = 0usize;

    for group in &result.groups {
        let (gone, remaining): (Vec<Item>, Vec<Item>) = group
            .members
            .iter()
            .cloned()
            .partition(|item| selection.contains(item.id));

        if gone.is_empty() {
            groups.push(group.clone());
            continue;
        }
        removed.extend(gone);

        match DuplicateGroup::from_members(group.fingerprint.clone(), remaining) {
            Some(rebuilt) => groups.push(rebuilt),
            None => {
                dissolved += 1;
                log::debug!("Group {} dissolved", group.fingerprint);
            }
        }
    }

    let recovered_size: u64 = removed.iter().map(|item| item.size).sum();
    let wasted_space: u64 = groups.iter().map(|g| g.wasted_size).sum();

    // Equal whenever members of a group share one size, as exact matches do.
    let expected = result.wasted_space.saturating_sub(recovered_size);
    if wasted_space != expected {
        log::debug!(
            "Wasted space {} differs from {} after removal; group sizes are uneven",
            wasted_space,
            expected
        );
    }

    if !removed.is_empty() {
        log::info!(
            "Removed {} item(s), recovered {} byte(s), {} group(s) dissolved",
            removed.len(),
            recovered_size,
            dissolved
        );
    }

    ReconcileOutcome {
        result: ScanResult {
            total_files: result.total_files,
            total_size: result.total_size,
            groups,
            wasted_space,
            unique_count: result.unique_count,
        },
        removed,
        recovered_size,
        selection: Selection::new(),
    }
}

/// A removal that has been requested but not yet applied.
#[derive(Debug, Clone)]
#[must_use = "a pending removal does nothing until committed"]
pub struct PendingRemoval {
    result: ScanResult,
    selection: Selection,
}

/// Snapshot `result` and `selection` for a deferred removal.
pub fn begin_removal(result: &ScanResult, selection: Selection) -> PendingRemoval {
    log::debug!("Removal of {} item(s) pending", selection.len());
    PendingRemoval {
        result: result.clone(),
        selection,
    }
}

impl PendingRemoval {
    /// The result as it was when the removal began.
    #[must_use]
    pub fn result(&self) -> &ScanResult {
        &self.result
    }

    /// The selection that will be removed.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Apply the removal now.
    #[must_use]
    pub fn commit(self) -> ReconcileOutcome {
        reconcile(&self.result, &self.selection)
    }

    /// Wait for `delay`, then apply the removal.
    #[must_use]
    pub fn commit_after(self, delay: Duration) -> ReconcileOutcome {
        if !delay.is_zero() {
            log::debug!("Applying removal in {:?}", delay);
            thread::sleep(delay);
        }
        self.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::build_scan_result;
    use crate::scanner::{Fingerprint, ItemId};
    use chrono::{DateTime, Utc};
    use std::time::Instant;

    fn item(id: u64, fp: &str, size: u64) -> Item {
        Item {
            id: ItemId(id),
            name: format!("f{id}"),
            relative_path: format!("f{id}"),
            size,
            content_type: None,
            modified: DateTime::<Utc>::from_timestamp_millis(id as i64).unwrap(),
            fingerprint: Fingerprint::new(fp),
        }
    }

    fn sample() -> ScanResult {
        build_scan_result(vec![
            item(0, "a", 100),
            item(1, "a", 100),
            item(2, "a", 100),
            item(3, "b", 40),
            item(4, "b", 40),
            item(5, "u", 7),
        ])
    }

    fn select(ids: &[u64]) -> Selection {
        ids.iter().map(|id| ItemId(*id)).collect()
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let result = sample();
        let outcome = reconcile(&result, &Selection::new());
        assert_eq!(outcome.result, result);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.recovered_size, 0);
    }

    #[test]
    fn test_two_member_group_dissolves() {
        let result = sample();
        let outcome = reconcile(&result, &select(&[4]));

        assert!(outcome.result.group(&Fingerprint::new("b")).is_none());
        assert!(outcome.result.group(&Fingerprint::new("a")).is_some());
        assert_eq!(outcome.recovered_size, 40);
        assert_eq!(outcome.result.wasted_space, result.wasted_space - 40);
    }

    #[test]
    fn test_removing_original_promotes_next_member() {
        let outcome = reconcile(&sample(), &select(&[0]));
        let group = outcome.result.group(&Fingerprint::new("a")).unwrap();

        assert_eq!(group.original().unwrap().id, ItemId(1));
        assert_eq!(group.len(), 2);
        assert_eq!(group.wasted_size, 100);
    }

    #[test]
    fn test_totals_carried_over_and_selection_cleared() {
        let result = sample();
        let outcome = reconcile(&result, &select(&[1, 2, 4]));

        assert_eq!(outcome.result.total_files, result.total_files);
        assert_eq!(outcome.result.total_size, result.total_size);
        assert_eq!(outcome.result.unique_count, result.unique_count);
        assert!(outcome.result.groups.is_empty());
        assert_eq!(outcome.result.wasted_space, 0);
        assert!(outcome.selection.is_empty());
        assert_eq!(outcome.removed_count(), 3);
    }

    #[test]
    fn test_ids_outside_groups_are_ignored() {
        let outcome = reconcile(&sample(), &select(&[5, 999]));
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.result, sample());
    }

    #[test]
    fn test_input_is_not_modified() {
        let result = sample();
        let before = result.clone();
        let _ = reconcile(&result, &select(&[0, 1, 3]));
        assert_eq!(result, before);
    }

    #[test]
    fn test_pending_removal_snapshot() {
        let result = sample();
        let pending = begin_removal(&result, select(&[1]));
        assert_eq!(pending.selection().len(), 1);
        assert_eq!(pending.result(), &result);

        let outcome = pending.commit();
        assert_eq!(outcome.recovered_size, 100);
        assert_eq!(outcome.result.group(&Fingerprint::new("a")).unwrap().len(), 2);
    }

    #[test]
    fn test_commit_after_waits() {
        let pending = begin_removal(&sample(), select(&[4]));
        let start = Instant::now();
        let outcome = pending.commit_after(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(outcome.recovered_size, 40);
    }
}
