//! Duplicate grouping and wasted-space accounting.
//!
//! # Overview
//!
//! [`build_scan_result`] turns the fingerprinted item list into a
//! [`ScanResult`]:
//!
//! 1. Partition items by fingerprint, keeping arrival order inside each
//!    partition.
//! 2. Keep partitions with two or more members as [`DuplicateGroup`]s. The
//!    first member is the designated original.
//! 3. A group's wasted size is the sum of sizes of every member after the
//!    original.
//! 4. Totals cover every item, unique or not; the unique count is the number of
//!    distinct fingerprints.
//! 5. Groups are ordered by wasted size, largest first. Ties keep the order in
//!    which their fingerprints were first seen.
//!
//! # Example
//!
//! ```
//! use dupelens::duplicates::build_scan_result;
//! use dupelens::scanner::{Fingerprint, Item, ItemId};
//! use chrono::Utc;
//!
//! let item = |id, fp: &str, size| Item {
//!     id: ItemId(id),
//!     name: format!("file{id}"),
//!     relative_path: format!("file{id}"),
//!     size,
//!     content_type: None,
//!     modified: Utc::now(),
//!     fingerprint: Fingerprint::new(fp),
//! };
//!
//! let result = build_scan_result(vec![item(0, "h1", 100), item(1, "h1", 100), item(2, "h2", 50)]);
//!
//! assert_eq!(result.groups.len(), 1);
//! assert_eq!(result.wasted_space, 100);
//! assert_eq!(result.unique_count, 2);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scanner::{Fingerprint, Item, ItemId};

/// Items sharing one fingerprint.
///
/// Visible groups always hold at least two members. Member order is fixed at
/// creation and never re-sorted; member 0 is the designated original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Members in arrival order
    pub members: Vec<Item>,
    /// Sum of sizes of members after the original
    pub wasted_size: u64,
}

impl DuplicateGroup {
    /// Build a group from members in arrival order.
    ///
    /// Returns `None` when fewer than two members remain, since such a group
    /// must never be emitted.
    #[must_use]
    pub fn from_members(fingerprint: Fingerprint, members: Vec<Item>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        let wasted_size = wasted_size_of(&members);
        Some(Self {
            fingerprint,
            members,
            wasted_size,
        })
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a group built through [`DuplicateGroup::from_members`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The designated original.
    #[must_use]
    pub fn original(&self) -> Option<&Item> {
        self.members.first()
    }

    /// Every member after the original.
    #[must_use]
    pub fn duplicates(&self) -> &[Item] {
        self.members.get(1..).unwrap_or_default()
    }

    /// Ids of every member after the original.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<ItemId> {
        self.duplicates().iter().map(|item| item.id).collect()
    }

    /// Total size of all members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|item| item.size).sum()
    }

    /// Whether an item belongs to this group.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.members.iter().any(|item| item.id == id)
    }
}

/// Wasted size of an ordered member list: everything after index 0.
#[must_use]
pub fn wasted_size_of(members: &[Item]) -> u64 {
    members.iter().skip(1).map(|item| item.size).sum()
}

/// Outcome of one completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Number of items scanned
    pub total_files: usize,
    /// Total size of all items scanned, in bytes
    pub total_size: u64,
    /// Duplicate groups, largest wasted size first
    pub groups: Vec<DuplicateGroup>,
    /// Sum of group wasted sizes
    pub wasted_space: u64,
    /// Number of distinct fingerprints observed
    pub unique_count: usize,
}

impl ScanResult {
    /// Number of duplicate groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of non-original members across all groups.
    #[must_use]
    pub fn duplicate_file_count(&self) -> usize {
        self.groups.iter().map(|g| g.len().saturating_sub(1)).sum()
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Look up a group by fingerprint.
    #[must_use]
    pub fn group(&self, fingerprint: &Fingerprint) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| &g.fingerprint == fingerprint)
    }
}

/// Group fingerprinted items into a [`ScanResult`].
///
/// Pure and total: an empty input yields a zeroed result.
#[must_use]
pub fn build_scan_result(items: Vec<Item>) -> ScanResult {
    let total_files = items.len();
    let total_size = items.iter().map(|item| item.size).sum();

    // Partitions in first-seen order; the map only indexes into them.
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();
    let mut partitions: Vec<(Fingerprint, Vec<Item>)> = Vec::new();
    for item in items {
        match index.get(&item.fingerprint) {
            Some(&slot) => partitions[slot].1.push(item),
            None => {
                index.insert(item.fingerprint.clone(), partitions.len());
                partitions.push((item.fingerprint.clone(), vec![item]));
            }
        }
    }
    let unique_count = partitions.len();

    let mut groups: Vec<DuplicateGroup> = partitions
        .into_iter()
        .filter_map(|(fingerprint, members)| {
            log::trace!("Fingerprint {} has {} member(s)", fingerprint, members.len());
            DuplicateGroup::from_members(fingerprint, members)
        })
        .collect();

    // Stable: ties stay in first-seen order.
    groups.sort_by(|a, b| b.wasted_size.cmp(&a.wasted_size));

    let wasted_space = groups.iter().map(|g| g.wasted_size).sum();

    log::info!(
        "Grouping complete: {} items, {} duplicate group(s), {} byte(s) wasted",
        total_files,
        groups.len(),
        wasted_space
    );

    ScanResult {
        total_files,
        total_size,
        groups,
        wasted_space,
        unique_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn make_item(id: u64, fp: &str, size: u64) -> Item {
        Item {
            id: ItemId(id),
            name: format!("file{id}.bin"),
            relative_path: format!("dir/file{id}.bin"),
            size,
            content_type: None,
            modified: at(id as i64),
            fingerprint: Fingerprint::new(fp),
        }
    }

    #[test]
    fn test_empty_input() {
        let result = build_scan_result(Vec::new());
        assert_eq!(result, ScanResult::default());
        assert!(!result.has_duplicates());
    }

    #[test]
    fn test_basic_scenario() {
        let result = build_scan_result(vec![
            make_item(0, "h1", 100),
            make_item(1, "h1", 100),
            make_item(2, "h2", 50),
        ]);

        assert_eq!(result.total_files, 3);
        assert_eq!(result.total_size, 250);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].fingerprint.as_str(), "h1");
        assert_eq!(result.groups[0].wasted_size, 100);
        assert_eq!(result.wasted_space, 100);
        assert_eq!(result.unique_count, 2);
    }

    #[test]
    fn test_original_is_first_arrival() {
        let result = build_scan_result(vec![
            make_item(0, "x", 10),
            make_item(1, "h", 30),
            make_item(2, "h", 20),
            make_item(3, "h", 10),
        ]);

        let group = &result.groups[0];
        assert_eq!(group.original().unwrap().id, ItemId(1));
        assert_eq!(group.duplicate_ids(), vec![ItemId(2), ItemId(3)]);
        // Original's size is excluded even though members differ in size
        assert_eq!(group.wasted_size, 30);
    }

    #[test]
    fn test_groups_sorted_by_wasted_size_with_stable_ties() {
        let result = build_scan_result(vec![
            make_item(0, "small", 10),
            make_item(1, "tie_a", 50),
            make_item(2, "big", 500),
            make_item(3, "small", 10),
            make_item(4, "tie_b", 50),
            make_item(5, "big", 500),
            make_item(6, "tie_a", 50),
            make_item(7, "tie_b", 50),
        ]);

        let order: Vec<&str> = result.groups.iter().map(|g| g.fingerprint.as_str()).collect();
        assert_eq!(order, vec!["big", "tie_a", "tie_b", "small"]);
        assert_eq!(result.wasted_space, 500 + 50 + 50 + 10);
    }

    #[test]
    fn test_unique_count_counts_groups_once() {
        let result = build_scan_result(vec![
            make_item(0, "a", 1),
            make_item(1, "a", 1),
            make_item(2, "a", 1),
            make_item(3, "b", 1),
            make_item(4, "c", 1),
        ]);
        assert_eq!(result.unique_count, 3);
        assert_eq!(result.duplicate_file_count(), 2);
    }

    #[test]
    fn test_synthetic_fingerprints_never_group() {
        let items: Vec<Item> = (0..3)
            .map(|i| {
                let mut item = make_item(i, "", 10);
                item.fingerprint = Fingerprint::synthetic();
                item
            })
            .collect();
        let result = build_scan_result(items);
        assert!(result.groups.is_empty());
        assert_eq!(result.unique_count, 3);
        assert_eq!(result.total_size, 30);
    }

    #[test]
    fn test_from_members_rejects_singletons() {
        assert!(DuplicateGroup::from_members(Fingerprint::new("a"), vec![]).is_none());
        assert!(
            DuplicateGroup::from_members(Fingerprint::new("a"), vec![make_item(0, "a", 1)])
                .is_none()
        );
    }

    #[test]
    fn test_group_lookup() {
        let result = build_scan_result(vec![make_item(0, "a", 1), make_item(1, "a", 1)]);
        assert!(result.group(&Fingerprint::new("a")).is_some());
        assert!(result.group(&Fingerprint::new("b")).is_none());
        assert!(result.groups[0].contains(ItemId(1)));
        assert!(!result.groups[0].contains(ItemId(9)));
    }
}
