//! Selection engine: which duplicate members are marked for removal.
//!
//! A [`Selection`] is a set of [`ItemId`]s scoped to one scan result. Two
//! families of operations produce new selections and never mutate their input:
//!
//! - Manual toggles ([`toggle_item`], [`toggle_group`]) touch only the named
//!   item or group and leave the rest of the selection alone.
//! - [`smart_select`] recomputes the whole selection from a [`SmartPolicy`]
//!   applied to every group independently. The previous selection is
//!   discarded, not merged.
//!
//! # Example
//!
//! ```
//! use dupelens::selection::{smart_select, SmartPolicy};
//! use dupelens::duplicates::DuplicateGroup;
//!
//! let groups: Vec<DuplicateGroup> = Vec::new();
//! let selection = smart_select(&groups, &SmartPolicy::Newest).unwrap();
//! assert!(selection.is_empty());
//! ```

use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::scanner::{Fingerprint, Item, ItemId};

/// Errors from selection operations.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The smart-select pattern is not a valid regular expression.
    #[error("invalid selection pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as supplied
        pattern: String,
        /// Compilation error
        #[source]
        source: regex::Error,
    },
}

/// Set of item ids marked for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<ItemId>);

impl Selection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    /// Number of selected items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ItemId> for Selection {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<ItemId> for Selection {
    fn extend<I: IntoIterator<Item = ItemId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Smart-select policy applied to every group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "policy", content = "pattern")]
pub enum SmartPolicy {
    /// Keep the oldest member, select the newer copies.
    Newest,
    /// Keep the newest member, select the older copies.
    Oldest,
    /// Select members whose name matches a case-insensitive regex, never a
    /// whole group.
    Pattern(String),
}

impl SmartPolicy {
    /// Check the policy before any scanning happens.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InvalidPattern`] for a pattern that does not
    /// compile.
    pub fn validate(&self) -> Result<(), SelectionError> {
        match self {
            Self::Pattern(pattern) => compile_pattern(pattern).map(|_| ()),
            Self::Newest | Self::Oldest => Ok(()),
        }
    }
}

impl fmt::Display for SmartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newest => write!(f, "newest"),
            Self::Oldest => write!(f, "oldest"),
            Self::Pattern(pattern) => write!(f, "pattern '{pattern}'"),
        }
    }
}

/// Add `id` if absent, remove it if present.
#[must_use]
pub fn toggle_item(selection: &Selection, id: ItemId) -> Selection {
    let mut next = selection.clone();
    if !next.0.remove(&id) {
        next.0.insert(id);
    }
    next
}

/// Toggle every non-original member of one group as a unit.
///
/// If all of them are selected they are all deselected; otherwise they are all
/// selected. An unknown fingerprint leaves the selection unchanged.
#[must_use]
pub fn toggle_group(
    selection: &Selection,
    groups: &[DuplicateGroup],
    fingerprint: &Fingerprint,
) -> Selection {
    let Some(group) = groups.iter().find(|g| &g.fingerprint == fingerprint) else {
        log::debug!("Toggle ignored, no group for {}", fingerprint);
        return selection.clone();
    };

    let ids = group.duplicate_ids();
    let mut next = selection.clone();
    if ids.iter().all(|id| selection.contains(*id)) {
        for id in &ids {
            next.0.remove(id);
        }
        log::debug!("Deselected {} duplicate(s) in group {}", ids.len(), fingerprint);
    } else {
        next.extend(ids.iter().copied());
        log::debug!("Selected {} duplicate(s) in group {}", ids.len(), fingerprint);
    }
    next
}

/// Recompute the entire selection from `policy`.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidPattern`] for a pattern that does not
/// compile. Nothing is selected in that case and the caller keeps its current
/// selection.
pub fn smart_select(
    groups: &[DuplicateGroup],
    policy: &SmartPolicy,
) -> Result<Selection, SelectionError> {
    let selection: Selection = match policy {
        SmartPolicy::Newest => groups
            .iter()
            .flat_map(|g| {
                let keeper = oldest_member(&g.members);
                g.members
                    .iter()
                    .filter(move |item| Some(item.id) != keeper)
                    .map(|item| item.id)
            })
            .collect(),
        SmartPolicy::Oldest => groups
            .iter()
            .flat_map(|g| {
                let keeper = newest_member(&g.members);
                g.members
                    .iter()
                    .filter(move |item| Some(item.id) != keeper)
                    .map(|item| item.id)
            })
            .collect(),
        SmartPolicy::Pattern(pattern) => select_by_pattern(groups, pattern)?,
    };

    log::info!(
        "Smart select ({}) marked {} item(s) across {} group(s)",
        policy,
        selection.len(),
        groups.len()
    );
    Ok(selection)
}

/// Total size of the selected members of `groups`.
#[must_use]
pub fn selected_size(groups: &[DuplicateGroup], selection: &Selection) -> u64 {
    groups
        .iter()
        .flat_map(|g| g.members.iter())
        .filter(|item| selection.contains(item.id))
        .map(|item| item.size)
        .sum()
}

// Earliest modified; the first arrival wins ties.
fn oldest_member(members: &[Item]) -> Option<ItemId> {
    members
        .iter()
        .reduce(|keep, item| if item.modified < keep.modified { item } else { keep })
        .map(|item| item.id)
}

// Latest modified; the last arrival wins ties.
fn newest_member(members: &[Item]) -> Option<ItemId> {
    members
        .iter()
        .reduce(|keep, item| if item.modified >= keep.modified { item } else { keep })
        .map(|item| item.id)
}

fn select_by_pattern(groups: &[DuplicateGroup], pattern: &str) -> Result<Selection, SelectionError> {
    if pattern.is_empty() {
        return Ok(Selection::new());
    }

    let regex = compile_pattern(pattern)?;

    let mut selection = Selection::new();
    for group in groups {
        let mut matched: Vec<ItemId> = group
            .members
            .iter()
            .filter(|item| regex.is_match(&item.name))
            .map(|item| item.id)
            .collect();
        // A group must always keep one survivor.
        if matched.len() == group.members.len() {
            matched.pop();
        }
        selection.extend(matched);
    }
    Ok(selection)
}

fn compile_pattern(pattern: &str) -> Result<Regex, SelectionError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| SelectionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
