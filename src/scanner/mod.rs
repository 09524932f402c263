//! Scanner module: scanned items and content fingerprinting.
//!
//! This module provides functionality for:
//! - Describing raw input items ([`RawItem`]) and scanned items ([`Item`])
//! - Exact content hashing with SHA-256 or BLAKE3
//! - Perceptual (average-luminance) hashing for images
//! - Collecting items from directories for the CLI
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`fingerprint`]: the fingerprint value and function families
//! - [`hasher`]: exact content hashing
//! - [`perceptual`]: 16x16 luminance grid hashing
//! - [`walker`]: directory traversal into [`RawItem`]s
//!
//! # Example
//!
//! ```
//! use dupelens::scanner::{RawItem, ItemContent};
//! use chrono::Utc;
//!
//! let item = RawItem::from_bytes("notes.txt", b"hello".to_vec(), Utc::now());
//! assert_eq!(item.size, 5);
//! assert!(matches!(item.content, ItemContent::Bytes(_)));
//! ```

pub mod fingerprint;
pub mod hasher;
pub mod perceptual;
pub mod walker;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export main types
pub use fingerprint::{
    Fingerprint, FingerprintError, FingerprintFamily, FingerprintFunction, MatchMode,
};
pub use hasher::{ExactAlgorithm, Hasher};
pub use perceptual::PerceptualHasher;
pub use walker::{Walker, WalkerConfig};

/// Where a raw item's bytes come from.
#[derive(Debug, Clone)]
pub enum ItemContent {
    /// Content already held in memory.
    Bytes(Arc<[u8]>),
    /// Content read from disk by the worker that fingerprints it.
    Path(PathBuf),
}

impl ItemContent {
    /// Load the complete content.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::UnreadableContent`] when a path cannot be read.
    pub fn load(&self) -> Result<Arc<[u8]>, FingerprintError> {
        match self {
            Self::Bytes(bytes) => Ok(Arc::clone(bytes)),
            Self::Path(path) => std::fs::read(path).map(Arc::from).map_err(|e| {
                FingerprintError::UnreadableContent(format!("{}: {}", path.display(), e))
            }),
        }
    }
}

/// One raw file-like entity handed to the engine for scanning.
#[derive(Debug, Clone)]
pub struct RawItem {
    /// Display name (usually the file name)
    pub name: String,
    /// Path relative to the selection root
    pub relative_path: String,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type, if any
    pub content_type: Option<String>,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// The bytes to fingerprint
    pub content: ItemContent,
}

impl RawItem {
    /// Create an in-memory item whose relative path is its name.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, modified: DateTime<Utc>) -> Self {
        let name = name.into();
        Self {
            relative_path: name.clone(),
            name,
            size: bytes.len() as u64,
            content_type: None,
            modified,
            content: ItemContent::Bytes(Arc::from(bytes)),
        }
    }

    /// Set the declared content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the relative path.
    #[must_use]
    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = path.into();
        self
    }
}

/// Opaque identifier of a scanned item, unique within one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scanned item with its assigned fingerprint.
///
/// Immutable once ingestion finishes; later stages only move items between
/// groups or drop them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier assigned in arrival order
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Path relative to the selection root
    pub relative_path: String,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type, if any
    pub content_type: Option<String>,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Fingerprint assigned by the scan
    pub fingerprint: Fingerprint,
}

impl Item {
    /// Materialize a scanned item from its raw form.
    #[must_use]
    pub fn from_raw(id: ItemId, raw: &RawItem, fingerprint: Fingerprint) -> Self {
        Self {
            id,
            name: raw.name.clone(),
            relative_path: raw.relative_path.clone(),
            size: raw.size,
            content_type: raw.content_type.clone(),
            modified: raw.modified,
            fingerprint,
        }
    }
}
