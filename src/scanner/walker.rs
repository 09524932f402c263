//! Directory walker that turns a set of paths into raw scan items.
//!
//! # Overview
//!
//! The engine consumes [`RawItem`]s and never touches the filesystem itself
//! except to read item content lazily. This walker is the file-selection
//! surface used by the CLI: it expands the given roots into regular files,
//! applies the hidden/size filters, and declares a content type from the
//! file extension so that visual matching knows which items are images.
//!
//! # Example
//!
//! ```no_run
//! use dupelens::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from("Pictures")], WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(item) => println!("{}: {} bytes", item.relative_path, item.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use super::{ItemContent, RawItem};

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,
    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,
}

/// Errors that can occur during directory walking.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Directory traversal failed for a path.
    #[error("Walk error for {path}: {message}")]
    Walk {
        /// Path where the error occurred
        path: PathBuf,
        /// Error description from the walker
        message: String,
    },
}

/// Walks one or more roots and yields raw items.
#[derive(Debug)]
pub struct Walker {
    roots: Vec<PathBuf>,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a walker over the given roots.
    ///
    /// Repeated roots and roots nested inside another root are dropped, so
    /// every file is yielded at most once.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            roots: distinct_roots(roots),
            config,
            shutdown_flag: None,
        }
    }

    /// Stop yielding items once the flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        self.config.min_size.map_or(true, |min| size >= min)
            && self.config.max_size.map_or(true, |max| size <= max)
    }

    /// Walk every root in order, yielding items or per-entry errors.
    pub fn walk(&self) -> impl Iterator<Item = Result<RawItem, ScanError>> + '_ {
        self.roots.iter().flat_map(move |root| self.walk_root(root))
    }

    fn walk_root<'a>(
        &'a self,
        root: &'a Path,
    ) -> Box<dyn Iterator<Item = Result<RawItem, ScanError>> + 'a> {
        if !root.exists() {
            return Box::new(std::iter::once(Err(ScanError::NotFound(root.to_path_buf()))));
        }

        // Relative paths keep the root's own name, e.g. `Photos/2023/a.png`.
        let base = root.parent().map(Path::to_path_buf).unwrap_or_default();
        let skip_hidden = self.config.skip_hidden;

        let iter = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !(skip_hidden && e.depth() > 0 && is_hidden(e)))
            .take_while(move |_| !self.is_shutdown_requested())
            .filter_map(move |entry| match entry {
                Ok(entry) => self.to_raw_item(&entry, &base).map(Ok),
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    log::warn!("Failed to walk {}: {}", path.display(), e);
                    Some(Err(ScanError::Walk {
                        path,
                        message: e.to_string(),
                    }))
                }
            });

        Box::new(iter)
    }

    fn to_raw_item(&self, entry: &DirEntry, base: &Path) -> Option<RawItem> {
        if !entry.file_type().is_file() {
            return None;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Failed to read metadata for {}: {}", entry.path().display(), e);
                return None;
            }
        };
        let size = metadata.len();
        if !self.passes_size_filter(size) {
            log::trace!("Size filter skipped {}", entry.path().display());
            return None;
        }

        let path = entry.path();
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);
        let relative = path.strip_prefix(base).unwrap_or(path);

        Some(RawItem {
            name: entry.file_name().to_string_lossy().into_owned(),
            relative_path: relative.to_string_lossy().replace('\\', "/"),
            size,
            content_type: content_type_for(path),
            modified,
            content: ItemContent::Path(path.to_path_buf()),
        })
    }
}

/// Drop roots that repeat or sit inside another root.
///
/// Comparison uses canonical paths; a root that cannot be canonicalized is
/// compared as given and kept so that walking it reports the failure.
fn distinct_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let canonical: Vec<PathBuf> = roots
        .iter()
        .map(|root| root.canonicalize().unwrap_or_else(|_| root.clone()))
        .collect();

    roots
        .into_iter()
        .enumerate()
        .filter(|(i, root)| {
            let this = &canonical[*i];
            let covered = canonical.iter().enumerate().any(|(j, other)| {
                (j < *i && other == this) || (other != this && this.starts_with(other))
            });
            if covered {
                log::debug!("Skipping root {} covered by another root", root.display());
            }
            !covered
        })
        .map(|(_, root)| root)
        .collect()
}

/// Declared content type for a path, inferred from its extension.
///
/// Only image types this build can decode are recognized; everything else is
/// left undeclared and will be hashed exactly.
#[must_use]
pub fn content_type_for(path: &Path) -> Option<String> {
    image::ImageFormat::from_path(path)
        .ok()
        .filter(|format| format.reading_enabled())
        .map(|format| format.to_mime_type().to_string())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
