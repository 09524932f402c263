//! Fingerprint values and the two fingerprint function families.
//!
//! # Overview
//!
//! A [`Fingerprint`] is the string two items must share to be reported as
//! duplicates. Three namespaces exist and can never collide:
//!
//! - exact: lowercase hex digest, no prefix (never contains `-`)
//! - perceptual: `v-` followed by 64 hex characters
//! - synthetic: `err-` followed by 16 hex characters, handed to items whose
//!   content could not be fingerprinted so they stay unique
//!
//! [`FingerprintFunction`] is the closed set of functions behind one contract,
//! and [`FingerprintFamily::for_item`] picks the family for an item from the
//! active [`MatchMode`] and the item's declared content type.

use std::fmt;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hasher::{ExactAlgorithm, Hasher};
use super::perceptual::PerceptualHasher;
use super::ItemContent;

/// Prefix of perceptual fingerprints.
pub const PERCEPTUAL_PREFIX: &str = "v-";

/// Prefix of synthetic fingerprints given to unreadable items.
pub const SYNTHETIC_PREFIX: &str = "err-";

static SYNTHETIC_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content fingerprint used as the duplicate equivalence key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-rendered fingerprint string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a perceptual fingerprint from packed grid bits.
    #[must_use]
    pub fn perceptual(bits: &[u8]) -> Self {
        let mut value = String::with_capacity(PERCEPTUAL_PREFIX.len() + bits.len() * 2);
        value.push_str(PERCEPTUAL_PREFIX);
        for byte in bits {
            value.push_str(&format!("{byte:02x}"));
        }
        Self(value)
    }

    /// Mint a fingerprint that no other item in this process will ever share.
    #[must_use]
    pub fn synthetic() -> Self {
        let n = SYNTHETIC_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{SYNTHETIC_PREFIX}{n:016x}"))
    }

    /// The rendered string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this fingerprint came from the perceptual function.
    #[must_use]
    pub fn is_perceptual(&self) -> bool {
        self.0.starts_with(PERCEPTUAL_PREFIX)
    }

    /// Whether this fingerprint stands in for unreadable content.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors produced by a fingerprint function.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The content could not be read or decoded by the selected function.
    #[error("Unreadable content: {0}")]
    UnreadableContent(String),
}

/// Matching policy chosen by the caller for a whole scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Byte-for-byte equality via a cryptographic content hash.
    #[default]
    Exact,
    /// Visual similarity for images, exact hashing for everything else.
    Visual,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Visual => write!(f, "visual"),
        }
    }
}

/// Which function family fingerprints a given item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintFamily {
    /// Cryptographic content hash.
    Exact,
    /// Luminance grid hash.
    Perceptual,
}

impl FingerprintFamily {
    /// Select the family for an item.
    ///
    /// Perceptual hashing only applies in [`MatchMode::Visual`] and only to
    /// items whose declared type is an image; everything else is hashed exactly.
    #[must_use]
    pub fn for_item(mode: MatchMode, content_type: Option<&str>) -> Self {
        let is_image = content_type.is_some_and(|t| t.starts_with("image/"));
        match mode {
            MatchMode::Visual if is_image => Self::Perceptual,
            _ => Self::Exact,
        }
    }
}

impl fmt::Display for FingerprintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Perceptual => write!(f, "perceptual"),
        }
    }
}

/// A fingerprint function: one contract, two implementations.
#[derive(Debug, Clone)]
pub enum FingerprintFunction {
    /// Whole-content cryptographic hash.
    Exact(Hasher),
    /// 16x16 average-luminance hash, optionally falling back to an exact hash
    /// when the content does not decode as an image.
    Perceptual {
        hasher: PerceptualHasher,
        fallback: Option<Hasher>,
    },
}

impl FingerprintFunction {
    /// Build the function for a family.
    #[must_use]
    pub fn for_family(
        family: FingerprintFamily,
        algorithm: ExactAlgorithm,
        perceptual_fallback: bool,
    ) -> Self {
        match family {
            FingerprintFamily::Exact => Self::Exact(Hasher::new(algorithm)),
            FingerprintFamily::Perceptual => Self::Perceptual {
                hasher: PerceptualHasher::new(),
                fallback: perceptual_fallback.then(|| Hasher::new(algorithm)),
            },
        }
    }

    /// The family this function belongs to.
    #[must_use]
    pub fn family(&self) -> FingerprintFamily {
        match self {
            Self::Exact(_) => FingerprintFamily::Exact,
            Self::Perceptual { .. } => FingerprintFamily::Perceptual,
        }
    }

    /// Fingerprint an item's content.
    ///
    /// Exact hashing of a path streams the file. Perceptual hashing needs the
    /// whole image, so it loads the content first.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::UnreadableContent`] when the content cannot
    /// be read or decoded.
    pub fn fingerprint_content(
        &self,
        content: &ItemContent,
    ) -> Result<Fingerprint, FingerprintError> {
        match (self, content) {
            (Self::Exact(hasher), ItemContent::Path(path)) => File::open(path)
                .and_then(|file| hasher.fingerprint_reader(file))
                .map_err(|e| {
                    FingerprintError::UnreadableContent(format!("{}: {}", path.display(), e))
                }),
            _ => content.load().and_then(|bytes| self.compute(&bytes)),
        }
    }

    /// Fingerprint raw content.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::UnreadableContent`] when the perceptual
    /// function cannot decode the bytes and no fallback is configured.
    pub fn compute(&self, bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
        match self {
            Self::Exact(hasher) => Ok(hasher.fingerprint(bytes)),
            Self::Perceptual { hasher, fallback } => match hasher.fingerprint(bytes) {
                Ok(fp) => Ok(fp),
                Err(e) => match fallback {
                    Some(exact) => {
                        log::debug!("Perceptual hash failed ({}), using exact hash", e);
                        Ok(exact.fingerprint(bytes))
                    }
                    None => Err(e),
                },
            },
        }
    }
}
