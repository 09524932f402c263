//! Perceptual image hashing for similarity detection.
//!
//! This module provides the [`PerceptualHasher`], an average-luminance hash:
//! the image is scaled to a fixed 16x16 grid, each cell is reduced to its
//! grayscale value, and one bit per cell records whether the cell is at least
//! as bright as the grid mean. Near-duplicates (re-encoded, resized, lightly
//! edited) usually collapse to the same value. That is the point of the hash,
//! so two items with equal perceptual fingerprints are not guaranteed to be
//! byte-identical.

use image::imageops::FilterType;

use super::fingerprint::{Fingerprint, FingerprintError};

/// Side length of the luminance grid.
pub const GRID_SIZE: u32 = 16;

/// Number of bytes needed to pack one bit per grid cell.
pub const HASH_BYTES: usize = (GRID_SIZE * GRID_SIZE / 8) as usize;

/// Computes average-luminance hashes for images.
#[derive(Debug, Clone, Copy)]
pub struct PerceptualHasher {
    filter: FilterType,
}

impl PerceptualHasher {
    /// Create a hasher with the default resampling filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    /// Compute the luminance grid bits for encoded image bytes.
    ///
    /// Bits are packed most-significant first, row by row.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::UnreadableContent`] if the bytes are not a
    /// decodable image in one of the enabled formats.
    pub fn grid_bits(&self, bytes: &[u8]) -> Result<[u8; HASH_BYTES], FingerprintError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FingerprintError::UnreadableContent(e.to_string()))?;
        let grid = img
            .resize_exact(GRID_SIZE, GRID_SIZE, self.filter)
            .to_rgba8();

        let luminance: Vec<f64> = grid
            .pixels()
            .map(|p| (f64::from(p[0]) + f64::from(p[1]) + f64::from(p[2])) / 3.0)
            .collect();
        let mean = luminance.iter().sum::<f64>() / luminance.len() as f64;

        let mut bits = [0u8; HASH_BYTES];
        for (i, value) in luminance.iter().enumerate() {
            if *value >= mean {
                bits[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Ok(bits)
    }

    /// Fingerprint encoded image bytes.
    ///
    /// # Errors
    ///
    /// See [`PerceptualHasher::grid_bits`].
    pub fn fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint, FingerprintError> {
        self.grid_bits(bytes).map(|bits| Fingerprint::perceptual(&bits))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}
