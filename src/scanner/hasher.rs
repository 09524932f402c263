//! Exact content hashing.
//!
//! # Overview
//!
//! The [`Hasher`] computes a 256-bit cryptographic digest over the complete
//! byte stream and renders it as lowercase hex. SHA-256 is the default;
//! BLAKE3 is available for large inputs where throughput matters.
//! Files are hashed from a buffered reader so they never sit in memory whole.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::fingerprint::Fingerprint;

/// Digest used by the exact fingerprint function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExactAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

impl std::fmt::Display for ExactAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Exact content hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    algorithm: ExactAlgorithm,
}

impl Hasher {
    /// Create a hasher for the given digest.
    #[must_use]
    pub fn new(algorithm: ExactAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Hash the whole content into a fingerprint.
    #[must_use]
    pub fn fingerprint(&self, bytes: &[u8]) -> Fingerprint {
        let hex = match self.algorithm {
            ExactAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            ExactAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        };
        Fingerprint::new(hex)
    }

    /// Hash everything `reader` yields, one buffer at a time.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn fingerprint_reader<R: Read>(&self, mut reader: R) -> io::Result<Fingerprint> {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let hex = match self.algorithm {
            ExactAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                format!("{:x}", hasher.finalize())
            }
            ExactAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = reader.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                hasher.finalize().to_hex().to_string()
            }
        };
        Ok(Fingerprint::new(hex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let fp = Hasher::new(ExactAlgorithm::Sha256).fingerprint(b"abc");
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_content_hash() {
        let fp = Hasher::new(ExactAlgorithm::Sha256).fingerprint(b"");
        assert_eq!(
            fp.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_blake3_length_and_determinism() {
        let hasher = Hasher::new(ExactAlgorithm::Blake3);
        let a = hasher.fingerprint(b"same bytes");
        let b = hasher.fingerprint(b"same bytes");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(!a.as_str().contains('-'));
    }

    #[test]
    fn test_reader_matches_in_memory_hash() {
        // Larger than one read buffer
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        for algorithm in [ExactAlgorithm::Sha256, ExactAlgorithm::Blake3] {
            let hasher = Hasher::new(algorithm);
            let streamed = hasher.fingerprint_reader(content.as_slice()).unwrap();
            assert_eq!(streamed, hasher.fingerprint(&content));
        }
    }

    #[test]
    fn test_different_content_differs() {
        let hasher = Hasher::default();
        assert_ne!(hasher.fingerprint(b"one"), hasher.fingerprint(b"two"));
    }
}
