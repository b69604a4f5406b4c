//! Streaming content hasher.
//!
//! # Overview
//! Files are read through a fixed-size buffer so memory use stays bounded
//! regardless of file size. The digest is rendered as lowercase hex, which
//! is also the form persisted in the index.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha1::Digest;

/// Read buffer size used for streaming file contents.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithm used for content hashes.
///
/// A database is bound to one algorithm when it is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (40 hex digits)
    #[default]
    Sha1,
    /// SHA-256 (64 hex digits)
    Sha256,
    /// BLAKE3 (64 hex digits)
    Blake3,
}

impl HashAlgorithm {
    /// Name as stored in the database metadata.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Length of the hex digest produced by this algorithm.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 | Self::Blake3 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("Unknown hash algorithm: '{other}'")),
        }
    }
}

/// Hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already hex-encoded digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

enum DigestState {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> ContentHash {
        let hex = match self {
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        };
        ContentHash(hex)
    }
}

/// Streaming file hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    algorithm: HashAlgorithm,
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher uses.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash the full contents of a file.
    ///
    /// Returns the digest and the number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> io::Result<(ContentHash, u64)> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }

    /// Hash everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Returns the first read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<(ContentHash, u64)> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..n]);
            total += n as u64;
        }

        Ok((state.finalize(), total))
    }

    /// Hash an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
        let mut state = DigestState::new(self.algorithm);
        state.update(data);
        state.finalize()
    }
}
