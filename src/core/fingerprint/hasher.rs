//! Streaming content hashes.

use crate::error::{ConfigError, HashError};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Files are read in chunks of this size so memory stays flat
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Available content-hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithmKind {
    /// SHA-256, the default
    #[default]
    Sha256,
    /// MD5 - faster, fine for deduplication of your own files
    Md5,
    /// SHA-1
    Sha1,
}

impl HashAlgorithmKind {
    pub const VALID_VALUES: &'static str = "sha256, md5, sha1";

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Sha256 => "sha256",
            HashAlgorithmKind::Md5 => "md5",
            HashAlgorithmKind::Sha1 => "sha1",
        }
    }

    /// Length of the hex digest this algorithm produces
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithmKind::Sha256 => 64,
            HashAlgorithmKind::Md5 => 32,
            HashAlgorithmKind::Sha1 => 40,
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithmKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithmKind::Sha256),
            "md5" => Ok(HashAlgorithmKind::Md5),
            "sha1" => Ok(HashAlgorithmKind::Sha1),
            _ => Err(ConfigError::InvalidChoice {
                field: "hash_algorithm",
                value: value.to_string(),
                expected: Self::VALID_VALUES,
            }),
        }
    }
}

/// Computes hex digests of file contents
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    algorithm: HashAlgorithmKind,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithmKind) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.algorithm
    }

    /// Hash a file's bytes, reading it in fixed-size chunks.
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let to_error = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(to_error)?;
        self.hash_reader(file).map_err(to_error)
    }

    /// Hash everything a reader yields.
    pub fn hash_reader(&self, reader: impl Read) -> io::Result<String> {
        match self.algorithm {
            HashAlgorithmKind::Sha256 => digest_reader::<Sha256>(reader),
            HashAlgorithmKind::Md5 => digest_reader::<Md5>(reader),
            HashAlgorithmKind::Sha1 => digest_reader::<Sha1>(reader),
        }
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => hasher.update(&buffer[..read]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{:02x}", byte);
    }
    Ok(hex)
}
