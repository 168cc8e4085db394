//! Streaming file checksums.
//!
//! Published dataset indexes record 32-digit MD5 digests, while indexes
//! generated locally default to SHA-256. Files are hashed through a fixed
//! buffer so multi-gigabyte audio never has to fit in memory.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read buffer size for hashing.
const CHUNK_SIZE: usize = 64 * 1024;

/// Digest algorithm used for a recorded checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    /// 128-bit MD5, 32 hex characters
    Md5,
    /// SHA-256, 64 hex characters
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    /// Length of the lowercase hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }

    /// Guess the algorithm that produced a recorded digest from its shape.
    ///
    /// Returns `None` when the string is not a hex digest of a known length.
    pub fn infer(checksum: &str) -> Option<Self> {
        if !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match checksum.len() {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Short lowercase name, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unknown checksum algorithm '{}'", other)),
        }
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the checksum of a file.
///
/// # Returns
///
/// Lowercase hex digest.
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened or read.
pub fn compute_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> std::io::Result<String> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(CHUNK_SIZE, file);
    match algorithm {
        ChecksumAlgorithm::Md5 => stream_digest::<Md5, _>(reader),
        ChecksumAlgorithm::Sha256 => stream_digest::<Sha256, _>(reader),
    }
}

/// Check a file against a recorded checksum.
///
/// The algorithm is inferred from the recorded value; a value of unknown
/// shape never matches. Comparison ignores hex letter case.
pub fn checksum_matches(path: &Path, expected: &str) -> std::io::Result<bool> {
    let Some(algorithm) = ChecksumAlgorithm::infer(expected) else {
        return Ok(false);
    };
    let actual = compute_checksum(path, algorithm)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

fn stream_digest<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(to_hex(&hasher.finalize()))
}

/// Lowercase hex encoding of a digest.
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_known_digests() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(
            compute_checksum(&path, ChecksumAlgorithm::Md5).unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            compute_checksum(&path, ChecksumAlgorithm::Sha256).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_infer_algorithm() {
        assert_eq!(
            ChecksumAlgorithm::infer("cf6fe52d64624f61ee116c752fb318ca"),
            Some(ChecksumAlgorithm::Md5)
        );
        assert_eq!(
            ChecksumAlgorithm::infer(&"a".repeat(64)),
            Some(ChecksumAlgorithm::Sha256)
        );
        assert_eq!(ChecksumAlgorithm::infer("abc123"), None);
        assert_eq!(ChecksumAlgorithm::infer(&"z".repeat(32)), None);
    }

    #[test]
    fn test_checksum_matches_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(checksum_matches(&path, "5D41402ABC4B2A76B9719D911017C592").unwrap());
        assert!(!checksum_matches(&path, "abc123").unwrap());
    }

    #[test]
    fn test_hex_encoding_keeps_leading_zeros() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
        assert_eq!(
            compute_checksum_of_empty(ChecksumAlgorithm::Md5),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    fn compute_checksum_of_empty(algorithm: ChecksumAlgorithm) -> String {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        compute_checksum(&path, algorithm).unwrap()
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = compute_checksum(Path::new("/nonexistent/file.wav"), ChecksumAlgorithm::Md5);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("MD5".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Md5));
        assert_eq!(
            "sha-256".parse::<ChecksumAlgorithm>(),
            Ok(ChecksumAlgorithm::Sha256)
        );
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
    }
}
