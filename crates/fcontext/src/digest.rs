//! Content digest over loaded specfiles
//!
//! When requested at open time, every successfully loaded rule and
//! substitution file is folded into one SHA-256 digest, in load order. A
//! relabeling run can compare the digest against a stored one to decide
//! whether anything it labeled from has changed.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Accumulates file contents while the handle loads.
#[derive(Debug, Default)]
pub(crate) struct DigestBuilder {
    hasher: Sha256,
    files: Vec<std::path::PathBuf>,
}

impl DigestBuilder {
    /// Fold one loaded file into the digest.
    pub(crate) fn add_specfile(&mut self, path: &Path, contents: &[u8]) {
        self.hasher.update(contents);
        self.files.push(path.to_path_buf());
    }

    /// Finalize into the digest value and the list of contributing files.
    pub(crate) fn finish(self) -> SpecfileDigest {
        SpecfileDigest {
            hash: self.hasher.finalize().to_vec(),
            files: self.files,
        }
    }
}

/// Finalized digest over all files a handle loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecfileDigest {
    hash: Vec<u8>,
    files: Vec<std::path::PathBuf>,
}

impl SpecfileDigest {
    /// The SHA-256 value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.hash
    }

    /// Paths folded into the digest, in load order.
    pub fn files(&self) -> &[std::path::PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_contents_same_digest() {
        let mut a = DigestBuilder::default();
        a.add_specfile(Path::new("one"), b"alpha");
        a.add_specfile(Path::new("two"), b"beta");

        let mut b = DigestBuilder::default();
        b.add_specfile(Path::new("one"), b"alpha");
        b.add_specfile(Path::new("two"), b"beta");

        assert_eq!(a.finish().as_bytes(), b.finish().as_bytes());
    }

    #[test]
    fn order_changes_digest() {
        let mut a = DigestBuilder::default();
        a.add_specfile(Path::new("one"), b"alpha");
        a.add_specfile(Path::new("two"), b"beta");

        let mut b = DigestBuilder::default();
        b.add_specfile(Path::new("two"), b"beta");
        b.add_specfile(Path::new("one"), b"alpha");

        assert_ne!(a.finish().as_bytes(), b.finish().as_bytes());
    }
}
