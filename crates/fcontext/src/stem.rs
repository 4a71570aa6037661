//! Stem table
//!
//! A stem is the leading path segment of a rule pattern (`/usr`, `/var`).
//! Keeping stems deduplicated in one table lets the lookup engine compare a
//! key's first segment against a rule by integer id instead of re-running
//! byte comparisons per rule.

use crate::mmap::Bytes;

/// Regex metacharacters that disqualify a leading segment from being a stem.
const META_CHARS: &[u8] = b".^$?*+|[({";

#[derive(Debug)]
pub(crate) struct Stem {
    bytes: Bytes,
}

impl Stem {
    pub(crate) fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

/// Deduplicated store of leading path segments.
#[derive(Debug, Default)]
pub(crate) struct StemTable {
    stems: Vec<Stem>,
}

impl StemTable {
    pub(crate) fn len(&self) -> usize {
        self.stems.len()
    }

    pub(crate) fn get(&self, id: usize) -> &[u8] {
        self.stems[id].as_slice()
    }

    fn find(&self, bytes: &[u8]) -> Option<usize> {
        self.stems.iter().position(|s| s.as_slice() == bytes)
    }

    /// Find or copy-in a stem, returning its id.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> usize {
        match self.find(bytes) {
            Some(id) => id,
            None => {
                self.stems.push(Stem {
                    bytes: Bytes::Owned(bytes.to_vec().into_boxed_slice()),
                });
                self.stems.len() - 1
            }
        }
    }

    /// Find or borrow-in a stem whose bytes live in a mapped region.
    pub(crate) fn intern_mapped(&mut self, bytes: &'static [u8]) -> usize {
        match self.find(bytes) {
            Some(id) => id,
            None => {
                self.stems.push(Stem {
                    bytes: Bytes::Mmap(bytes),
                });
                self.stems.len() - 1
            }
        }
    }

    /// Stem id of a lookup key, and the key text after the stem.
    ///
    /// The key's first segment (through the byte before its second `/`) is
    /// looked up by exact bytes; with no second `/` or no table entry there
    /// is no stem and the full key is returned for matching.
    pub(crate) fn key_stem<'k>(&self, key: &'k str) -> (i32, &'k str) {
        let Some(len) = leading_segment_len(key) else {
            return (-1, key);
        };
        match self.find(&key.as_bytes()[..len]) {
            Some(id) => (id as i32, &key[len..]),
            None => (-1, key),
        }
    }
}

/// Byte length of the first path segment, i.e. everything before the second
/// `/`. `None` when the key has no second slash.
fn leading_segment_len(key: &str) -> Option<usize> {
    key.as_bytes()
        .iter()
        .skip(1)
        .position(|&b| b == b'/')
        .map(|p| p + 1)
}

/// The stem of a rule pattern: its first path segment, accepted only when
/// that segment is a pure literal (no regex metacharacters).
pub(crate) fn pattern_stem(pattern: &str) -> Option<&str> {
    let len = leading_segment_len(pattern)?;
    let head = &pattern.as_bytes()[..len];
    if head.iter().any(|b| META_CHARS.contains(b)) {
        return None;
    }
    Some(&pattern[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut stems = StemTable::default();
        let a = stems.intern(b"/usr");
        let b = stems.intern(b"/var");
        let c = stems.intern(b"/usr");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(stems.len(), 2);
    }

    #[test]
    fn key_stem_advances_past_segment() {
        let mut stems = StemTable::default();
        stems.intern(b"/usr");

        let (id, rest) = stems.key_stem("/usr/bin/ls");
        assert_eq!(id, 0);
        assert_eq!(rest, "/bin/ls");
    }

    #[test]
    fn key_without_second_slash_has_no_stem() {
        let mut stems = StemTable::default();
        stems.intern(b"/usr");
        assert_eq!(stems.key_stem("/usr"), (-1, "/usr"));
        assert_eq!(stems.key_stem("passwd"), (-1, "passwd"));
    }

    #[test]
    fn unknown_segment_has_no_stem() {
        let stems = StemTable::default();
        assert_eq!(stems.key_stem("/opt/x"), (-1, "/opt/x"));
    }

    #[test]
    fn pattern_stem_requires_literal_segment() {
        assert_eq!(pattern_stem("/usr/bin(/.*)?"), Some("/usr"));
        assert_eq!(pattern_stem("/usr(/.*)?"), None);
        assert_eq!(pattern_stem("/[uv]sr/.*"), None);
        assert_eq!(pattern_stem("/.*"), None);
    }
}
