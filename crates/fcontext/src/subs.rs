//! Path substitution overlays
//!
//! A substitution file rewrites the leading portion of lookup keys before
//! rule matching, so a tree mounted at an alternate location can reuse the
//! labels of its canonical location. Lines are `src dst` pairs; the first
//! entry whose `src` matches a leading run of the key (at a `/` or
//! end-of-key boundary) wins.

use crate::digest::DigestBuilder;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug)]
struct SubEntry {
    src: String,
    dst: String,
}

/// An ordered substitution table loaded from one or more overlay files.
#[derive(Debug, Default)]
pub(crate) struct Substitutions {
    entries: Vec<SubEntry>,
}

impl Substitutions {
    /// Load `path` and append its entries. A missing file is not an error;
    /// loaded files feed the content digest.
    pub(crate) fn load(
        &mut self,
        path: &Path,
        digest: Option<&mut DigestBuilder>,
    ) -> Result<()> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(src), Some(dst)) = (fields.next(), fields.next()) else {
                continue;
            };
            self.entries.push(SubEntry {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }

        if let Some(digest) = digest {
            digest.add_specfile(path, text.as_bytes());
        }
        Ok(())
    }

    /// Rewrite the leading run of `key` through the first matching entry.
    pub(crate) fn apply(&self, key: &str) -> Option<String> {
        for entry in &self.entries {
            let Some(rest) = key.strip_prefix(entry.src.as_str()) else {
                continue;
            };
            if !(rest.is_empty() || rest.starts_with('/')) {
                continue;
            }
            let mut out = String::with_capacity(entry.dst.len() + rest.len());
            out.push_str(&entry.dst);
            out.push_str(rest);
            return Some(out);
        }
        None
    }
}
