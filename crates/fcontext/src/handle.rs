//! Loaded rule set handle
//!
//! `FileContexts` owns a fully loaded, sorted rule set and answers lookups
//! against it. Opening goes through a builder in the usual fluent shape:
//!
//! ```no_run
//! use fcontext::FileContexts;
//!
//! let fc = FileContexts::from("/etc/selinux/targeted/contexts/files/file_contexts")
//!     .base_only(true)
//!     .open()?;
//!
//! if let Some(label) = fc.lookup("/etc/passwd", fcontext::mode::REGULAR)? {
//!     println!("{}", label.raw);
//! }
//! # Ok::<(), fcontext::Error>(())
//! ```
//!
//! After `open` returns the handle is immutable to callers; the only
//! interior state that moves is the per-rule match counter and the
//! write-once lazy-compile slot, both safe under concurrent readers.

use crate::cmp::{self, CmpResult};
use crate::digest::{DigestBuilder, SpecfileDigest};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::load::{self, LoadTarget};
use crate::mmap::MmapPool;
use crate::mode;
use crate::rx::Outcome;
use crate::spec::{Label, Spec, SpecStore};
use crate::stem::StemTable;
use crate::subs::Substitutions;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Syntax check applied to each context while a validating open runs.
///
/// The backend has no policy knowledge of its own; embedders that can check
/// a context against the loaded policy plug that in here.
pub trait ContextValidator: Send + Sync {
    /// `Ok` if `context` is acceptable, `Err` with a reason otherwise.
    fn validate(&self, context: &str) -> std::result::Result<(), String>;
}

/// Builder for opening a rule set with custom configuration.
///
/// Created via [`FileContexts::builder`] or [`FileContexts::from`].
pub struct FileContextsBuilder {
    paths: Vec<PathBuf>,
    subset: Option<String>,
    base_only: bool,
    validating: bool,
    want_digest: bool,
    validator: Option<Box<dyn ContextValidator>>,
    env: Environment,
}

impl FileContextsBuilder {
    fn new() -> Self {
        FileContextsBuilder {
            paths: Vec::new(),
            subset: None,
            base_only: false,
            validating: false,
            want_digest: false,
            validator: None,
            env: Environment::default(),
        }
    }

    /// Add a rule file path. Repeatable; without any, the environment's
    /// default rule file is used.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Restrict loading to rules whose stem leads this prefix.
    pub fn subset(mut self, prefix: impl Into<String>) -> Self {
        self.subset = Some(prefix.into());
        self
    }

    /// Skip the `homedirs` and `local` overlays.
    pub fn base_only(mut self, base_only: bool) -> Self {
        self.base_only = base_only;
        self
    }

    /// Check contexts through the validator and fail the open on duplicate
    /// rules.
    pub fn validate(mut self, validating: bool) -> Self {
        self.validating = validating;
        self
    }

    /// Record a content digest over every loaded file.
    pub fn digest(mut self, want: bool) -> Self {
        self.want_digest = want;
        self
    }

    /// Context syntax checker used when validating.
    pub fn validator(mut self, validator: Box<dyn ContextValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Filesystem defaults; only consulted when no explicit path is given.
    pub fn environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Load, validate and sort the rule set.
    pub fn open(self) -> Result<FileContexts> {
        let mut stems = StemTable::default();
        let mut specs = SpecStore::default();
        let mut pool = MmapPool::default();
        let mut subs = Substitutions::default();
        let mut dist_subs = Substitutions::default();
        let mut digest = self.want_digest.then(DigestBuilder::default);

        let path_provided = !self.paths.is_empty();
        let spec_files: Vec<PathBuf> = if path_provided {
            self.paths
        } else {
            vec![self.env.file_contexts.clone()]
        };

        // Substitution overlays: the environment's pair when running off
        // defaults, per-path companions otherwise. Missing files are fine.
        if path_provided {
            for path in &spec_files {
                dist_subs.load(&load::append_suffix(path, "subs_dist"), digest.as_mut())?;
                subs.load(&load::append_suffix(path, "subs"), digest.as_mut())?;
            }
        } else {
            dist_subs.load(&self.env.subs_dist, digest.as_mut())?;
            subs.load(&self.env.subs, digest.as_mut())?;
        }

        for path in &spec_files {
            let mut target = LoadTarget {
                stems: &mut stems,
                specs: &mut specs,
                pool: &mut pool,
                digest: digest.as_mut(),
                validating: self.validating,
                validator: self.validator.as_deref(),
                subset: self.subset.as_deref(),
            };
            load::process_file(&mut target, path, None)?;

            if self.validating {
                let dups = specs.report_duplicates(path);
                if dups > 0 {
                    return Err(Error::DuplicateSpec {
                        path: path.clone(),
                        count: dups,
                    });
                }
            }
        }

        if !self.base_only {
            for suffix in ["homedirs", "local"] {
                let mut target = LoadTarget {
                    stems: &mut stems,
                    specs: &mut specs,
                    pool: &mut pool,
                    digest: digest.as_mut(),
                    validating: self.validating,
                    validator: self.validator.as_deref(),
                    subset: self.subset.as_deref(),
                };
                match load::process_file(&mut target, &spec_files[0], Some(suffix)) {
                    Ok(()) => {}
                    Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }

        specs.sort();

        Ok(FileContexts {
            stems,
            specs,
            subs,
            dist_subs,
            digest: digest.map(DigestBuilder::finish),
            spec_files,
            pool,
        })
    }
}

/// A loaded, sorted rule set.
///
/// Shareable across threads behind an `Arc`; lookups take `&self`.
#[derive(Debug)]
pub struct FileContexts {
    pub(crate) stems: StemTable,
    pub(crate) specs: SpecStore,
    subs: Substitutions,
    dist_subs: Substitutions,
    digest: Option<SpecfileDigest>,
    spec_files: Vec<PathBuf>,
    // Declared last: the mapped regions outlive every rule borrowing from
    // them within this struct, drop order included.
    #[allow(dead_code)]
    pool: MmapPool,
}

impl FileContexts {
    /// Builder with no paths set; the environment's default rule file will
    /// be loaded.
    pub fn builder() -> FileContextsBuilder {
        FileContextsBuilder::new()
    }

    /// Builder seeded with one rule file path.
    pub fn from(path: impl Into<PathBuf>) -> FileContextsBuilder {
        FileContextsBuilder::new().path(path)
    }

    /// Label for `key`, filtered by file-type `file_mode` (0 = any).
    ///
    /// `Ok(None)` when no rule matches, and when the matching rule assigns
    /// the no-label sentinel.
    pub fn lookup(&self, key: &str, file_mode: u32) -> Result<Option<&Label>> {
        Ok(self
            .lookup_common(key, file_mode, false)?
            .map(|spec| spec.label()))
    }

    /// Whether `key` could still reach a labeled path, i.e. some rule
    /// matches it fully or accepts it as a prefix.
    pub fn partial_match(&self, key: &str) -> Result<bool> {
        Ok(self.lookup_common(key, 0, true)?.is_some())
    }

    /// Label for `key` or the best of its hardlink `aliases`.
    ///
    /// An exact (metachar-free) rule hit wins outright, the key probed
    /// before the aliases. Otherwise the probe whose rule has the longest
    /// fixed prefix wins; ties go to the key, then to the earliest alias.
    pub fn best_match(
        &self,
        key: &str,
        aliases: &[&str],
        file_mode: u32,
    ) -> Result<Option<&Label>> {
        if aliases.is_empty() {
            return self.lookup(key, file_mode);
        }

        let mut best: Option<&Spec> = None;
        let mut best_prefix = 0u32;
        for (idx, probe) in std::iter::once(key).chain(aliases.iter().copied()).enumerate() {
            let Some(spec) = self.lookup_common(probe, file_mode, false)? else {
                continue;
            };
            if !spec.has_meta_chars() {
                return Ok(Some(spec.label()));
            }
            if idx == 0 {
                best = Some(spec);
                best_prefix = spec.prefix_len();
            } else if spec.prefix_len() > best_prefix {
                best = Some(spec);
                best_prefix = spec.prefix_len();
            }
        }
        Ok(best.map(|spec| spec.label()))
    }

    /// Structural comparison against another loaded rule set.
    pub fn compare(&self, other: &FileContexts) -> CmpResult {
        cmp::compare(self, other)
    }

    /// Warn about every rule that has not matched since load.
    pub fn stats(&self) {
        for spec in self.specs.specs() {
            if spec.match_count() > 0 {
                continue;
            }
            match mode::to_type_field(spec.mode()) {
                Some(file_type) => warn!(
                    pattern = spec.pattern(),
                    file_type,
                    context = %spec.label().raw,
                    "no matches for rule"
                ),
                None => warn!(
                    pattern = spec.pattern(),
                    context = %spec.label().raw,
                    "no matches for rule"
                ),
            }
        }
    }

    /// Content digest over the loaded files, when requested at open.
    pub fn digest(&self) -> Option<&SpecfileDigest> {
        self.digest.as_ref()
    }

    /// Rule file paths this handle was opened from.
    pub fn spec_files(&self) -> &[PathBuf] {
        &self.spec_files
    }

    /// Number of loaded rules.
    pub fn rule_count(&self) -> usize {
        self.specs.len()
    }

    /// Serialize the rule set to the compiled wire format.
    pub fn to_compiled_bytes(&self) -> Result<Vec<u8>> {
        crate::compile::compile_to_bytes(&self.stems, &self.specs)
    }

    /// Serialize the rule set to `path` in the compiled wire format.
    pub fn write_compiled(&self, path: &Path) -> Result<()> {
        let bytes = self.to_compiled_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// The scan shared by lookup, partial match and best match: newest
    /// matching rule wins, which the sorted store turns into a reverse
    /// walk where literal rules are seen before regex rules.
    fn lookup_common(&self, key: &str, file_mode: u32, partial: bool) -> Result<Option<&Spec>> {
        if self.specs.is_empty() {
            return Ok(None);
        }

        // Alternate-location substitution, local table over distribution.
        let substituted = self
            .subs
            .apply(key)
            .or_else(|| self.dist_subs.apply(key));
        let key = substituted.as_deref().unwrap_or(key);

        // Collapse runs of slashes; rules are written against canonical
        // single-slash paths.
        let collapsed;
        let key = if key.contains("//") {
            collapsed = collapse_slashes(key);
            collapsed.as_str()
        } else {
            key
        };

        let (key_stem, remainder) = self.stems.key_stem(key);
        let file_mode = file_mode & mode::MASK;

        for spec in self.specs.specs().iter().rev() {
            if spec.stem_id() != -1 && spec.stem_id() != key_stem {
                continue;
            }
            if file_mode != 0 && spec.mode() != 0 && file_mode != spec.mode() {
                continue;
            }

            let regex = spec
                .compiled(&self.stems)
                .map_err(|e| Error::Internal(e.to_string()))?;
            let text = if spec.stem_id() == -1 { key } else { remainder };
            match regex.matches(text).map_err(|e| Error::Internal(e.to_string()))? {
                Outcome::Match => {
                    spec.record_match();
                    return Ok(Self::filter_none(spec));
                }
                Outcome::PartialMatch if partial => {
                    return Ok(Self::filter_none(spec));
                }
                _ => {}
            }
        }

        Ok(None)
    }

    fn filter_none(spec: &Spec) -> Option<&Spec> {
        if spec.label().is_none_sentinel() {
            None
        } else {
            Some(spec)
        }
    }
}

fn collapse_slashes(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_slash = false;
    for ch in key.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_slashes_removes_runs() {
        assert_eq!(collapse_slashes("/a//b///c"), "/a/b/c");
        assert_eq!(collapse_slashes("/a/b"), "/a/b");
        assert_eq!(collapse_slashes("//"), "/");
    }
}
