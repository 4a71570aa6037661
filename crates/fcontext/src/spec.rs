//! Rule store
//!
//! One `Spec` is a single pattern-to-label rule; the `SpecStore` is the
//! ordered array the lookup engine scans. The store is append-only while
//! loading and frozen after the final sort, apart from per-rule match
//! counters and the write-once lazy-compile slot.

use crate::mmap::Bytes;
use crate::rx::{CompiledRegex, RxError};
use crate::stem::StemTable;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::warn;

/// A matched context that assigns no label; surfaced to callers as "not
/// found" rather than as a label.
pub const NONE_CONTEXT: &str = "<<none>>";

/// The security label a rule assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Raw context string as written in the rule file.
    pub raw: String,
    /// Translated form; populated by callers that run a translation layer,
    /// never by the loaders.
    pub translated: Option<String>,
}

impl Label {
    pub(crate) fn new(raw: String) -> Self {
        Label {
            raw,
            translated: None,
        }
    }

    /// Whether this label is the no-label sentinel.
    pub fn is_none_sentinel(&self) -> bool {
        self.raw == NONE_CONTEXT
    }
}

/// A single pattern-to-label rule.
#[derive(Debug)]
pub(crate) struct Spec {
    regex_str: Bytes,
    regex: OnceLock<Result<CompiledRegex, RxError>>,
    stem_id: i32,
    mode: u32,
    label: Label,
    has_meta_chars: bool,
    prefix_len: u32,
    matches: AtomicU64,
}

impl Spec {
    pub(crate) fn new(
        regex_str: Bytes,
        stem_id: i32,
        mode: u32,
        label: Label,
        has_meta_chars: bool,
        prefix_len: u32,
    ) -> Self {
        Spec {
            regex_str,
            regex: OnceLock::new(),
            stem_id,
            mode,
            label,
            has_meta_chars,
            prefix_len,
            matches: AtomicU64::new(0),
        }
    }

    /// Pattern source, including the stem.
    pub(crate) fn pattern(&self) -> &str {
        // Loaders only store UTF-8 validated bytes.
        std::str::from_utf8(self.regex_str.as_slice()).expect("pattern bytes checked at load")
    }

    pub(crate) fn pattern_bytes(&self) -> &[u8] {
        self.regex_str.as_slice()
    }

    pub(crate) fn stem_id(&self) -> i32 {
        self.stem_id
    }

    pub(crate) fn mode(&self) -> u32 {
        self.mode
    }

    pub(crate) fn label(&self) -> &Label {
        &self.label
    }

    pub(crate) fn has_meta_chars(&self) -> bool {
        self.has_meta_chars
    }

    pub(crate) fn prefix_len(&self) -> u32 {
        self.prefix_len
    }

    pub(crate) fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn match_count(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }

    /// Adopt an already-compiled regex (deserialized from a compiled file).
    pub(crate) fn adopt_compiled(&self, regex: CompiledRegex) {
        let _ = self.regex.set(Ok(regex));
    }

    /// Whether the lazy-compile slot has been filled with a usable regex.
    pub(crate) fn compiled_regex(&self) -> Option<&CompiledRegex> {
        match self.regex.get() {
            Some(Ok(re)) => Some(re),
            _ => None,
        }
    }

    /// Compiled form of this rule, compiling on first use.
    ///
    /// Stem-anchored rules compile only the pattern text after the stem;
    /// the lookup engine matches them against the key remainder.
    pub(crate) fn compiled(&self, stems: &StemTable) -> Result<&CompiledRegex, RxError> {
        let slot = self.regex.get_or_init(|| {
            let pattern = self.pattern();
            let source = if self.stem_id >= 0 {
                &pattern[stems.get(self.stem_id as usize).len()..]
            } else {
                pattern
            };
            CompiledRegex::anchored(source)
        });
        match slot {
            Ok(re) => Ok(re),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Scan a pattern for regex metacharacters.
///
/// Returns the `has_meta_chars` flag and the fixed-prefix length: the byte
/// offset of the first metacharacter, or the whole length for a literal
/// pattern. A backslash escapes the following byte.
pub(crate) fn analyze_pattern(pattern: &str) -> (bool, u32) {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'.' | b'^' | b'$' | b'?' | b'*' | b'+' | b'|' | b'[' | b'(' | b'{' => {
                return (true, i as u32);
            }
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    (false, bytes.len() as u32)
}

/// Ordered array of rules.
#[derive(Debug, Default)]
pub(crate) struct SpecStore {
    specs: Vec<Spec>,
}

impl SpecStore {
    pub(crate) fn push(&mut self, spec: Spec) {
        self.specs.push(spec);
    }

    pub(crate) fn len(&self) -> usize {
        self.specs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub(crate) fn specs(&self) -> &[Spec] {
        &self.specs
    }

    /// Roll back rules appended by a failed load pass.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.specs.truncate(len);
    }

    /// Stable partition moving literal (metachar-free) rules after regex
    /// rules. The reverse scan of the lookup engine then sees literals
    /// first, so a literal pathname beats any regex that also matches.
    pub(crate) fn sort(&mut self) {
        self.specs.sort_by_key(|s| !s.has_meta_chars);
    }

    /// Report duplicated rules: identical pattern text with compatible
    /// modes (either unrestricted, or equal). Returns the number of
    /// duplicate pairs found; each is logged, distinguishing redundant
    /// duplicates from conflicting ones.
    pub(crate) fn report_duplicates(&self, path: &std::path::Path) -> usize {
        let mut dups = 0;
        for (i, a) in self.specs.iter().enumerate() {
            for b in &self.specs[i + 1..] {
                if a.regex_str != b.regex_str {
                    continue;
                }
                if a.mode != 0 && b.mode != 0 && a.mode != b.mode {
                    continue;
                }
                dups += 1;
                if a.label.raw == b.label.raw {
                    warn!(
                        path = %path.display(),
                        pattern = a.pattern(),
                        "multiple identical specifications"
                    );
                } else {
                    warn!(
                        path = %path.display(),
                        pattern = a.pattern(),
                        first = %a.label.raw,
                        second = %b.label.raw,
                        "multiple different specifications for one pattern"
                    );
                }
            }
        }
        dups
    }
}
