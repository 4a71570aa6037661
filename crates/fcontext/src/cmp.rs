//! Structural comparison of two loaded rule sets
//!
//! Walks both spec stores in parallel. Because the sort moves literal
//! pathname rules to the end, regex rules present in only one set appear as
//! skips during the walk rather than as hard mismatches; skips on one side
//! only make that side the superset.

use crate::handle::FileContexts;
use crate::spec::Spec;
use tracing::info;

/// Verdict of comparing two rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpResult {
    /// Identical rule sequences.
    Equal,
    /// Every rule of the left set appears in the right set.
    Subset,
    /// Every rule of the right set appears in the left set.
    Superset,
    /// The sets disagree on at least one rule, or each has rules the other
    /// lacks.
    Incomparable,
}

fn mismatch(field: &str, i: usize, a: &Spec, j: usize, b: &Spec) -> CmpResult {
    info!(
        field,
        left_index = i,
        left_pattern = a.pattern(),
        left_mode = a.mode(),
        left_context = %a.label().raw,
        right_index = j,
        right_pattern = b.pattern(),
        right_mode = b.mode(),
        right_context = %b.label().raw,
        "rule sets differ"
    );
    CmpResult::Incomparable
}

pub(crate) fn compare(h1: &FileContexts, h2: &FileContexts) -> CmpResult {
    let specs1 = h1.specs.specs();
    let specs2 = h2.specs.specs();

    let mut i = 0;
    let mut j = 0;
    let mut skipped1 = false;
    let mut skipped2 = false;

    while i < specs1.len() && j < specs2.len() {
        let a = &specs1[i];
        let b = &specs2[j];

        // Literal rules trail regex rules after the sort, so a regex rule
        // facing a literal one can only be an extra entry on its side.
        if !a.has_meta_chars() && b.has_meta_chars() {
            j += 1;
            skipped2 = true;
            continue;
        }
        if a.has_meta_chars() && !b.has_meta_chars() {
            i += 1;
            skipped1 = true;
            continue;
        }

        match (a.compiled_regex(), b.compiled_regex()) {
            (Some(ra), Some(rb)) => {
                if !ra.equivalent(rb) {
                    return mismatch("regex", i, a, j, b);
                }
            }
            _ => {
                if a.pattern_bytes() != b.pattern_bytes() {
                    return mismatch("pattern", i, a, j, b);
                }
            }
        }

        if a.mode() != b.mode() {
            return mismatch("mode", i, a, j, b);
        }

        match (a.stem_id(), b.stem_id()) {
            (-1, -1) => {}
            (-1, _) | (_, -1) => return mismatch("stem", i, a, j, b),
            (sa, sb) => {
                if h1.stems.get(sa as usize) != h2.stems.get(sb as usize) {
                    return mismatch("stem", i, a, j, b);
                }
            }
        }

        if a.label().raw != b.label().raw {
            return mismatch("context", i, a, j, b);
        }

        i += 1;
        j += 1;
    }

    if (skipped1 || i < specs1.len()) && !skipped2 {
        CmpResult::Superset
    } else if (skipped2 || j < specs2.len()) && !skipped1 {
        CmpResult::Subset
    } else if skipped1 && skipped2 {
        CmpResult::Incomparable
    } else {
        CmpResult::Equal
    }
}
