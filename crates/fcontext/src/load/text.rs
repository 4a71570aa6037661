//! Text rule file loader
//!
//! Parses the line-oriented rule format: `pattern [file-type] context`,
//! blank lines and `#` comments ignored. Rules are appended uncompiled; the
//! lookup engine compiles each pattern on first use.

use super::LoadTarget;
use crate::error::{Error, Result};
use crate::mmap::Bytes;
use crate::spec::{analyze_pattern, Label, Spec, NONE_CONTEXT};
use crate::stem::pattern_stem;
use crate::mode;
use std::path::Path;

pub(crate) fn process_text(
    target: &mut LoadTarget<'_>,
    path: &Path,
    contents: &str,
) -> Result<()> {
    for (idx, line) in contents.lines().enumerate() {
        process_line(target, path, line, idx as u32 + 1)?;
    }
    Ok(())
}

fn parse_error(path: &Path, line: u32, reason: impl Into<String>) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

/// Parse one rule line and append it to the spec store.
pub(crate) fn process_line(
    target: &mut LoadTarget<'_>,
    path: &Path,
    line: &str,
    lineno: u32,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(());
    }

    let mut fields = line.split_whitespace();
    let pattern = fields.next().expect("non-empty line has a first field");
    let second = fields.next();
    let third = fields.next();
    if fields.next().is_some() {
        return Err(parse_error(path, lineno, "too many fields"));
    }

    let (type_field, context) = match (second, third) {
        (Some(t), Some(c)) => (Some(t), c),
        (Some(c), None) => (None, c),
        _ => return Err(parse_error(path, lineno, "missing context")),
    };

    let file_mode = match type_field {
        Some(field) => mode::from_type_field(field)
            .ok_or_else(|| parse_error(path, lineno, format!("invalid file type {:?}", field)))?,
        None => 0,
    };

    let stem = pattern_stem(pattern);

    // A subset prefix restricts the set to rules whose stem leads the
    // prefix; everything else is silently discarded.
    if let (Some(stem), Some(prefix)) = (stem, target.subset) {
        if !prefix.starts_with(stem) {
            return Ok(());
        }
    }

    if target.validating && context != NONE_CONTEXT {
        if let Some(validator) = target.validator {
            if validator.validate(context).is_err() {
                return Err(Error::Validate {
                    path: path.to_path_buf(),
                    context: context.to_string(),
                });
            }
        }
    }

    let stem_id = match stem {
        Some(stem) => target.stems.intern(stem.as_bytes()) as i32,
        None => -1,
    };
    let (has_meta, prefix_len) = analyze_pattern(pattern);

    target.specs.push(Spec::new(
        Bytes::Owned(pattern.as_bytes().to_vec().into_boxed_slice()),
        stem_id,
        file_mode,
        Label::new(context.to_string()),
        has_meta,
        prefix_len,
    ));
    Ok(())
}
