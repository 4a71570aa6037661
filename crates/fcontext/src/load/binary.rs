//! Compiled rule file loader
//!
//! Parses the mapped bytes of a compiled rule file into the stem table and
//! spec store. Stems and pattern strings are borrowed straight out of the
//! mapping; contexts are copied because validation may rewrite them.
//!
//! A compiled file embeds the regex engine fingerprint of the build that
//! produced it. A different engine version rejects the file outright (the
//! resolver then falls back to the text source). A different arch string
//! only disables adoption of the stored DFAs; patterns recompile lazily
//! from source on first lookup.

use super::LoadTarget;
use crate::error::{Error, Result};
use crate::mmap::Bytes;
use crate::rx::{self, CompiledRegex};
use crate::spec::{Label, Spec, NONE_CONTEXT};
use fcontext_format::{
    Cursor, FormatError, COMPILED_MAGIC, MAX_VERS, VERS_ENGINE_ARCH, VERS_ENGINE_VERSION,
    VERS_PREFIX_LEN,
};
use std::path::Path;
use tracing::debug;

pub(crate) fn load_compiled(
    target: &mut LoadTarget<'_>,
    path: &Path,
    region: &'static [u8],
) -> Result<()> {
    let mut cur = Cursor::new(region);

    let magic = cur.read_u32("magic")?;
    if magic != COMPILED_MAGIC {
        return Err(FormatError::BadMagic(magic).into());
    }
    let version = cur.read_u32("version")?;
    if version > MAX_VERS {
        return Err(FormatError::UnsupportedVersion(version).into());
    }

    let mut arch_matches = false;
    if version >= VERS_ENGINE_VERSION {
        let host = rx::engine_version();
        let len = cur.read_u32("engine version length")? as usize;
        if len != host.len() {
            return Err(Error::VersionMismatch {
                found: format!("<{} bytes>", len),
                host: host.to_string(),
            });
        }
        let stored = cur.bytes(len, "engine version")?;
        if stored != host.as_bytes() {
            return Err(Error::VersionMismatch {
                found: String::from_utf8_lossy(stored).into_owned(),
                host: host.to_string(),
            });
        }

        if version >= VERS_ENGINE_ARCH {
            let host_arch = rx::arch_string();
            let len = cur.read_u32("engine arch length")? as usize;
            if len != host_arch.len() {
                // Wrong length already proves a foreign arch; the entry is
                // skipped, but the skip running off the region is still a
                // format error.
                cur.skip(len, "engine arch")?;
            } else {
                let stored = cur.bytes(len, "engine arch")?;
                arch_matches = stored == host_arch.as_bytes();
            }
            if !arch_matches {
                debug!(
                    path = %path.display(),
                    host_arch = %host_arch,
                    "stored regexes are for a foreign arch, compiling lazily"
                );
            }
        }
    }

    // Stem table, file-local ids remapped onto the handle's table.
    let stem_count = cur.read_u32("stem count")?;
    if stem_count == 0 {
        return Err(FormatError::ZeroLength("stem table").into());
    }
    let mut stem_map = Vec::with_capacity(stem_count as usize);
    for _ in 0..stem_count {
        let len = cur.read_u32("stem length")? as usize;
        if len == 0 {
            return Err(FormatError::ZeroLength("stem").into());
        }
        if len >= u32::MAX as usize {
            return Err(FormatError::BadLength("stem").into());
        }
        let bytes = cur.read_nul_entry(len + 1, "stem")?;
        stem_map.push(target.stems.intern_mapped(bytes) as i32);
    }

    let spec_count = cur.read_u32("spec count")?;
    if spec_count == 0 {
        return Err(FormatError::ZeroLength("spec table").into());
    }

    for _ in 0..spec_count {
        let len = cur.read_u32("context length")? as usize;
        let raw = cur.read_nul_entry(len, "context")?;
        let context = std::str::from_utf8(raw)
            .map_err(|_| FormatError::BadEncoding("context"))?
            .to_string();

        if target.validating && context != NONE_CONTEXT {
            if let Some(validator) = target.validator {
                if validator.validate(&context).is_err() {
                    return Err(Error::Validate {
                        path: path.to_path_buf(),
                        context,
                    });
                }
            }
        }

        let len = cur.read_u32("pattern length")? as usize;
        let pattern = cur.read_nul_entry(len, "pattern")?;
        std::str::from_utf8(pattern).map_err(|_| FormatError::BadEncoding("pattern"))?;

        let mode = cur.read_u32("mode")?;

        let file_stem = cur.read_i32("stem id")?;
        let mut stem_id = if file_stem < 0 || file_stem >= stem_count as i32 {
            -1
        } else {
            stem_map[file_stem as usize]
        };
        // A stem that is not actually a prefix of its pattern cannot be
        // stripped before matching; demote the rule to stemless.
        if stem_id >= 0 && !pattern.starts_with(target.stems.get(stem_id as usize)) {
            stem_id = -1;
        }

        let has_meta = cur.read_u32("meta flag")? != 0;
        let prefix_len = if version >= VERS_PREFIX_LEN {
            cur.read_u32("prefix length")?
        } else {
            0
        };

        let spec = Spec::new(
            Bytes::Mmap(pattern),
            stem_id,
            mode,
            Label::new(context),
            has_meta,
            prefix_len,
        );

        let blob_len = cur.read_u32("regex blob length")? as usize;
        let blob = cur.bytes(blob_len, "regex blob")?;
        if arch_matches && blob_len > 0 {
            let regex = CompiledRegex::from_bytes(blob)
                .map_err(|e| Error::Internal(format!("stored regex rejected: {}", e)))?;
            spec.adopt_compiled(regex);
        }

        target.specs.push(spec);
    }

    Ok(())
}
