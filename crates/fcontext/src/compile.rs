//! Compiled rule file writer
//!
//! Serializes a loaded rule set to the compiled wire format, including a
//! serialized DFA per rule, so later opens can adopt the compiled form
//! instead of re-parsing the text source. The writer always emits the
//! newest format version; the engine fingerprint it embeds restricts the
//! file to hosts with the same regex engine build and architecture.

use crate::error::{Error, Result};
use crate::spec::SpecStore;
use crate::stem::StemTable;
use crate::rx;
use fcontext_format::{FormatError, COMPILED_MAGIC, MAX_VERS};

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Length-prefixed bytes with a trailing NUL, the format's string shape.
fn put_nul_entry(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, bytes.len() as u32 + 1);
    out.extend_from_slice(bytes);
    out.push(0);
}

pub(crate) fn compile_to_bytes(stems: &StemTable, specs: &SpecStore) -> Result<Vec<u8>> {
    // The wire format requires non-empty tables; a set this degenerate has
    // no compiled form.
    if stems.len() == 0 {
        return Err(FormatError::ZeroLength("stem table").into());
    }
    if specs.is_empty() {
        return Err(FormatError::ZeroLength("spec table").into());
    }

    let mut out = Vec::new();
    put_u32(&mut out, COMPILED_MAGIC);
    put_u32(&mut out, MAX_VERS);

    let engine = rx::engine_version();
    put_u32(&mut out, engine.len() as u32);
    out.extend_from_slice(engine.as_bytes());

    let arch = rx::arch_string();
    put_u32(&mut out, arch.len() as u32);
    out.extend_from_slice(arch.as_bytes());

    put_u32(&mut out, stems.len() as u32);
    for id in 0..stems.len() {
        let stem = stems.get(id);
        put_u32(&mut out, stem.len() as u32);
        out.extend_from_slice(stem);
        out.push(0);
    }

    put_u32(&mut out, specs.len() as u32);
    for spec in specs.specs() {
        put_nul_entry(&mut out, spec.label().raw.as_bytes());
        put_nul_entry(&mut out, spec.pattern_bytes());
        put_u32(&mut out, spec.mode());
        put_i32(&mut out, spec.stem_id());
        put_u32(&mut out, spec.has_meta_chars() as u32);
        put_u32(&mut out, spec.prefix_len());

        let regex = spec
            .compiled(stems)
            .map_err(|e| Error::Internal(format!("cannot compile {:?}: {}", spec.pattern(), e)))?;
        let blob = regex.to_bytes();
        put_u32(&mut out, blob.len() as u32);
        out.extend_from_slice(&blob);
    }

    Ok(out)
}
