//! Specfile resolution and loading
//!
//! A rule set on disk is a base path with optional compiled (`.bin`) and
//! overlay (`.homedirs`, `.local`) companions. The resolver stats the
//! candidates and opens the most recently modified one; if that file fails
//! to load, a second pass falls back to the oldest, so a stale compiled file
//! cannot brick lookups when its text source was just updated.

mod binary;
mod text;

use crate::digest::DigestBuilder;
use crate::error::{Error, Result};
use crate::handle::ContextValidator;
use crate::mmap::MmapPool;
use crate::spec::SpecStore;
use crate::stem::StemTable;
use fcontext_format::COMPILED_MAGIC;
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Longest specfile path accepted, matching the platform path limit.
const MAX_PATH_BYTES: usize = 4096;

/// Mutable loading state threaded through the text and binary loaders.
pub(crate) struct LoadTarget<'a> {
    pub(crate) stems: &'a mut StemTable,
    pub(crate) specs: &'a mut SpecStore,
    pub(crate) pool: &'a mut MmapPool,
    pub(crate) digest: Option<&'a mut DigestBuilder>,
    pub(crate) validating: bool,
    pub(crate) validator: Option<&'a dyn ContextValidator>,
    pub(crate) subset: Option<&'a str>,
}

/// `<path>.<suffix>` with a plain textual dot append.
pub(crate) fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

/// Resolve and load one specfile (base plus optional secondary suffix).
///
/// First pass opens the newest candidate; if it fails to load, the second
/// pass opens the oldest. Rules appended by a failed pass are rolled back so
/// the fallback starts from clean state. No candidate existing at all is an
/// `Io(NotFound)` error, which the caller may swallow for overlays.
pub(crate) fn process_file(
    target: &mut LoadTarget<'_>,
    base: &Path,
    suffix: Option<&str>,
) -> Result<()> {
    let mut last_err = None;

    for pass in 0..2 {
        let Some((found_path, file)) = open_file(base, suffix, pass > 0)? else {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
        };

        let mark = target.specs.len();
        match load_one(target, &found_path, file) {
            Ok(()) => return Ok(()),
            Err(e) => {
                target.specs.truncate(mark);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.expect("two load passes ran"))
}

/// Pick which of `base[.suffix]` and `base[.suffix].bin` to open.
///
/// Among the candidates that exist, the latest modification time wins; on a
/// tie the later candidate (the compiled one) wins. `open_oldest` inverts
/// the preference for the fallback pass, where ties keep the earlier
/// candidate. Returns `None` when neither exists.
fn open_file(
    base: &Path,
    suffix: Option<&str>,
    open_oldest: bool,
) -> Result<Option<(PathBuf, File)>> {
    let primary = match suffix {
        Some(sfx) => append_suffix(base, sfx),
        None => base.to_path_buf(),
    };
    if primary.as_os_str().len() + ".bin".len() > MAX_PATH_BYTES {
        return Err(Error::NameTooLong(primary));
    }
    let compiled = append_suffix(&primary, "bin");

    let mut found: Option<(PathBuf, SystemTime)> = None;
    for candidate in [primary, compiled] {
        let Ok(meta) = std::fs::metadata(&candidate) else {
            continue;
        };
        let mtime = meta.modified()?;
        match &found {
            None => found = Some((candidate, mtime)),
            Some((_, found_mtime)) => {
                if open_oldest != (mtime >= *found_mtime) {
                    found = Some((candidate, mtime));
                }
            }
        }
    }

    match found {
        Some((path, _)) => {
            let file = File::open(&path)?;
            Ok(Some((path, file)))
        }
        None => Ok(None),
    }
}

/// A compiled rule file starts with the magic constant.
fn starts_with_magic(file: &File) -> Result<bool> {
    let mut head = [0u8; 4];
    let peek = match (&*file).read_exact(&mut head) {
        Ok(()) => u32::from_le_bytes(head) == COMPILED_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };
    (&*file).seek(SeekFrom::Start(0))?;
    Ok(peek)
}

fn load_one(target: &mut LoadTarget<'_>, path: &Path, file: File) -> Result<()> {
    if starts_with_magic(&file)? {
        let region = target.pool.map(&file)?;
        binary::load_compiled(target, path, region)?;
        if let Some(digest) = target.digest.as_deref_mut() {
            digest.add_specfile(path, region);
        }
    } else {
        let mut contents = String::new();
        (&file).read_to_string(&mut contents).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                Error::Parse {
                    path: path.to_path_buf(),
                    line: 0,
                    reason: "rule file is not valid UTF-8".to_string(),
                }
            } else {
                e.into()
            }
        })?;
        text::process_text(target, path, &contents)?;
        if let Some(digest) = target.digest.as_deref_mut() {
            digest.add_specfile(path, contents.as_bytes());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::time::Duration;

    fn set_mtime(path: &Path, t: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(t).unwrap();
    }

    #[test]
    fn newest_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file_contexts");
        fs::write(&base, "text").unwrap();
        let bin = append_suffix(&base, "bin");
        fs::write(&bin, "bin").unwrap();

        let now = SystemTime::now();
        set_mtime(&base, now);
        set_mtime(&bin, now - Duration::from_secs(60));

        let (path, _) = open_file(&base, None, false).unwrap().unwrap();
        assert_eq!(path, base);
    }

    #[test]
    fn timestamp_tie_prefers_compiled() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file_contexts");
        fs::write(&base, "text").unwrap();
        let bin = append_suffix(&base, "bin");
        fs::write(&bin, "bin").unwrap();

        let now = SystemTime::now();
        set_mtime(&base, now);
        set_mtime(&bin, now);

        let (path, _) = open_file(&base, None, false).unwrap().unwrap();
        assert_eq!(path, bin);
    }

    #[test]
    fn oldest_pass_inverts_preference() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file_contexts");
        fs::write(&base, "text").unwrap();
        let bin = append_suffix(&base, "bin");
        fs::write(&bin, "bin").unwrap();

        let now = SystemTime::now();
        set_mtime(&base, now);
        set_mtime(&bin, now - Duration::from_secs(60));

        let (path, _) = open_file(&base, None, true).unwrap().unwrap();
        assert_eq!(path, bin);

        // On a tie the oldest pass keeps the plain file.
        set_mtime(&bin, now);
        let (path, _) = open_file(&base, None, true).unwrap().unwrap();
        assert_eq!(path, base);
    }

    #[test]
    fn missing_candidates_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("absent");
        assert!(open_file(&base, None, false).unwrap().is_none());
    }

    #[test]
    fn magic_peek_detects_compiled_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&COMPILED_MAGIC.to_le_bytes()).unwrap();
        tmp.write_all(b"rest").unwrap();
        tmp.flush().unwrap();
        let file = File::open(tmp.path()).unwrap();
        assert!(starts_with_magic(&file).unwrap());
        // The peek must leave the cursor at the start.
        let mut head = [0u8; 4];
        (&file).read_exact(&mut head).unwrap();
        assert_eq!(u32::from_le_bytes(head), COMPILED_MAGIC);
    }

    #[test]
    fn short_files_are_not_compiled() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"/x").unwrap();
        tmp.flush().unwrap();
        let file = File::open(tmp.path()).unwrap();
        assert!(!starts_with_magic(&file).unwrap());
    }
}
