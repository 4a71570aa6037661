//! Default specfile locations
//!
//! The process-wide configuration of the original system (default rule file
//! path, substitution file paths) is modeled as a value handed to the opener
//! instead of global state, so tests and embedders can point the backend at
//! any directory tree.

use std::path::{Path, PathBuf};

/// Filesystem locations used when the opener is given no explicit paths.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Default rule file, used when no `path()` option is supplied.
    pub file_contexts: PathBuf,
    /// Local substitution overlay.
    pub subs: PathBuf,
    /// Distribution substitution overlay.
    pub subs_dist: PathBuf,
}

impl Environment {
    /// Environment rooted at a contexts directory; the conventional file
    /// names are appended.
    pub fn rooted_at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Environment {
            file_contexts: dir.join("file_contexts"),
            subs: dir.join("file_contexts.subs"),
            subs_dist: dir.join("file_contexts.subs_dist"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::rooted_at("/etc/selinux/targeted/contexts/files")
    }
}
