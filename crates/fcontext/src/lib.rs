//! fcontext - File-Context Labeling Backend
//!
//! fcontext loads a corpus of pathname-pattern to security-label rules and,
//! given a concrete filesystem path, returns the best matching label. It is
//! the resolver used during filesystem relabeling, daemon startup and
//! per-file policy lookup.
//!
//! # Quick Start
//!
//! ```no_run
//! use fcontext::{mode, FileContexts};
//!
//! let fc = FileContexts::from("testdata/file_contexts").open()?;
//!
//! // Label for a regular file
//! if let Some(label) = fc.lookup("/etc/passwd", mode::REGULAR)? {
//!     println!("{}", label.raw);
//! }
//!
//! // Could anything under this directory be labeled?
//! if fc.partial_match("/var/log")? {
//!     println!("worth descending");
//! }
//! # Ok::<(), fcontext::Error>(())
//! ```
//!
//! # Key Behaviors
//!
//! - **Last match wins**: later rules override earlier ones, and a literal
//!   pathname rule overrides any regex rule that also matches
//! - **Stem narrowing**: rules are pruned by their leading path segment
//!   before any regex runs
//! - **Compiled rule files**: a `.bin` companion produced by
//!   [`FileContexts::write_compiled`] loads by memory mapping, borrowing
//!   patterns and adopting pre-compiled regexes when the engine build and
//!   architecture match
//! - **Overlays**: `.homedirs` / `.local` rule overlays and `.subs` /
//!   `.subs_dist` path substitutions merge atop the base file
//!
//! # Architecture
//!
//! ```text
//! text rule file ──┐
//!                  ├──> stem table + spec store ──> sort ──> lookup scan
//! compiled file ───┘         │
//!   (mmap, borrowed)         └──> compiled writer (.bin)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cmp;
mod compile;
mod digest;
mod env;
mod error;
mod handle;
mod load;
mod mmap;
/// File-type mode bits used to restrict rules to one kind of file
pub mod mode;
mod rx;
mod spec;
mod stem;
mod subs;

pub use crate::cmp::CmpResult;
pub use crate::digest::SpecfileDigest;
pub use crate::env::Environment;
pub use crate::error::{Error, FormatError, Result};
pub use crate::handle::{ContextValidator, FileContexts, FileContextsBuilder};
pub use crate::spec::{Label, NONE_CONTEXT};

/// Library version string
pub const FCONTEXT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let mut parts = FCONTEXT_VERSION.split('.');
        assert!(parts.next().unwrap().parse::<u32>().is_ok());
        assert!(parts.next().unwrap().parse::<u32>().is_ok());
    }
}
