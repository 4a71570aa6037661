//! Wire format for compiled file-context rule files
//!
//! This crate defines the **format-level** pieces of the compiled rule file:
//! the magic constant, the version ladder, a bounds-checked little-endian
//! cursor for reading mapped regions, and the format error type. The loader
//! and writer that speak this format live in the `fcontext` crate; this crate
//! knows nothing about rules, stems or regexes.
//!
//! # File layout
//!
//! All integers little-endian, 32-bit unless noted.
//!
//! ```text
//! magic          u32   COMPILED_MAGIC
//! version        u32   <= MAX_VERS
//! engine version u32 len + bytes        (version >= VERS_ENGINE_VERSION)
//! engine arch    u32 len + bytes        (version >= VERS_ENGINE_ARCH)
//! stem count     u32   (> 0)
//!   per stem:    u32 len + bytes[len + 1], trailing NUL
//! spec count     u32   (> 0)
//!   per spec:    context      u32 len + bytes[len], last byte NUL
//!                pattern      u32 len + bytes[len], last byte NUL
//!                mode         u32
//!                stem id      i32
//!                has meta     u32
//!                prefix len   u32      (version >= VERS_PREFIX_LEN)
//!                regex blob   u32 len + bytes[len]   (engine-defined)
//! ```

mod cursor;
mod error;

pub use cursor::Cursor;
pub use error::FormatError;

/// Magic identifying a compiled rule file.
pub const COMPILED_MAGIC: u32 = 0xf97c_ff8a;

/// Oldest format: no engine fingerprint, narrow mode field.
pub const VERS_BASE: u32 = 1;

/// Adds the regex engine version string after the file version.
pub const VERS_ENGINE_VERSION: u32 = 2;

/// Mode field widened to a fixed u32.
pub const VERS_WIDE_MODE: u32 = 3;

/// Adds the fixed-prefix length per spec, for best-match ranking.
pub const VERS_PREFIX_LEN: u32 = 4;

/// Adds the regex engine arch string after the engine version.
pub const VERS_ENGINE_ARCH: u32 = 5;

/// Highest version this library understands.
pub const MAX_VERS: u32 = VERS_ENGINE_ARCH;
