//! Error type for compiled-file parsing

use std::fmt;

/// Errors raised while parsing a compiled rule file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// First four bytes are not the compiled-file magic
    BadMagic(u32),
    /// File version is newer than this library understands
    UnsupportedVersion(u32),
    /// A declared byte count would run past the end of the region
    Truncated { what: &'static str, want: usize, have: usize },
    /// A count or length field that must be non-zero was zero
    ZeroLength(&'static str),
    /// A length field exceeds what the format allows
    BadLength(&'static str),
    /// A string entry is missing its trailing NUL
    MissingNul(&'static str),
    /// A string entry is not valid UTF-8
    BadEncoding(&'static str),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic(magic) => {
                write!(f, "bad magic 0x{:08x}, not a compiled rule file", magic)
            }
            FormatError::UnsupportedVersion(vers) => {
                write!(f, "compiled file version {} is newer than supported", vers)
            }
            FormatError::Truncated { what, want, have } => {
                write!(f, "truncated {}: need {} bytes, {} left", what, want, have)
            }
            FormatError::ZeroLength(what) => write!(f, "zero-length {}", what),
            FormatError::BadLength(what) => write!(f, "implausible length for {}", what),
            FormatError::MissingNul(what) => {
                write!(f, "{} is not NUL-terminated", what)
            }
            FormatError::BadEncoding(what) => write!(f, "{} is not valid UTF-8", what),
        }
    }
}

impl std::error::Error for FormatError {}
