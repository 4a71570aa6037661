//! Regex engine wrapper
//!
//! Rule patterns are matched with dense DFAs from `regex-automata`. A DFA
//! gives the three contracts the backend needs from its engine:
//!
//! - anchored whole-key matching,
//! - partial matching (the key is a viable prefix of some full match),
//! - a serialized compiled form that a compiled rule file can carry, valid
//!   only for the build that produced it.
//!
//! The serialized form is tied to the engine's wire format and to the target
//! architecture. [`engine_version`] and [`arch_string`] identify both; a
//! compiled rule file records them so a loader can decide whether stored
//! DFAs can be adopted or the pattern must be recompiled from source.

use regex_automata::dfa::{dense, Automaton, StartKind};
use regex_automata::util::syntax;
use regex_automata::{Anchored, Input, MatchKind};
use std::fmt;

/// Fingerprint of the serialized DFA format this build produces.
pub fn engine_version() -> &'static str {
    "regex-automata-dense-0.4"
}

/// Compatibility domain of a serialized DFA: target arch and endianness.
pub fn arch_string() -> String {
    let endian = if cfg!(target_endian = "little") {
        "el"
    } else {
        "eb"
    };
    format!("{}-{}", std::env::consts::ARCH, endian)
}

/// Error from the regex engine (bad pattern, corrupt serialized DFA, or an
/// unexpected state during a match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxError(pub(crate) String);

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RxError {}

/// Outcome of matching a key against a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The whole key matched.
    Match,
    /// The key is a proper prefix of some string the pattern accepts.
    PartialMatch,
    /// No match, and no continuation of the key could match.
    NoMatch,
}

/// An anchored, compiled rule pattern.
#[derive(Debug)]
pub struct CompiledRegex {
    dfa: dense::DFA<Vec<u32>>,
}

impl CompiledRegex {
    /// Compile `pattern` anchored on both ends.
    ///
    /// Patterns are byte-oriented: `.` never consumes more than one byte and
    /// the haystack is not required to be UTF-8 between match boundaries.
    pub fn anchored(pattern: &str) -> Result<CompiledRegex, RxError> {
        let anchored = format!("^{}$", pattern);
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .start_kind(StartKind::Anchored)
                    .match_kind(MatchKind::All),
            )
            .syntax(syntax::Config::new().unicode(false).utf8(false))
            .build(&anchored)
            .map_err(|e| RxError(e.to_string()))?;
        Ok(CompiledRegex { dfa })
    }

    /// Match `text` against the pattern, walking the DFA byte by byte.
    ///
    /// A live (non-dead) state after the last byte means some continuation
    /// of `text` could still match, which is exactly the partial-match
    /// answer callers probing directory prefixes want.
    pub fn matches(&self, text: &str) -> Result<Outcome, RxError> {
        let input = Input::new(text).anchored(Anchored::Yes);
        let mut sid = self
            .dfa
            .start_state_forward(&input)
            .map_err(|e| RxError(e.to_string()))?;

        for &byte in text.as_bytes() {
            sid = self.dfa.next_state(sid, byte);
            if self.dfa.is_special_state(sid) {
                if self.dfa.is_dead_state(sid) {
                    return Ok(Outcome::NoMatch);
                }
                if self.dfa.is_quit_state(sid) {
                    return Err(RxError("dfa entered a quit state".to_string()));
                }
            }
        }

        let eoi = self.dfa.next_eoi_state(sid);
        if self.dfa.is_match_state(eoi) {
            Ok(Outcome::Match)
        } else {
            Ok(Outcome::PartialMatch)
        }
    }

    /// Serialize the compiled DFA for embedding in a compiled rule file.
    /// The bytes are only loadable on a host whose [`engine_version`] and
    /// [`arch_string`] both match the writer's.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (bytes, padding) = self.dfa.to_bytes_native_endian();
        bytes[padding..].to_vec()
    }

    /// Deserialize a DFA stored by [`CompiledRegex::to_bytes`].
    ///
    /// The blob usually comes straight out of a mapped region with no
    /// alignment guarantee, so it is re-homed into a `u32`-aligned buffer
    /// before validation.
    pub fn from_bytes(blob: &[u8]) -> Result<CompiledRegex, RxError> {
        let mut buf = vec![0u8; blob.len() + 3];
        let off = buf.as_ptr().align_offset(4);
        buf[off..off + blob.len()].copy_from_slice(blob);
        let (dfa, _) = dense::DFA::from_bytes(&buf[off..off + blob.len()])
            .map_err(|e| RxError(e.to_string()))?;
        Ok(CompiledRegex {
            dfa: dfa.to_owned(),
        })
    }

    /// Structural equality of two compiled patterns.
    pub fn equivalent(&self, other: &CompiledRegex) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}
