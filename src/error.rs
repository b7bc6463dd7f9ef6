//! Crate-level error taxonomy (`SPEC_FULL.md` §7, §11).
//!
//! Matches the teacher workspace's leaf-crate convention of a `thiserror`-derived enum rather
//! than a boxed `dyn Error` or a bespoke `Display` impl.

use thiserror::Error;

/// Fatal or propagated errors from `decompile_function`/`decompile`.
///
/// Per §7, not everything in the error taxonomy is an `Err`: split-target-not-found and
/// external-resolver misses are logged and locally contained (see [`crate::builder`]), so they
/// have no variant here.
#[derive(Debug, Error)]
pub enum LiftError {
    /// §7 "Unknown opcode": fatal, the lifter cannot proceed without semantics for this
    /// instruction. Aborts the in-flight function build; the caller must discard the function
    /// (or the whole `Module`, if it cannot tolerate a partially-built function).
    #[error("unknown opcode {opcode:?} at offset {offset:#x}")]
    UnknownOpcode { opcode: crate::machine::Opcode, offset: u64 },

    /// §7 "Decode error": the disassembler collaborator reported failure. Non-fatal to the
    /// overall run; `decompile_function` returns `Ok(None)` after this is logged once.
    #[error("failed to disassemble function at {addr:#x}: {reason}")]
    Decode { addr: u64, reason: String },

    /// §7 "Out-of-section address": `addr` lies outside the currently selected code section.
    #[error("address {addr:#x} lies outside the current code section")]
    OutOfSection { addr: u64 },
}
