//! Core x86-64 ELF machine-code-to-IR lifter.
//!
//! Three components, each in its own module tree: the register/flag model ([`regs`]), the
//! per-instruction lifter ([`lift`]), and the function builder that drives recursive-descent CFG
//! recovery ([`builder`]). [`ir`] is the typed intermediate representation they all emit into;
//! [`machine`] is the disassembler's input contract; [`external`] is the pair of collaborator
//! traits a caller implements against its own ELF loader and disassembler.
//!
//! ```no_run
//! use saib_core::builder::LifterContext;
//! use saib_core::config::LifterConfig;
//! use saib_core::external::{Disassembler, SymbolResolver};
//!
//! fn lift_one(disasm: &mut dyn Disassembler, resolver: &mut dyn SymbolResolver, entry: u64) {
//!     let triple = target_lexicon::Triple::host();
//!     let mut ctx = LifterContext::new(triple, LifterConfig::default(), disasm, resolver);
//!     let _ = ctx.decompile(entry);
//!     let mut text = String::new();
//!     saib_core::ir::write::write_module(&ctx.module, &mut text).unwrap();
//!     println!("{text}");
//! }
//! ```

pub mod builder;
pub mod config;
pub mod emit;
pub mod error;
pub mod external;
pub mod ir;
pub mod lift;
pub mod machine;
pub mod regs;

pub use builder::LifterContext;
pub use config::LifterConfig;
pub use error::LiftError;
