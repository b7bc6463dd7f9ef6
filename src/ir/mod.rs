//! Intermediate representation.
//!
//! Laid out the way Cranelift splits its own `ir` module: entity reference newtypes, a small
//! fixed type universe, the instruction set, a data-flow graph (what each instruction is), a
//! layout (where each instruction sits), and the `Function`/`Module` containers that tie them
//! together. See `SPEC_FULL.md` §3 for the data model this implements.

pub mod condcodes;
pub mod dfg;
pub mod entities;
pub mod function;
pub mod instdata;
pub mod layout;
pub mod module;
pub mod types;
pub mod write;

pub use entities::{Block, FuncRef, Global, Inst, Value};
pub use function::Function;
pub use module::{GlobalData, Module};
pub use types::Type;
