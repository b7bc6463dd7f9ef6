//! IR entity references.
//!
//! Instructions, values, blocks and declared functions are not referenced through Rust
//! references: the IR is an arena of densely numbered entities (see [`crate::ir::function`]),
//! and entity references are thin `u32` indices into the arena that owns them. This keeps the
//! IR compact and sidesteps the borrow-checker friction of a graph of real references.
//!
//! Each entity kind gets its own newtype so that a `Value` can never be confused with a `Block`
//! or an `Inst` at the type level, even though all three are backed by a `u32`.

use core::fmt;

use cranelift_entity::entity_impl;

/// A reference to a [basic block](crate::ir::function::BlockData) inside a [`Function`](crate::ir::Function).
///
/// Blocks are named `bb_<offset>` in the textual IR, where `<offset>` is the load-free byte
/// offset of the block's first machine instruction (see [`crate::ir::function::BlockData::offset`]).
/// The `Block` type itself is just a dense arena index used internally; the `bb_` name is
/// derived from the block's recorded offset, not from this index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to the result of an instruction that produces one.
///
/// Not every instruction defines a `Value` (stores, branches and calls to void functions do
/// not), but every `Value` is defined by exactly one instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A reference to an instruction inside a function's [`DataFlowGraph`](crate::ir::dfg::DataFlowGraph).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A reference to a declared [`Function`](crate::ir::Function) inside a [`Module`](crate::ir::Module).
///
/// Every callable function -- whether fully decompiled, a forward declaration awaiting
/// decompilation, or an external PLT stub with no body -- has a `FuncRef`. Direct and indirect
/// calls both resolve to a `FuncRef` before they are lowered to IR.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncRef(u32);
entity_impl!(FuncRef, "fn");

/// A reference to a process-wide global cell: a canonical register, a flag bit, or one of the
/// two segment-base pseudo-registers. See [`crate::ir::module::GlobalData`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Global(u32);
entity_impl!(Global, "g");

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Debug for Inst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn entity_refs_are_distinct_types_over_the_same_index() {
        let b = Block::new(3);
        let v = Value::new(3);
        assert_eq!(b.index(), v.index());
        assert_eq!(b.to_string(), "block3");
        assert_eq!(v.to_string(), "v3");
    }
}
