//! The instruction set of the emitted IR.
//!
//! This is deliberately small: it is not a general-purpose compiler IR (no vectors, no floats,
//! no phis -- see the note in `SPEC_FULL.md` §3 about why register/flag state makes phis
//! unnecessary here), just enough to express integer arithmetic, loads/stores against the
//! register-cell/memory model of C1, and the branch-class terminators C2/C3 need.

use smallvec::SmallVec;

use crate::ir::condcodes::IntCC;
use crate::ir::entities::{Block, FuncRef, Global, Value};
use crate::ir::types::Type;

/// A binary integer operator. Shared by arithmetic, logic and shift handlers so that flag
/// formulas (§4.1) can be written once against `BinOp` rather than once per opcode.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BinOp {
    Add,
    Sub,
    /// Used only by memory-operand address computation (`index * scale`, §4.2); no opcode
    /// family in the §4.2 table needs a general integer multiply.
    Mul,
    And,
    Or,
    Xor,
    Shl,
    /// Logical right shift (`SHR`).
    Lshr,
    /// Arithmetic right shift (`SAR`).
    Ashr,
}

/// Up to four call arguments inline before spilling to the heap; `saib_collect_indirect` and
/// PLT stubs never need more than one or two.
pub type ValueList = SmallVec<[Value; 4]>;

/// The payload of one IR instruction.
///
/// Every variant that produces a value is paired with a `result: Option<Value>` in
/// [`super::dfg::InstData`] rather than embedding the result type here; this keeps the type
/// small and matches how very similar variants (e.g. a load and a global-load) only differ in
/// how the result is produced, not in the shape of the data.
#[derive(Clone, Debug)]
pub enum InstKind {
    /// A constant of the given type.
    IConst { ty: Type, imm: i64 },

    /// Load `ty` bits from the address in `ptr`.
    Load { ty: Type, ptr: Value },
    /// Store `val` to the address in `ptr`.
    Store { val: Value, ptr: Value },

    /// Read a process-wide global cell (a canonical register, a flag, or a segment base).
    GlobalLoad { ty: Type, global: Global },
    /// Write a process-wide global cell.
    GlobalStore { global: Global, val: Value },

    /// A two-operand integer operator at a fixed width.
    Binary { op: BinOp, ty: Type, lhs: Value, rhs: Value },
    /// Two's-complement negation (`NEG`).
    Neg { ty: Type, val: Value },
    /// Bitwise complement, used to build `¬CF`/`¬ZF`-style flag predicates; always produces `i1`.
    Not { val: Value },
    /// Boolean AND/OR over `i1` values, used to combine Jcc predicates.
    BoolAnd { lhs: Value, rhs: Value },
    BoolOr { lhs: Value, rhs: Value },

    /// An integer comparison, producing `i1`.
    Icmp { cc: IntCC, ty: Type, lhs: Value, rhs: Value },

    /// Truncate to a narrower type.
    Trunc { ty: Type, val: Value },
    /// Zero-extend to a wider type.
    Zext { ty: Type, val: Value },
    /// Sign-extend to a wider type.
    Sext { ty: Type, val: Value },

    /// A direct call to a known callee. `result` is `None` for void callees (every callee in
    /// this IR is void: see §6.2 -- all decompiled functions and `saib_collect_indirect` return
    /// nothing the lifter models).
    Call { callee: FuncRef, args: ValueList },

    /// An opaque no-op intrinsic: `NOP`, `HLT`, a `REP` prefix standing alone, or `SYSCALL`.
    /// Carries the mnemonic purely for the textual IR / debugging.
    Intrinsic { name: &'static str },

    /// Unconditional branch.
    Jump { target: Block },
    /// Conditional branch: `cond` must be an `i1` value.
    Brif { cond: Value, then_block: Block, else_block: Block },
    /// Function return.
    Return,
    /// Execution cannot continue past this point (indirect jump target, failed split, dead code
    /// after a no-return call).
    Unreachable,
}

impl InstKind {
    /// Whether this instruction ends a basic block. Mirrors the "terminated" predicate from
    /// §3: branch, conditional branch, return, or unreachable.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Jump { .. }
                | InstKind::Brif { .. }
                | InstKind::Return
                | InstKind::Unreachable
        )
    }

    /// The successor blocks of a terminator, in `(taken, not-taken)` order for `Brif`.
    pub fn successors(&self) -> SmallVec<[Block; 2]> {
        match self {
            InstKind::Jump { target } => SmallVec::from_slice(&[*target]),
            InstKind::Brif { then_block, else_block, .. } => {
                SmallVec::from_slice(&[*then_block, *else_block])
            }
            _ => SmallVec::new(),
        }
    }
}
