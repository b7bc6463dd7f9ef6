//! The disassembler's structured output: the "MachineInst (input contract)" of `SPEC_FULL.md`
//! §3, reduced to the typed shape C2 actually dispatches on.
//!
//! The specification describes the wire contract as `{opcode: u16, operands: [Operand], size,
//! offset}` with memory operands packed positionally into the operand list. Per the §9 design
//! note ("model memory operands once as a record... provide one read and one write entry
//! point"), this crate applies the same once-not-per-callsite treatment to the opcode itself:
//! [`Opcode`] is a closed enum rather than a raw `u16`, and operand *shape* (register vs.
//! immediate vs. memory, and which of `rr`/`rm`/`mr`/`ri`/`mi` a given instruction is) is read
//! off the [`Operand`] list at lowering time instead of being pre-classified by a second tag.
//! Operation width is still its own field, since one mnemonic (`ADD`, `MOV`, ...) covers 8/32/64
//! bit forms that share every other property.

use smallvec::SmallVec;

use crate::ir::condcodes::JccCondition;

/// An x86-64 general-purpose or segment register, named the way the original LLVM-derived
/// disassembler names them (`AL`, `EAX`, `RAX`, ... plus the four segment registers the memory
/// operand's `seg` slot can carry). [`RegId::NoRegister`] is the sentinel for an unused operand
/// slot described in §3.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RegId {
    Al, Ah, Ax, Eax, Rax,
    Bl, Bh, Bx, Ebx, Rbx,
    Cl, Ch, Cx, Ecx, Rcx,
    Dl, Dh, Dx, Edx, Rdx,
    Sil, Si, Esi, Rsi,
    Dil, Di, Edi, Rdi,
    Bpl, Bp, Ebp, Rbp,
    Spl, Sp, Esp, Rsp,
    R8b, R8w, R8d, R8,
    R9b, R9w, R9d, R9,
    R10b, R10w, R10d, R10,
    R11b, R11w, R11d, R11,
    R12b, R12w, R12d, R12,
    R13b, R13w, R13d, R13,
    R14b, R14w, R14d, R14,
    R15b, R15w, R15d, R15,
    Cs, Ds, Es, Ss, Fs, Gs,
    /// Sentinel meaning "this operand slot is unused" (§3).
    NoRegister,
}

/// The width an instruction operates at. Carried as its own `MachineInst` field (the table in
/// `SPEC_FULL.md` §4.2 lists width as a column of the opcode family, not of the mnemonic).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    pub const fn bits(self) -> u32 {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }
}

/// A memory operand, modeled once as the record the §9 design note asks for:
/// `addr = seg_base(seg) + base + disp + index * scale` (§4.2).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct MemOperand {
    pub base: RegId,
    pub scale: i64,
    pub index: RegId,
    pub disp: i64,
    pub seg: RegId,
}

/// One decoded operand slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Operand {
    Reg(RegId),
    /// Already sign-extended to 64 bits by the disassembler collaborator, whatever the source
    /// immediate's encoded width was (see the note on `MOV64ri32` in [`crate::lift::mov`]).
    Imm(i64),
    Mem(MemOperand),
}

/// The closed set of opcode families from `SPEC_FULL.md` §4.2's table. `Jcc` carries which of
/// the sixteen conditions it tests (shared with `BRIF` lowering via [`JccCondition`]).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Opcode {
    Mov,
    Lea,
    Push,
    Pop,
    Leave,
    Add,
    Sub,
    Inc,
    Dec,
    And,
    Or,
    Xor,
    Neg,
    Sar,
    Shr,
    Shl,
    Cmp,
    Test,
    Jmp,
    /// Indirect `JMP r` (§4.2, §9 open question: lowers to `Unreachable` by default).
    JmpReg,
    Jcc(JccCondition),
    CallRel,
    /// Indirect `CALL r`.
    CallReg,
    Ret,
    Nop,
    Hlt,
    RepPrefix,
    Syscall,
}

/// One decoded machine instruction: opcode, operand list, width, encoded size, and the
/// load-free byte offset it sits at (§3's "MachineInst (input contract)").
#[derive(Clone, Debug)]
pub struct MachineInst {
    pub opcode: Opcode,
    pub operands: SmallVec<[Operand; 4]>,
    pub width: Width,
    pub size: u8,
    pub offset: u64,
}

impl MachineInst {
    pub fn new(opcode: Opcode, width: Width, size: u8, offset: u64, operands: &[Operand]) -> Self {
        MachineInst { opcode, operands: SmallVec::from_slice(operands), width, size, offset }
    }

    /// `off + sz`, the address of the instruction immediately following this one -- the base
    /// every relative branch displacement and `next_rip` computation (§4.2) is taken against.
    pub fn next_offset(&self) -> u64 {
        self.offset + u64::from(self.size)
    }
}

/// A straight-line run of [`MachineInst`]s, as the disassembler groups them (§3's glossary entry
/// for "MachineBlock").
#[derive(Clone, Debug, Default)]
pub struct MachineBasicBlock {
    pub insts: Vec<MachineInst>,
}

impl MachineBasicBlock {
    pub fn start_offset(&self) -> Option<u64> {
        self.insts.first().map(|i| i.offset)
    }
}

/// The disassembler's per-function output: an ordered collection of [`MachineBasicBlock`]s
/// (§3's glossary entry for "MachineFunction").
#[derive(Clone, Debug, Default)]
pub struct MachineFunction {
    pub blocks: Vec<MachineBasicBlock>,
}

impl MachineFunction {
    pub fn new(blocks: Vec<MachineBasicBlock>) -> Self {
        MachineFunction { blocks }
    }
}
