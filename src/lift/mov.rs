//! `MOV` and `LEA` (§4.2's table, first two rows).

use crate::emit::Cursor;
use crate::ir::Module;
use crate::ir::Type;
use crate::machine::{MachineInst, Operand};
use crate::regs;

use super::{lower_address, read_operand, write_operand};

/// `MOV` covers `r↔r`, `r↔m`, `m↔i`, `r↔i` at 8/32/64 bits.
///
/// The table's parenthetical "32→64 sign-extend for `MOV64ri32`" describes how the disassembler
/// collaborator must have decoded that encoding's raw 32-bit immediate field, not a further
/// transform this lifter performs: `Operand::Imm` already carries the fully sign-extended `i64`
/// (§3's operand contract), so a 64-bit-destination `MOV` with an immediate source is exactly as
/// uniform as every other `MOV` form here.
pub fn lift_mov(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let (dst, src) = match minst.operands.as_slice() {
        [dst, src] => (dst, src),
        other => unreachable!("MOV with unexpected operand shape: {other:?}"),
    };
    let val = read_operand(cursor, module, ty, src);
    write_operand(cursor, module, dst, val);
}

/// `LEA r, [base + idx*scale + disp]`: writes the computed address itself, never touching
/// memory.
pub fn lift_lea(cursor: &mut Cursor, module: &Module, minst: &MachineInst) {
    let (dst, mem) = match minst.operands.as_slice() {
        [Operand::Reg(dst), Operand::Mem(mem)] => (*dst, *mem),
        other => unreachable!("LEA with unexpected operand shape: {other:?}"),
    };
    let addr = lower_address(cursor, module, &mem);
    regs::write_register(cursor, module, dst, addr);
}
