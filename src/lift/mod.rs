//! C2: the instruction lifter.
//!
//! Implements §4.2's dispatch contract: for each [`MachineInst`], set the insertion point to the
//! end of the target block, stage `next_rip`, then hand off to the opcode family's handler. The
//! family handlers live in sibling modules, grouped the way the §4.2 table groups them.
//!
//! Branch-target blocks are resolved (`Function::get_or_create_block`) *before* a [`Cursor`] is
//! constructed for the instruction, since both need `&mut Function` and only one can hold it at
//! a time; the resolved [`Block`] handles are plain `Copy` values, so there is no lifetime
//! entanglement once that's done up front.

pub mod arith;
pub mod branch;
pub mod call;
pub mod mov;
pub mod shift;
pub mod stack;

use log::trace;

use crate::config::LifterConfig;
use crate::emit::Cursor;
use crate::error::LiftError;
use crate::external::{Disassembler, SymbolResolver};
use crate::ir::entities::{Block, Value};
use crate::ir::instdata::BinOp;
use crate::ir::{Function, Module, Type};
use crate::machine::{MachineInst, MemOperand, Opcode, Operand, RegId, Width};
use crate::regs;

pub(crate) fn width_ty(width: Width) -> Type {
    match width {
        Width::W8 => Type::I8,
        Width::W16 => Type::I16,
        Width::W32 => Type::I32,
        Width::W64 => Type::I64,
    }
}

/// `addr = seg_base(seg) + base + disp + index * scale` (§4.2).
pub(crate) fn lower_address(cursor: &mut Cursor, module: &Module, mem: &MemOperand) -> Value {
    let i64ty = Type::I64;
    let base = if mem.base == RegId::NoRegister {
        cursor.iconst(i64ty, 0)
    } else {
        regs::read_register(cursor, module, mem.base)
    };
    let index = if mem.index == RegId::NoRegister {
        cursor.iconst(i64ty, 0)
    } else {
        regs::read_register(cursor, module, mem.index)
    };
    let scale = cursor.iconst(i64ty, mem.scale);
    let scaled_index = cursor.binary(BinOp::Mul, i64ty, index, scale);
    let disp = cursor.iconst(i64ty, mem.disp);
    let seg = regs::seg_base(cursor, module, mem.seg);
    let sum1 = cursor.binary(BinOp::Add, i64ty, seg, base);
    let sum2 = cursor.binary(BinOp::Add, i64ty, sum1, disp);
    cursor.binary(BinOp::Add, i64ty, sum2, scaled_index)
}

/// Read an [`Operand`] at `ty`: a register read, an immediate constant, or a memory load.
pub(crate) fn read_operand(cursor: &mut Cursor, module: &Module, ty: Type, operand: &Operand) -> Value {
    match operand {
        Operand::Reg(r) => regs::read_register(cursor, module, *r),
        Operand::Imm(i) => cursor.iconst(ty, *i),
        Operand::Mem(mem) => {
            let addr = lower_address(cursor, module, mem);
            cursor.load(ty, addr)
        }
    }
}

/// Write `value` back to an [`Operand`] destination: a register write or a memory store.
/// Destinations are never immediates.
pub(crate) fn write_operand(cursor: &mut Cursor, module: &Module, operand: &Operand, value: Value) {
    match operand {
        Operand::Reg(r) => regs::write_register(cursor, module, *r, value),
        Operand::Mem(mem) => {
            let addr = lower_address(cursor, module, mem);
            cursor.store(value, addr);
        }
        Operand::Imm(_) => unreachable!("an immediate is never a write destination"),
    }
}

/// `target = off + sz + d` (§4.2's "Target address computation"), reading `d` off the
/// instruction's sole `Imm` operand.
fn rel_target(minst: &MachineInst) -> u64 {
    let disp = match minst.operands.as_slice() {
        [Operand::Imm(d)] => *d,
        other => unreachable!("relative branch with unexpected operand shape: {other:?}"),
    };
    (minst.next_offset() as i64 + disp) as u64
}

/// Stage `next_rip = offset + size` into the `RIP` cell (§4.2's pre-dispatch step), so a
/// subsequent `CALL` pushes the correct return address.
fn stage_next_rip(module: &Module, func: &mut Function, block: Block, minst: &MachineInst) {
    let mut cursor = Cursor::new(func, block, minst.offset);
    let next_rip = minst.next_offset();
    let imm = cursor.iconst(Type::I64, next_rip as i64);
    cursor.global_store(module.rip_global(), imm);
}

/// Dispatch one [`MachineInst`] into `block`, per §4.2's per-instruction contract.
///
/// Returns the fatal [`LiftError::UnknownOpcode`] if the opcode has no handler. Every other
/// opcode in the closed [`Opcode`] enum is handled, so in practice this always returns `Ok`
/// today; the `Result` return type is kept so a future opcode addition that legitimately can't
/// be lowered (rather than simply being unimplemented) has somewhere to report it, matching
/// §7's "Unknown opcode: fatal" taxonomy entry.
pub fn lift_instruction(
    module: &mut Module,
    func: &mut Function,
    block: Block,
    minst: &MachineInst,
    config: &LifterConfig,
    disasm: &mut dyn Disassembler,
    resolver: &mut dyn SymbolResolver,
) -> Result<(), LiftError> {
    trace!("lifting {:?} @ {:#x}", minst.opcode, minst.offset);

    stage_next_rip(module, func, block, minst);
    let ty = width_ty(minst.width);

    match minst.opcode {
        Opcode::Jmp => {
            let target = func.get_or_create_block(rel_target(minst));
            let mut cursor = Cursor::new(func, block, minst.offset);
            branch::lift_jmp(&mut cursor, target);
        }
        Opcode::Jcc(cond) => {
            let taken = func.get_or_create_block(rel_target(minst));
            let fallthrough = func.get_or_create_block(minst.next_offset());
            let mut cursor = Cursor::new(func, block, minst.offset);
            branch::lift_jcc(&mut cursor, module, cond, taken, fallthrough);
        }
        Opcode::JmpReg => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            branch::lift_jmp_reg(&mut cursor, module, minst, config);
        }
        Opcode::CallRel => {
            let target = rel_target(minst);
            let mut cursor = Cursor::new(func, block, minst.offset);
            call::lift_call_rel(module, &mut cursor, target, disasm, resolver);
        }
        Opcode::CallReg => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            call::lift_call_reg(&mut cursor, module, minst);
        }
        Opcode::Mov => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            mov::lift_mov(&mut cursor, module, ty, minst);
        }
        Opcode::Lea => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            mov::lift_lea(&mut cursor, module, minst);
        }
        Opcode::Push => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            stack::lift_push(&mut cursor, module, minst);
        }
        Opcode::Pop => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            stack::lift_pop(&mut cursor, module, minst);
        }
        Opcode::Leave => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            stack::lift_leave(&mut cursor, module);
        }
        Opcode::Ret => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            stack::lift_ret(&mut cursor, module);
        }
        Opcode::Add => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_add(&mut cursor, module, ty, minst, config);
        }
        Opcode::Sub => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_sub(&mut cursor, module, ty, minst);
        }
        Opcode::Inc => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_inc(&mut cursor, module, ty, minst);
        }
        Opcode::Dec => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_dec(&mut cursor, module, ty, minst);
        }
        Opcode::And => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_logic(&mut cursor, module, ty, minst, BinOp::And);
        }
        Opcode::Or => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_logic(&mut cursor, module, ty, minst, BinOp::Or);
        }
        Opcode::Xor => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_logic(&mut cursor, module, ty, minst, BinOp::Xor);
        }
        Opcode::Neg => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_neg(&mut cursor, module, ty, minst);
        }
        Opcode::Cmp => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_cmp(&mut cursor, module, ty, minst);
        }
        Opcode::Test => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            arith::lift_test(&mut cursor, module, ty, minst);
        }
        Opcode::Sar => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            shift::lift_shift(&mut cursor, module, ty, minst, shift::ShiftKind::Sar, config);
        }
        Opcode::Shr => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            shift::lift_shift(&mut cursor, module, ty, minst, shift::ShiftKind::Shr, config);
        }
        Opcode::Shl => {
            let mut cursor = Cursor::new(func, block, minst.offset);
            shift::lift_shift(&mut cursor, module, ty, minst, shift::ShiftKind::Shl, config);
        }
        Opcode::Nop => Cursor::new(func, block, minst.offset).intrinsic("nop"),
        Opcode::Hlt => Cursor::new(func, block, minst.offset).intrinsic("hlt"),
        Opcode::RepPrefix => Cursor::new(func, block, minst.offset).intrinsic("rep"),
        Opcode::Syscall => Cursor::new(func, block, minst.offset).intrinsic("syscall"),
    }

    Ok(())
}
