//! `ADD`/`SUB`/`INC`/`DEC`/`AND`/`OR`/`XOR`/`NEG`/`CMP`/`TEST` (§4.2's arithmetic and logic rows).
//!
//! Every handler here shares the same shape: read operand(s) at the instruction's width, compute
//! the result, optionally write it back, then drive the flag formulas from `crate::regs` that
//! correspond to this family's "Flags set" column.

use crate::config::LifterConfig;
use crate::emit::Cursor;
use crate::ir::instdata::BinOp;
use crate::ir::Module;
use crate::ir::Type;
use crate::machine::MachineInst;
use crate::regs::{self, Flag};

use super::{read_operand, write_operand};

fn binary_operands<'a>(minst: &'a MachineInst) -> (&'a crate::machine::Operand, &'a crate::machine::Operand) {
    match minst.operands.as_slice() {
        [dst, src] => (dst, src),
        other => unreachable!("binary arithmetic op with unexpected operand shape: {other:?}"),
    }
}

/// `ADD`: `AF,PF,ZF,SF,CF,OF`. `CF` follows [`LifterConfig::fix_add_carry`] (§9 open question).
pub fn lift_add(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst, config: &LifterConfig) {
    let (dst, src) = binary_operands(minst);
    let lhs = read_operand(cursor, module, ty, dst);
    let rhs = read_operand(cursor, module, ty, src);
    let result = cursor.binary(BinOp::Add, ty, lhs, rhs);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, lhs, rhs, result);
    regs::write_of(cursor, module, ty, lhs, rhs, result);
    if config.fix_add_carry {
        regs::write_cf_add_fixed(cursor, module, ty, lhs, result);
    } else {
        regs::write_cf_sub_template(cursor, module, ty, lhs, rhs);
    }
}

/// `SUB`: `AF,PF,ZF,SF,CF,OF`, `CF := lhs <u rhs`.
pub fn lift_sub(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let (dst, src) = binary_operands(minst);
    let lhs = read_operand(cursor, module, ty, dst);
    let rhs = read_operand(cursor, module, ty, src);
    let result = cursor.binary(BinOp::Sub, ty, lhs, rhs);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, lhs, rhs, result);
    regs::write_of(cursor, module, ty, lhs, rhs, result);
    regs::write_cf_sub_template(cursor, module, ty, lhs, rhs);
}

/// `CMP`: identical to `SUB`'s flag computation, without the writeback.
pub fn lift_cmp(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let (dst, src) = binary_operands(minst);
    let lhs = read_operand(cursor, module, ty, dst);
    let rhs = read_operand(cursor, module, ty, src);
    let result = cursor.binary(BinOp::Sub, ty, lhs, rhs);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, lhs, rhs, result);
    regs::write_of(cursor, module, ty, lhs, rhs, result);
    regs::write_cf_sub_template(cursor, module, ty, lhs, rhs);
}

/// `INC`/`DEC`: `AF,PF,ZF,SF,OF`; `CF` is explicitly left unchanged (§4.2's table), so neither
/// handler writes it.
pub fn lift_inc(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let dst = single_operand(minst);
    let val = read_operand(cursor, module, ty, dst);
    let one = cursor.iconst(ty, 1);
    let result = cursor.binary(BinOp::Add, ty, val, one);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, val, one, result);
    regs::write_of(cursor, module, ty, val, one, result);
}

pub fn lift_dec(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let dst = single_operand(minst);
    let val = read_operand(cursor, module, ty, dst);
    let one = cursor.iconst(ty, 1);
    let result = cursor.binary(BinOp::Sub, ty, val, one);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, val, one, result);
    regs::write_of(cursor, module, ty, val, one, result);
}

/// `NEG`: `result = 0 - val`; same flag set as `SUB`, with `lhs = 0`.
pub fn lift_neg(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let dst = single_operand(minst);
    let val = read_operand(cursor, module, ty, dst);
    let zero = cursor.iconst(ty, 0);
    let result = cursor.binary(BinOp::Sub, ty, zero, val);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::write_af(cursor, module, ty, zero, val, result);
    regs::write_of(cursor, module, ty, zero, val, result);
    regs::write_cf_sub_template(cursor, module, ty, zero, val);
}

/// `AND`/`OR`/`XOR`: `PF,ZF,SF` from the result; `CF`/`OF` unconditionally cleared.
pub fn lift_logic(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst, op: BinOp) {
    let (dst, src) = binary_operands(minst);
    let lhs = read_operand(cursor, module, ty, dst);
    let rhs = read_operand(cursor, module, ty, src);
    let result = cursor.binary(op, ty, lhs, rhs);
    write_operand(cursor, module, dst, result);

    regs::write_zsp(cursor, module, ty, result);
    regs::clear_flag(cursor, module, Flag::Cf);
    regs::clear_flag(cursor, module, Flag::Of);
}

/// `TEST`: `AND` without the writeback.
pub fn lift_test(cursor: &mut Cursor, module: &Module, ty: Type, minst: &MachineInst) {
    let (dst, src) = binary_operands(minst);
    let lhs = read_operand(cursor, module, ty, dst);
    let rhs = read_operand(cursor, module, ty, src);
    let result = cursor.binary(BinOp::And, ty, lhs, rhs);

    regs::write_zsp(cursor, module, ty, result);
    regs::clear_flag(cursor, module, Flag::Cf);
    regs::clear_flag(cursor, module, Flag::Of);
}

fn single_operand(minst: &MachineInst) -> &crate::machine::Operand {
    match minst.operands.as_slice() {
        [dst] => dst,
        other => unreachable!("unary arithmetic op with unexpected operand shape: {other:?}"),
    }
}
