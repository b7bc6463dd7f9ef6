//! `PUSH`/`POP`/`LEAVE`/`RET` (§4.2's stack-effects rows).

use crate::emit::Cursor;
use crate::ir::instdata::BinOp;
use crate::ir::Module;
use crate::ir::Type;
use crate::machine::{MachineInst, Operand, RegId};
use crate::regs;

/// Read `RSP`, offset it by `delta` (`+8` for a pop, `-8` for a push), and return both the old
/// and new values -- shared by every handler in this module.
fn adjust_rsp(cursor: &mut Cursor, module: &Module, delta: i64) -> (crate::ir::entities::Value, crate::ir::entities::Value) {
    let rsp = regs::read_register(cursor, module, RegId::Rsp);
    let op = if delta < 0 { BinOp::Sub } else { BinOp::Add };
    let magnitude = cursor.iconst(Type::I64, delta.abs());
    let new_rsp = cursor.binary(op, Type::I64, rsp, magnitude);
    (rsp, new_rsp)
}

/// `RSP -= 8` then store the register's value at the new `[RSP]`.
pub fn lift_push(cursor: &mut Cursor, module: &Module, minst: &MachineInst) {
    let reg = match minst.operands.as_slice() {
        [Operand::Reg(r)] => *r,
        other => unreachable!("PUSH with unexpected operand shape: {other:?}"),
    };
    let val = regs::read_register(cursor, module, reg);
    let (_, new_rsp) = adjust_rsp(cursor, module, -8);
    cursor.store(val, new_rsp);
    regs::write_register(cursor, module, RegId::Rsp, new_rsp);
}

/// Load `[RSP]` into the register, then `RSP += 8`.
pub fn lift_pop(cursor: &mut Cursor, module: &Module, minst: &MachineInst) {
    let reg = match minst.operands.as_slice() {
        [Operand::Reg(r)] => *r,
        other => unreachable!("POP with unexpected operand shape: {other:?}"),
    };
    let (rsp, new_rsp) = adjust_rsp(cursor, module, 8);
    let val = cursor.load(Type::I64, rsp);
    regs::write_register(cursor, module, reg, val);
    regs::write_register(cursor, module, RegId::Rsp, new_rsp);
}

/// `RSP := RBP; RBP := [RSP]; RSP += 8`.
pub fn lift_leave(cursor: &mut Cursor, module: &Module) {
    let rbp_val = regs::read_register(cursor, module, RegId::Rbp);
    regs::write_register(cursor, module, RegId::Rsp, rbp_val);
    let loaded = cursor.load(Type::I64, rbp_val);
    regs::write_register(cursor, module, RegId::Rbp, loaded);
    let eight = cursor.iconst(Type::I64, 8);
    let new_rsp = cursor.binary(BinOp::Add, Type::I64, rbp_val, eight);
    regs::write_register(cursor, module, RegId::Rsp, new_rsp);
}

/// Pop `[RSP]` into the `RIP` staging cell, `RSP += 8`, then emit the return terminator.
pub fn lift_ret(cursor: &mut Cursor, module: &Module) {
    let (rsp, new_rsp) = adjust_rsp(cursor, module, 8);
    let ret_addr = cursor.load(Type::I64, rsp);
    cursor.global_store(module.rip_global(), ret_addr);
    regs::write_register(cursor, module, RegId::Rsp, new_rsp);
    cursor.return_();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;
    use crate::machine::{MachineInst, Opcode, Width};
    use std::str::FromStr;
    use target_lexicon::Triple;

    #[test]
    fn ret_ends_the_block_with_a_return_terminator() {
        let module = Module::new(Triple::from_str("x86_64-unknown-linux-gnu").unwrap());
        let mut func = Function::new("f", Some(0));
        let entry = func.layout.make_block(0);
        let mut cursor = Cursor::new(&mut func, entry, 0);
        lift_ret(&mut cursor, &module);
        let last = *func.layout.block_insts(entry).last().unwrap();
        assert!(matches!(func.dfg.inst_data(last).kind, crate::ir::instdata::InstKind::Return));
    }

    #[test]
    fn push_then_pop_round_trips_through_rsp() {
        let module = Module::new(Triple::from_str("x86_64-unknown-linux-gnu").unwrap());
        let mut func = Function::new("f", Some(0));
        let entry = func.layout.make_block(0);
        let mut cursor = Cursor::new(&mut func, entry, 0);
        let push = MachineInst::new(Opcode::Push, Width::W64, 1, 0, &[Operand::Reg(RegId::Rax)]);
        lift_push(&mut cursor, &module, &push);
        let pop = MachineInst::new(Opcode::Pop, Width::W64, 1, 1, &[Operand::Reg(RegId::Rbx)]);
        lift_pop(&mut cursor, &module, &pop);
        // Both RSP writes should be present: one subtracting, one adding 8.
        let stores = func
            .layout
            .block_insts(entry)
            .iter()
            .filter(|&&inst| {
                matches!(
                    func.dfg.inst_data(inst).kind,
                    crate::ir::instdata::InstKind::GlobalStore { global, .. }
                        if global == module.register_global(crate::regs::GprFamily::Rsp)
                )
            })
            .count();
        assert_eq!(stores, 2);
    }
}
