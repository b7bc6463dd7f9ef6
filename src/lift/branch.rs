//! `JMP`/`JMP r`/`Jcc` (§4.2's branch rows). Call-bearing control flow (`CALL`/`CALL r`/`RET`)
//! lives in [`super::call`]/[`super::stack`]; this module only ever produces `Jump`/`Brif`/
//! `Unreachable` terminators.

use crate::config::LifterConfig;
use crate::emit::Cursor;
use crate::ir::condcodes::JccCondition;
use crate::ir::entities::Block;
use crate::ir::Module;
use crate::machine::{MachineInst, Operand, RegId};
use crate::regs::{self, Flag};

/// `JMP rel8/rel32`: unconditional branch to the already-resolved target block.
pub fn lift_jmp(cursor: &mut Cursor, target: Block) {
    cursor.jump(target);
}

/// Build the `i1` predicate for one of the sixteen `Jcc` mnemonics from the flags they read
/// (`SPEC_FULL.md` §4.2's condition table, mirrored in [`JccCondition`]'s doc comments).
fn build_condition(cursor: &mut Cursor, module: &Module, cond: JccCondition) -> crate::ir::entities::Value {
    let flag = |cursor: &mut Cursor, f: Flag| regs::read_flag(cursor, module, f);
    match cond {
        JccCondition::Equal => flag(cursor, Flag::Zf),
        JccCondition::NotEqual => {
            let zf = flag(cursor, Flag::Zf);
            cursor.not1(zf)
        }
        JccCondition::Above => {
            let cf = flag(cursor, Flag::Cf);
            let zf = flag(cursor, Flag::Zf);
            let not_cf = cursor.not1(cf);
            let not_zf = cursor.not1(zf);
            cursor.and1(not_cf, not_zf)
        }
        JccCondition::AboveOrEqual => {
            let cf = flag(cursor, Flag::Cf);
            cursor.not1(cf)
        }
        JccCondition::Below => flag(cursor, Flag::Cf),
        JccCondition::BelowOrEqual => {
            let cf = flag(cursor, Flag::Cf);
            let zf = flag(cursor, Flag::Zf);
            cursor.or1(cf, zf)
        }
        JccCondition::Greater => {
            let zf = flag(cursor, Flag::Zf);
            let sf = flag(cursor, Flag::Sf);
            let of = flag(cursor, Flag::Of);
            let not_zf = cursor.not1(zf);
            let sf_eq_of = flags_equal(cursor, sf, of);
            cursor.and1(not_zf, sf_eq_of)
        }
        JccCondition::GreaterOrEqual => {
            let sf = flag(cursor, Flag::Sf);
            let of = flag(cursor, Flag::Of);
            flags_equal(cursor, sf, of)
        }
        JccCondition::Less => {
            let sf = flag(cursor, Flag::Sf);
            let of = flag(cursor, Flag::Of);
            let eq = flags_equal(cursor, sf, of);
            cursor.not1(eq)
        }
        JccCondition::LessOrEqual => {
            let zf = flag(cursor, Flag::Zf);
            let sf = flag(cursor, Flag::Sf);
            let of = flag(cursor, Flag::Of);
            let eq = flags_equal(cursor, sf, of);
            let ne = cursor.not1(eq);
            cursor.or1(zf, ne)
        }
        JccCondition::Overflow => flag(cursor, Flag::Of),
        JccCondition::NotOverflow => {
            let of = flag(cursor, Flag::Of);
            cursor.not1(of)
        }
        JccCondition::Sign => flag(cursor, Flag::Sf),
        JccCondition::NotSign => {
            let sf = flag(cursor, Flag::Sf);
            cursor.not1(sf)
        }
        JccCondition::Parity => flag(cursor, Flag::Pf),
        JccCondition::NotParity => {
            let pf = flag(cursor, Flag::Pf);
            cursor.not1(pf)
        }
    }
}

/// `a == b` for two `i1` values, built from `BoolAnd`/`BoolOr`/`Not` rather than an `i1` `Icmp`
/// (this IR's `Icmp` is typed over the arithmetic width family, not booleans).
fn flags_equal(cursor: &mut Cursor, a: crate::ir::entities::Value, b: crate::ir::entities::Value) -> crate::ir::entities::Value {
    let not_a = cursor.not1(a);
    let not_b = cursor.not1(b);
    let both_true = cursor.and1(a, b);
    let both_false = cursor.and1(not_a, not_b);
    cursor.or1(both_true, both_false)
}

/// `Jcc`: conditional branch to `taken` if the flag predicate holds, `fallthrough` otherwise.
pub fn lift_jcc(cursor: &mut Cursor, module: &Module, cond: JccCondition, taken: Block, fallthrough: Block) {
    let pred = build_condition(cursor, module, cond);
    cursor.brif(pred, taken, fallthrough);
}

/// Indirect `JMP r` (§9 open question): lowers to `Unreachable` by default. When
/// [`LifterConfig::indirect_jmp_collects`] is set, the target is first routed through
/// `saib_collect_indirect`, matching the treatment indirect `CALL` always gets
/// (`original_source/lib/CodeInv/IREmitter.cpp`'s indirect-call path).
pub fn lift_jmp_reg(cursor: &mut Cursor, module: &Module, minst: &MachineInst, config: &LifterConfig) {
    if config.indirect_jmp_collects {
        let reg = match minst.operands.as_slice() {
            [Operand::Reg(r)] => *r,
            other => unreachable!("JMP r with unexpected operand shape: {other:?}"),
        };
        let target = regs::read_register(cursor, module, reg);
        cursor.call1(module.collect_indirect, target);
    }
    cursor.unreachable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Function;
    use std::str::FromStr;
    use target_lexicon::Triple;

    fn harness() -> (Module, Function) {
        (Module::new(Triple::from_str("x86_64-unknown-linux-gnu").unwrap()), Function::new("f", Some(0)))
    }

    #[test]
    fn je_reads_only_zf() {
        let (module, mut func) = harness();
        let entry = func.layout.make_block(0);
        let mut cursor = Cursor::new(&mut func, entry, 0);
        let _ = build_condition(&mut cursor, &module, JccCondition::Equal);
        let reads_zf = func.layout.block_insts(entry).iter().any(|&inst| {
            matches!(
                func.dfg.inst_data(inst).kind,
                crate::ir::instdata::InstKind::GlobalLoad { global, .. }
                    if matches!(module.global_data(global), crate::ir::module::GlobalData::Flag(Flag::Zf))
            )
        });
        assert!(reads_zf);
    }

    #[test]
    fn indirect_jmp_defaults_to_unreachable_without_a_collect_call() {
        let (module, mut func) = harness();
        let entry = func.layout.make_block(0);
        let mut cursor = Cursor::new(&mut func, entry, 0);
        let minst = crate::machine::MachineInst::new(
            crate::machine::Opcode::JmpReg,
            crate::machine::Width::W64,
            2,
            0,
            &[Operand::Reg(RegId::Rax)],
        );
        lift_jmp_reg(&mut cursor, &module, &minst, &LifterConfig::default());
        let insts: Vec<_> = func.layout.block_insts(entry).to_vec();
        assert_eq!(insts.len(), 1);
        assert!(matches!(func.dfg.inst_data(insts[0]).kind, crate::ir::instdata::InstKind::Unreachable));
    }
}
