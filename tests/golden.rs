//! Golden-file check on the textual IR (§6.3 "persisted state"): the rendered form of the
//! trivial-leaf scenario (§8.2 #1) is pinned verbatim, with a unified diff on mismatch rather than
//! a bare `assert_eq!`, matching how `cranelift-filetests` reports CLIF expectation failures.

mod common;

use similar::TextDiff;

use saib_core::builder::LifterContext;
use saib_core::config::LifterConfig;
use saib_core::ir::write::write_module;
use saib_core::machine::{MachineBasicBlock, MachineFunction, MachineInst, Opcode, Operand, RegId, Width};

use common::{init_logging, MockDisasm, MockResolver, Section};
use std::str::FromStr;
use target_lexicon::Triple;

fn assert_golden(expected: &str, actual: &str) {
    if expected != actual {
        panic!(
            "rendered module does not match the pinned golden text:\n\n{}",
            TextDiff::from_lines(expected, actual).unified_diff().header("expected", "actual")
        );
    }
}

/// `mov rax, 42; ret` at `0x400100` (§8.2 scenario 1), rendered end to end through
/// [`write_module`]. Pins the exact textual form so a change to the writer, the block-naming
/// scheme, or the lowering of `MOV`/`RET` shows up as a readable diff instead of a silent drift.
#[test]
fn trivial_leaf_renders_to_the_pinned_golden_text() {
    init_logging();
    let mov = MachineInst::new(Opcode::Mov, Width::W64, 7, 0x400100, &[Operand::Reg(RegId::Rax), Operand::Imm(42)]);
    let ret = MachineInst::new(Opcode::Ret, Width::W64, 1, 0x400107, &[]);
    let mf = MachineFunction::new(vec![MachineBasicBlock { insts: vec![mov, ret] }]);
    let mut disasm =
        MockDisasm::new(Section { name: ".text".into(), start: 0x400000, end: 0x401000 }).with_function(0x400100, mf);
    let mut resolver = MockResolver::default();
    let mut ctx = LifterContext::new(
        Triple::from_str("x86_64-unknown-linux-gnu").unwrap(),
        LifterConfig::default(),
        &mut disasm,
        &mut resolver,
    );
    ctx.decompile_function(0x400100).unwrap().unwrap();

    let mut out = String::new();
    write_module(&ctx.module, &mut out).unwrap();

    let expected = "; target x86_64-unknown-linux-gnu\n\
declare void @saib_collect_indirect(i64)\n\
function sub_0x400100(\"Address\"=\"4194560\") {\n\
bb_4194560:\n\
    v0 = iconst.i64 4194567  ; @0x400100\n\
    global_store @RIP, v0  ; @0x400100\n\
    v1 = iconst.i64 42  ; @0x400100\n\
    global_store @RAX, v1  ; @0x400100\n\
    v2 = iconst.i64 4194568  ; @0x400107\n\
    global_store @RIP, v2  ; @0x400107\n\
    v3 = global_load.i64 @RSP  ; @0x400107\n\
    v4 = iconst.i64 8  ; @0x400107\n\
    v5 = iadd.i64 v3, v4  ; @0x400107\n\
    v6 = load.i64 v3  ; @0x400107\n\
    global_store @RIP, v6  ; @0x400107\n\
    global_store @RSP, v5  ; @0x400107\n\
    return  ; @0x400107\n\
}\n\n";

    assert_golden(expected, &out);
}
