//! Textual rendering of the IR.
//!
//! Per §6.3, the module's textual form is the only persisted artifact, and block names
//! (`bb_<offset>`) and the function `Address` attribute are load-bearing keys that downstream
//! tooling parses back out. This module is the one place that format is allowed to live.

use std::fmt::{self, Write};

use crate::ir::entities::{Block, FuncRef};
use crate::ir::function::Function;
use crate::ir::instdata::{BinOp, InstKind};
use crate::ir::module::{GlobalData, Module};
use crate::regs::{Flag, GprFamily};

/// `bb_<offset>`, the load-bearing block name described in §3 and §6.3.
pub fn block_name(func: &Function, block: Block) -> String {
    format!("bb_{}", func.layout.block_offset(block))
}

fn global_name(module: &Module, global: crate::ir::entities::Global) -> String {
    match module.global_data(global) {
        GlobalData::Register(family) => gpr_family_name(family).to_string(),
        GlobalData::Flag(flag) => flag_name(flag).to_string(),
        GlobalData::FsBase => "FS_BASE".to_string(),
        GlobalData::GsBase => "GS_BASE".to_string(),
        GlobalData::Rip => "RIP".to_string(),
    }
}

pub fn gpr_family_name(family: GprFamily) -> &'static str {
    use GprFamily::*;
    match family {
        Rax => "RAX",
        Rbx => "RBX",
        Rcx => "RCX",
        Rdx => "RDX",
        Rsi => "RSI",
        Rdi => "RDI",
        Rbp => "RBP",
        Rsp => "RSP",
        R8 => "R8",
        R9 => "R9",
        R10 => "R10",
        R11 => "R11",
        R12 => "R12",
        R13 => "R13",
        R14 => "R14",
        R15 => "R15",
    }
}

pub fn flag_name(flag: Flag) -> &'static str {
    use Flag::*;
    match flag {
        Of => "OF",
        Sf => "SF",
        Zf => "ZF",
        Af => "AF",
        Pf => "PF",
        Cf => "CF",
        Tf => "TF",
        If => "IF",
        Df => "DF",
        Nt => "NT",
        Rf => "RF",
    }
}

fn write_binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "iadd",
        BinOp::Sub => "isub",
        BinOp::Mul => "imul",
        BinOp::And => "band",
        BinOp::Or => "bor",
        BinOp::Xor => "bxor",
        BinOp::Shl => "ishl",
        BinOp::Lshr => "ushr",
        BinOp::Ashr => "sshr",
    }
}

/// Render an entire module, function by function, in declaration order.
pub fn write_module(module: &Module, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "; target {}", module.triple)?;
    writeln!(out, "declare void @saib_collect_indirect(i64)")?;
    for (func_ref, _) in module.functions() {
        if func_ref == module.collect_indirect {
            continue;
        }
        write_function(module, func_ref, out)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Render one function. A function with no blocks is printed as a bare declaration, matching
/// the "forward declaration" state described in §3.
pub fn write_function(module: &Module, func_ref: FuncRef, out: &mut impl Write) -> fmt::Result {
    let func = module.function(func_ref);
    match func.address {
        Some(addr) => write!(out, "function {}(\"Address\"=\"{addr}\") {{", func.name)?,
        None => write!(out, "function {}() {{", func.name)?,
    }
    if !func.is_defined() {
        return writeln!(out, "}}");
    }
    writeln!(out)?;
    for block in func.blocks() {
        writeln!(out, "{}:", block_name(func, block))?;
        for &inst in func.layout.block_insts(block) {
            let data = func.dfg.inst_data(inst);
            write!(out, "    ")?;
            if let Some(result) = data.result {
                write!(out, "{result} = ")?;
            }
            write_inst_kind(module, func, &data.kind, out)?;
            writeln!(out, "  ; @{:#x}", data.offset)?;
        }
    }
    writeln!(out, "}}")
}

fn write_inst_kind(module: &Module, func: &Function, kind: &InstKind, out: &mut impl Write) -> fmt::Result {
    match kind {
        InstKind::IConst { ty, imm } => write!(out, "iconst.{ty} {imm}"),
        InstKind::Load { ty, ptr } => write!(out, "load.{ty} {ptr}"),
        InstKind::Store { val, ptr } => write!(out, "store {val}, {ptr}"),
        InstKind::GlobalLoad { ty, global } => {
            write!(out, "global_load.{ty} @{}", global_name(module, *global))
        }
        InstKind::GlobalStore { global, val } => {
            write!(out, "global_store @{}, {val}", global_name(module, *global))
        }
        InstKind::Binary { op, ty, lhs, rhs } => write!(out, "{}.{ty} {lhs}, {rhs}", write_binop(*op)),
        InstKind::Neg { ty, val } => write!(out, "ineg.{ty} {val}"),
        InstKind::Not { val } => write!(out, "bnot {val}"),
        InstKind::BoolAnd { lhs, rhs } => write!(out, "band1 {lhs}, {rhs}"),
        InstKind::BoolOr { lhs, rhs } => write!(out, "bor1 {lhs}, {rhs}"),
        InstKind::Icmp { cc, ty, lhs, rhs } => write!(out, "icmp.{ty} {cc} {lhs}, {rhs}"),
        InstKind::Trunc { ty, val } => write!(out, "trunc.{ty} {val}"),
        InstKind::Zext { ty, val } => write!(out, "uextend.{ty} {val}"),
        InstKind::Sext { ty, val } => write!(out, "sextend.{ty} {val}"),
        InstKind::Call { callee, args } => {
            write!(out, "call {}(", module.function(*callee).name)?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write!(out, "{arg}")?;
            }
            write!(out, ")")
        }
        InstKind::Intrinsic { name } => write!(out, "intrinsic {name}"),
        InstKind::Jump { target } => write!(out, "jump {}", block_name(func, *target)),
        InstKind::Brif { cond, then_block, else_block } => write!(
            out,
            "brif {cond}, {}, {}",
            block_name(func, *then_block),
            block_name(func, *else_block)
        ),
        InstKind::Return => write!(out, "return"),
        InstKind::Unreachable => write!(out, "unreachable"),
    }
}
