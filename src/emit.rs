//! An insertion cursor for appending instructions to one block of one function.
//!
//! Cranelift threads a `FuncCursor`/`InstBuilder` pair through its lowering code so handlers
//! never have to know how `DataFlowGraph`/`Layout` are wired together; this is the same idea,
//! shrunk to this IR's instruction set. §4.2's "Sets the IR insertion point to the end of `BB`"
//! is exactly what constructing a `Cursor` for that block does -- appends always land at the
//! tail, there is no mid-block insertion.

use crate::ir::condcodes::IntCC;
use crate::ir::entities::{Block, FuncRef, Global, Value};
use crate::ir::instdata::{BinOp, InstKind, ValueList};
use crate::ir::{Function, Type};

/// Appends instructions to the end of `block` in `func`, tagging each with `offset` -- the
/// load-free byte offset of the machine instruction currently being lowered (§3's
/// "debug-location field").
pub struct Cursor<'f> {
    pub func: &'f mut Function,
    pub block: Block,
    pub offset: u64,
}

impl<'f> Cursor<'f> {
    pub fn new(func: &'f mut Function, block: Block, offset: u64) -> Self {
        Cursor { func, block, offset }
    }

    fn push_result(&mut self, kind: InstKind, ty: Type) -> Value {
        let (inst, value) = self.func.dfg.make_inst_result(kind, ty, self.offset);
        self.func.layout.append_inst(self.block, inst);
        value
    }

    fn push_void(&mut self, kind: InstKind) {
        let inst = self.func.dfg.make_inst(kind, self.offset);
        self.func.layout.append_inst(self.block, inst);
    }

    pub fn iconst(&mut self, ty: Type, imm: i64) -> Value {
        self.push_result(InstKind::IConst { ty, imm }, ty)
    }

    pub fn load(&mut self, ty: Type, ptr: Value) -> Value {
        self.push_result(InstKind::Load { ty, ptr }, ty)
    }

    pub fn store(&mut self, val: Value, ptr: Value) {
        self.push_void(InstKind::Store { val, ptr });
    }

    pub fn global_load(&mut self, ty: Type, global: Global) -> Value {
        self.push_result(InstKind::GlobalLoad { ty, global }, ty)
    }

    pub fn global_store(&mut self, global: Global, val: Value) {
        self.push_void(InstKind::GlobalStore { global, val });
    }

    pub fn binary(&mut self, op: BinOp, ty: Type, lhs: Value, rhs: Value) -> Value {
        self.push_result(InstKind::Binary { op, ty, lhs, rhs }, ty)
    }

    pub fn neg(&mut self, ty: Type, val: Value) -> Value {
        self.push_result(InstKind::Neg { ty, val }, ty)
    }

    /// Boolean complement (`¬CF`, `¬ZF`, ...); operates on and produces `i1`.
    pub fn not1(&mut self, val: Value) -> Value {
        self.push_result(InstKind::Not { val }, Type::I1)
    }

    pub fn and1(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_result(InstKind::BoolAnd { lhs, rhs }, Type::I1)
    }

    pub fn or1(&mut self, lhs: Value, rhs: Value) -> Value {
        self.push_result(InstKind::BoolOr { lhs, rhs }, Type::I1)
    }

    pub fn icmp(&mut self, cc: IntCC, ty: Type, lhs: Value, rhs: Value) -> Value {
        self.push_result(InstKind::Icmp { cc, ty, lhs, rhs }, Type::I1)
    }

    pub fn trunc(&mut self, ty: Type, val: Value) -> Value {
        self.push_result(InstKind::Trunc { ty, val }, ty)
    }

    pub fn zext(&mut self, ty: Type, val: Value) -> Value {
        self.push_result(InstKind::Zext { ty, val }, ty)
    }

    pub fn sext(&mut self, ty: Type, val: Value) -> Value {
        self.push_result(InstKind::Sext { ty, val }, ty)
    }

    /// Every callee in this IR is void (§6.2): decompiled functions, PLT stubs and
    /// `saib_collect_indirect` all return nothing the lifter models, so `call` never yields a
    /// `Value`.
    pub fn call(&mut self, callee: FuncRef, args: &[Value]) {
        let args: ValueList = smallvec::SmallVec::from_slice(args);
        self.push_void(InstKind::Call { callee, args });
    }

    pub fn call1(&mut self, callee: FuncRef, arg: Value) {
        self.call(callee, &[arg]);
    }

    pub fn intrinsic(&mut self, name: &'static str) {
        self.push_void(InstKind::Intrinsic { name });
    }

    pub fn jump(&mut self, target: Block) {
        self.push_void(InstKind::Jump { target });
    }

    pub fn brif(&mut self, cond: Value, then_block: Block, else_block: Block) {
        self.push_void(InstKind::Brif { cond, then_block, else_block });
    }

    pub fn return_(&mut self) {
        self.push_void(InstKind::Return);
    }

    pub fn unreachable(&mut self) {
        self.push_void(InstKind::Unreachable);
    }
}

