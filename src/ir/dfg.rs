//! Data flow graph: owns every instruction and value in a [`Function`](super::function::Function),
//! independent of the block order ([`super::layout`] covers that).
//!
//! This mirrors Cranelift's split between a `DataFlowGraph` (what an instruction *is*, and what
//! value it defines) and a `Layout` (where it *sits*), but is considerably smaller: there are no
//! basic-block parameters, no value aliases, and no union-find for GVN, because this IR never
//! runs an optimizer -- it is a lift target, not a compiler middle end.

use cranelift_entity::PrimaryMap;

use crate::ir::entities::{Inst, Value};
use crate::ir::instdata::InstKind;
use crate::ir::types::Type;

/// One instruction's full record: its payload, its optional result, and the byte offset of the
/// machine instruction it was lifted from (the "debug-location field" of §3).
#[derive(Clone, Debug)]
pub struct InstData {
    pub kind: InstKind,
    pub result: Option<Value>,
    pub offset: u64,
}

/// The type and defining instruction of one SSA-style value.
#[derive(Clone, Copy, Debug)]
pub struct ValueData {
    pub ty: Type,
    pub def: Inst,
}

/// Owns the instruction and value arenas for one function.
#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    insts: PrimaryMap<Inst, InstData>,
    values: PrimaryMap<Value, ValueData>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self { insts: PrimaryMap::new(), values: PrimaryMap::new() }
    }

    /// Append a value-producing instruction and return the `Value` it defines.
    pub fn make_inst_result(&mut self, kind: InstKind, ty: Type, offset: u64) -> (Inst, Value) {
        let inst = self.insts.push(InstData { kind, result: None, offset });
        let value = self.values.push(ValueData { ty, def: inst });
        self.insts[inst].result = Some(value);
        (inst, value)
    }

    /// Append an instruction that produces no value (a store, a branch, a void call, ...).
    pub fn make_inst(&mut self, kind: InstKind, offset: u64) -> Inst {
        self.insts.push(InstData { kind, result: None, offset })
    }

    pub fn inst_data(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }

    pub fn inst_data_mut(&mut self, inst: Inst) -> &mut InstData {
        &mut self.insts[inst]
    }

    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.insts[inst].result
    }

    pub fn value_type(&self, value: Value) -> Type {
        self.values[value].ty
    }

    pub fn value_def(&self, value: Value) -> Inst {
        self.values[value].def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instdata::InstKind;

    #[test]
    fn inst_results_round_trip_through_the_value_arena() {
        let mut dfg = DataFlowGraph::new();
        let (inst, val) = dfg.make_inst_result(InstKind::IConst { ty: Type::I32, imm: 42 }, Type::I32, 0x10);
        assert_eq!(dfg.inst_result(inst), Some(val));
        assert_eq!(dfg.value_type(val), Type::I32);
        assert_eq!(dfg.value_def(val), inst);
    }

    #[test]
    fn void_instructions_have_no_result() {
        let mut dfg = DataFlowGraph::new();
        let inst = dfg.make_inst(InstKind::Return, 0x20);
        assert_eq!(dfg.inst_result(inst), None);
    }
}
