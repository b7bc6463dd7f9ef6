//! C3: the function builder.
//!
//! Drives recursive-descent decompilation from an entry address (§4.3): walks a
//! [`MachineFunction`] into IR blocks via C2, then splits any block a branch targeted at an
//! interior offset. [`LifterContext`] is the explicit context the §9 design note asks for in
//! place of the source's process-global lifter state: it owns the [`Module`], the
//! [`LifterConfig`], the two external collaborators, and the `by_address` fast-path cache.

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use target_lexicon::Triple;

use crate::config::LifterConfig;
use crate::error::LiftError;
use crate::external::{Disassembler, SymbolResolver};
use crate::ir::entities::{Block, FuncRef};
use crate::ir::instdata::InstKind;
use crate::ir::{Function, Module};
use crate::lift;
use crate::machine::MachineFunction;

/// Owns the [`Module`] under construction, the configuration it's built with, the two upstream
/// collaborators, and an address-keyed cache of already-decompiled (or in-flight) functions.
///
/// The cache exists alongside [`Module::function_by_addr`]'s linear scan (kept, per §4.3, as the
/// external-facing lookup) purely as the O(1) fast path recursive descent itself relies on; see
/// `DESIGN.md` for why both live side by side.
pub struct LifterContext<'a> {
    pub module: Module,
    pub config: LifterConfig,
    disasm: &'a mut dyn Disassembler,
    resolver: &'a mut dyn SymbolResolver,
    by_address: FxHashMap<u64, FuncRef>,
}

impl<'a> LifterContext<'a> {
    pub fn new(
        triple: Triple,
        config: LifterConfig,
        disasm: &'a mut dyn Disassembler,
        resolver: &'a mut dyn SymbolResolver,
    ) -> Self {
        LifterContext { module: Module::new(triple), config, disasm, resolver, by_address: FxHashMap::default() }
    }

    /// `get_or_insert_function` (§4.3 step 3): the cached fast path for "the function at `addr`,
    /// creating an empty forward declaration if none exists yet".
    pub fn get_or_insert_function(&mut self, addr: u64) -> FuncRef {
        if let Some(&func) = self.by_address.get(&addr) {
            return func;
        }
        if let Some(func) = self.module.function_by_addr(addr) {
            self.by_address.insert(addr, func);
            return func;
        }
        let name = self.resolve_display_name(addr);
        let func = self.module.declare_function(name, Some(addr));
        self.by_address.insert(addr, func);
        func
    }

    fn resolve_display_name(&self, addr: u64) -> String {
        let mut name = self.resolver.func_name(addr);
        if name.is_empty() {
            name = self.disasm.function_name(addr);
        }
        if name.is_empty() {
            debug!("external resolver miss for function at {addr:#x}");
            name = format!("sub_{addr:#x}");
        }
        name
    }

    /// `decompile_function(addr)` (§4.3): bounds-check, disassemble, memoize, emit, split. Returns
    /// `Ok(None)` for an out-of-section address or a decode failure (both logged, non-fatal);
    /// `Err` only for [`LiftError::UnknownOpcode`].
    pub fn decompile_function(&mut self, addr: u64) -> Result<Option<FuncRef>, LiftError> {
        match self.disasm.current_section() {
            Some(s) if s.contains(addr) => {}
            _ => {
                warn!("address {addr:#x} lies outside the current code section");
                return Ok(None);
            }
        }

        let machine_func = match self.disasm.disassemble(addr) {
            Some(mf) => mf,
            None => {
                warn!("failed to disassemble function at {addr:#x}");
                return Ok(None);
            }
        };

        let func_ref = self.get_or_insert_function(addr);
        if self.module.function(func_ref).is_defined() {
            return Ok(Some(func_ref));
        }

        let mut body = self.module.take_function(func_ref);
        let result = self.emit_function(&mut body, &machine_func);
        self.module.put_function(func_ref, body);
        result?;

        self.split_branch_targets(func_ref);
        self.close_unterminated_blocks(func_ref);

        Ok(Some(func_ref))
    }

    /// First and second passes of §4.3: pre-create every MachineBlock's IR block (so forward
    /// branches resolve), then lower each instruction into its block.
    ///
    /// A `MachineBasicBlock` can hold an *interior* terminator (e.g. a `Jcc` that is not its
    /// last instruction -- the trivial single-machine-block encoding of §8.2 scenario 2 is
    /// exactly this shape). Once an instruction leaves a block terminated, every instruction
    /// that follows it in the machine block belongs to a fresh IR block instead: appending more
    /// instructions after a `brif`/`jump`/`return`/`unreachable` would violate the §3
    /// "terminated block" invariant (its terminator must be the block's last instruction). That
    /// fresh block is addressed by the next instruction's own offset, which `get_or_create_block`
    /// resolves to whatever block the terminator's own lowering already created for it (a Jcc's
    /// fallthrough target, for instance) rather than creating a duplicate.
    fn emit_function(&mut self, body: &mut Function, machine_func: &MachineFunction) -> Result<(), LiftError> {
        for mb in &machine_func.blocks {
            if let Some(offset) = mb.start_offset() {
                body.get_or_create_block(offset);
            }
        }

        for mb in &machine_func.blocks {
            let Some(start) = mb.start_offset() else { continue };
            let mut block = body.get_or_create_block(start);
            for minst in &mb.insts {
                if block_is_terminated(body, block) {
                    block = body.get_or_create_block(minst.offset);
                }
                trace!("dispatching {:?} @ {:#x}", minst.opcode, minst.offset);
                let result =
                    lift::lift_instruction(&mut self.module, body, block, minst, &self.config, self.disasm, self.resolver);
                if let Err(err) = &result {
                    if let LiftError::UnknownOpcode { opcode, offset } = err {
                        log::error!("unknown opcode {opcode:?} at offset {offset:#x}, aborting function build");
                    }
                    return result;
                }
            }
        }
        Ok(())
    }

    /// Append `Unreachable` to every block that fell off the end of its MachineBlock without a
    /// terminator (§4.2 "Termination & unreachable").
    fn close_unterminated_blocks(&mut self, func_ref: FuncRef) {
        let func = self.module.function_mut(func_ref);
        let blocks: Vec<Block> = func.blocks().collect();
        for block in blocks {
            if !block_is_terminated(func, block) {
                let offset = func.layout.block_offset(block);
                let mut cursor = crate::emit::Cursor::new(func, block, offset);
                cursor.unreachable();
            }
        }
    }

    /// Third pass: split-on-branch-target (§4.3). Repeatedly finds an empty, non-entry block and
    /// carves its instructions out of the populated block that spans its target offset, until no
    /// empty block remains splittable.
    fn split_branch_targets(&mut self, func_ref: FuncRef) {
        loop {
            let func = self.module.function_mut(func_ref);
            let target_block = func
                .blocks()
                .find(|&b| !func.layout.is_entry(b) && func.layout.is_empty(b));
            let Some(empty_block) = target_block else { break };
            let target_offset = func.layout.block_offset(empty_block);

            let source_block = func.blocks().find(|&b| {
                b != empty_block && spans_offset(func, b, target_offset)
            });

            let Some(source_block) = source_block else {
                warn!("split target bb_{target_offset} was not found within any populated block");
                break;
            };

            let offsets: FxHashMap<crate::ir::entities::Inst, u64> =
                func.layout.block_insts(source_block).iter().map(|&i| (i, func.dfg.inst_data(i).offset)).collect();
            func.layout.stable_sort_insts_by_key(source_block, |inst| offsets[&inst]);

            let split_at = func
                .layout
                .block_insts(source_block)
                .iter()
                .position(|&inst| func.dfg.inst_data(inst).offset == target_offset);

            let Some(split_at) = split_at else {
                warn!("split target bb_{target_offset} was not found within any populated block");
                break;
            };

            let tail = func.layout.split_off(source_block, split_at);
            func.layout.extend_insts(empty_block, tail);

            // The retained head may already end in its own terminator (an interior branch whose
            // machine instruction offset happens to equal the split point): in that case the
            // existing terminator *is* the block's branch, and a bridge `jump` would wrongly
            // follow it with a second control transfer. Only bridge the two blocks when the head
            // fell through without one.
            if !block_is_terminated(func, source_block) {
                let bridge_offset = func
                    .layout
                    .block_insts(source_block)
                    .last()
                    .map(|&inst| func.dfg.inst_data(inst).offset)
                    .unwrap_or(target_offset);
                let mut cursor = crate::emit::Cursor::new(func, source_block, bridge_offset);
                cursor.jump(empty_block);
            }
        }
    }

    /// `decompile(addr)` (§4.3): LIFO work-list recursive descent, discovering call targets as it
    /// goes. Returns the entry function's `FuncRef` on success.
    pub fn decompile(&mut self, addr: u64) -> Result<Option<FuncRef>, LiftError> {
        let mut work: Vec<u64> = vec![addr];
        let mut started: std::collections::HashSet<u64> = std::collections::HashSet::new();
        let mut entry = None;

        while let Some(next) = work.pop() {
            trace!("work-list pop {next:#x}");
            if !started.insert(next) {
                continue;
            }
            match self.decompile_function(next)? {
                Some(func_ref) => {
                    if entry.is_none() {
                        entry = Some(func_ref);
                    }
                    for target in self.call_targets(func_ref) {
                        self.rename_and_enqueue(target, &mut work);
                    }
                }
                None => continue,
            }
        }

        Ok(entry)
    }

    /// Scan `func_ref`'s emitted `Call` instructions for direct calls to a function with a
    /// concrete `Address` attribute (§4.3 "Recursive descent across calls").
    fn call_targets(&self, func_ref: FuncRef) -> Vec<u64> {
        let func = self.module.function(func_ref);
        let mut targets = Vec::new();
        for block in func.blocks() {
            for &inst in func.layout.block_insts(block) {
                if let InstKind::Call { callee, .. } = func.dfg.inst_data(inst).kind {
                    if let Some(addr) = self.module.function(callee).address {
                        targets.push(addr);
                    }
                }
            }
        }
        targets
    }

    fn rename_and_enqueue(&mut self, target: u64, work: &mut Vec<u64>) {
        let func_ref = self.get_or_insert_function(target);
        if !self.module.function(func_ref).is_defined() {
            let name = self.resolve_display_name(target);
            if self.module.function(func_ref).name != name {
                self.module.rename_function(func_ref, name);
            }
            trace!("work-list push {target:#x}");
            work.push(target);
        }
    }
}

/// Whether `block`'s last instruction is already a terminator (§3's "terminated" predicate),
/// i.e. whether appending anything further to it would produce a second control transfer.
fn block_is_terminated(func: &Function, block: Block) -> bool {
    match func.layout.block_insts(block).last() {
        Some(&last) => func.dfg.inst_data(last).kind.is_terminator(),
        None => false,
    }
}

fn spans_offset(func: &Function, block: Block, offset: u64) -> bool {
    let insts = func.layout.block_insts(block);
    if insts.is_empty() {
        return false;
    }
    let start = func.layout.block_offset(block);
    let end = func.dfg.inst_data(*insts.last().unwrap()).offset;
    start <= offset && offset <= end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::Section;
    use crate::machine::{MachineBasicBlock, MachineInst, Opcode, Operand, RegId, Width};
    use std::str::FromStr;

    struct FixedDisasm {
        section: Section,
        functions: FxHashMap<u64, MachineFunction>,
    }

    impl Disassembler for FixedDisasm {
        fn disassemble(&mut self, addr: u64) -> Option<MachineFunction> {
            self.functions.get(&addr).cloned()
        }
        fn section_by_address(&self, addr: u64) -> Option<Section> {
            self.section.contains(addr).then(|| self.section.clone())
        }
        fn set_section(&mut self, section: Section) {
            self.section = section;
        }
        fn current_section(&self) -> Option<Section> {
            Some(self.section.clone())
        }
        fn function_name(&self, _addr: u64) -> String {
            String::new()
        }
        fn reloc_function_name(&self, _addr: u64, _name: &mut String) {}
    }

    struct EmptyResolver;
    impl SymbolResolver for EmptyResolver {
        fn func_name_in_plt(&self, _addr: u64) -> String {
            String::new()
        }
        fn func_name(&self, _addr: u64) -> String {
            String::new()
        }
        fn unload_addr(&self, load_addr: u64) -> u64 {
            load_addr
        }
        fn load_addr(&self, unload_addr: u64, _obj: &str, _sec: &str) -> u64 {
            unload_addr
        }
        fn addr(&self, _name: &str) -> u64 {
            0
        }
    }

    fn triple() -> Triple {
        Triple::from_str("x86_64-unknown-linux-gnu").unwrap()
    }

    /// `mov rax, 42; ret` at `0x400100`, re-decompiled: the second call must be a memoized no-op
    /// rather than re-lowering the body (§4.3 step 3).
    #[test]
    fn decompile_function_memoizes_an_already_defined_function() {
        let mov = MachineInst::new(Opcode::Mov, Width::W64, 7, 0x400100, &[Operand::Reg(RegId::Rax), Operand::Imm(42)]);
        let ret = MachineInst::new(Opcode::Ret, Width::W64, 1, 0x400107, &[]);
        let mf = MachineFunction::new(vec![MachineBasicBlock { insts: vec![mov, ret] }]);
        let mut disasm = FixedDisasm {
            section: Section { name: ".text".into(), start: 0x400000, end: 0x401000 },
            functions: FxHashMap::from_iter([(0x400100, mf)]),
        };
        let mut resolver = EmptyResolver;
        let mut ctx = LifterContext::new(triple(), LifterConfig::default(), &mut disasm, &mut resolver);

        let first = ctx.decompile_function(0x400100).unwrap().unwrap();
        let before = ctx.module.function(first).blocks().count();
        let second = ctx.decompile_function(0x400100).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.module.function(second).blocks().count(), before);
    }

    /// `jmp +0; nop; ret` at `0x10` (§8.2 scenario 3): splits `bb_10` so `bb_18` holds `nop; ret`.
    #[test]
    fn self_branch_into_own_body_splits_the_block() {
        let jmp = MachineInst::new(Opcode::Jmp, Width::W64, 2, 0x10, &[Operand::Imm(0)]);
        let nop = MachineInst::new(Opcode::Nop, Width::W64, 1, 0x12, &[]);
        let ret = MachineInst::new(Opcode::Ret, Width::W64, 1, 0x13, &[]);
        let mf = MachineFunction::new(vec![MachineBasicBlock { insts: vec![jmp, nop, ret] }]);
        let mut disasm = FixedDisasm {
            section: Section { name: ".text".into(), start: 0, end: 0x1000 },
            functions: FxHashMap::from_iter([(0x10, mf)]),
        };
        let mut resolver = EmptyResolver;
        let mut ctx = LifterContext::new(triple(), LifterConfig::default(), &mut disasm, &mut resolver);

        let func_ref = ctx.decompile_function(0x10).unwrap().unwrap();
        let func = ctx.module.function(func_ref);
        let blocks: Vec<_> = func.blocks().collect();
        assert_eq!(blocks.len(), 2);
        let entry = blocks[0];
        let split = blocks[1];
        assert_eq!(func.layout.block_offset(entry), 0x10);
        assert_eq!(func.layout.block_offset(split), 0x12);

        let entry_last = *func.layout.block_insts(entry).last().unwrap();
        assert!(matches!(func.dfg.inst_data(entry_last).kind, InstKind::Jump { target } if target == split));
        let split_last = *func.layout.block_insts(split).last().unwrap();
        assert!(matches!(func.dfg.inst_data(split_last).kind, InstKind::Return));
    }
}
