//! The top-level IR container: one per binary (or per lifter session).
//!
//! Mirrors Cranelift's `Module` trait family in spirit (an arena of functions plus a handful of
//! process-wide declarations) but is concrete rather than generic, since this crate only ever
//! targets one triple: little-endian x86-64 ELF.

use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;
use target_lexicon::Triple;

use crate::ir::entities::{FuncRef, Global};
use crate::ir::function::Function;
use crate::regs::{Flag, GprFamily, ALL_FLAGS, ALL_GPR_FAMILIES};

/// What a [`Global`] cell stores. Every cell is a process-wide mutable location: reads and
/// writes to it are `GlobalLoad`/`GlobalStore` instructions (§4.1), never SSA-threaded values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalData {
    /// One of the sixteen canonical (widest) general-purpose registers.
    Register(GprFamily),
    /// One EFLAGS bit.
    Flag(Flag),
    /// `FS` segment base, used by `seg_base(FS)` in memory-operand lowering (§4.2).
    FsBase,
    /// `GS` segment base.
    GsBase,
    /// Staging cell for the fall-through address a `CALL` pushes as its return address (§4.2's
    /// pre-dispatch step: "writes `next_rip` to `RIP`").
    Rip,
}

/// The IR arena for one lifted binary: functions, the architectural register/flag cells they
/// share, and the intrinsic helper used to record indirect-call targets.
#[derive(Debug)]
pub struct Module {
    pub triple: Triple,
    functions: PrimaryMap<FuncRef, Function>,
    by_name: FxHashMap<String, FuncRef>,
    globals: PrimaryMap<Global, GlobalData>,
    register_globals: FxHashMap<GprFamily, Global>,
    flag_globals: FxHashMap<Flag, Global>,
    fs_base: Global,
    gs_base: Global,
    rip: Global,
    /// `saib_collect_indirect(i64) -> void`, declared once at module construction (§3, §6.2).
    pub collect_indirect: FuncRef,
}

impl Module {
    /// Build a fresh module for `triple`, pre-declaring every register cell, flag cell, the two
    /// segment bases, the `RIP` staging cell, and `saib_collect_indirect`.
    pub fn new(triple: Triple) -> Self {
        let mut globals = PrimaryMap::new();
        let mut register_globals = FxHashMap::default();
        for family in ALL_GPR_FAMILIES {
            register_globals.insert(family, globals.push(GlobalData::Register(family)));
        }
        let mut flag_globals = FxHashMap::default();
        for flag in ALL_FLAGS {
            flag_globals.insert(flag, globals.push(GlobalData::Flag(flag)));
        }
        let fs_base = globals.push(GlobalData::FsBase);
        let gs_base = globals.push(GlobalData::GsBase);
        let rip = globals.push(GlobalData::Rip);

        let mut functions = PrimaryMap::new();
        let mut by_name = FxHashMap::default();
        let collect_indirect = functions.push(Function::new("saib_collect_indirect", None));
        by_name.insert("saib_collect_indirect".to_string(), collect_indirect);

        Module {
            triple,
            functions,
            by_name,
            globals,
            register_globals,
            flag_globals,
            fs_base,
            gs_base,
            rip,
            collect_indirect,
        }
    }

    pub fn register_global(&self, family: GprFamily) -> Global {
        self.register_globals[&family]
    }

    pub fn flag_global(&self, flag: Flag) -> Global {
        self.flag_globals[&flag]
    }

    pub fn fs_base_global(&self) -> Global {
        self.fs_base
    }

    pub fn gs_base_global(&self) -> Global {
        self.gs_base
    }

    pub fn rip_global(&self) -> Global {
        self.rip
    }

    pub fn global_data(&self, global: Global) -> GlobalData {
        self.globals[global]
    }

    pub fn function(&self, func: FuncRef) -> &Function {
        &self.functions[func]
    }

    pub fn function_mut(&mut self, func: FuncRef) -> &mut Function {
        &mut self.functions[func]
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncRef> {
        self.by_name.get(name).copied()
    }

    /// Look up a function by its `Address` attribute. Per §4.3, this is a **linear** scan: the
    /// specification calls it out by name (`getFunctionByAddr. Linearly searches functions by
    /// Address attribute`) as the literal lookup algorithm, not merely an implementation detail,
    /// so it is kept exactly that way here rather than replaced by an index. The O(1) fast path
    /// recursive descent actually relies on is `LifterContext::by_address`, a separate cache
    /// (see `DESIGN.md`).
    pub fn function_by_addr(&self, addr: u64) -> Option<FuncRef> {
        self.functions
            .iter()
            .find(|(_, f)| f.address == Some(addr))
            .map(|(func, _)| func)
    }

    /// Declare a new, empty function named `name` at `address`. Does not check for an existing
    /// function at that name or address; callers that need get-or-insert semantics (the common
    /// case) should go through [`crate::builder::get_or_insert_function`].
    pub fn declare_function(&mut self, name: impl Into<String>, address: Option<u64>) -> FuncRef {
        let name = name.into();
        let func = self.functions.push(Function::new(name.clone(), address));
        self.by_name.insert(name, func);
        func
    }

    /// Rename an already-declared function (e.g. once the PLT resolver supplies a display name
    /// for a callee that was first seen only as a bare address).
    pub fn rename_function(&mut self, func: FuncRef, new_name: impl Into<String>) {
        let new_name = new_name.into();
        let old_name = self.functions[func].name.clone();
        self.by_name.remove(&old_name);
        self.functions[func].name = new_name.clone();
        self.by_name.insert(new_name, func);
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncRef, &Function)> {
        self.functions.iter()
    }

    /// Remove `func`'s body from the module, leaving an empty placeholder in its slot, and hand
    /// the owned `Function` to the caller.
    ///
    /// This is how the builder (§4.3) gets simultaneous `&mut Function` (for the emission
    /// cursor) and `&Module` (for global-cell and call-target lookups) without aliasing the same
    /// allocation: the function is lifted standalone, then spliced back with
    /// [`Module::put_function`]. See the §9 design note on the `Decompiler`/`IREmitter` cyclic
    /// reference -- this is the "ownership with one direction owning, the other holding a
    /// handle" resolution, applied to the builder itself rather than to a dedicated context type.
    pub fn take_function(&mut self, func: FuncRef) -> Function {
        let name = self.functions[func].name.clone();
        let address = self.functions[func].address;
        std::mem::replace(&mut self.functions[func], Function::new(name, address))
    }

    /// Splice a function lifted via [`Module::take_function`] back into its slot.
    pub fn put_function(&mut self, func: FuncRef, body: Function) {
        self.functions[func] = body;
    }
}
