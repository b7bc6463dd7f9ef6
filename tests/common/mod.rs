//! Shared in-memory mock collaborators for the end-to-end scenarios in `SPEC_FULL.md` §8.2.

use std::collections::HashMap;
use std::sync::Once;

use saib_core::external::{Disassembler, SymbolResolver};
use saib_core::machine::MachineFunction;

pub use saib_core::external::Section;

static LOG_INIT: Once = Once::new();

/// Install `env_logger` once per test binary, matching the teacher's dev-dependency usage (§13).
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A fixed table of pre-decoded functions plus a single code section, standing in for a real
/// ELF loader and disassembler.
pub struct MockDisasm {
    pub section: Section,
    pub functions: HashMap<u64, MachineFunction>,
    pub names: HashMap<u64, String>,
}

impl MockDisasm {
    pub fn new(section: Section) -> Self {
        MockDisasm { section, functions: HashMap::new(), names: HashMap::new() }
    }

    pub fn with_function(mut self, addr: u64, func: MachineFunction) -> Self {
        self.functions.insert(addr, func);
        self
    }
}

impl Disassembler for MockDisasm {
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

    fn function_name(&self, addr: u64) -> String {
        self.names.get(&addr).cloned().unwrap_or_default()
    }

    fn reloc_function_name(&self, _addr: u64, _name: &mut String) {}
}

/// A fixed PLT name table; every other resolver query misses (matching §6.1's "may fail by
/// returning an empty string or zero").
#[derive(Default)]
pub struct MockResolver {
    pub plt_names: HashMap<u64, String>,
}

impl SymbolResolver for MockResolver {
    fn func_name_in_plt(&self, addr: u64) -> String {
        self.plt_names.get(&addr).cloned().unwrap_or_default()
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
