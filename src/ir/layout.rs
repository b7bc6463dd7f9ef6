//! The order of basic blocks in a function, and of instructions within each block.
//!
//! Cranelift's `Layout` is an intrusive doubly-linked list so that splicing mid-block during
//! instruction legalization is O(1). This lifter never legalizes: blocks are built once by
//! walking a `MachineBasicBlock` front-to-back, and the one structural edit it performs --
//! splitting a populated block at a branch target offset (§4.3) -- is a single `Vec::split_off`
//! per split, which a plain per-block `Vec<Inst>` handles just as well with far less machinery.

use cranelift_entity::PrimaryMap;

use crate::ir::entities::{Block, Inst};

#[derive(Clone, Debug)]
struct BlockNode {
    /// Load-free byte offset of this block's first machine instruction (§3). This is the only
    /// piece of data the textual name `bb_<offset>` is derived from.
    offset: u64,
    insts: Vec<Inst>,
}

/// Owns block identity (offset), block instruction order, and function-wide block order.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    blocks: PrimaryMap<Block, BlockNode>,
    /// Blocks in the order they were first created. The first entry is always the entry block.
    order: Vec<Block>,
}

impl Layout {
    pub fn new() -> Self {
        Self { blocks: PrimaryMap::new(), order: Vec::new() }
    }

    /// Create a new, empty block at `offset`. Callers are responsible for not creating two
    /// blocks at the same offset (`get_or_create_block` in the builder enforces this).
    pub fn make_block(&mut self, offset: u64) -> Block {
        let block = self.blocks.push(BlockNode { offset, insts: Vec::new() });
        self.order.push(block);
        block
    }

    /// Insert a new block immediately after `after` in function order, used when a split target
    /// (§4.3) needs to appear right after the block it was carved out of.
    pub fn make_block_after(&mut self, after: Block, offset: u64) -> Block {
        let block = self.blocks.push(BlockNode { offset, insts: Vec::new() });
        let pos = self.order.iter().position(|&b| b == after).map_or(self.order.len(), |i| i + 1);
        self.order.insert(pos, block);
        block
    }

    pub fn block_offset(&self, block: Block) -> u64 {
        self.blocks[block].offset
    }

    pub fn append_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block].insts.push(inst);
    }

    pub fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block].insts
    }

    pub fn is_empty(&self, block: Block) -> bool {
        self.blocks[block].insts.is_empty()
    }

    /// Every block, in function order. The first yielded block is always the entry block.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.order.iter().copied()
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.order.first().copied()
    }

    /// Whether `block` is the entry block (the split pass in §4.3 never touches it).
    pub fn is_entry(&self, block: Block) -> bool {
        self.order.first() == Some(&block)
    }

    /// Stable-sort a block's instructions by a caller-supplied key (their debug offset), per
    /// step 2 of the split-on-branch-target pass: lowering one machine instruction can emit
    /// several IR instructions that all carry that instruction's offset but whose relative
    /// emission order is not otherwise guaranteed.
    pub fn stable_sort_insts_by_key<F, K>(&mut self, block: Block, mut key: F)
    where
        F: FnMut(Inst) -> K,
        K: Ord,
    {
        self.blocks[block].insts.sort_by_key(|&inst| key(inst));
    }

    /// Split a block's instruction list at position `at`: everything from `at` onward is
    /// removed from `block` and returned, for the caller to append into the split target block.
    pub fn split_off(&mut self, block: Block, at: usize) -> Vec<Inst> {
        self.blocks[block].insts.split_off(at)
    }

    /// Append a whole run of already-lifted instructions (the tail produced by `split_off`)
    /// onto another block.
    pub fn extend_insts(&mut self, block: Block, insts: Vec<Inst>) {
        self.blocks[block].insts.extend(insts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn split_off_moves_the_tail_and_leaves_the_head() {
        let mut layout = Layout::new();
        let b = layout.make_block(0);
        for i in 0..4 {
            layout.append_inst(b, Inst::new(i));
        }
        let tail = layout.split_off(b, 2);
        assert_eq!(layout.block_insts(b), &[Inst::new(0), Inst::new(1)]);
        assert_eq!(tail, vec![Inst::new(2), Inst::new(3)]);
    }

    #[test]
    fn entry_block_is_always_first_in_order() {
        let mut layout = Layout::new();
        let entry = layout.make_block(0);
        let _second = layout.make_block(10);
        assert!(layout.is_entry(entry));
        assert_eq!(layout.entry_block(), Some(entry));
    }

    #[test]
    fn make_block_after_inserts_right_after_its_source() {
        let mut layout = Layout::new();
        let a = layout.make_block(0);
        let c = layout.make_block(20);
        let b = layout.make_block_after(a, 10);
        let order: Vec<_> = layout.blocks().collect();
        assert_eq!(order, vec![a, b, c]);
    }
}
