//! Basic blocks and the control flow graph.
//!
//! Blocks carry typed parameters instead of phi nodes: a branch passes
//! arguments to its target's parameters. The entry block's parameters are
//! the function's arguments. The CFG keeps an explicit `block_order` list;
//! the order is purely cosmetic (it is what the textual dump prints) and
//! correctness never depends on it.

use super::{IrId, IrInstruction, IrTerminator, IrType, OwnershipKind};
use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Unique identifier for basic blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IrBlockId(pub u32);

impl IrBlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for IrBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Typed block parameter. Plays the role of a phi node: each predecessor
/// passes one branch argument per parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrBlockParam {
    /// Value introduced by this parameter
    pub value: IrId,

    /// Parameter type
    pub ty: IrType,

    /// Ownership kind, preserved verbatim when the block is cloned
    pub ownership: OwnershipKind,
}

/// A basic block: parameters, straight-line instructions, one terminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrBasicBlock {
    /// Unique identifier for this block
    pub id: IrBlockId,

    /// Human-readable label (for debugging)
    pub label: Option<String>,

    /// Block parameters
    pub params: Vec<IrBlockParam>,

    /// Instructions in this block (executed sequentially)
    pub instructions: Vec<IrInstruction>,

    /// Terminator. `None` is the transient "open" state that exists only
    /// in the middle of a transformation (e.g. right after a split).
    pub terminator: Option<IrTerminator>,
}

impl IrBasicBlock {
    /// Create a new, empty, open basic block
    pub fn new(id: IrBlockId) -> Self {
        Self {
            id,
            label: None,
            params: Vec::new(),
            instructions: Vec::new(),
            terminator: None,
        }
    }

    /// Add an instruction to this block
    pub fn add_instruction(&mut self, inst: IrInstruction) {
        self.instructions.push(inst);
    }

    /// Set the terminator for this block
    pub fn set_terminator(&mut self, term: IrTerminator) {
        self.terminator = Some(term);
    }

    /// Get all successor blocks based on the terminator
    pub fn successors(&self) -> SmallVec<[IrBlockId; 2]> {
        match &self.terminator {
            Some(term) => term.kind.successors(),
            None => SmallVec::new(),
        }
    }

    /// Check if this block has a terminator
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// Control flow graph of a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrControlFlowGraph {
    /// All basic blocks in the function
    pub blocks: FxHashMap<IrBlockId, IrBasicBlock>,

    /// Textual ordering of blocks; contains every block exactly once
    pub block_order: Vec<IrBlockId>,

    /// Entry block ID. The entry block never has predecessors.
    pub entry_block: IrBlockId,

    /// Next available block ID
    pub next_block_id: u32,
}

impl IrControlFlowGraph {
    /// Create a new CFG with an empty entry block
    pub fn new() -> Self {
        let entry_block = IrBlockId::new(0);
        let mut blocks = FxHashMap::default();
        blocks.insert(entry_block, IrBasicBlock::new(entry_block));

        Self {
            blocks,
            block_order: vec![entry_block],
            entry_block,
            next_block_id: 1,
        }
    }

    fn alloc_block_id(&mut self) -> IrBlockId {
        let id = IrBlockId::new(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    /// Create a new block at the end of the block list
    pub fn create_block(&mut self) -> IrBlockId {
        self.create_block_before(None)
    }

    /// Create a new block placed before `anchor` in the block list, or at
    /// the end if `anchor` is `None`.
    pub fn create_block_before(&mut self, anchor: Option<IrBlockId>) -> IrBlockId {
        let id = self.alloc_block_id();
        self.blocks.insert(id, IrBasicBlock::new(id));
        match anchor.and_then(|a| self.position_of(a)) {
            Some(pos) => self.block_order.insert(pos, id),
            None => self.block_order.push(id),
        }
        id
    }

    /// Get a block by ID
    pub fn get_block(&self, id: IrBlockId) -> Option<&IrBasicBlock> {
        self.blocks.get(&id)
    }

    /// Get a mutable block by ID
    pub fn get_block_mut(&mut self, id: IrBlockId) -> Option<&mut IrBasicBlock> {
        self.blocks.get_mut(&id)
    }

    fn position_of(&self, id: IrBlockId) -> Option<usize> {
        self.block_order.iter().position(|&b| b == id)
    }

    /// The block following `id` in the block list, if any
    pub fn block_after(&self, id: IrBlockId) -> Option<IrBlockId> {
        let pos = self.position_of(id)?;
        self.block_order.get(pos + 1).copied()
    }

    /// Move `block` so it appears before `anchor` in the block list, or at
    /// the end if `anchor` is `None`. Purely cosmetic.
    pub fn move_block_before(&mut self, block: IrBlockId, anchor: Option<IrBlockId>) {
        let Some(from) = self.position_of(block) else {
            return;
        };
        self.block_order.remove(from);
        match anchor.and_then(|a| self.position_of(a)) {
            Some(pos) => self.block_order.insert(pos, block),
            None => self.block_order.push(block),
        }
    }

    /// Split `block` at `index`: a new successor block receives
    /// `instructions[index..]` and the terminator, and is placed right
    /// after `block` in the block list. The predecessor keeps everything
    /// before `index` and is left open; no branch is inserted.
    pub fn split_block(&mut self, block: IrBlockId, index: usize) -> IrBlockId {
        let tail_id = self.alloc_block_id();
        let src = self
            .blocks
            .get_mut(&block)
            .expect("cannot split a block that is not in the cfg");
        let tail_insts = src.instructions.split_off(index);
        let tail_term = src.terminator.take();

        let mut tail = IrBasicBlock::new(tail_id);
        tail.instructions = tail_insts;
        tail.terminator = tail_term;
        self.blocks.insert(tail_id, tail);

        let pos = self
            .position_of(block)
            .expect("split source is not in the block order");
        self.block_order.insert(pos + 1, tail_id);
        tail_id
    }

    /// Blocks in depth-first preorder from the entry, following terminator
    /// successors. Unreachable blocks are not visited.
    pub fn depth_first_order(&self) -> Vec<IrBlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut visited: FxHashSet<IrBlockId> = FxHashSet::default();
        let mut stack = vec![self.entry_block];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(block) = self.blocks.get(&id) {
                let succs = block.successors();
                for &succ in succs.iter().rev() {
                    if !visited.contains(&succ) {
                        stack.push(succ);
                    }
                }
            }
        }

        order
    }

    /// Predecessors of `id`, computed from terminators.
    pub fn predecessors_of(&self, id: IrBlockId) -> Vec<IrBlockId> {
        let mut preds = Vec::new();
        for &b in &self.block_order {
            if let Some(block) = self.blocks.get(&b) {
                if block.successors().contains(&id) {
                    preds.push(b);
                }
            }
        }
        preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrTermKind, IrTerminator};

    #[test]
    fn test_block_creation_and_order() {
        let mut cfg = IrControlFlowGraph::new();
        let bb1 = cfg.create_block();
        let bb2 = cfg.create_block();
        assert_eq!(cfg.block_order, vec![cfg.entry_block, bb1, bb2]);

        // Insert a block between entry and bb1
        let bb3 = cfg.create_block_before(Some(bb1));
        assert_eq!(cfg.block_order, vec![cfg.entry_block, bb3, bb1, bb2]);

        assert_eq!(cfg.block_after(cfg.entry_block), Some(bb3));
        assert_eq!(cfg.block_after(bb2), None);
    }

    #[test]
    fn test_split_block() {
        let mut cfg = IrControlFlowGraph::new();
        let entry = cfg.entry_block;
        {
            use crate::ir::IrInstKind;
            let block = cfg.get_block_mut(entry).unwrap();
            for i in 0..4 {
                block.add_instruction(IrInstruction::new(IrInstKind::IntegerLiteral {
                    dest: IrId::new(i),
                    ty: IrType::I32,
                    value: i as i64,
                }));
            }
            block.set_terminator(IrTerminator::new(IrTermKind::Return { value: None }));
        }

        let tail = cfg.split_block(entry, 2);

        let head = cfg.get_block(entry).unwrap();
        assert_eq!(head.instructions.len(), 2);
        assert!(!head.is_terminated());

        let tail_block = cfg.get_block(tail).unwrap();
        assert_eq!(tail_block.instructions.len(), 2);
        assert!(tail_block.is_terminated());

        // Tail sits right after the split block
        assert_eq!(cfg.block_order, vec![entry, tail]);
    }

    #[test]
    fn test_depth_first_order() {
        let mut cfg = IrControlFlowGraph::new();
        let bb1 = cfg.create_block();
        let bb2 = cfg.create_block();
        let unreachable = cfg.create_block();

        cfg.get_block_mut(cfg.entry_block)
            .unwrap()
            .set_terminator(IrTerminator::new(IrTermKind::CondBranch {
                condition: IrId::new(0),
                true_target: bb1,
                true_args: vec![],
                false_target: bb2,
                false_args: vec![],
            }));
        cfg.get_block_mut(bb1)
            .unwrap()
            .set_terminator(IrTerminator::new(IrTermKind::Branch {
                target: bb2,
                args: vec![],
            }));
        cfg.get_block_mut(bb2)
            .unwrap()
            .set_terminator(IrTerminator::new(IrTermKind::Return { value: None }));
        cfg.get_block_mut(unreachable)
            .unwrap()
            .set_terminator(IrTerminator::new(IrTermKind::Unreachable));

        let order = cfg.depth_first_order();
        assert_eq!(order, vec![cfg.entry_block, bb1, bb2]);

        assert_eq!(cfg.predecessors_of(bb2), vec![cfg.entry_block, bb1]);
    }
}
