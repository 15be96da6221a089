//! A compiled function's IR (§3 "Function").

use chrono_values::Value;

use crate::block::{BasicBlock, Loop};
use crate::ids::{BlockId, InstrId, LoopId, TempId};
use crate::instruction::Instruction;

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub param_count: u32,
    pub blocks: Vec<BasicBlock>,
    pub loops: Vec<Loop>,
    pub constants: Vec<Value>,
    /// Number of distinct temporaries allocated so far; also the next
    /// [`TempId`] to hand out.
    pub temp_count: u32,
    /// The register assigned to each temporary by C6, indexed by
    /// [`TempId`]. Empty until allocation runs.
    pub registers: Vec<u32>,
    /// Phi-copy groups installed by `chrono_ssa::finalize` (§4.1 step 2):
    /// for each phi, the fresh `Mov` destinations inserted into its
    /// predecessor blocks, in operand order. Liveness coalescing (§4.2)
    /// merges each group's interference nodes into the phi's.
    pub phi_copies: Vec<PhiCopyGroup>,
}

/// One phi's predecessor-side copies, inserted by phi-copy insertion
/// (§4.1 step 2, §9 "Phi-copy insertion is mandatory").
#[derive(Debug, Clone)]
pub struct PhiCopyGroup {
    pub phi: TempId,
    pub copies: Vec<TempId>,
}

impl Function {
    pub fn new(name: impl Into<String>, param_count: u32) -> Self {
        Self {
            name: name.into(),
            param_count,
            blocks: Vec::new(),
            loops: Vec::new(),
            constants: Vec::new(),
            temp_count: 0,
            registers: Vec::new(),
            phi_copies: Vec::new(),
        }
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id));
        id
    }

    pub fn new_loop(&mut self, header: BlockId, parent: Option<LoopId>) -> LoopId {
        let id = LoopId(self.loops.len() as u32);
        self.loops.push(Loop::new(id, header, parent));
        if let Some(parent) = parent {
            self.loops[parent.index()].children.push(id);
        }
        id
    }

    pub fn new_temp(&mut self) -> TempId {
        let id = TempId(self.temp_count);
        self.temp_count += 1;
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub fn loop_(&self, id: LoopId) -> &Loop {
        &self.loops[id.index()]
    }

    /// Adds a constant to the pool, deduplicating scalar (non-string)
    /// values so `10` appearing twice shares one constant id (§4.4).
    /// String constants are never deduplicated here — the caller is
    /// expected to have already deduplicated via the persistent string
    /// cache's own interning (§9 "Constant folding safety").
    pub fn intern_constant(&mut self, value: Value) -> crate::ids::ConstId {
        if !matches!(value, Value::String(_)) {
            if let Some(pos) = self.constants.iter().position(|c| *c == value) {
                return crate::ids::ConstId(pos as u32);
            }
        }
        let id = crate::ids::ConstId(self.constants.len() as u32);
        self.constants.push(value);
        id
    }

    /// Adds `pred → succ` to both blocks' adjacency lists.
    pub fn link(&mut self, pred: BlockId, succ: BlockId) {
        self.block_mut(pred).add_succ(succ);
        self.block_mut(succ).add_pred(pred);
    }

    /// Produces the flat, block-ordered instruction view §3 describes:
    /// concatenates every block's instructions in block-id order, stamping
    /// each block's `start`/`end` sentinels and returning the dense list.
    /// Run once, after dead-code elimination and phi-copy insertion
    /// (§4.1 step 3-4).
    pub fn finalize(&mut self) -> Vec<Instruction> {
        let mut flat = Vec::new();
        for block in &mut self.blocks {
            let start = InstrId(flat.len() as u32);
            flat.extend(block.instructions.iter().cloned());
            let end = InstrId(flat.len() as u32);
            block.start = Some(start);
            block.end = Some(end);
        }
        flat
    }

    pub fn all_instructions(&self) -> impl Iterator<Item = (BlockId, &Instruction)> {
        self.blocks.iter().flat_map(|b| b.instructions.iter().map(move |i| (b.id, i)))
    }
}
