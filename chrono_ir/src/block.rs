//! Basic blocks and the loop-nesting forest (§3).
//!
//! Each block owns its own instruction vector rather than pointing into one
//! global flat array: the builder needs to insert a phi at the *start* of a
//! block that isn't the current one (reading a variable recursively through
//! an unsealed predecessor, §4.1), which a single growing flat list can't
//! express without becoming a linked structure. [`Function::finalize`]
//! produces the flat, block-ordered view — with each block's `start`/`end`
//! sentinels — that §3 describes and that the bytecode builder consumes.

use crate::bitset::BitSet;
use crate::ids::{BlockId, InstrId, LoopId, TempId};
use crate::instruction::Instruction;

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub sealed: bool,
    /// Set once any non-phi instruction has been appended.
    pub has_assignment: bool,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    pub loop_: Option<LoopId>,
    pub instructions: Vec<Instruction>,
    /// Variables read from this block while it was still unsealed, awaiting
    /// their phi operand once the missing predecessor is known (§4.1). The
    /// `u32` is the builder's opaque per-variable slot id, not a temp.
    pub incomplete_phis: Vec<(u32, TempId)>,
    pub live_in: BitSet,
    pub live_out: BitSet,
    pub phi_defs: BitSet,
    pub phi_uses: BitSet,
    /// This block's range in the function's finalized flat instruction
    /// list, filled in by [`Function::finalize`].
    pub start: Option<InstrId>,
    pub end: Option<InstrId>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            sealed: false,
            has_assignment: false,
            preds: Vec::new(),
            succs: Vec::new(),
            loop_: None,
            instructions: Vec::new(),
            incomplete_phis: Vec::new(),
            live_in: BitSet::new(),
            live_out: BitSet::new(),
            phi_defs: BitSet::new(),
            phi_uses: BitSet::new(),
            start: None,
            end: None,
        }
    }

    pub fn add_pred(&mut self, pred: BlockId) {
        if !self.preds.contains(&pred) {
            self.preds.push(pred);
        }
    }

    pub fn add_succ(&mut self, succ: BlockId) {
        if !self.succs.contains(&succ) {
            self.succs.push(succ);
        }
    }

    pub fn single_pred(&self) -> Option<BlockId> {
        match self.preds.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Appends a non-phi instruction to the end of the block.
    pub fn push(&mut self, instr: Instruction) {
        self.has_assignment = true;
        self.instructions.push(instr);
    }

    /// Prepends a phi so every phi in a block precedes every non-phi
    /// instruction (§3 invariant).
    pub fn push_phi_front(&mut self, phi: Instruction) {
        debug_assert!(phi.is_phi());
        let split = self.instructions.iter().take_while(|i| i.is_phi()).count();
        self.instructions.insert(split, phi);
    }

    /// The index one past the last phi — where phi-copy insertion and the
    /// terminator-aware rewrites of §4.1 step 2 operate.
    pub fn first_non_phi(&self) -> usize {
        self.instructions.iter().take_while(|i| i.is_phi()).count()
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// The index of the first instruction in this block's trailing run of
    /// terminators (§3, §4.1 "switch lowering" — a "jumps" block's whole
    /// body can be such a run: several `BranchEqual`s followed by a `Jmp`).
    /// Phi-copy insertion inserts a predecessor's `Mov` here rather than
    /// merely before the block's last instruction, so a copy meant for an
    /// edge taken by an earlier branch in the run still executes before
    /// that branch fires.
    pub fn first_terminator_index(&self) -> usize {
        let mut idx = self.instructions.len();
        while idx > 0 && self.instructions[idx - 1].is_terminator() {
            idx -= 1;
        }
        idx
    }
}

/// A node in the loop-nesting forest (§3).
#[derive(Debug, Clone)]
pub struct Loop {
    pub id: LoopId,
    pub header: BlockId,
    pub members: Vec<BlockId>,
    pub parent: Option<LoopId>,
    pub children: Vec<LoopId>,
}

impl Loop {
    pub fn new(id: LoopId, header: BlockId, parent: Option<LoopId>) -> Self {
        Self { id, header, members: vec![header], parent, children: Vec::new() }
    }
}
