//! Instructions (§3). Every `Temporary` is defined by exactly one
//! `Expression`; phis precede all other instructions in their block.

use smallvec::{smallvec, SmallVec};

use chrono_values::{BinaryOp, UnaryOp};

use crate::ids::{BlockId, TempId};
use crate::rvalue::RValue;

/// The operator carried by an `Expression` instruction. Beyond the value
/// operators of §4.8, this also covers the container-literal and
/// container-access forms the grammar needs (§6) but that the distilled
/// spec folds into "get"/"set" prose rather than naming as opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Mov,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `get(container, key)`.
    ContainerGet,
    /// `set(container, key, value)`; produces the stored value as its own
    /// result so compound assignment (`obj.x += 1`) can read it back.
    ContainerSet,
    NewObject,
    NewList,
    /// Appends `srcs[1]` to the list `srcs[0]`, yielding the list (used to
    /// lower list literals `[a, b, c]` as a chain of appends to a fresh
    /// list instead of one variadic instruction).
    ListAppend,
}

/// Jump opcodes (§3, §4.1 "switch lowering").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOp {
    Jmp,
    BranchTrue,
    BranchFalse,
    BranchEqual,
}

/// Call opcodes (§4.4, §4.6 linking rewrites `Call` into `CallBuiltin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOp {
    Call,
    CallBuiltin,
    CallMethod,
}

/// The callee of a `FunctionCall`. Starts out name-addressed; `CallMethod`
/// and `CallBuiltin` targets resolve to a registry index immediately since
/// both tables are known at SSA-build time, while a plain `Call` stays
/// `Unresolved` until the compilation cache links the module (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Unresolved(String),
    /// Resolved against this module's own function table.
    Local(u32),
    /// Resolved against an imported module; the compilation cache stores
    /// the flat per-function `callTargets` index once linking assigns it.
    Linked(u32),
    Builtin(u32),
    Method(u32),
}

impl CallTarget {
    pub fn name(&self) -> Option<&str> {
        match self {
            CallTarget::Unresolved(name) => Some(name),
            _ => None,
        }
    }
}

/// A single phi source: the value read along `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhiSource {
    pub from: BlockId,
    pub value: RValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Expression { op: Operator, dst: TempId, srcs: Vec<RValue> },
    Phi { dst: TempId, srcs: Vec<PhiSource> },
    FunctionCall { op: CallOp, dst: Option<TempId>, target: CallTarget, srcs: Vec<RValue> },
    Jump { op: JumpOp, target: Option<BlockId>, srcs: Vec<RValue> },
    Export { dst: u32, src: RValue },
    Return { src: Option<RValue> },
    NoOp,
    BlockDecl(BlockId),
}

impl Instruction {
    /// The temporary this instruction defines, if any — used by dead-code
    /// elimination and liveness to find a `def` (§4.1, §4.2).
    pub fn dst(&self) -> Option<TempId> {
        match self {
            Instruction::Expression { dst, .. } => Some(*dst),
            Instruction::Phi { dst, .. } => Some(*dst),
            Instruction::FunctionCall { dst, .. } => *dst,
            _ => None,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi { .. })
    }

    /// Whether this instruction can end a block (§3: "a terminal `NoOp` the
    /// last"; §4.1 "switch lowering" lowers a `switch` to a dedicated
    /// "jumps" block holding a *chain* of these — one `BranchEqual` per
    /// case, followed by an unconditional `Jmp` to the default target — so a
    /// block may end with a run of several terminators, not just one).
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Jump { .. } | Instruction::Return { .. } | Instruction::NoOp)
    }

    /// Side-effecting instructions are never eliminated as dead code even
    /// with no users (§4.1 "Dead-code pass": "calls and Set are never
    /// dead").
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Instruction::FunctionCall { .. }
                | Instruction::Jump { .. }
                | Instruction::Export { .. }
                | Instruction::Return { .. }
                | Instruction::Expression { op: Operator::ContainerSet, .. }
        )
    }

    /// Every `RValue` this instruction reads (for use-rewriting and
    /// liveness). Does not recurse into an operand's own `lvalue` chain —
    /// that chain describes provenance, not a live use.
    ///
    /// Almost every instruction has at most three operands (the busiest
    /// case is `ContainerSet(container, key, value)`), so this collects
    /// into a `SmallVec` that stays on the stack for the common case
    /// instead of heap-allocating a `Vec` on every liveness/use-rewrite walk.
    pub fn srcs(&self) -> SmallVec<[&RValue; 3]> {
        match self {
            Instruction::Expression { srcs, .. } => srcs.iter().collect(),
            Instruction::Phi { srcs, .. } => srcs.iter().map(|s| &s.value).collect(),
            Instruction::FunctionCall { srcs, .. } => srcs.iter().collect(),
            Instruction::Jump { srcs, .. } => srcs.iter().collect(),
            Instruction::Export { src, .. } => smallvec![src],
            Instruction::Return { src } => src.iter().collect(),
            Instruction::NoOp | Instruction::BlockDecl(_) => SmallVec::new(),
        }
    }

    pub fn srcs_mut(&mut self) -> SmallVec<[&mut RValue; 3]> {
        match self {
            Instruction::Expression { srcs, .. } => srcs.iter_mut().collect(),
            Instruction::Phi { srcs, .. } => srcs.iter_mut().map(|s| &mut s.value).collect(),
            Instruction::FunctionCall { srcs, .. } => srcs.iter_mut().collect(),
            Instruction::Jump { srcs, .. } => srcs.iter_mut().collect(),
            Instruction::Export { src, .. } => smallvec![src],
            Instruction::Return { src } => src.iter_mut().collect(),
            Instruction::NoOp | Instruction::BlockDecl(_) => SmallVec::new(),
        }
    }
}
