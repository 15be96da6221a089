//! The on-the-fly SSA builder (§4.1): Braun et al.'s `readVariable`/
//! `writeVariable`/trivial-phi-elimination algorithm, scope discipline, the
//! control-flow helpers the parser drives, and constant folding (§4.1/§9).

use hashbrown::HashMap;

use chrono_ir::{
    BlockId, CallOp, CallTarget, Function, Instruction, JumpOp, LValue, LoopId, Operator, RValue,
    RValueKind, TempId,
};
use chrono_values::{BinaryOp, StringCache, UnaryOp, Value};

use crate::error::{Result, SsaError};

/// An opaque per-declaration variable key: distinct declarations of the
/// same source name in nested scopes get distinct slots, so shadowing can
/// never alias two logically different variables in `currentDef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotId(u32);

enum Variable {
    Local(SlotId),
    Global(u32),
}

pub struct SsaBuilder<'s> {
    func: Function,
    current: BlockId,
    scopes: Vec<HashMap<String, SlotId>>,
    globals: HashMap<String, u32>,
    next_slot: u32,
    next_global: u32,
    current_def: HashMap<(u32, BlockId), RValueKind>,
    redirects: HashMap<TempId, RValueKind>,
    phi_users: HashMap<TempId, Vec<TempId>>,
    def_block: HashMap<TempId, BlockId>,
    pub break_stack: Vec<BlockId>,
    pub continue_stack: Vec<BlockId>,
    strings: &'s mut StringCache,
}

impl<'s> SsaBuilder<'s> {
    pub fn new(name: impl Into<String>, param_count: u32, strings: &'s mut StringCache) -> Self {
        let mut func = Function::new(name, param_count);
        let entry = func.new_block();
        func.block_mut(entry).sealed = true; // entry has no predecessors to await
        Self {
            func,
            current: entry,
            scopes: vec![HashMap::new()],
            globals: HashMap::new(),
            next_slot: 0,
            next_global: 0,
            current_def: HashMap::new(),
            redirects: HashMap::new(),
            phi_users: HashMap::new(),
            def_block: HashMap::new(),
            break_stack: Vec::new(),
            continue_stack: Vec::new(),
            strings,
        }
    }

    pub fn entry_block(&self) -> BlockId {
        BlockId(0)
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current = block;
    }

    // ---- scope discipline (§4.1 "Scope discipline") ----

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        assert!(!self.scopes.is_empty(), "popped the outermost scope");
    }

    pub fn declare_global(&mut self, name: &str) -> Result<u32> {
        if self.globals.contains_key(name) {
            return Err(chrono_ir::IrError::GlobalRedefined(name.to_string()).into());
        }
        let id = self.next_global;
        self.next_global += 1;
        self.globals.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn declare_param(&mut self, name: &str, index: u32) -> Result<()> {
        self.declare_variable(name)?;
        let slot = *self.scopes.last().unwrap().get(name).unwrap();
        self.current_def.insert((slot.0, self.entry_block()), RValueKind::Param(index));
        Ok(())
    }

    pub fn declare_variable(&mut self, name: &str) -> Result<()> {
        if self.globals.contains_key(name) {
            return Err(chrono_ir::IrError::DuplicateVariable(name.to_string()).into());
        }
        let innermost = self.scopes.last_mut().expect("at least one scope");
        if innermost.contains_key(name) {
            return Err(chrono_ir::IrError::DuplicateVariable(name.to_string()).into());
        }
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        innermost.insert(name.to_string(), slot);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<Variable> {
        for scope in self.scopes.iter().rev() {
            if let Some(&slot) = scope.get(name) {
                return Some(Variable::Local(slot));
            }
        }
        self.globals.get(name).map(|&id| Variable::Global(id))
    }

    pub fn read_variable(&mut self, name: &str) -> Result<RValue> {
        match self.lookup(name) {
            Some(Variable::Local(slot)) => {
                let kind = self.read_ssa(slot.0, self.current);
                Ok(RValue::with_lvalue(kind, LValue::variable(name)))
            }
            Some(Variable::Global(id)) => {
                Ok(RValue::with_lvalue(RValueKind::GlobalRef(id), LValue::variable(name)))
            }
            None => Err(SsaError::UndefinedVariable(name.to_string())),
        }
    }

    pub fn write_variable(&mut self, name: &str, value: RValue) -> Result<()> {
        match self.lookup(name) {
            Some(Variable::Local(slot)) => {
                self.current_def.insert((slot.0, self.current), value.kind);
                Ok(())
            }
            Some(Variable::Global(id)) => {
                self.emit(Instruction::Export { dst: id, src: value });
                Ok(())
            }
            None => Err(SsaError::UndefinedVariable(name.to_string())),
        }
    }

    /// Reads back the current value behind an lvalue, for compound
    /// assignment (`mkAssignment(lv, mkBinaryOp(op, readBack(lv), rhs))`,
    /// §4.1).
    pub fn read_back(&mut self, lv: &LValue) -> Result<RValue> {
        match lv {
            LValue::Variable(name) => self.read_variable(name),
            LValue::Member { container, key } => {
                Ok(self.mk_get((**container).clone(), (**key).clone()))
            }
        }
    }

    pub fn mk_assignment(&mut self, lv: LValue, rhs: RValue) -> Result<RValue> {
        match lv {
            LValue::Variable(name) => {
                self.write_variable(&name, rhs.clone())?;
                Ok(rhs)
            }
            LValue::Member { container, key } => {
                let dst = self.func.new_temp();
                self.emit(Instruction::Expression {
                    op: Operator::ContainerSet,
                    dst,
                    srcs: vec![*container, *key, rhs],
                });
                Ok(RValue::temp(dst))
            }
        }
    }

    // ---- Braun et al. on-the-fly SSA (§4.1) ----

    fn read_ssa(&mut self, slot: u32, block: BlockId) -> RValueKind {
        if let Some(&v) = self.current_def.get(&(slot, block)) {
            let resolved = self.resolve_kind(v);
            self.current_def.insert((slot, block), resolved);
            return resolved;
        }
        let result = if !self.func.block(block).sealed {
            let phi = self.new_phi(block);
            self.func.block_mut(block).incomplete_phis.push((slot, phi));
            RValueKind::Temporary(phi)
        } else if let Some(pred) = self.func.block(block).single_pred() {
            self.read_ssa(slot, pred)
        } else {
            let phi = self.new_phi(block);
            self.current_def.insert((slot, block), RValueKind::Temporary(phi));
            self.add_phi_operands(slot, phi, block)
        };
        self.current_def.insert((slot, block), result);
        result
    }

    fn new_phi(&mut self, block: BlockId) -> TempId {
        let dst = self.func.new_temp();
        self.func
            .block_mut(block)
            .push_phi_front(Instruction::Phi { dst, srcs: Vec::new() });
        self.def_block.insert(dst, block);
        dst
    }

    fn add_phi_operands(&mut self, slot: u32, phi: TempId, block: BlockId) -> RValueKind {
        let preds = self.func.block(block).preds.clone();
        for pred in preds {
            let kind = self.read_ssa(slot, pred);
            self.append_phi_operand(phi, pred, kind);
        }
        self.try_remove_trivial_phi(phi)
    }

    fn append_phi_operand(&mut self, phi: TempId, from: BlockId, kind: RValueKind) {
        let block = self.def_block[&phi];
        let instr = self
            .func
            .block_mut(block)
            .instructions
            .iter_mut()
            .find(|i| i.dst() == Some(phi))
            .expect("phi must exist in its recorded block");
        if let Instruction::Phi { srcs, .. } = instr {
            srcs.push(chrono_ir::PhiSource { from, value: RValue::new(kind) });
        }
        if let RValueKind::Temporary(t) = kind {
            self.phi_users.entry(t).or_default().push(phi);
        }
    }

    /// `tryRemoveTrivialPhi` (§4.1). Returns the phi's final value — either
    /// itself (non-trivial) or the replacement it redirects to.
    fn try_remove_trivial_phi(&mut self, phi: TempId) -> RValueKind {
        let block = self.def_block[&phi];
        let srcs = match self.func.block(block).instructions.iter().find(|i| i.dst() == Some(phi))
        {
            Some(Instruction::Phi { srcs, .. }) => srcs.clone(),
            _ => return RValueKind::Temporary(phi),
        };

        let mut same: Option<RValueKind> = None;
        for src in &srcs {
            let resolved = self.resolve_kind(src.value.kind);
            if resolved == RValueKind::Temporary(phi) {
                continue; // self-reference
            }
            match same {
                Some(s) if s == resolved => {}
                Some(_) => return RValueKind::Temporary(phi), // more than one distinct operand
                None => same = Some(resolved),
            }
        }

        let replacement = same.unwrap_or(RValueKind::Undef);
        self.redirects.insert(phi, replacement);

        if let Some(users) = self.phi_users.remove(&phi) {
            for user in users {
                if user != phi {
                    self.try_remove_trivial_phi(user);
                }
            }
        }
        replacement
    }

    fn resolve_kind(&self, kind: RValueKind) -> RValueKind {
        Self::resolve_kind_map(&self.redirects, kind)
    }

    fn resolve_kind_map(redirects: &HashMap<TempId, RValueKind>, kind: RValueKind) -> RValueKind {
        let mut current = kind;
        let mut guard = 0;
        while let RValueKind::Temporary(t) = current {
            match redirects.get(&t) {
                Some(&next) => {
                    current = next;
                    guard += 1;
                    if guard > 1_000_000 {
                        break; // defensive: should be unreachable, redirect chains are acyclic by construction
                    }
                }
                None => break,
            }
        }
        current
    }

    fn instruction_for(&self, temp: TempId) -> Option<&Instruction> {
        let block = self.def_block.get(&temp)?;
        self.func.block(*block).instructions.iter().find(|i| i.dst() == Some(temp))
    }

    // ---- control flow (§4.1 "Control-flow helpers") ----

    pub fn create_bb_after(&mut self, loop_: Option<LoopId>) -> BlockId {
        let id = self.func.new_block();
        if let Some(l) = loop_ {
            self.func.block_mut(id).loop_ = Some(l);
            self.func.loops[l.index()].members.push(id);
        }
        id
    }

    pub fn new_loop(&mut self, header: BlockId, parent: Option<LoopId>) -> LoopId {
        self.func.new_loop(header, parent)
    }

    pub fn seal_block(&mut self, block: BlockId) {
        let pending = std::mem::take(&mut self.func.block_mut(block).incomplete_phis);
        for (slot, phi) in pending {
            self.add_phi_operands(slot, phi, block);
        }
        self.func.block_mut(block).sealed = true;
    }

    pub fn add_pred(&mut self, block: BlockId, pred: BlockId) {
        self.func.link(pred, block);
    }

    pub fn mk_jump(&mut self, op: JumpOp, target: Option<BlockId>, srcs: Vec<RValue>) {
        self.emit(Instruction::Jump { op, target, srcs });
    }

    pub fn mk_return(&mut self, src: Option<RValue>) {
        self.emit(Instruction::Return { src });
    }

    pub fn mk_noop(&mut self) {
        self.emit(Instruction::NoOp);
    }

    pub fn mk_break(&mut self) -> Result<()> {
        let target = *self.break_stack.last().ok_or(chrono_ir::IrError::BreakOutsideLoop)?;
        self.mk_jump(JumpOp::Jmp, Some(target), Vec::new());
        Ok(())
    }

    pub fn mk_continue(&mut self) -> Result<()> {
        let target = *self.continue_stack.last().ok_or(chrono_ir::IrError::ContinueOutsideLoop)?;
        self.mk_jump(JumpOp::Jmp, Some(target), Vec::new());
        Ok(())
    }

    // ---- calls ----

    pub fn mk_call(&mut self, name: &str, args: Vec<RValue>, want_result: bool) -> RValue {
        let dst = if want_result { Some(self.func.new_temp()) } else { None };
        self.emit(Instruction::FunctionCall {
            op: CallOp::Call,
            dst,
            target: CallTarget::Unresolved(name.to_string()),
            srcs: args,
        });
        dst.map(RValue::temp).unwrap_or_else(RValue::undef)
    }

    /// Resolves `name` against the method registry immediately (§4.6/§4.7:
    /// "`CallMethod` and `CallBuiltin` targets resolve to a registry index
    /// immediately since both tables are known at SSA-build time") — unlike
    /// a free `Call`, a method name is never ambiguous across modules.
    pub fn mk_call_method(&mut self, name: &str, receiver: RValue, mut args: Vec<RValue>) -> Result<RValue> {
        let index = chrono_builtins::lookup_method(name).ok_or_else(|| SsaError::UnknownMethod(name.to_string()))?;
        let dst = self.func.new_temp();
        let mut srcs = vec![receiver];
        srcs.append(&mut args);
        self.emit(Instruction::FunctionCall {
            op: CallOp::CallMethod,
            dst: Some(dst),
            target: CallTarget::Method(index),
            srcs,
        });
        Ok(RValue::temp(dst))
    }

    // ---- containers (§4.8, §6 literals) ----

    pub fn mk_get(&mut self, container: RValue, key: RValue) -> RValue {
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression {
            op: Operator::ContainerGet,
            dst,
            srcs: vec![container.clone(), key.clone()],
        });
        RValue::with_lvalue(RValueKind::Temporary(dst), LValue::member(container, key))
    }

    pub fn mk_new_object(&mut self) -> RValue {
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression { op: Operator::NewObject, dst, srcs: Vec::new() });
        RValue::temp(dst)
    }

    pub fn mk_new_list(&mut self) -> RValue {
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression { op: Operator::NewList, dst, srcs: Vec::new() });
        RValue::temp(dst)
    }

    pub fn mk_list_append(&mut self, list: RValue, value: RValue) -> RValue {
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression {
            op: Operator::ListAppend,
            dst,
            srcs: vec![list, value],
        });
        RValue::temp(dst)
    }

    // ---- constants & folding (C11, §4.1 "Constant folding", §9) ----

    pub fn mk_int_constant(&mut self, v: i32) -> RValue {
        self.const_rvalue(Value::Integer(v))
    }

    pub fn mk_decimal_constant(&mut self, v: f64) -> RValue {
        self.const_rvalue(Value::Decimal(v))
    }

    pub fn mk_string_constant(&mut self, bytes: &[u8]) -> RValue {
        let idx = self.strings.pop_persistent(bytes);
        self.const_rvalue(Value::String(idx))
    }

    fn const_rvalue(&mut self, value: Value) -> RValue {
        let id = self.func.intern_constant(value);
        RValue::constant(id)
    }

    fn const_value(&self, rv: &RValue) -> Option<Value> {
        rv.as_constant().map(|id| self.func.constants[id.index()])
    }

    pub fn mk_unary_op(&mut self, op: UnaryOp, operand: RValue) -> RValue {
        if let Some(v) = self.const_value(&operand) {
            if let Ok(folded) = chrono_values::eval_unary(op, v) {
                return self.const_rvalue(self.promote_if_string(folded));
            }
        }
        match op {
            UnaryOp::Bool if self.is_boolean_valued(&operand) => return operand,
            UnaryOp::BoolNot => {
                if let Some(inner) = self.unwrap_bool_operand(&operand) {
                    return self.mk_unary_op(UnaryOp::BoolNot, inner);
                }
            }
            _ => {}
        }
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression { op: Operator::Unary(op), dst, srcs: vec![operand] });
        RValue::temp(dst)
    }

    pub fn mk_binary_op(&mut self, op: BinaryOp, lhs: RValue, rhs: RValue) -> RValue {
        if let (Some(a), Some(b)) = (self.const_value(&lhs), self.const_value(&rhs)) {
            if let Ok(folded) = chrono_values::eval_binary(op, a, b, self.strings) {
                let folded = self.promote_if_string(folded);
                return self.const_rvalue(folded);
            }
        }
        let dst = self.func.new_temp();
        self.emit(Instruction::Expression { op: Operator::Binary(op), dst, srcs: vec![lhs, rhs] });
        RValue::temp(dst)
    }

    /// §9 "Constant folding safety": a folded string concatenation must
    /// survive past the next temporary sweep, so promote it before it ever
    /// becomes a constant.
    fn promote_if_string(&mut self, value: Value) -> Value {
        if let Value::String(idx) = value {
            self.strings.promote_to_persistent(idx);
        }
        value
    }

    fn unwrap_bool_operand(&self, rv: &RValue) -> Option<RValue> {
        let RValueKind::Temporary(t) = rv.kind else { return None };
        match self.instruction_for(t)? {
            Instruction::Expression { op: Operator::Unary(UnaryOp::Bool), srcs, .. } => {
                srcs.first().cloned()
            }
            _ => None,
        }
    }

    /// A value is "boolean-valued" per §4.1 if it's a comparison, a
    /// `Bool`/`BoolNot`, an integer constant 0/1, or a phi all of whose
    /// operands are boolean-valued.
    fn is_boolean_valued(&self, rv: &RValue) -> bool {
        match rv.kind {
            RValueKind::Constant(id) => {
                matches!(self.func.constants[id.index()], Value::Integer(0) | Value::Integer(1))
            }
            RValueKind::Temporary(t) => match self.instruction_for(t) {
                Some(Instruction::Expression { op: Operator::Binary(b), .. }) => b.is_comparison(),
                Some(Instruction::Expression {
                    op: Operator::Unary(UnaryOp::Bool | UnaryOp::BoolNot),
                    ..
                }) => true,
                Some(Instruction::Phi { srcs, .. }) => {
                    let srcs = srcs.clone();
                    srcs.iter().all(|s| self.is_boolean_valued(&s.value))
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn emit(&mut self, instr: Instruction) {
        if let Some(dst) = instr.dst() {
            self.def_block.insert(dst, self.current);
        }
        self.func.block_mut(self.current).push(instr);
    }

    /// Resolves every remaining stale reference to a since-eliminated
    /// trivial phi, then hands back the finished function (§4.1).
    pub fn finish(mut self) -> Function {
        let redirects = std::mem::take(&mut self.redirects);
        for block in &mut self.func.blocks {
            for instr in &mut block.instructions {
                for src in instr.srcs_mut() {
                    src.kind = Self::resolve_kind_map(&redirects, src.kind);
                    Self::resolve_lvalue(&redirects, src);
                }
            }
        }
        self.func
    }

    fn resolve_lvalue(redirects: &HashMap<TempId, RValueKind>, rv: &mut RValue) {
        if let Some(LValue::Member { container, key }) = rv.lvalue.as_mut() {
            container.kind = Self::resolve_kind_map(redirects, container.kind);
            key.kind = Self::resolve_kind_map(redirects, key.kind);
            Self::resolve_lvalue(redirects, container);
            Self::resolve_lvalue(redirects, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_values::Value;
    use rstest::rstest;

    /// Constant folding (§4.1/§9): two constant operands to `mk_binary_op`
    /// must fold immediately into a single constant `RValue`, never emit an
    /// `Expression` instruction, across the same promotion/coercion rules
    /// `chrono_values::eval_binary` itself exercises.
    #[rstest]
    #[case(BinaryOp::Add, Value::Integer(2), Value::Integer(3), Value::Integer(5))]
    #[case(BinaryOp::Div, Value::Integer(10), Value::Integer(3), Value::Integer(3))]
    #[case(BinaryOp::Div, Value::Integer(10), Value::Decimal(2.5), Value::Decimal(4.0))]
    #[case(BinaryOp::Mul, Value::Integer(6), Value::Integer(7), Value::Integer(42))]
    #[case(BinaryOp::Lt, Value::Integer(1), Value::Integer(2), Value::Integer(1))]
    #[case(BinaryOp::Eq, Value::Integer(4), Value::Integer(4), Value::Integer(1))]
    fn binary_ops_on_constants_fold_immediately(
        #[case] op: BinaryOp,
        #[case] lhs: Value,
        #[case] rhs: Value,
        #[case] expected: Value,
    ) {
        let mut strings = StringCache::new();
        let mut b = SsaBuilder::new("f", 0, &mut strings);
        let lhs = b.const_rvalue(lhs);
        let rhs = b.const_rvalue(rhs);
        let result = b.mk_binary_op(op, lhs, rhs);
        let id = result.as_constant().expect("constant operands must fold to a constant");
        assert_eq!(b.func.constants[id.index()], expected);
        assert!(b.func.blocks.iter().all(|blk| blk.instructions.is_empty()));
    }
}
