//! C8: the dispatch loop (§4.5). A plain recursive-descent interpreter over
//! frames, matching §5's "no preemption, no coroutines, failure is the only
//! early termination".

use chrono_bytecode::source::{FILE_CONSTANT_BASE, FILE_GLOBAL, FILE_PARAM, FILE_TEMP};
use chrono_bytecode::{ExecInstruction, Opcode, Source};
use chrono_builtins::Host;
use chrono_heap::ContainerHeap;
use chrono_values::{BinaryOp, StringCache, UnaryOp, Value, ValueError};

use crate::error::{Result, VmError};
use crate::module::Program;

/// Bounds recursion depth; the interpreter has no trampoline, so an
/// unbounded script-level recursion would otherwise blow the Rust stack
/// instead of returning a `VmError` (§5 has no cancellation model of its
/// own to reuse here).
const MAX_CALL_DEPTH: usize = 4096;

/// The interpreter's full runtime state: the linked program, and the two
/// process-wide singletons (§5 "process-wide or runtime-wide singletons")
/// every frame reads and writes through.
pub struct Interpreter {
    pub program: Program,
    pub strings: StringCache,
    pub heap: ContainerHeap,
    script_args: Vec<String>,
    depth: usize,
}

impl Interpreter {
    /// `strings` must be the same [`StringCache`] instance `chrono_compiler`
    /// compiled `program` against — every `Value::String` baked into a
    /// function's constant pool is an index into it, so starting the
    /// interpreter from a fresh cache would make those indices dangle.
    /// The container heap, by contrast, is always fresh: constant folding
    /// never allocates a container, only scalars and strings (§4.1).
    pub fn new(program: Program, strings: StringCache, script_args: Vec<String>) -> Self {
        Self { program, strings, heap: ContainerHeap::new(), script_args, depth: 0 }
    }

    /// The top-level `runFunction` (§4.5 final paragraph): runs `func_id`,
    /// promotes a returned string to persistent (every temporary is about
    /// to be swept), then sweeps temporaries regardless of outcome.
    pub fn run_function(&mut self, func_id: u32, args: &[Value]) -> Result<Value> {
        let result = self.call(func_id, args);
        if let Ok(Value::String(idx)) = result {
            self.strings.promote_to_persistent(idx);
        }
        self.heap.clear_temporary_references(&mut self.strings);
        self.strings.clear_temporary();
        result
    }

    /// Runs `markAll` + `sweep` over the container heap (§5 "typically at
    /// shutdown"). The host decides when to call this; the interpreter
    /// never invokes it on its own.
    pub fn collect_garbage(&mut self) {
        self.heap.mark_all();
        self.heap.sweep(&mut self.strings);
    }

    /// Marks `value` as a GC root before a collection, if it points into the
    /// heap.
    pub fn mark_root(&mut self, value: Value) {
        if let Some(idx) = value.as_heap_index() {
            self.heap.push_gray(idx);
        }
    }

    fn call(&mut self, func_id: u32, args: &[Value]) -> Result<Value> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(VmError::StackOverflow(MAX_CALL_DEPTH));
        }
        let result = self.run_frame(func_id, args);
        self.depth -= 1;
        result
    }

    fn run_frame(&mut self, func_id: u32, args: &[Value]) -> Result<Value> {
        let num_temps = self.program.functions[func_id as usize].bytecode.num_temps as usize;
        let mut temps = vec![Value::Empty; num_temps];
        let mut pc: usize = 0;

        loop {
            let instr: ExecInstruction = self.program.functions[func_id as usize].bytecode.instructions[pc];
            match instr.opcode {
                Opcode::NoOp => pc += 1,

                Opcode::Mov => {
                    temps[instr.dst as usize] = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    pc += 1;
                }

                Opcode::Neg | Opcode::BitNot | Opcode::Bool | Opcode::BoolNot => {
                    let v = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    temps[instr.dst as usize] = chrono_values::eval_unary(unary_op(instr.opcode), v)?;
                    pc += 1;
                }

                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::BitAnd
                | Opcode::BitOr
                | Opcode::BitXor
                | Opcode::Shl
                | Opcode::Shr
                | Opcode::Eq
                | Opcode::Ne
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Gt
                | Opcode::Ge => {
                    let lhs = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    let rhs = self.fetch(func_id, Source(instr.b), &temps, args)?;
                    temps[instr.dst as usize] = chrono_values::eval_binary(
                        binary_op(instr.opcode),
                        lhs,
                        rhs,
                        &mut self.strings,
                    )?;
                    pc += 1;
                }

                Opcode::ContainerGet => {
                    let container = as_container_index(self.fetch(func_id, Source(instr.a), &temps, args)?)?;
                    let key = self.fetch(func_id, Source(instr.b), &temps, args)?;
                    temps[instr.dst as usize] = chrono_heap::get(self.heap.get(container), &self.strings, key)?;
                    pc += 1;
                }

                Opcode::ContainerSet => {
                    let container = as_container_index(self.fetch(func_id, Source(instr.a), &temps, args)?)?;
                    let key = self.fetch(func_id, Source(instr.b), &temps, args)?;
                    let value = self.fetch(func_id, Source(instr.c), &temps, args)?;
                    chrono_heap::set(&mut self.heap, &mut self.strings, container, key, value)?;
                    temps[instr.dst as usize] = value;
                    pc += 1;
                }

                Opcode::NewObject => {
                    temps[instr.dst as usize] = Value::Object(self.heap.pop_object());
                    pc += 1;
                }

                Opcode::NewList => {
                    temps[instr.dst as usize] = Value::List(self.heap.pop_list());
                    pc += 1;
                }

                Opcode::ListAppend => {
                    let list = as_container_index(self.fetch(func_id, Source(instr.a), &temps, args)?)?;
                    let value = self.fetch(func_id, Source(instr.b), &temps, args)?;
                    chrono_heap::push(&mut self.heap, &mut self.strings, list, value);
                    temps[instr.dst as usize] = Value::List(list);
                    pc += 1;
                }

                Opcode::Jmp => pc = instr.a as usize,

                Opcode::BranchTrue => {
                    let cond = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    pc = if cond.is_truthy() { instr.b as usize } else { pc + 1 };
                }

                Opcode::BranchFalse => {
                    let cond = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    pc = if cond.is_truthy() { pc + 1 } else { instr.b as usize };
                }

                Opcode::BranchEqual => {
                    let lhs = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    let rhs = self.fetch(func_id, Source(instr.b), &temps, args)?;
                    let eq = chrono_values::eval_binary(BinaryOp::Eq, lhs, rhs, &mut self.strings)?;
                    pc = if eq.is_truthy() { instr.c as usize } else { pc + 1 };
                }

                Opcode::Call => {
                    let slot = &self.program.functions[func_id as usize].bytecode.call_targets[instr.a as usize];
                    let target = match slot {
                        chrono_bytecode::CallTargetSlot::Resolved(id) => *id,
                        chrono_bytecode::CallTargetSlot::Unresolved(name) => {
                            return Err(VmError::UnresolvedCall(name.clone()))
                        }
                    };
                    let call_args = self.collect_call_args(func_id, instr.b, &temps, args)?;
                    let result = self.call(target, &call_args)?;
                    temps[instr.dst as usize] = result;
                    pc += 1;
                }

                Opcode::CallBuiltin => {
                    let call_args = self.collect_call_args(func_id, instr.b, &temps, args)?;
                    temps[instr.dst as usize] =
                        chrono_builtins::call_builtin(instr.a as u32, self, &call_args)?;
                    pc += 1;
                }

                Opcode::CallMethod => {
                    let call_args = self.collect_call_args(func_id, instr.b, &temps, args)?;
                    temps[instr.dst as usize] =
                        chrono_builtins::call_method(instr.a as u32, self, &call_args)?;
                    pc += 1;
                }

                Opcode::Return => {
                    return self.fetch(func_id, Source(instr.a), &temps, args);
                }

                Opcode::Export => {
                    let value = self.fetch(func_id, Source(instr.a), &temps, args)?;
                    let slot = self.program.functions[func_id as usize].global_slot;
                    let globals = &mut self.program.globals[slot];
                    let index = instr.dst as usize;
                    if index >= globals.len() {
                        globals.resize(index + 1, Value::Empty);
                    }
                    globals[index] = value;
                    pc += 1;
                }
            }
        }
    }

    /// Builds the argument vector for a `Call`/`CallBuiltin`/`CallMethod` at
    /// `params_index` into the current function's `call_params` buffer: a
    /// leading count `Source`, followed by that many encoded argument
    /// sources (§4.4).
    fn collect_call_args(
        &self,
        func_id: u32,
        params_index: u16,
        temps: &[Value],
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let call_params = &self.program.functions[func_id as usize].bytecode.call_params;
        let count = call_params[params_index as usize].0 as usize;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let src = call_params[params_index as usize + 1 + i];
            out.push(self.fetch(func_id, src, temps, args)?);
        }
        Ok(out)
    }

    /// `(file, index) -> base[file][index]` (§4.5).
    fn fetch(&self, func_id: u32, src: Source, temps: &[Value], args: &[Value]) -> Result<Value> {
        match src.file() {
            FILE_TEMP => Ok(temps[src.index() as usize]),
            FILE_PARAM => Ok(args[src.index() as usize]),
            FILE_GLOBAL => {
                let slot = self.program.functions[func_id as usize].global_slot;
                Ok(self.program.globals[slot].get(src.index() as usize).copied().unwrap_or(Value::Empty))
            }
            file => {
                let pool = (file - FILE_CONSTANT_BASE) as u32;
                let id = pool * 256 + src.index() as u32;
                Ok(self.program.functions[func_id as usize].bytecode.constants[id as usize])
            }
        }
    }
}

impl Host for Interpreter {
    fn strings(&mut self) -> &mut StringCache {
        &mut self.strings
    }

    fn heap(&mut self) -> &mut ContainerHeap {
        &mut self.heap
    }

    fn strings_and_heap(&mut self) -> (&mut StringCache, &mut ContainerHeap) {
        (&mut self.strings, &mut self.heap)
    }

    fn script_args(&self) -> &[String] {
        &self.script_args
    }
}

fn as_container_index(v: Value) -> Result<u32> {
    v.as_heap_index().ok_or_else(|| ValueError::UnaryTypeMismatch { op: "(container)", operand: v.type_name() }.into())
}

fn unary_op(op: Opcode) -> UnaryOp {
    match op {
        Opcode::Neg => UnaryOp::Neg,
        Opcode::BitNot => UnaryOp::BitNot,
        Opcode::Bool => UnaryOp::Bool,
        Opcode::BoolNot => UnaryOp::BoolNot,
        other => unreachable!("{other:?} is not a unary opcode"),
    }
}

fn binary_op(op: Opcode) -> BinaryOp {
    match op {
        Opcode::Add => BinaryOp::Add,
        Opcode::Sub => BinaryOp::Sub,
        Opcode::Mul => BinaryOp::Mul,
        Opcode::Div => BinaryOp::Div,
        Opcode::Mod => BinaryOp::Mod,
        Opcode::BitAnd => BinaryOp::BitAnd,
        Opcode::BitOr => BinaryOp::BitOr,
        Opcode::BitXor => BinaryOp::BitXor,
        Opcode::Shl => BinaryOp::Shl,
        Opcode::Shr => BinaryOp::Shr,
        Opcode::Eq => BinaryOp::Eq,
        Opcode::Ne => BinaryOp::Ne,
        Opcode::Lt => BinaryOp::Lt,
        Opcode::Le => BinaryOp::Le,
        Opcode::Gt => BinaryOp::Gt,
        Opcode::Ge => BinaryOp::Ge,
        other => unreachable!("{other:?} is not a binary opcode"),
    }
}
