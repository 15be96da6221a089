//! C7: lowers a finalized, register-allocated [`chrono_ir::Function`] into
//! the flat `ExecInstruction` bytecode the interpreter (C8) runs (§4.4).

pub mod instr;
pub mod opcode;
pub mod source;

pub use instr::{CallTargetSlot, ExecInstruction};
pub use opcode::Opcode;
pub use source::Source;

use chrono_ir::{CallOp, CallTarget, ConstId, Function, Instruction, Operator, RValue, RValueKind};
use chrono_liveness::InterferenceGraph;
use chrono_values::Value;

/// A function's bytecode (§3 "Bytecode", §4.4). `constants` is this
/// function's own deduplicated pool; the compilation cache (C9) concatenates
/// it into the module-wide pool and rebases every `Constant` source by the
/// cumulative offset of the functions compiled before it.
#[derive(Debug, Clone)]
pub struct BytecodeFunction {
    pub name: String,
    pub param_count: u32,
    pub num_temps: u32,
    pub instructions: Vec<ExecInstruction>,
    /// Flat buffer: each call site's slice starts with a count `Source`
    /// (`file` unused, `index`/`a`-style payload holds the count) followed
    /// by that many encoded argument sources (§4.4).
    pub call_params: Vec<Source>,
    pub call_targets: Vec<CallTargetSlot>,
    pub constants: Vec<Value>,
}

/// Lowers `func` to bytecode using the coloring `colors` computed by
/// [`chrono_regalloc::allocate`] over `graph`. `func` must already be
/// finalized (`chrono_ssa::finalize` ran, block `start`/`end` are stamped)
/// and must not be mutated again afterward except to intern the `Empty`
/// constant this function may add for unreachable-phi / bare-`return`
/// sources.
pub fn build_function(func: &mut Function, graph: &InterferenceGraph, colors: &[u32]) -> BytecodeFunction {
    let block_bc_start = compute_block_starts(func);

    let flat: Vec<Instruction> =
        func.blocks.iter().flat_map(|b| b.instructions.iter().filter(|i| !i.is_phi()).cloned()).collect();

    let mut undef_const: Option<ConstId> = None;
    let mut instructions = Vec::with_capacity(flat.len());
    let mut call_params: Vec<Source> = Vec::new();
    let mut call_targets: Vec<CallTargetSlot> = Vec::new();

    for instr in &flat {
        let exec =
            lower(func, instr, graph, colors, &block_bc_start, &mut undef_const, &mut call_params, &mut call_targets);
        instructions.push(exec);
    }

    let num_temps = colors.iter().copied().max().map(|m| m + 1).unwrap_or(0);

    BytecodeFunction {
        name: func.name.clone(),
        param_count: func.param_count,
        num_temps,
        instructions,
        call_params,
        call_targets,
        constants: func.constants.clone(),
    }
}

/// Each block's position in the emitted (phi-free) stream — distinct from
/// `block.start`, which still counts the phis `finalize()` stamped ranges
/// over before this pass drops them.
fn compute_block_starts(func: &Function) -> Vec<u32> {
    let mut starts = vec![0u32; func.blocks.len()];
    let mut cursor = 0u32;
    for block in &func.blocks {
        starts[block.id.index()] = cursor;
        cursor += block.instructions.iter().filter(|i| !i.is_phi()).count() as u32;
    }
    starts
}

fn encode_source(
    func: &mut Function,
    undef_const: &mut Option<ConstId>,
    graph: &InterferenceGraph,
    colors: &[u32],
    rv: &RValue,
) -> Source {
    match rv.kind {
        RValueKind::Temporary(t) => Source::temp(chrono_regalloc::register_for(graph, colors, t) as u8),
        RValueKind::Param(i) => Source::param(i as u8),
        RValueKind::GlobalRef(id) => Source::global(id as u8),
        RValueKind::Constant(id) => Source::constant(id.0),
        RValueKind::Undef => {
            let id = *undef_const.get_or_insert_with(|| func.intern_constant(Value::Empty));
            Source::constant(id.0)
        }
    }
}

fn lower(
    func: &mut Function,
    instr: &Instruction,
    graph: &InterferenceGraph,
    colors: &[u32],
    block_bc_start: &[u32],
    undef_const: &mut Option<ConstId>,
    call_params: &mut Vec<Source>,
    call_targets: &mut Vec<CallTargetSlot>,
) -> ExecInstruction {
    match instr {
        Instruction::Expression { op, dst, srcs } => {
            let dst_reg = chrono_regalloc::register_for(graph, colors, *dst) as u8;
            match op {
                Operator::Mov => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    ExecInstruction::new(Opcode::Mov, dst_reg, a.0, 0, 0)
                }
                Operator::Unary(u) => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    ExecInstruction::new(Opcode::from_unary(*u), dst_reg, a.0, 0, 0)
                }
                Operator::Binary(b) => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    let c = encode_source(func, undef_const, graph, colors, &srcs[1]);
                    ExecInstruction::new(Opcode::from_binary(*b), dst_reg, a.0, c.0, 0)
                }
                Operator::ContainerGet => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    let b = encode_source(func, undef_const, graph, colors, &srcs[1]);
                    ExecInstruction::new(Opcode::ContainerGet, dst_reg, a.0, b.0, 0)
                }
                Operator::ContainerSet => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    let b = encode_source(func, undef_const, graph, colors, &srcs[1]);
                    let c = encode_source(func, undef_const, graph, colors, &srcs[2]);
                    ExecInstruction::new(Opcode::ContainerSet, dst_reg, a.0, b.0, c.0)
                }
                Operator::NewObject => ExecInstruction::new(Opcode::NewObject, dst_reg, 0, 0, 0),
                Operator::NewList => ExecInstruction::new(Opcode::NewList, dst_reg, 0, 0, 0),
                Operator::ListAppend => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    let b = encode_source(func, undef_const, graph, colors, &srcs[1]);
                    ExecInstruction::new(Opcode::ListAppend, dst_reg, a.0, b.0, 0)
                }
            }
        }
        Instruction::Phi { .. } => unreachable!("phis are filtered out before lowering"),
        Instruction::FunctionCall { op, dst, target, srcs } => {
            let dst_reg = dst.map(|d| chrono_regalloc::register_for(graph, colors, d) as u8).unwrap_or(0);

            let params_index = call_params.len() as u16;
            call_params.push(Source(srcs.len() as u16));
            for s in srcs {
                let encoded = encode_source(func, undef_const, graph, colors, s);
                call_params.push(encoded);
            }

            let (opcode, target_word) = match (op, target) {
                (CallOp::CallBuiltin, CallTarget::Builtin(i)) => (Opcode::CallBuiltin, *i as u16),
                (CallOp::CallMethod, CallTarget::Method(i)) => (Opcode::CallMethod, *i as u16),
                (CallOp::Call, CallTarget::Local(i)) | (CallOp::Call, CallTarget::Linked(i)) => {
                    call_targets.push(CallTargetSlot::Resolved(*i));
                    (Opcode::Call, (call_targets.len() - 1) as u16)
                }
                (CallOp::Call, CallTarget::Unresolved(name)) => {
                    log::warn!("unresolved call to `{name}` reached bytecode emission");
                    call_targets.push(CallTargetSlot::Unresolved(name.clone()));
                    (Opcode::Call, (call_targets.len() - 1) as u16)
                }
                _ => panic!("call op {op:?} paired with mismatched target {target:?}"),
            };
            ExecInstruction::new(opcode, dst_reg, target_word, params_index, 0)
        }
        Instruction::Jump { op, target, srcs } => {
            let target_pos = target.map(|t| block_bc_start[t.index()]).unwrap_or(0) as u16;
            match op {
                chrono_ir::JumpOp::Jmp => ExecInstruction::new(Opcode::Jmp, 0, target_pos, 0, 0),
                chrono_ir::JumpOp::BranchTrue => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    ExecInstruction::new(Opcode::BranchTrue, 0, a.0, target_pos, 0)
                }
                chrono_ir::JumpOp::BranchFalse => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    ExecInstruction::new(Opcode::BranchFalse, 0, a.0, target_pos, 0)
                }
                chrono_ir::JumpOp::BranchEqual => {
                    let a = encode_source(func, undef_const, graph, colors, &srcs[0]);
                    let b = encode_source(func, undef_const, graph, colors, &srcs[1]);
                    ExecInstruction::new(Opcode::BranchEqual, 0, a.0, b.0, target_pos)
                }
            }
        }
        Instruction::Export { dst, src } => {
            let a = encode_source(func, undef_const, graph, colors, src);
            ExecInstruction::new(Opcode::Export, *dst as u8, a.0, 0, 0)
        }
        Instruction::Return { src } => {
            let a = match src {
                Some(rv) => encode_source(func, undef_const, graph, colors, rv),
                None => {
                    let id = *undef_const.get_or_insert_with(|| func.intern_constant(Value::Empty));
                    Source::constant(id.0)
                }
            };
            ExecInstruction::new(Opcode::Return, 0, a.0, 0, 0)
        }
        Instruction::NoOp | Instruction::BlockDecl(_) => ExecInstruction::new(Opcode::NoOp, 0, 0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_liveness::{coalesce, compute_live_intervals, compute_live_sets, InterferenceGraph};
    use chrono_ssa::SsaBuilder;

    fn pipeline(func: &mut Function) -> (InterferenceGraph, Vec<u32>) {
        chrono_ssa::finalize(func);
        compute_live_sets(func);
        let intervals = compute_live_intervals(func);
        let coalesced = coalesce(func, intervals);
        let all_temps: Vec<_> = (0..func.temp_count).map(chrono_ir::TempId).collect();
        let graph = chrono_liveness::interference::build(coalesced.uf, coalesced.merged_intervals, &all_temps);
        let colors = chrono_regalloc::allocate(&graph);
        (graph, colors)
    }

    #[test]
    fn straight_line_add_lowers_to_a_single_binary_instruction() {
        let mut strings = chrono_values::StringCache::new();
        let mut b = SsaBuilder::new("f", 2, &mut strings);
        b.declare_param("a", 0).unwrap();
        b.declare_param("b", 1).unwrap();
        let a = b.read_variable("a").unwrap();
        let bb = b.read_variable("b").unwrap();
        let sum = b.mk_binary_op(chrono_values::BinaryOp::Add, a, bb);
        b.mk_return(Some(sum));
        let mut func = b.finish();

        let (graph, colors) = pipeline(&mut func);
        let bc = build_function(&mut func, &graph, &colors);

        let add_count = bc.instructions.iter().filter(|i| i.opcode == Opcode::Add).count();
        assert_eq!(add_count, 1);
        assert!(bc.instructions.iter().any(|i| i.opcode == Opcode::Return));
    }

    #[test]
    fn phi_never_reaches_the_emitted_stream() {
        let mut strings = chrono_values::StringCache::new();
        let mut b = SsaBuilder::new("f", 1, &mut strings);
        b.declare_param("cond", 0).unwrap();
        b.declare_variable("x").unwrap();
        let entry = b.current_block();
        let then_blk = b.create_bb_after(None);
        let else_blk = b.create_bb_after(None);
        let after = b.create_bb_after(None);
        let cond = b.read_variable("cond").unwrap();
        b.add_pred(then_blk, entry);
        b.add_pred(else_blk, entry);
        b.mk_jump(chrono_ir::JumpOp::BranchFalse, Some(else_blk), vec![cond]);

        b.set_current_block(then_blk);
        b.seal_block(then_blk);
        let one = b.mk_int_constant(1);
        b.write_variable("x", one).unwrap();
        b.add_pred(after, then_blk);
        b.mk_jump(chrono_ir::JumpOp::Jmp, Some(after), vec![]);

        b.set_current_block(else_blk);
        b.seal_block(else_blk);
        let two = b.mk_int_constant(2);
        b.write_variable("x", two).unwrap();
        b.add_pred(after, else_blk);
        b.mk_jump(chrono_ir::JumpOp::Jmp, Some(after), vec![]);

        b.set_current_block(after);
        b.seal_block(after);
        let merged = b.read_variable("x").unwrap();
        b.mk_return(Some(merged));
        let mut func = b.finish();

        let (graph, colors) = pipeline(&mut func);
        let bc = build_function(&mut func, &graph, &colors);
        assert_eq!(func.phi_copies.len(), 1);
        assert_eq!(bc.instructions.iter().filter(|i| matches!(i.opcode, Opcode::Mov)).count(), 2);
    }
}
