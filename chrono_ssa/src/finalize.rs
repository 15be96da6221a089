//! Dead-code elimination and phi-copy insertion (§4.1 "Dead-code pass and
//! finalization"), run by `chrono_compiler` once per function between SSA
//! construction and liveness analysis.

use hashbrown::{HashMap, HashSet};

use chrono_ir::{BitSet, Function, Instruction, Operator, PhiCopyGroup, RValue, RValueKind, TempId};

/// Runs the full finalization pipeline: dead-code elimination, phi-copy
/// insertion, flattening the block-ordered instruction stream (stamping
/// each block's `start`/`end`), and computing the `phiDefs`/`phiUses`
/// bit-sets liveness needs (§4.1 steps 1-2, 3 is already maintained
/// incrementally by the builder's `link`, 4-5 here).
pub fn finalize(func: &mut Function) {
    remove_dead_code(func);
    insert_phi_copies(func);
    let _ = func.finalize();
    compute_phi_bitsets(func);
}

/// §4.1 step 1: repeatedly remove every expression whose destination has no
/// users and that has no side effects, to a fixpoint (removing one dead
/// instruction can make one of its operands' definitions dead in turn).
/// Trivial phis were already eliminated during SSA construction; any phi
/// still standing here has real uses and survives until phi-copy insertion
/// (or until this pass finds it has none).
pub fn remove_dead_code(func: &mut Function) {
    loop {
        let mut used: HashSet<TempId> = HashSet::new();
        for block in &func.blocks {
            for instr in &block.instructions {
                for src in instr.srcs() {
                    if let RValueKind::Temporary(t) = src.kind {
                        used.insert(t);
                    }
                }
            }
        }

        let mut changed = false;
        for block in &mut func.blocks {
            let before = block.instructions.len();
            block.instructions.retain(|instr| match instr.dst() {
                Some(dst) if !instr.has_side_effects() => used.contains(&dst),
                _ => true,
            });
            changed |= block.instructions.len() != before;
        }
        if !changed {
            break;
        }
    }
}

/// §4.1 step 2: for every phi, insert a `Mov` of each source into the
/// source's predecessor block (right before its *first* terminator, see
/// below), rewrite the phi operand to read the copy, and record the group
/// so liveness coalescing (§4.2) can merge each copy's interference node
/// into the phi's. Direct execution of `Phi` is never attempted (§9) —
/// after this pass every phi's operands are plain `Mov` temporaries.
///
/// A predecessor can end in a *run* of terminators rather than a single
/// one — §9 "Switch lowering" puts a whole chain of `BranchEqual`s plus a
/// trailing `Jmp` into one "jumps" block, one per case. Inserting a move
/// before only the block's last instruction would place the copy for an
/// edge taken by an earlier branch in that chain *after* the branch that
/// actually leaves the block, so it would never run. Inserting before the
/// whole trailing run (`first_terminator_index`) instead runs every
/// predecessor's copies unconditionally before any of its branches are
/// tested, which is correct regardless of which one fires.
///
/// This implementation skips the optional dominance-based use-redirection
/// refinement of §4.1 step 2 (shrinking other uses of a phi source to read
/// the copy when the copy's block dominates them) — it only improves
/// coalescing yield, never correctness, and the reference dominance
/// computation Braun's algorithm otherwise avoids isn't otherwise needed
/// anywhere in this pipeline.
pub fn insert_phi_copies(func: &mut Function) {
    let mut operands: Vec<(TempId, usize, chrono_ir::BlockId, RValue)> = Vec::new();
    for block in &func.blocks {
        for instr in &block.instructions {
            if let Instruction::Phi { dst, srcs } = instr {
                for (i, src) in srcs.iter().enumerate() {
                    operands.push((*dst, i, src.from, src.value.clone()));
                }
            }
        }
    }

    let mut groups: HashMap<TempId, Vec<TempId>> = HashMap::new();
    let mut order: Vec<TempId> = Vec::new();

    for (phi, index, pred, source) in operands {
        let mov_temp = func.new_temp();
        {
            let pred_block = func.block_mut(pred);
            let insert_at = pred_block.first_terminator_index();
            pred_block.instructions.insert(
                insert_at,
                Instruction::Expression { op: Operator::Mov, dst: mov_temp, srcs: vec![source] },
            );
        }
        for block in &mut func.blocks {
            for instr in &mut block.instructions {
                if let Instruction::Phi { dst, srcs } = instr {
                    if *dst == phi {
                        srcs[index].value = RValue::temp(mov_temp);
                    }
                }
            }
        }
        if !groups.contains_key(&phi) {
            order.push(phi);
        }
        groups.entry(phi).or_default().push(mov_temp);
    }

    func.phi_copies =
        order.into_iter().map(|phi| PhiCopyGroup { phi, copies: groups.remove(&phi).unwrap() }).collect();
}

/// §3 "phiDefs"/"phiUses" per block: the temporaries phis in this block
/// define, and the temporaries their (post-phi-copy) operands read. After
/// phi-copy insertion a phi's operands are always the fresh `Mov`
/// destinations, never the original sources directly.
fn compute_phi_bitsets(func: &mut Function) {
    for block in &mut func.blocks {
        let mut phi_defs = BitSet::new();
        let mut phi_uses = BitSet::new();
        for instr in &block.instructions {
            if let Instruction::Phi { dst, srcs } = instr {
                phi_defs.insert(dst.index());
                for src in srcs {
                    if let RValueKind::Temporary(t) = src.value.kind {
                        phi_uses.insert(t.index());
                    }
                }
            }
        }
        block.phi_defs = phi_defs;
        block.phi_uses = phi_uses;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use chrono_values::{StringCache, UnaryOp};

    use crate::builder::SsaBuilder;

    #[test_case(UnaryOp::Neg; "negation")]
    #[test_case(UnaryOp::BoolNot; "logical not")]
    #[test_case(UnaryOp::BitNot; "bitwise not")]
    fn dead_pure_expression_is_removed(op: UnaryOp) {
        let mut strings = StringCache::new();
        let mut b = SsaBuilder::new("f", 1, &mut strings);
        b.declare_param("p", 0).unwrap();
        let p = b.read_variable("p").unwrap();
        // A pure unary op whose result is never used — not foldable since
        // `p` is a parameter, not a constant.
        let _dead = b.mk_unary_op(op, p);
        b.mk_return(None);
        let mut func = b.finish();
        remove_dead_code(&mut func);
        assert_eq!(func.block(chrono_ir::BlockId(0)).instructions.len(), 1);
    }

    #[test]
    fn phi_copy_insertion_rewrites_operands_and_records_group() {
        let mut strings = StringCache::new();
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
        remove_dead_code(&mut func);
        insert_phi_copies(&mut func);

        assert_eq!(func.phi_copies.len(), 1);
        assert_eq!(func.phi_copies[0].copies.len(), 2);

        // Every predecessor of the merge block now ends with [Mov, Jmp].
        for pred in [then_blk, else_blk] {
            let blk = func.block(pred);
            let len = blk.instructions.len();
            assert!(matches!(
                blk.instructions[len - 2],
                Instruction::Expression { op: Operator::Mov, .. }
            ));
        }
    }

    /// Regression test for a "jumps" block (§9 "Switch lowering") whose
    /// whole body is a trailing run of terminators: `BranchEqual(case1)`,
    /// `BranchEqual(case2)`, `Jmp(default)`. `case2`'s phi merges `entry`
    /// and `case1`; `entry`'s contribution must run before *any* of
    /// `entry`'s own branches are tested, not merely before its last one —
    /// otherwise the `BranchEqual(case2)` that actually takes the edge
    /// would fire before the copy feeding the phi ever executed.
    #[test]
    fn phi_copy_in_a_multi_terminator_jumps_block_precedes_every_branch() {
        let mut strings = StringCache::new();
        let mut b = SsaBuilder::new("f", 1, &mut strings);
        b.declare_param("n", 0).unwrap();
        b.declare_variable("result").unwrap();

        let entry = b.current_block();
        let case1 = b.create_bb_after(None);
        let case2 = b.create_bb_after(None);
        let default = b.create_bb_after(None);

        let two_const = b.mk_int_constant(200);
        b.write_variable("result", two_const).unwrap();

        b.add_pred(case1, entry);
        b.add_pred(case2, entry);
        b.add_pred(default, entry);

        let n = b.read_variable("n").unwrap();
        let one = b.mk_int_constant(1);
        b.mk_jump(chrono_ir::JumpOp::BranchEqual, Some(case1), vec![n.clone(), one]);
        let two = b.mk_int_constant(2);
        b.mk_jump(chrono_ir::JumpOp::BranchEqual, Some(case2), vec![n, two]);
        b.mk_jump(chrono_ir::JumpOp::Jmp, Some(default), vec![]);

        b.set_current_block(case1);
        b.seal_block(case1);
        let one_val = b.mk_int_constant(100);
        b.write_variable("result", one_val).unwrap();
        b.add_pred(case2, case1);
        b.mk_jump(chrono_ir::JumpOp::Jmp, Some(case2), vec![]);

        b.set_current_block(case2);
        b.seal_block(case2);
        let merged = b.read_variable("result").unwrap();
        b.mk_return(Some(merged));

        b.set_current_block(default);
        b.seal_block(default);
        b.mk_return(None);

        let mut func = b.finish();
        remove_dead_code(&mut func);
        insert_phi_copies(&mut func);

        // entry's body is exactly three terminators plus the one phi-copy
        // Mov feeding case2's phi; that Mov must sit before all three,
        // never between the case2 branch and the default jump.
        let entry_blk = func.block(entry);
        assert_eq!(entry_blk.instructions.len(), 4);
        assert!(matches!(
            entry_blk.instructions[0],
            Instruction::Expression { op: Operator::Mov, .. }
        ));
        assert!(entry_blk.instructions[1..].iter().all(Instruction::is_terminator));
    }
}
