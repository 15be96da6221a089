//! Phi-aware coalescing (§4.2 "Coalescing (phi-aware)"): every phi-copy is
//! merged into its phi unconditionally, then opportunistically merged with
//! its original source when the live ranges don't overlap.

use hashbrown::HashMap;

use chrono_ir::{Function, Instruction, Operator, RValueKind, TempId};

use crate::interval::Intervals;
use crate::union_find::UnionFind;

pub struct Coalesced {
    pub uf: UnionFind,
    pub merged_intervals: HashMap<TempId, Intervals>,
}

/// Runs both coalescing passes over `func`'s phi-copy groups (populated by
/// `chrono_ssa::finalize`) against `intervals` (from
/// `compute_live_intervals`).
pub fn coalesce(func: &Function, mut intervals: HashMap<TempId, Intervals>) -> Coalesced {
    let mut uf = UnionFind::new();

    // mov temp -> the original value it copies, read back off the Mov
    // instruction `insert_phi_copies` left behind.
    let mut mov_source: HashMap<TempId, TempId> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instructions {
            if let Instruction::Expression { op: Operator::Mov, dst, srcs } = instr {
                if let Some(src) = srcs.first() {
                    if let RValueKind::Temporary(t) = src.kind {
                        mov_source.insert(*dst, t);
                    }
                }
            }
        }
    }

    // Mandatory merge: every phi-copy's live range ends exactly where the
    // phi starts, so this always succeeds by construction (§4.2).
    for group in &func.phi_copies {
        for &copy in &group.copies {
            try_merge(&mut uf, &mut intervals, group.phi, copy, true);
        }
    }

    // Opportunistic merge: succeeds only if the copy and its source don't
    // interfere.
    for group in &func.phi_copies {
        for &copy in &group.copies {
            if let Some(&source) = mov_source.get(&copy) {
                try_merge(&mut uf, &mut intervals, copy, source, false);
            }
        }
    }

    Coalesced { uf, merged_intervals: intervals }
}

/// Unions `a` and `b`'s interference nodes iff their live ranges don't
/// overlap, unless `force` is set (the mandatory phi/copy merge). Returns
/// whether the merge happened.
fn try_merge(
    uf: &mut UnionFind,
    intervals: &mut HashMap<TempId, Intervals>,
    a: TempId,
    b: TempId,
    force: bool,
) -> bool {
    let (ra, rb) = (uf.find(a), uf.find(b));
    if ra == rb {
        return true;
    }
    let overlap = match (intervals.get(&ra), intervals.get(&rb)) {
        (Some(ia), Some(ib)) => ia.overlaps(ib),
        _ => false,
    };
    if overlap && !force {
        return false;
    }
    let merged = match (intervals.remove(&ra), intervals.remove(&rb)) {
        (Some(mut ia), Some(ib)) => {
            ia.union_with(&ib);
            Some(ia)
        }
        (Some(ia), None) => Some(ia),
        (None, Some(ib)) => Some(ib),
        (None, None) => None,
    };
    let root = uf.union(a, b);
    if let Some(m) = merged {
        intervals.insert(root, m);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_ssa::SsaBuilder;

    #[test]
    fn phi_and_its_copies_always_coalesce() {
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
        chrono_ssa::finalize(&mut func);
        crate::compute_live_sets(&mut func);
        let intervals = crate::compute_live_intervals(&func);
        let phi = func.phi_copies[0].phi;
        let copies = func.phi_copies[0].copies.clone();

        let coalesced = coalesce(&func, intervals);
        let mut uf = coalesced.uf;
        let phi_root = uf.find(phi);
        for copy in copies {
            assert_eq!(uf.find(copy), phi_root);
        }
    }
}
