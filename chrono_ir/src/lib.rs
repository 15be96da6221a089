//! C3: the SSA intermediate representation — values, instructions, basic
//! blocks, the loop-nesting forest, and the per-function container that
//! holds them all.

pub mod bitset;
pub mod block;
pub mod error;
pub mod function;
pub mod ids;
pub mod instruction;
pub mod rvalue;

pub use bitset::BitSet;
pub use block::{BasicBlock, Loop};
pub use error::{IrError, Result};
pub use function::{Function, PhiCopyGroup};
pub use ids::{BlockId, ConstId, InstrId, LoopId, TempId};
pub use instruction::{CallOp, CallTarget, Instruction, JumpOp, Operator, PhiSource};
pub use rvalue::{LValue, RValue, RValueKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_links_preds_and_succs() {
        let mut f = Function::new("main", 0);
        let a = f.new_block();
        let b = f.new_block();
        f.link(a, b);
        assert_eq!(f.block(a).succs, vec![b]);
        assert_eq!(f.block(b).preds, vec![a]);
    }

    #[test]
    fn finalize_concatenates_blocks_in_order_and_stamps_ranges() {
        let mut f = Function::new("main", 0);
        let a = f.new_block();
        let b = f.new_block();
        f.block_mut(a).push(Instruction::NoOp);
        f.block_mut(b).push(Instruction::NoOp);
        f.block_mut(b).push(Instruction::NoOp);
        let flat = f.finalize();
        assert_eq!(flat.len(), 3);
        assert_eq!(f.block(a).start, Some(InstrId(0)));
        assert_eq!(f.block(a).end, Some(InstrId(1)));
        assert_eq!(f.block(b).start, Some(InstrId(1)));
        assert_eq!(f.block(b).end, Some(InstrId(3)));
    }

    #[test]
    fn scalar_constants_dedup_but_strings_do_not() {
        let mut f = Function::new("main", 0);
        let a = f.intern_constant(chrono_values::Value::Integer(10));
        let b = f.intern_constant(chrono_values::Value::Integer(10));
        assert_eq!(a, b);
        let s1 = f.intern_constant(chrono_values::Value::String(0));
        let s2 = f.intern_constant(chrono_values::Value::String(0));
        assert_ne!(s1, s2);
    }
}
