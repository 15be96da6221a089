//! Dense index newtypes used throughout the IR (§3). Kept as thin `u32`
//! wrappers so blocks/temporaries/constants can live in flat `Vec`s instead
//! of behind pointers — the whole IR is discarded after bytecode emission
//! (§9 "Ownership of IR"), so there is no lifetime to thread through pointer
//! chasing.

use std::fmt;

macro_rules! dense_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                $name(v)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", stringify!($name), self.0)
            }
        }
    };
}

dense_id!(TempId, "A temporary's dense id, unique within its owning function.");
dense_id!(BlockId, "A basic block's dense id, unique within its owning function.");
dense_id!(ConstId, "A constant's dense id within its owning function's constant pool.");
dense_id!(LoopId, "A loop's dense id within its owning function's loop-nesting forest.");
dense_id!(InstrId, "An instruction's position in the function's flat instruction list.");
