//! A linked, runtime-ready program (§4.6 "compilation cache"): every
//! imported module's functions flattened into one table, addressed by the
//! `CallTargetSlot::Resolved` indices the linker bakes into each
//! `BytecodeFunction`'s `call_targets`.
//!
//! `chrono_compiler` (C9) builds one of these per top-level script; it is
//! the boundary between "compiled, linked, ready to run" and the
//! interpreter, which only ever addresses functions and globals by their
//! flat index into this structure.

use chrono_bytecode::BytecodeFunction;
use chrono_values::Value;

/// One function in the flat, linked table, tagged with the module it came
/// from (for diagnostics) and which of `Program::globals` holds its
/// module's global-variable storage.
#[derive(Debug, Clone)]
pub struct LinkedFunction {
    pub module_path: String,
    pub bytecode: BytecodeFunction,
    pub global_slot: usize,
}

/// The result of linking (§4.6 steps 5-7): every function across every
/// transitively-imported module, plus one global-variable array per module.
/// `Call` targets are already resolved to indices into `functions`;
/// `CallBuiltin`/`CallMethod` targets are direct builtin/method indices and
/// never touch this table at all.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: Vec<LinkedFunction>,
    pub globals: Vec<Vec<Value>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a function by its defining module and name — used by the
    /// CLI entry point to find the script's designated entry function.
    pub fn function_id(&self, module_path: &str, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .position(|f| f.module_path == module_path && f.bytecode.name == name)
            .map(|i| i as u32)
    }
}
