//! C8: the bytecode interpreter (§4.5). Consumes the linked [`Program`]
//! `chrono_compiler` (C9) builds and runs it to completion, dispatching
//! `CallBuiltin`/`CallMethod` through [`chrono_builtins`] over its own
//! string cache and container heap.

mod error;
mod interpreter;
mod module;

pub use error::{Result, VmError};
pub use interpreter::Interpreter;
pub use module::{LinkedFunction, Program};
