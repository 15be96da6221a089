//! C9: the compilation cache — per-canonical-path module cache and the
//! cross-module linker that resolves free `Call` targets (§4.6). Sits
//! between whatever drives [`chrono_ssa::SsaBuilder`] (a real parser is out
//! of scope; see [`source::ModuleSource`]) and [`chrono_vm`], which only
//! ever runs the finished, linked [`chrono_vm::Program`].

mod compiler;
mod error;
mod source;

pub use compiler::compile;
pub use error::{CompilerError, Result};
pub use source::{canonicalize, FunctionSignature, ModuleProvider, ModuleSource};
