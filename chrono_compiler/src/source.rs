//! The contract the out-of-scope parser/preprocessor would satisfy (§1
//! "explicitly out of scope... drives the SSA-construction API in §4.1"):
//! something that, for one source file, can list its imports, its
//! functions' signatures, and build each function's body directly against
//! an [`chrono_ssa::SsaBuilder`]. `chrono_cli` supplies the concrete
//! implementation that stands in for a real lexer/parser.

use chrono_ssa::SsaBuilder;

use crate::error::Result;

/// One function's name and parameter count, known before its body is built
/// — enough for the compiler to pre-register a slot for it (§4.6 step 2)
/// so mutually recursive calls within (or across) modules resolve.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub param_count: u32,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, param_count: u32) -> Self {
        Self { name: name.into(), param_count }
    }
}

/// One already-"parsed" source file (§4.6 "Load file contents... run the
/// preprocessor to produce a token stream and an imports list").
pub trait ModuleSource {
    /// Import paths in declaration order, exactly as written in the source
    /// (not yet canonicalised).
    fn imports(&self) -> Vec<String>;

    /// This module's global variable names, in declaration order. The
    /// compiler calls [`chrono_ssa::SsaBuilder::declare_global`] with these,
    /// in this order, before building every one of the module's functions,
    /// so the same name resolves to the same global id across all of them.
    fn globals(&self) -> Vec<String>;

    /// This module's function signatures, in declaration order.
    fn functions(&self) -> Vec<FunctionSignature>;

    /// Builds `name`'s body against `builder`. `builder` already has every
    /// global from [`ModuleSource::globals`] declared and every parameter
    /// from this function's own signature declared; the implementation is
    /// only responsible for the body.
    fn build_function(&self, name: &str, builder: &mut SsaBuilder<'_>) -> Result<()>;
}

/// Resolves an import path (or a top-level entry path) to its
/// [`ModuleSource`] (§4.6 step 2 "Load file contents").
pub trait ModuleProvider {
    fn load(&self, canonical_path: &str) -> Option<Box<dyn ModuleSource>>;
}

/// §4.6 step 1: "lowercase, backslash -> forward-slash". The compilation
/// cache keys on this form so that two import spellings of the same file
/// share one cache entry.
pub fn canonicalize(path: &str) -> String {
    path.to_lowercase().replace('\\', "/")
}
