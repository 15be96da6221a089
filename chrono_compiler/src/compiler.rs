//! The compilation cache (C9, §4.6): `import(path)` loads a module (or
//! returns the cached one), pre-registers every function it declares so
//! mutually recursive and cyclic imports resolve, recurses into its
//! imports, then links and fully compiles each of its functions down to
//! bytecode.

use hashbrown::HashMap;

use chrono_bytecode::{build_function, BytecodeFunction};
use chrono_ir::{CallOp, CallTarget, Function, Instruction, TempId};
use chrono_liveness::{coalesce, compute_live_intervals, compute_live_sets, interference};
use chrono_ssa::SsaBuilder;
use chrono_values::{StringCache, Value};
use chrono_vm::{LinkedFunction, Program};

use crate::error::{CompilerError, Result};
use crate::source::{canonicalize, FunctionSignature, ModuleProvider, ModuleSource};

/// One cached module (§3 "Module (C9)"): its pre-registered function ids,
/// its canonicalised import list (resolved to module indices), and the
/// slot of `Program::globals` its `Export`s write into.
struct ModuleRecord {
    path: String,
    function_ids: HashMap<String, u32>,
    imports: Vec<usize>,
    global_count: usize,
}

/// Drives one whole-program compile. Not reused across programs: build a
/// fresh one per [`compile`] call, the way the spec's arena-scoped
/// compilation cache is scoped to one parse (§5 "bulk-release allocator
/// scoped to the parse of one file").
pub struct Compiler<'p> {
    provider: &'p dyn ModuleProvider,
    strings: StringCache,
    cache: HashMap<String, usize>,
    modules: Vec<ModuleRecord>,
    functions: Vec<Option<LinkedFunction>>,
}

/// Compiles `entry_path` and everything it transitively imports into a
/// single linked [`Program`], along with the [`StringCache`] it was
/// compiled against. The cache must be handed to [`chrono_vm::Interpreter`]
/// unchanged — every `Value::String` baked into a function's constant pool
/// is an index into it.
pub fn compile(provider: &dyn ModuleProvider, entry_path: &str) -> Result<(Program, StringCache)> {
    let mut compiler = Compiler {
        provider,
        strings: StringCache::new(),
        cache: HashMap::new(),
        modules: Vec::new(),
        functions: Vec::new(),
    };
    compiler.import(entry_path)?;

    let mut globals = vec![Vec::new(); compiler.modules.len()];
    for (i, module) in compiler.modules.iter().enumerate() {
        globals[i] = vec![Value::Empty; module.global_count];
    }
    let functions = compiler
        .functions
        .into_iter()
        .map(|f| f.expect("every pre-registered function id is filled before import() returns"))
        .collect();
    Ok((Program { functions, globals }, compiler.strings))
}

impl<'p> Compiler<'p> {
    /// §4.6 steps 1-7. Returns the module's index in `self.modules`, stable
    /// across the whole compile (it doubles as `global_slot`).
    fn import(&mut self, path: &str) -> Result<usize> {
        let canonical = canonicalize(path);
        if let Some(&index) = self.cache.get(&canonical) {
            return Ok(index);
        }

        let source =
            self.provider.load(&canonical).ok_or_else(|| CompilerError::UnknownModule(canonical.clone()))?;
        let global_names = source.globals();
        let signatures = source.functions();

        let module_index = self.modules.len();
        // Registered before recursing into imports (step 4): a cyclic
        // import sees this entry, with its functions already pre-allocated,
        // instead of recursing forever.
        self.cache.insert(canonical.clone(), module_index);

        let mut function_ids = HashMap::new();
        for sig in &signatures {
            if function_ids.contains_key(&sig.name) {
                return Err(CompilerError::DuplicateFunction(sig.name.clone(), canonical.clone()));
            }
            let id = self.functions.len() as u32;
            self.functions.push(None);
            function_ids.insert(sig.name.clone(), id);
        }

        self.modules.push(ModuleRecord {
            path: canonical.clone(),
            function_ids,
            imports: Vec::new(),
            global_count: global_names.len(),
        });

        let mut imports = Vec::with_capacity(source.imports().len());
        for import_path in source.imports() {
            imports.push(self.import(&import_path)?);
        }
        self.modules[module_index].imports = imports;

        for sig in &signatures {
            let bytecode = self.compile_function(module_index, &global_names, sig, source.as_ref())?;
            let func_id = self.modules[module_index].function_ids[&sig.name];
            self.functions[func_id as usize] =
                Some(LinkedFunction { module_path: canonical.clone(), bytecode, global_slot: module_index });
        }

        Ok(module_index)
    }

    /// §4.6 steps 5-6 for one function: resolve its `Call` targets against
    /// this module, then its imports, then the builtins table, and run it
    /// through finalize -> liveness -> coalescing -> interference ->
    /// coloring -> bytecode emission.
    fn compile_function(
        &mut self,
        module_index: usize,
        global_names: &[String],
        sig: &FunctionSignature,
        source: &dyn ModuleSource,
    ) -> Result<BytecodeFunction> {
        let mut builder = SsaBuilder::new(sig.name.clone(), sig.param_count, &mut self.strings);
        for name in global_names {
            builder.declare_global(name)?;
        }
        source.build_function(&sig.name, &mut builder)?;
        let mut func = builder.finish();

        self.resolve_calls(&mut func, module_index);

        chrono_ssa::finalize(&mut func);
        compute_live_sets(&mut func);
        let intervals = compute_live_intervals(&mut func);
        let coalesced = coalesce(&mut func, intervals);
        let all_temps: Vec<_> = (0..func.temp_count).map(TempId).collect();
        let graph = interference::build(coalesced.uf, coalesced.merged_intervals, &all_temps);
        let colors = chrono_regalloc::allocate(&graph);
        Ok(build_function(&mut func, &graph, &colors))
    }

    /// §4.6 step 5: local module, then imports in *reverse* declaration
    /// order (last import wins), then builtins (opcode rewritten to
    /// `CallBuiltin`). A name matching none of these is logged and left
    /// `Unresolved` — a link warning, not a compile failure.
    fn resolve_calls(&self, func: &mut Function, module_index: usize) {
        for block in &mut func.blocks {
            for instr in &mut block.instructions {
                let Instruction::FunctionCall { op, target, .. } = instr else { continue };
                if *op != CallOp::Call {
                    continue;
                }
                let Some(name) = target.name().map(str::to_string) else { continue };
                match self.resolve_call_target(module_index, &name) {
                    Some((resolved_op, resolved_target)) => {
                        *op = resolved_op;
                        *target = resolved_target;
                    }
                    None => {
                        log::warn!(
                            "unresolved call to `{name}` in module `{}`",
                            self.modules[module_index].path
                        );
                    }
                }
            }
        }
    }

    fn resolve_call_target(&self, module_index: usize, name: &str) -> Option<(CallOp, CallTarget)> {
        let module = &self.modules[module_index];
        if let Some(&id) = module.function_ids.get(name) {
            return Some((CallOp::Call, CallTarget::Local(id)));
        }
        for &imported in module.imports.iter().rev() {
            if let Some(&id) = self.modules[imported].function_ids.get(name) {
                return Some((CallOp::Call, CallTarget::Linked(id)));
            }
        }
        chrono_builtins::lookup_builtin(name).map(|index| (CallOp::CallBuiltin, CallTarget::Builtin(index)))
    }
}
