//! Command-line entry point for the ChronoScript toolchain. Stands in for
//! whatever front-end would normally hand `chrono_compiler` a real parsed
//! module (§1: the lexer/parser/preprocessor are out of scope) by shipping
//! a fixed set of hand-built demo programs (see [`demos`]) addressable by
//! name.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chrono_values::{StringCache, Value};

mod config;
mod demos;

/// The ChronoScript toolchain CLI.
#[derive(Parser)]
#[command(name = "runscript")]
#[command(about = "Compile and run ChronoScript demo programs", long_about = None)]
struct Cli {
    /// Sets the level of verbosity (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a `chronoscript.toml` config file; defaults to one in the
    /// current directory if present, otherwise built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run one of the bundled demo programs.
    Run {
        /// Demo program name (see `list`).
        demo: String,
        /// Arguments exposed to the script through `get_args`.
        script_args: Vec<String>,
    },
    /// List the demo programs this build ships.
    List,
    /// Exercise the container heap's mark-sweep collector directly,
    /// outside the SSA/bytecode pipeline: builds a cycle of persistent
    /// objects, drops the caller's references, then runs a collection
    /// cycle and reports what survived.
    GcDemo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::init();
    match cli.verbose {
        0 => log::set_max_level(log::LevelFilter::Warn),
        1 => log::set_max_level(log::LevelFilter::Info),
        2 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let cfg = match config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run { demo, script_args } => run_demo(&demo, script_args, &cfg),
        Commands::List => list_demos(),
        Commands::GcDemo => gc_demo(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn list_demos() -> Result<()> {
    for name in demos::names() {
        println!("{name}");
    }
    Ok(())
}

fn run_demo(demo: &str, script_args: Vec<String>, cfg: &config::ChronoConfig) -> Result<()> {
    if !demos::names().contains(&demo) {
        anyhow::bail!("no such demo '{demo}' (see `runscript list`)");
    }

    let provider = demos::DemoProvider;
    let (program, strings) =
        chrono_compiler::compile(&provider, demo).with_context(|| format!("compiling '{demo}'"))?;
    let canonical = chrono_compiler::canonicalize(demo);
    let entry = program
        .function_id(&canonical, "main")
        .with_context(|| format!("'{demo}' declares no entry point named `main`"))?;

    let mut vm = chrono_vm::Interpreter::new(program, strings, script_args);
    let result = vm.run_function(entry, &[]).with_context(|| format!("running '{demo}'"))?;

    println!("{}", render(&result, &vm.strings, &vm.heap));

    if cfg.gc.collect_after_run {
        vm.collect_garbage();
    }
    Ok(())
}

/// Renders a [`Value`], resolving strings and recursing into containers —
/// `Value`'s own `Display` only has the raw scalar/index, since it has no
/// access to the caches that give a string or container index meaning.
fn render(value: &Value, strings: &StringCache, heap: &chrono_heap::ContainerHeap) -> String {
    match value {
        Value::String(idx) => format!("{:?}", String::from_utf8_lossy(strings.get(*idx))),
        Value::List(idx) => {
            let Some(list) = heap.get(*idx).as_list() else { return value.to_string() };
            let items: Vec<String> = list.iter().map(|v| render(v, strings, heap)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(idx) => {
            let Some(obj) = heap.get(*idx).as_object() else { return value.to_string() };
            let mut entries: Vec<String> = obj
                .entries()
                .map(|(key, v)| format!("{:?}: {}", String::from_utf8_lossy(strings.get(key)), render(v, strings, heap)))
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(", "))
        }
        other => other.to_string(),
    }
}

/// §8 scenario 6: three persistent objects in a reference cycle, reachable
/// only from each other once the caller drops its own references. Pure
/// refcounting would leak this; `mark_all` + `sweep` must reclaim it.
fn gc_demo() -> Result<()> {
    let mut strings = StringCache::new();
    let mut heap = chrono_heap::ContainerHeap::new();

    let a = heap.pop_object();
    let b = heap.pop_object();
    let c = heap.pop_object();
    heap.ref_(a, &mut strings);
    heap.ref_(b, &mut strings);
    heap.ref_(c, &mut strings);

    let key = strings.pop_persistent(b"next");
    chrono_heap::ops::set(&mut heap, &mut strings, a, Value::String(key), Value::Object(b))?;
    chrono_heap::ops::set(&mut heap, &mut strings, b, Value::String(key), Value::Object(c))?;
    chrono_heap::ops::set(&mut heap, &mut strings, c, Value::String(key), Value::Object(a))?;

    println!("built a cycle: a#{a} -> b#{b} -> c#{c} -> a#{a}");

    heap.unref(a);
    heap.unref(b);
    heap.unref(c);
    heap.clear_temporary_references(&mut strings);
    println!(
        "after dropping external refs: refcount(a)={}, refcount(b)={}, refcount(c)={} (still 1 each, kept alive by the cycle)",
        heap.refcount(a),
        heap.refcount(b),
        heap.refcount(c),
    );

    heap.mark_all();
    heap.sweep(&mut strings);

    let reused = heap.pop_object();
    println!("after mark_all + sweep: slot #{reused} was reclaimed from the freed cycle");
    Ok(())
}
