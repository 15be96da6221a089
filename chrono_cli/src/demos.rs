//! Stand-in "parser" for the CLI demo harness (§4.6/§8): since the real
//! lexer/parser/grammar is an out-of-scope collaborator (spec §1), this
//! drives [`chrono_ssa::SsaBuilder`] directly to reconstruct the §8
//! end-to-end scenarios as a tiny set of fixed "source files" addressable
//! by canonical path, the way a real front-end would hand `chrono_compiler`
//! a [`ModuleSource`] per file.

use chrono_compiler::{FunctionSignature, ModuleProvider, ModuleSource, Result};
use chrono_ir::JumpOp;
use chrono_ssa::SsaBuilder;
use chrono_values::BinaryOp;

/// The demo module files this build ships, keyed by canonical path. Every
/// name here is valid as both a `runscript run <name>` entry point and an
/// import target of another demo file.
pub fn names() -> &'static [&'static str] {
    &["arithmetic.cs", "prime.cs", "switch.cs", "loops.cs", "cycle_a.cs", "cycle_b.cs"]
}

pub struct DemoProvider;

impl ModuleProvider for DemoProvider {
    fn load(&self, canonical_path: &str) -> Option<Box<dyn ModuleSource>> {
        match canonical_path {
            "arithmetic.cs" => Some(Box::new(Arithmetic)),
            "prime.cs" => Some(Box::new(Prime)),
            "switch.cs" => Some(Box::new(Switch)),
            "loops.cs" => Some(Box::new(Loops)),
            "cycle_a.cs" => Some(Box::new(CycleA)),
            "cycle_b.cs" => Some(Box::new(CycleB)),
            _ => None,
        }
    }
}

/// §8 scenario 1 ("Arithmetic/type promotion"): `main()` assembles the four
/// literal results into a list so a single run prints all of them —
/// `[4.0, 3, "a b", "10x"]`.
struct Arithmetic;

impl ModuleSource for Arithmetic {
    fn imports(&self) -> Vec<String> {
        vec![]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("main", 0)]
    }
    fn build_function(&self, _name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        let mut list = b.mk_new_list();

        let ten = b.mk_int_constant(10);
        let two_and_a_half = b.mk_decimal_constant(2.5);
        let r1 = b.mk_binary_op(BinaryOp::Div, ten, two_and_a_half);
        list = b.mk_list_append(list, r1);

        let ten = b.mk_int_constant(10);
        let three = b.mk_int_constant(3);
        let r2 = b.mk_binary_op(BinaryOp::Div, ten, three);
        list = b.mk_list_append(list, r2);

        let a = b.mk_string_constant(b"a ");
        let bee = b.mk_string_constant(b"b");
        let r3 = b.mk_binary_op(BinaryOp::Add, a, bee);
        list = b.mk_list_append(list, r3);

        let ten = b.mk_int_constant(10);
        let x = b.mk_string_constant(b"x");
        let r4 = b.mk_binary_op(BinaryOp::Add, ten, x);
        list = b.mk_list_append(list, r4);

        b.mk_return(Some(list));
        Ok(())
    }
}

/// §8 scenario 2 ("Prime check"): `is_prime(n)` by trial division up to
/// `floor(sqrt(n))`; `main()` assembles `[isPrime(1), isPrime(2),
/// isPrime(17), isPrime(21)]` = `[0, 1, 1, 0]`.
struct Prime;

impl ModuleSource for Prime {
    fn imports(&self) -> Vec<String> {
        vec![]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("main", 0), FunctionSignature::new("is_prime", 1)]
    }
    fn build_function(&self, name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        match name {
            "main" => build_prime_main(b),
            "is_prime" => build_is_prime(b),
            other => unreachable!("prime.cs declares no function `{other}`"),
        }
    }
}

fn build_prime_main(b: &mut SsaBuilder<'_>) -> Result<()> {
    let mut list = b.mk_new_list();
    for n in [1, 2, 17, 21] {
        let arg = b.mk_int_constant(n);
        let result = b.mk_call("is_prime", vec![arg], true);
        list = b.mk_list_append(list, result);
    }
    b.mk_return(Some(list));
    Ok(())
}

/// `if (n < 2) return 0; for (i = 2; i*i <= n; i = i+1) if (n % i == 0)
/// return 0; return 1;`
fn build_is_prime(b: &mut SsaBuilder<'_>) -> Result<()> {
    b.declare_param("n", 0)?;
    let n = b.read_variable("n")?;
    let two = b.mk_int_constant(2);
    let lt_two = b.mk_binary_op(BinaryOp::Lt, n, two);

    let entry = b.current_block();
    let too_small = b.create_bb_after(None);
    let after_guard = b.create_bb_after(None);
    b.add_pred(too_small, entry);
    b.add_pred(after_guard, entry);
    b.mk_jump(JumpOp::BranchFalse, Some(after_guard), vec![lt_two]);

    b.set_current_block(too_small);
    b.seal_block(too_small);
    let zero = b.mk_int_constant(0);
    b.mk_return(Some(zero));

    b.set_current_block(after_guard);
    b.seal_block(after_guard);
    b.declare_variable("i")?;
    let two = b.mk_int_constant(2);
    b.write_variable("i", two)?;

    let header = b.create_bb_after(None);
    b.add_pred(header, after_guard);
    b.mk_jump(JumpOp::Jmp, Some(header), vec![]);

    b.set_current_block(header);
    let i = b.read_variable("i")?;
    let i_again = b.read_variable("i")?;
    let i_squared = b.mk_binary_op(BinaryOp::Mul, i, i_again);
    let n = b.read_variable("n")?;
    let still_in_range = b.mk_binary_op(BinaryOp::Le, i_squared, n);

    let body = b.create_bb_after(None);
    let exit = b.create_bb_after(None);
    b.add_pred(body, header);
    b.add_pred(exit, header);
    b.mk_jump(JumpOp::BranchFalse, Some(exit), vec![still_in_range]);

    b.set_current_block(body);
    b.seal_block(body);
    let n = b.read_variable("n")?;
    let i = b.read_variable("i")?;
    let remainder = b.mk_binary_op(BinaryOp::Mod, n, i);
    let zero = b.mk_int_constant(0);
    let divides_evenly = b.mk_binary_op(BinaryOp::Eq, remainder, zero);

    let composite = b.create_bb_after(None);
    let keep_going = b.create_bb_after(None);
    b.add_pred(composite, body);
    b.add_pred(keep_going, body);
    b.mk_jump(JumpOp::BranchFalse, Some(keep_going), vec![divides_evenly]);

    b.set_current_block(composite);
    b.seal_block(composite);
    let zero = b.mk_int_constant(0);
    b.mk_return(Some(zero));

    b.set_current_block(keep_going);
    b.seal_block(keep_going);
    let i = b.read_variable("i")?;
    let one = b.mk_int_constant(1);
    let next_i = b.mk_binary_op(BinaryOp::Add, i, one);
    b.write_variable("i", next_i)?;
    b.add_pred(header, keep_going);
    b.mk_jump(JumpOp::Jmp, Some(header), vec![]);

    b.seal_block(header);

    b.set_current_block(exit);
    b.seal_block(exit);
    let one = b.mk_int_constant(1);
    b.mk_return(Some(one));
    Ok(())
}

/// §8 scenario 3 ("Switch with fallthrough"): `case 1:` sets the result and
/// falls through (no `break;`, matching the sticky fallthrough comment bit
/// of §6) into `case 2:`'s no-op, so `n=1` yields `"one or two"` while
/// `n=2` yields the pre-switch default `"two"`; anything else falls to
/// `default:` and yields `"unknown"`. `main()` runs all three.
struct Switch;

impl ModuleSource for Switch {
    fn imports(&self) -> Vec<String> {
        vec![]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("main", 0), FunctionSignature::new("switch_demo", 1)]
    }
    fn build_function(&self, name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        match name {
            "main" => build_switch_main(b),
            "switch_demo" => build_switch_demo(b),
            other => unreachable!("switch.cs declares no function `{other}`"),
        }
    }
}

fn build_switch_main(b: &mut SsaBuilder<'_>) -> Result<()> {
    let mut list = b.mk_new_list();
    for n in [1, 2, 3] {
        let arg = b.mk_int_constant(n);
        let result = b.mk_call("switch_demo", vec![arg], true);
        list = b.mk_list_append(list, result);
    }
    b.mk_return(Some(list));
    Ok(())
}

fn build_switch_demo(b: &mut SsaBuilder<'_>) -> Result<()> {
    b.declare_param("n", 0)?;
    let n = b.read_variable("n")?;
    b.declare_variable("result")?;
    let two_str = b.mk_string_constant(b"two");
    b.write_variable("result", two_str)?;

    // §9 "Switch lowering": the scrutinee/default setup lives in its own
    // block, which falls through unconditionally into a dedicated "jumps"
    // block holding nothing but the `BranchEqual` chain and its trailing
    // `Jmp` to `default` — never mixed with the setup's own instructions.
    let entry = b.current_block();
    let jumps = b.create_bb_after(None);
    b.add_pred(jumps, entry);
    b.mk_jump(JumpOp::Jmp, Some(jumps), vec![]);

    b.set_current_block(jumps);
    b.seal_block(jumps);

    let case1 = b.create_bb_after(None);
    let case2 = b.create_bb_after(None);
    let default = b.create_bb_after(None);
    let after = b.create_bb_after(None);

    b.add_pred(case1, jumps);
    b.add_pred(case2, jumps);
    b.add_pred(default, jumps);

    let one = b.mk_int_constant(1);
    b.mk_jump(JumpOp::BranchEqual, Some(case1), vec![n.clone(), one]);
    let two = b.mk_int_constant(2);
    b.mk_jump(JumpOp::BranchEqual, Some(case2), vec![n, two]);
    b.mk_jump(JumpOp::Jmp, Some(default), vec![]);

    // case 1: /* fall through */
    b.set_current_block(case1);
    b.seal_block(case1);
    let one_or_two = b.mk_string_constant(b"one or two");
    b.write_variable("result", one_or_two)?;
    b.add_pred(case2, case1);
    b.mk_jump(JumpOp::Jmp, Some(case2), vec![]);

    // case 2: break;
    b.set_current_block(case2);
    b.seal_block(case2);
    b.add_pred(after, case2);
    b.mk_jump(JumpOp::Jmp, Some(after), vec![]);

    // default:
    b.set_current_block(default);
    b.seal_block(default);
    let unknown = b.mk_string_constant(b"unknown");
    b.write_variable("result", unknown)?;
    b.add_pred(after, default);
    b.mk_jump(JumpOp::Jmp, Some(after), vec![]);

    b.set_current_block(after);
    b.seal_block(after);
    let result = b.read_variable("result")?;
    b.mk_return(Some(result));
    Ok(())
}

/// §8 scenario 4 ("Nested loops", the dead-phi-cycle regression): three
/// nested counting loops over `a in [1,10)`, `b in [2,10)`, `c in [3,10)`,
/// each reading and incrementing the same outer `counter`. `counter` is
/// read through an unsealed header at every nesting level, which is
/// exactly the shape that used to produce a spurious "undefined value"
/// when trivial-phi elimination didn't fully chase redirect chains.
struct Loops;

impl ModuleSource for Loops {
    fn imports(&self) -> Vec<String> {
        vec![]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("main", 0)]
    }
    fn build_function(&self, _name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        b.declare_variable("counter")?;
        let zero = b.mk_int_constant(0);
        b.write_variable("counter", zero)?;

        build_counting_loop(b, "a", 1, 10, &|b| {
            build_counting_loop(b, "b", 2, 10, &|b| {
                build_counting_loop(b, "c", 3, 10, &|b| {
                    let counter = b.read_variable("counter")?;
                    let one = b.mk_int_constant(1);
                    let next = b.mk_binary_op(BinaryOp::Add, counter, one);
                    b.write_variable("counter", next)?;
                    Ok(())
                })
            })
        })?;

        let counter = b.read_variable("counter")?;
        b.mk_return(Some(counter));
        Ok(())
    }
}

/// `for (var = start; var < bound; var = var+1) { body }`, built against
/// the builder's low-level block primitives the way a real `for`-statement
/// reduction would (§4.1 "Control-flow helpers"): the header is read from
/// while still unsealed (the back edge isn't known yet), so every read of
/// an outer loop's variables inside a nested loop's header forces a fresh
/// incomplete phi that trivial-phi elimination must later collapse back to
/// the one real definition.
fn build_counting_loop(
    b: &mut SsaBuilder<'_>,
    var: &str,
    start: i32,
    bound: i32,
    body: &dyn Fn(&mut SsaBuilder<'_>) -> Result<()>,
) -> Result<()> {
    b.declare_variable(var)?;
    let start_v = b.mk_int_constant(start);
    b.write_variable(var, start_v)?;

    let preheader = b.current_block();
    let header = b.create_bb_after(None);
    b.add_pred(header, preheader);
    b.mk_jump(JumpOp::Jmp, Some(header), vec![]);

    b.set_current_block(header);
    let current = b.read_variable(var)?;
    let bound_v = b.mk_int_constant(bound);
    let in_range = b.mk_binary_op(BinaryOp::Lt, current, bound_v);

    let body_blk = b.create_bb_after(None);
    let after = b.create_bb_after(None);
    b.add_pred(body_blk, header);
    b.add_pred(after, header);
    b.mk_jump(JumpOp::BranchFalse, Some(after), vec![in_range]);

    b.set_current_block(body_blk);
    b.seal_block(body_blk);
    body(b)?;

    let latch = b.current_block();
    let current = b.read_variable(var)?;
    let one = b.mk_int_constant(1);
    let next = b.mk_binary_op(BinaryOp::Add, current, one);
    b.write_variable(var, next)?;
    b.add_pred(header, latch);
    b.mk_jump(JumpOp::Jmp, Some(header), vec![]);

    b.seal_block(header);

    b.set_current_block(after);
    b.seal_block(after);
    Ok(())
}

/// §8 scenario 5 ("Import cycle"): `cycle_a.cs` imports `cycle_b.cs` and
/// vice versa; each file's function calls the other's with a base case, so
/// the compilation cache's "pre-register function ids before recursing
/// into imports" discipline (§4.6 step 2) is load-bearing — without it,
/// resolving `is_odd`'s call to `is_even` while `cycle_a.cs` is still being
/// imported would find no entry at all.
struct CycleA;

impl ModuleSource for CycleA {
    fn imports(&self) -> Vec<String> {
        vec!["cycle_b.cs".to_string()]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("main", 0), FunctionSignature::new("is_even", 1)]
    }
    fn build_function(&self, name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        match name {
            "main" => {
                let ten = b.mk_int_constant(10);
                let result = b.mk_call("is_even", vec![ten], true);
                b.mk_return(Some(result));
                Ok(())
            }
            "is_even" => build_parity(b, 1, "is_odd"),
            other => unreachable!("cycle_a.cs declares no function `{other}`"),
        }
    }
}

struct CycleB;

impl ModuleSource for CycleB {
    fn imports(&self) -> Vec<String> {
        vec!["cycle_a.cs".to_string()]
    }
    fn globals(&self) -> Vec<String> {
        vec![]
    }
    fn functions(&self) -> Vec<FunctionSignature> {
        vec![FunctionSignature::new("is_odd", 1)]
    }
    fn build_function(&self, name: &str, b: &mut SsaBuilder<'_>) -> Result<()> {
        match name {
            "is_odd" => build_parity(b, 0, "is_even"),
            other => unreachable!("cycle_b.cs declares no function `{other}`"),
        }
    }
}

/// `if (n == 0) return base; return other(n - 1);` — shared shape for
/// `is_even`/`is_odd`'s mutual recursion; `base` is `1` for `is_even`
/// (zero is even) and `0` for `is_odd` (zero is not odd).
fn build_parity(b: &mut SsaBuilder<'_>, base_case: i32, other: &str) -> Result<()> {
    b.declare_param("n", 0)?;
    let n = b.read_variable("n")?;
    let zero = b.mk_int_constant(0);
    let is_zero = b.mk_binary_op(BinaryOp::Eq, n, zero);

    let entry = b.current_block();
    let base = b.create_bb_after(None);
    let recurse = b.create_bb_after(None);
    b.add_pred(base, entry);
    b.add_pred(recurse, entry);
    b.mk_jump(JumpOp::BranchFalse, Some(recurse), vec![is_zero]);

    b.set_current_block(base);
    b.seal_block(base);
    let base_value = b.mk_int_constant(base_case);
    b.mk_return(Some(base_value));

    b.set_current_block(recurse);
    b.seal_block(recurse);
    let n = b.read_variable("n")?;
    let one = b.mk_int_constant(1);
    let pred = b.mk_binary_op(BinaryOp::Sub, n, one);
    let result = b.mk_call(other, vec![pred], true);
    b.mk_return(Some(result));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_values::Value;

    fn run(entry: &str) -> Value {
        let provider = DemoProvider;
        let (program, strings) = chrono_compiler::compile(&provider, entry).unwrap();
        let canonical = chrono_compiler::canonicalize(entry);
        let id = program.function_id(&canonical, "main").unwrap();
        let mut vm = chrono_vm::Interpreter::new(program, strings, vec![]);
        vm.run_function(id, &[]).unwrap()
    }

    fn list_items(value: Value, vm: &chrono_vm::Interpreter) -> Vec<Value> {
        let idx = value.as_heap_index().expect("expected a container");
        vm.heap.get(idx).as_list().expect("expected a list").iter().copied().collect()
    }

    #[test]
    fn arithmetic_demo_matches_scenario_one() {
        let provider = DemoProvider;
        let (program, strings) = chrono_compiler::compile(&provider, "arithmetic.cs").unwrap();
        let id = program.function_id("arithmetic.cs", "main").unwrap();
        let mut vm = chrono_vm::Interpreter::new(program, strings, vec![]);
        let result = vm.run_function(id, &[]).unwrap();
        let items = list_items(result, &vm);
        assert_eq!(items[0], Value::Decimal(4.0));
        assert_eq!(items[1], Value::Integer(3));
        let Value::String(s3) = items[2] else { panic!() };
        assert_eq!(vm.strings.get(s3), b"a b");
        let Value::String(s4) = items[3] else { panic!() };
        assert_eq!(vm.strings.get(s4), b"10x");
    }

    #[test]
    fn prime_demo_matches_scenario_two() {
        let provider = DemoProvider;
        let (program, strings) = chrono_compiler::compile(&provider, "prime.cs").unwrap();
        let id = program.function_id("prime.cs", "main").unwrap();
        let mut vm = chrono_vm::Interpreter::new(program, strings, vec![]);
        let result = vm.run_function(id, &[]).unwrap();
        let items = list_items(result, &vm);
        assert_eq!(items, vec![Value::Integer(0), Value::Integer(1), Value::Integer(1), Value::Integer(0)]);
    }

    #[test]
    fn switch_demo_matches_scenario_three() {
        let provider = DemoProvider;
        let (program, strings) = chrono_compiler::compile(&provider, "switch.cs").unwrap();
        let id = program.function_id("switch.cs", "main").unwrap();
        let mut vm = chrono_vm::Interpreter::new(program, strings, vec![]);
        let result = vm.run_function(id, &[]).unwrap();
        let items = list_items(result, &vm);
        let as_str = |v: Value, vm: &chrono_vm::Interpreter| {
            let Value::String(idx) = v else { panic!() };
            String::from_utf8_lossy(vm.strings.get(idx)).into_owned()
        };
        assert_eq!(as_str(items[0], &vm), "one or two");
        assert_eq!(as_str(items[1], &vm), "two");
        assert_eq!(as_str(items[2], &vm), "unknown");
    }

    #[test]
    fn nested_loops_match_scenario_four() {
        assert_eq!(run("loops.cs"), Value::Integer(9 * 8 * 7));
    }

    #[test]
    fn import_cycle_resolves_and_terminates() {
        assert_eq!(run("cycle_a.cs"), Value::Integer(1));
    }
}
