//! Free builtins (§4.7): receive their arguments with no receiver prepended.

use chrono_values::Value;

use crate::convert;
use crate::error::{BuiltinError, Result};
use crate::host::Host;

fn check_arity(name: &'static str, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() != expected {
        return Err(BuiltinError::ArityMismatch { name, expected, actual: args.len() });
    }
    Ok(())
}

fn set_field(host: &mut dyn Host, obj: u32, name: &str, value: Value) -> Result<()> {
    let (strings, heap) = host.strings_and_heap();
    let key = strings.pop_persistent(name.as_bytes());
    chrono_heap::set(heap, strings, obj, Value::String(key), value)?;
    Ok(())
}

/// `create_entity(x, y, z)` (§4.7, §9 open question): the upstream reference
/// reads `params[1]` for both `y` and `z`; this reads three distinct
/// arguments.
pub fn create_entity(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("create_entity", 3, args)?;
    let x = convert::to_decimal(args[0], host.strings())?;
    let y = convert::to_decimal(args[1], host.strings())?;
    let z = convert::to_decimal(args[2], host.strings())?;

    let obj = host.heap().pop_object();
    set_field(host, obj, "x", Value::Decimal(x))?;
    set_field(host, obj, "y", Value::Decimal(y))?;
    set_field(host, obj, "z", Value::Decimal(z))?;
    Ok(Value::Object(obj))
}

/// `get_args()`: the script-args list the host passed the CLI (§6).
pub fn get_args(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("get_args", 0, args)?;
    let list_idx = host.heap().pop_list();
    let script_args: Vec<String> = host.script_args().to_vec();
    for arg in script_args {
        let (strings, heap) = host.strings_and_heap();
        let idx = strings.pop(arg.len());
        strings.set_bytes(idx, arg.into_bytes());
        chrono_heap::push(heap, strings, list_idx, Value::String(idx));
    }
    Ok(Value::List(list_idx))
}

/// `log(value)`: writes the value's string form to stdout (§7 "all
/// user-visible messages are plain English strings written to stdout").
pub fn log(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("log", 1, args)?;
    let bytes = chrono_values::display_bytes(&args[0], host.strings());
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(Value::Empty)
}

pub fn to_decimal(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("to_decimal", 1, args)?;
    Ok(Value::Decimal(convert::to_decimal(args[0], host.strings())?))
}

pub fn to_integer(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("to_integer", 1, args)?;
    Ok(Value::Integer(convert::to_integer(args[0], host.strings())?))
}

pub fn to_string(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("to_string", 1, args)?;
    let bytes = chrono_values::display_bytes(&args[0], host.strings());
    let strings = host.strings();
    let idx = strings.pop(bytes.len());
    strings.set_bytes(idx, bytes);
    Ok(Value::String(idx))
}
