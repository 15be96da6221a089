//! Methods (§4.7): receive the receiver as `args[0]`, inserted by the SSA
//! builder ahead of the call's written-out arguments.

use chrono_heap::Container;
use chrono_values::Value;

use crate::error::{BuiltinError, Result};
use crate::host::Host;

fn check_arity(name: &'static str, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() != expected {
        return Err(BuiltinError::ArityMismatch { name, expected, actual: args.len() });
    }
    Ok(())
}

fn field(host: &mut dyn Host, obj: u32, name: &str) -> Result<Value> {
    let (strings, heap) = host.strings_and_heap();
    let key = strings
        .find_string(name.as_bytes())
        .ok_or_else(|| BuiltinError::UnknownProperty(name.to_string()))?;
    chrono_heap::get(heap.get(obj), strings, Value::String(key)).map_err(Into::into)
}

fn set_field(host: &mut dyn Host, obj: u32, name: &str, value: Value) -> Result<()> {
    let (strings, heap) = host.strings_and_heap();
    let key = strings.pop_persistent(name.as_bytes());
    chrono_heap::set(heap, strings, obj, Value::String(key), value)?;
    Ok(())
}

fn as_object(v: Value) -> Result<u32> {
    match v {
        Value::Object(idx) => Ok(idx),
        other => {
            Err(chrono_values::ValueError::UnaryTypeMismatch { op: "(method)", operand: other.type_name() }.into())
        }
    }
}

/// `substring(s, start, len)`.
pub fn substring(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("substring", 3, args)?;
    let Value::String(idx) = args[0] else {
        return Err(chrono_values::ValueError::UnaryTypeMismatch { op: "substring", operand: args[0].type_name() }
            .into());
    };
    let start = crate::convert::to_integer(args[1], host.strings())?.max(0) as usize;
    let len = crate::convert::to_integer(args[2], host.strings())?.max(0) as usize;
    let bytes = host.strings().get(idx).to_vec();
    let end = (start + len).min(bytes.len());
    let slice = if start <= bytes.len() { bytes[start..end].to_vec() } else { Vec::new() };

    let strings = host.strings();
    let out = strings.pop(slice.len());
    strings.set_bytes(out, slice);
    Ok(Value::String(out))
}

/// `length()`: byte length of a string, entry count of an object, element
/// count of a list.
pub fn length(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("length", 1, args)?;
    let n = match args[0] {
        Value::String(idx) => host.strings().len(idx),
        Value::Object(idx) => match host.heap().get(idx) {
            Container::Object(obj) => obj.len(),
            Container::List(_) => unreachable!("object index always holds an object"),
        },
        Value::List(idx) => match host.heap().get(idx) {
            Container::List(list) => list.len(),
            Container::Object(_) => unreachable!("list index always holds a list"),
        },
        other => {
            return Err(chrono_values::ValueError::UnaryTypeMismatch { op: "length", operand: other.type_name() }
                .into())
        }
    };
    Ok(Value::Integer(n as i32))
}

/// `has_key(obj, key)`.
pub fn has_key(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("has_key", 2, args)?;
    let obj = as_object(args[0])?;
    let Value::String(key) = args[1] else {
        return Err(chrono_heap::HeapError::NonStringObjectKey.into());
    };
    let (strings, heap) = host.strings_and_heap();
    let Container::Object(object) = heap.get(obj) else {
        unreachable!("object index always holds an object");
    };
    Ok(Value::Integer(object.has_key(strings, key) as i32))
}

/// `keys(obj)`: a fresh list of the object's keys, in table order.
pub fn keys(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("keys", 1, args)?;
    let obj = as_object(args[0])?;
    let key_ids: Vec<u32> = match host.heap().get(obj) {
        Container::Object(object) => object.keys().collect(),
        Container::List(_) => unreachable!("object index always holds an object"),
    };

    let list_idx = host.heap().pop_list();
    for key in key_ids {
        let (strings, heap) = host.strings_and_heap();
        strings.ref_(key);
        chrono_heap::push(heap, strings, list_idx, Value::String(key));
    }
    Ok(Value::List(list_idx))
}

/// `move(entity, dx, dy, dz)`: offsets the `x`/`y`/`z` fields [`create_entity`]
/// installs. Returns `Empty`.
pub fn move_(host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    check_arity("move", 4, args)?;
    let entity = as_object(args[0])?;
    let dx = crate::convert::to_decimal(args[1], host.strings())?;
    let dy = crate::convert::to_decimal(args[2], host.strings())?;
    let dz = crate::convert::to_decimal(args[3], host.strings())?;

    let x = crate::convert::to_decimal(field(host, entity, "x")?, host.strings())? + dx;
    let y = crate::convert::to_decimal(field(host, entity, "y")?, host.strings())? + dy;
    let z = crate::convert::to_decimal(field(host, entity, "z")?, host.strings())? + dz;
    set_field(host, entity, "x", Value::Decimal(x))?;
    set_field(host, entity, "y", Value::Decimal(y))?;
    set_field(host, entity, "z", Value::Decimal(z))?;
    Ok(Value::Empty)
}
