//! Two independently sorted tables (§4.7): free builtins and methods. Each
//! entry's position is a stable index, assigned once at registry
//! construction and handed out to the SSA builder's `lookup_*` calls, which
//! bake it into `CallTarget::Builtin`/`CallTarget::Method` (§4.4, §4.6).

use chrono_values::Value;

use crate::error::{BuiltinError, Result};
use crate::host::Host;
use crate::{builtins, methods};

pub type BuiltinFn = fn(&mut dyn Host, &[Value]) -> Result<Value>;

/// Sorted free-builtin table. Names must stay in ascending order — `lookup`
/// binary-searches it.
const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("create_entity", builtins::create_entity),
    ("get_args", builtins::get_args),
    ("log", builtins::log),
    ("to_decimal", builtins::to_decimal),
    ("to_integer", builtins::to_integer),
    ("to_string", builtins::to_string),
];

/// Sorted method table.
const METHODS: &[(&str, BuiltinFn)] = &[
    ("has_key", methods::has_key),
    ("keys", methods::keys),
    ("length", methods::length),
    ("move", methods::move_),
    ("substring", methods::substring),
];

fn lookup(table: &[(&str, BuiltinFn)], name: &str) -> Option<u32> {
    table.binary_search_by_key(&name, |(n, _)| *n).ok().map(|i| i as u32)
}

pub fn lookup_builtin(name: &str) -> Option<u32> {
    lookup(BUILTINS, name)
}

pub fn lookup_method(name: &str) -> Option<u32> {
    lookup(METHODS, name)
}

pub fn call_builtin(index: u32, host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    let (_, f) = BUILTINS.get(index as usize).ok_or(BuiltinError::UnknownBuiltin(index))?;
    f(host, args)
}

pub fn call_method(index: u32, host: &mut dyn Host, args: &[Value]) -> Result<Value> {
    let (_, f) = METHODS.get(index as usize).ok_or(BuiltinError::UnknownMethod(index))?;
    f(host, args)
}
