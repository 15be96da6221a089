use std::fmt;

use serde::{Deserialize, Serialize};

/// A host-owned opaque handle. `type_tag` is a small integer the host assigns
/// per handle family (entity, file descriptor, ...); ChronoScript never
/// interprets `handle` itself, only routes `get`/`set` against it through
/// `type_tag` to the host's registered property table (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerHandle {
    pub type_tag: u16,
    pub handle: u64,
}

impl PointerHandle {
    pub fn new(type_tag: u16, handle: u64) -> Self {
        Self { type_tag, handle }
    }
}

impl fmt::Display for PointerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<pointer type={} handle={}>", self.type_tag, self.handle)
    }
}

/// A tagged dynamic value (§3 "Value").
///
/// `String`, `Object`, and `List` carry an index rather than owned data: the
/// former indexes the string cache (`chrono_values::StringCache`), the latter
/// two index the container heap (`chrono_heap::ContainerHeap`). Whether that
/// index is a temporary or a persistent reference is tracked by the owning
/// cache/heap, never by the `Value` itself (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Integer(i32),
    Decimal(f64),
    Pointer(PointerHandle),
    String(u32),
    Object(u32),
    List(u32),
}

impl Value {
    /// The tag name, used in error messages and for dispatch on the value's
    /// dynamic type (e.g. `is_container`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Pointer(_) => "pointer",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::List(_))
    }

    /// §4.8 truthiness: `Empty` and numeric zero are false; everything else
    /// (including every string, container, or non-null pointer) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Integer(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::Pointer(_) | Value::String(_) | Value::Object(_) | Value::List(_) => true,
        }
    }

    pub fn as_heap_index(&self) -> Option<u32> {
        match self {
            Value::Object(idx) | Value::List(idx) => Some(*idx),
            _ => None,
        }
    }

    pub fn as_string_index(&self) -> Option<u32> {
        match self {
            Value::String(idx) => Some(*idx),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "null"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Pointer(p) => write!(f, "{p}"),
            Value::String(idx) => write!(f, "<string#{idx}>"),
            Value::Object(idx) => write!(f, "<object#{idx}>"),
            Value::List(idx) => write!(f, "<list#{idx}>"),
        }
    }
}
