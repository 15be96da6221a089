//! §4.8 value operators, shared by the constant folder (chrono_ssa) and the
//! interpreter (chrono_vm) so that "fold now" and "execute later" can never
//! disagree about semantics.

use crate::error::{Result, ValueError};
use crate::string_cache::StringCache;
use crate::value::Value;

/// Binary opcodes. Mirrors `ExecInstruction`'s binary-op encoding (§3/§4.4)
/// and `Instruction::Expression`'s `op` field (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Whether this op always yields the boolean-valued integer 0/1 — used
    /// by the constant folder's `Bool`/`BoolNot` peepholes (§4.1).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Unary opcodes, including the two folding-peephole pseudo-ops `Bool` and
/// `BoolNot` (§4.1 constant folding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    BitNot,
    /// Cast-to-boolean: truthy → 1, falsy → 0.
    Bool,
    /// Logical not: truthy → 0, falsy → 1.
    BoolNot,
}

fn type_pair(op: &'static str, lhs: &Value, rhs: &Value) -> ValueError {
    ValueError::TypeMismatch { op, lhs: lhs.type_name(), rhs: rhs.type_name() }
}

fn as_i32(v: &Value) -> Option<i32> {
    match v {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// A value's string form — shared by `+` concatenation and the `to_string`
/// builtin so both agree on exactly how a non-string operand renders.
pub fn display_bytes(v: &Value, strings: &StringCache) -> Vec<u8> {
    match v {
        Value::String(idx) => strings.get(*idx).to_vec(),
        other => other.to_string().into_bytes(),
    }
}

fn bool_value(b: bool) -> Value {
    Value::Integer(if b { 1 } else { 0 })
}

/// Dispatches a binary opcode over two values (§4.8).
///
/// `strings` is mutated for `+` concatenation (a fresh, temporary string
/// slot is allocated) and read for string comparisons.
pub fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value, strings: &mut StringCache) -> Result<Value> {
    use BinaryOp::*;

    if op == Add && (matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_))) {
        let mut bytes = display_bytes(&lhs, strings);
        bytes.extend(display_bytes(&rhs, strings));
        let idx = strings.pop(bytes.len());
        strings.set_bytes(idx, bytes);
        return Ok(Value::String(idx));
    }

    match op {
        Add | Sub | Mul | Div => arithmetic(op, lhs, rhs),
        Mod => {
            let (a, b) = (as_i32(&lhs), as_i32(&rhs));
            match (a, b) {
                (Some(_), Some(0)) => Err(ValueError::DivisionByZero),
                (Some(a), Some(b)) => Ok(Value::Integer(a.wrapping_rem(b))),
                _ => Err(ValueError::ModuloRequiresIntegers),
            }
        }
        BitAnd | BitOr | BitXor | Shl | Shr => bitwise(op, lhs, rhs),
        Eq => Ok(bool_value(values_equal(&lhs, &rhs, strings))),
        Ne => Ok(bool_value(!values_equal(&lhs, &rhs, strings))),
        Lt | Le | Gt | Ge => ordering(op, &lhs, &rhs, strings),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => {
            let r = match op {
                Add => a.wrapping_add(b),
                Sub => a.wrapping_sub(b),
                Mul => a.wrapping_mul(b),
                Div => {
                    if b == 0 {
                        return Err(ValueError::DivisionByZero);
                    }
                    a.wrapping_div(b)
                }
                _ => unreachable!(),
            };
            Ok(Value::Integer(r))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (a, b) = (as_f64(&a).unwrap(), as_f64(&b).unwrap());
            let r = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a / b,
                _ => unreachable!(),
            };
            Ok(Value::Decimal(r))
        }
        (a, b) => Err(type_pair(op_name(op), &a, &b)),
    }
}

fn bitwise(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    match (as_i32(&lhs), as_i32(&rhs)) {
        (Some(a), Some(b)) => {
            let r = match op {
                BitAnd => a & b,
                BitOr => a | b,
                BitXor => a ^ b,
                Shl => a.wrapping_shl(b as u32 & 31),
                Shr => a.wrapping_shr(b as u32 & 31),
                _ => unreachable!(),
            };
            Ok(Value::Integer(r))
        }
        _ => Err(ValueError::BitwiseRequiresIntegers),
    }
}

fn values_equal(lhs: &Value, rhs: &Value, strings: &StringCache) -> bool {
    match (lhs, rhs) {
        (Value::Empty, Value::Empty) => true,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (a, b) if a.is_numeric() && b.is_numeric() => as_f64(a) == as_f64(b),
        (Value::String(a), Value::String(b)) => a == b || strings.get(*a) == strings.get(*b),
        (Value::Object(a), Value::Object(b)) => a == b,
        (Value::List(a), Value::List(b)) => a == b,
        (Value::Pointer(a), Value::Pointer(b)) => a == b,
        _ => false,
    }
}

fn ordering(op: BinaryOp, lhs: &Value, rhs: &Value, strings: &StringCache) -> Result<Value> {
    use BinaryOp::*;
    use std::cmp::Ordering as Ord_;

    let ordering = match (lhs, rhs) {
        (a, b) if a.is_numeric() && b.is_numeric() => {
            as_f64(a).unwrap().partial_cmp(&as_f64(b).unwrap())
        }
        (Value::String(a), Value::String(b)) => Some(strings.get(*a).cmp(strings.get(*b))),
        _ => None,
    };

    let result = match ordering {
        None => false,
        Some(ord) => match op {
            Lt => ord == Ord_::Less,
            Le => ord != Ord_::Greater,
            Gt => ord == Ord_::Greater,
            Ge => ord != Ord_::Less,
            _ => unreachable!(),
        },
    };
    Ok(bool_value(result))
}

fn op_name(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        Shl => "<<",
        Shr => ">>",
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
    }
}

/// Dispatches a unary opcode (§4.8, §4.1 peepholes).
pub fn eval_unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match op {
        UnaryOp::Neg => match operand {
            Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => Err(ValueError::UnaryTypeMismatch { op: "-", operand: other.type_name() }),
        },
        UnaryOp::BitNot => match operand {
            // Corrected per §9 design note 2: the reference implementation's
            // ScriptVariant_Bit_Not returned its input unchanged; the
            // mathematically correct semantics complement the bits.
            Value::Integer(i) => Ok(Value::Integer(!i)),
            other => Err(ValueError::UnaryTypeMismatch { op: "~", operand: other.type_name() }),
        },
        UnaryOp::Bool => Ok(bool_value(operand.is_truthy())),
        UnaryOp::BoolNot => Ok(bool_value(!operand.is_truthy())),
    }
}

/// Parses a decimal ASCII integer literal the way the runtime `to_integer`
/// builtin does (used by both the builtins registry and constant folding).
pub fn parse_integer(text: &str) -> Result<i32> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| ValueError::InvalidIntegerLiteral { text: text.to_string() })
}

/// Parses a decimal literal. Per §9 design note 3, a non-numeric string is a
/// hard failure (the legacy reference implementation's `true`-on-error path
/// is a bug, not the intended contract).
pub fn parse_decimal(text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ValueError::InvalidDecimalLiteral { text: text.to_string() })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(10, 3, Value::Integer(3); "both integers truncates")]
    #[test_case(9, 3, Value::Integer(3); "exact division stays integer")]
    #[test_case(-7, 2, Value::Integer(-3); "negative numerator truncates toward zero")]
    fn integer_division_truncates(lhs: i32, rhs: i32, expected: Value) {
        let mut strings = StringCache::new();
        let r = eval_binary(BinaryOp::Div, Value::Integer(lhs), Value::Integer(rhs), &mut strings).unwrap();
        assert_eq!(r, expected);
    }

    #[test]
    fn integer_over_decimal_promotes() {
        let mut strings = StringCache::new();
        let r = eval_binary(BinaryOp::Div, Value::Integer(10), Value::Decimal(2.5), &mut strings).unwrap();
        assert_eq!(r, Value::Decimal(4.0));
    }

    #[test]
    fn string_concat_with_string_operand() {
        let mut strings = StringCache::new();
        let a = strings.pop(1);
        strings.set_bytes(a, b"a ".to_vec());
        let b = strings.pop(1);
        strings.set_bytes(b, b"b".to_vec());
        let r = eval_binary(BinaryOp::Add, Value::String(a), Value::String(b), &mut strings).unwrap();
        let idx = r.as_string_index().unwrap();
        assert_eq!(strings.get(idx), b"a b");
    }

    #[test]
    fn integer_plus_string_stringifies_integer() {
        let mut strings = StringCache::new();
        let x = strings.pop(1);
        strings.set_bytes(x, b"x".to_vec());
        let r = eval_binary(BinaryOp::Add, Value::Integer(10), Value::String(x), &mut strings).unwrap();
        let idx = r.as_string_index().unwrap();
        assert_eq!(strings.get(idx), b"10x");
    }

    #[test]
    fn division_by_zero_fails() {
        let mut strings = StringCache::new();
        let err = eval_binary(BinaryOp::Div, Value::Integer(1), Value::Integer(0), &mut strings).unwrap_err();
        assert_eq!(err, ValueError::DivisionByZero);
    }

    #[test]
    fn bit_not_complements() {
        assert_eq!(eval_unary(UnaryOp::BitNot, Value::Integer(0)).unwrap(), Value::Integer(-1));
    }

    #[test]
    fn bool_not_bool_peephole_semantics() {
        // BoolNot(Bool(x)) should equal BoolNot(x): verify the two compose
        // to the same observable result for a representative truthy/falsy x.
        let x = Value::Integer(5);
        let direct = eval_unary(UnaryOp::BoolNot, x).unwrap();
        let via_bool = eval_unary(UnaryOp::Bool, x).unwrap();
        let double = eval_unary(UnaryOp::BoolNot, via_bool).unwrap();
        assert_eq!(direct, double);
    }
}
