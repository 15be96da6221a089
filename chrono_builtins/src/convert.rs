//! Value coercions shared by the `to_integer`/`to_decimal`/`to_string`
//! builtins (§4.7, §8 round-trip/idempotence properties).

use chrono_values::{StringCache, Value, ValueError};

pub fn to_integer(v: Value, strings: &StringCache) -> chrono_values::Result<i32> {
    match v {
        Value::Integer(i) => Ok(i),
        Value::Decimal(d) => {
            if !d.is_finite() {
                return Err(ValueError::NonFiniteToInteger);
            }
            if d < i32::MIN as f64 || d > i32::MAX as f64 {
                return Err(ValueError::NumericConversionOverflow);
            }
            Ok(d as i32)
        }
        Value::String(idx) => {
            let text = String::from_utf8_lossy(strings.get(idx));
            chrono_values::parse_integer(&text)
        }
        Value::Empty => Ok(0),
        other => Err(ValueError::UnaryTypeMismatch { op: "to_integer", operand: other.type_name() }),
    }
}

/// Per §9 "Open questions": a non-numeric string is a hard failure here,
/// not the legacy reference's `true`-on-error bug.
pub fn to_decimal(v: Value, strings: &StringCache) -> chrono_values::Result<f64> {
    match v {
        Value::Integer(i) => Ok(i as f64),
        Value::Decimal(d) => Ok(d),
        Value::String(idx) => {
            let text = String::from_utf8_lossy(strings.get(idx));
            chrono_values::parse_decimal(&text)
        }
        Value::Empty => Ok(0.0),
        other => Err(ValueError::UnaryTypeMismatch { op: "to_decimal", operand: other.type_name() }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(f64::NAN; "NaN")]
    #[test_case(f64::INFINITY; "positive infinity")]
    #[test_case(f64::NEG_INFINITY; "negative infinity")]
    fn decimal_truncation_rejects_non_finite(d: f64) {
        let strings = StringCache::new();
        assert_eq!(to_integer(Value::Decimal(d), &strings), Err(ValueError::NonFiniteToInteger));
    }

    #[test]
    fn to_decimal_rejects_non_numeric_string() {
        let mut strings = StringCache::new();
        let idx = strings.pop_persistent(b"not a number");
        assert!(to_decimal(Value::String(idx), &strings).is_err());
    }

    #[test]
    fn to_integer_is_idempotent_on_an_integer() {
        let strings = StringCache::new();
        let once = to_integer(Value::Integer(42), &strings).unwrap();
        let twice = to_integer(Value::Integer(once), &strings).unwrap();
        assert_eq!(once, twice);
    }
}
