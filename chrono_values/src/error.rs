use thiserror::Error;

/// Runtime errors raised by value operators (§4.8) and string-cache bookkeeping.
///
/// These are the "runtime error" kind of spec §7: raising one aborts the
/// current interpreter frame and propagates as failure out of `run_function`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValueError {
    #[error("type mismatch: {op} is not defined for {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("unary {op} is not defined for {operand}")]
    UnaryTypeMismatch { op: &'static str, operand: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo requires both operands to be integers")]
    ModuloRequiresIntegers,

    #[error("bitwise operators require integer operands")]
    BitwiseRequiresIntegers,

    #[error("cannot truncate NaN or infinite value to an integer")]
    NonFiniteToInteger,

    #[error("numeric conversion overflowed i32 range")]
    NumericConversionOverflow,

    #[error("'{text}' is not a valid integer")]
    InvalidIntegerLiteral { text: String },

    #[error("'{text}' is not a valid decimal")]
    InvalidDecimalLiteral { text: String },
}

pub type Result<T> = std::result::Result<T, ValueError>;
